//! Event - 発生した出来事の値オブジェクト
//!
//! Event は名前と opaque な params を持つだけで、posts / votes / orders
//! といった業務ドメインのことは知りません。payload の意味は publish する側と
//! handler の間の約束です。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque parameter payload attached by the publisher.
pub type Params = serde_json::Map<String, Value>;

/// Identifier of the actor (usually a user) who caused an event.
///
/// The dispatcher never interprets it; the web layer stores its own
/// document ids here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Who signed an event and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub reason: String,
    pub actor_id: ActorId,
}

impl Signer {
    pub fn new(reason: impl Into<String>, actor_id: impl Into<ActorId>) -> Self {
        Self {
            reason: reason.into(),
            actor_id: actor_id.into(),
        }
    }
}

/// Event は publish 後に変更されない
///
/// # 使用例
/// ```ignore
/// let event = Event::new("vote")
///     .signed_by(Signer::new("vote", "5a1f..."))
///     .with_param("type", "up");
/// dispatcher.publish(event).await;
/// ```
///
/// フィールドは private にして、構築後に書き換えられないようにしています。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signer: Option<Signer>,
    #[serde(default)]
    params: Params,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signer: None,
            params: Params::new(),
        }
    }

    pub fn signed_by(mut self, signer: Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Replaces the whole payload.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}
