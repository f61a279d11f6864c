//! Event constructors used by the forum and store layers.
//!
//! These are thin factories: they only decide the event name and the shape
//! of the params. Handlers look the names up through the constants below.

use super::event::{ActorId, Event, Signer};

pub const VOTE_CAST: &str = "vote";
pub const FLAG_RAISED: &str = "flag.new";
pub const ORDER_STATUS_CHANGED: &str = "order.status";
pub const COMMENT_CREATED: &str = "comment.new";

/// Something a user can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reactable {
    Post,
    Comment,
}

impl Reactable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reactable::Post => "post",
            Reactable::Comment => "comment",
        }
    }
}

/// A vote was upserted (or withdrawn, when `removed` is set).
pub fn vote_cast(
    voter: impl Into<ActorId>,
    vote_id: &str,
    target: Reactable,
    target_id: &str,
    kind: &str,
    removed: bool,
) -> Event {
    Event::new(VOTE_CAST)
        .signed_by(Signer::new("vote", voter))
        .with_param("id", vote_id)
        .with_param("related", target.as_str())
        .with_param("related_id", target_id)
        .with_param("type", kind)
        .with_param("removed", removed)
}

/// A flag was raised against a post or comment. Moderation reacts to it.
pub fn flag_raised(flag_id: &str) -> Event {
    Event::new(FLAG_RAISED).with_param("id", flag_id)
}

pub fn order_status_changed(order_id: &str, from: &str, to: &str) -> Event {
    Event::new(ORDER_STATUS_CHANGED)
        .with_param("id", order_id)
        .with_param("from", from)
        .with_param("to", to)
}

pub fn comment_created(author: impl Into<ActorId>, comment_id: &str, post_id: &str) -> Event {
    Event::new(COMMENT_CREATED)
        .signed_by(Signer::new("comment", author))
        .with_param("id", comment_id)
        .with_param("post_id", post_id)
}

/// Payload of an order event, for handlers that want it typed.
pub fn order_transition(event: &Event) -> Option<(String, String)> {
    let from = event.param("from")?.as_str()?;
    let to = event.param("to")?.as_str()?;
    Some((from.to_string(), to.to_string()))
}
