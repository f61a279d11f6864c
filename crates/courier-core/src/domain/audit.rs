//! Audit record: the before/after trace of one event dispatch.
//!
//! The dispatcher only ever writes these records. Reading them back is left
//! to operators and tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::event::{Event, Params, Signer};
use super::ids::EventRecordId;

/// Durable trace of one published event.
///
/// Inserted with only the "started" fields set, then completed once by
/// [`AuditCompletion`] after the matched handlers ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: EventRecordId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<Signer>,

    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<Duration>,

    /// Handlers scheduled for the event, not the number that succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_count: Option<usize>,
}

impl AuditRecord {
    /// Record in the "started" state, copied field by field from the event.
    pub fn started(id: EventRecordId, event: &Event, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: event.name().to_string(),
            signer: event.signer().cloned(),
            params: event.params().clone(),
            created_at,
            finished_at: None,
            elapsed: None,
            handler_count: None,
        }
    }

    pub fn apply(&mut self, completion: &AuditCompletion) {
        self.finished_at = Some(completion.finished_at);
        self.elapsed = Some(completion.elapsed);
        self.handler_count = Some(completion.handler_count);
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Partial update written once the handler chain is over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCompletion {
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub handler_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn at(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, sec).unwrap()
    }

    #[test]
    fn started_record_copies_event_verbatim() {
        let event = Event::new("vote")
            .signed_by(Signer::new("vote", "u-1"))
            .with_param("type", "up");
        let id = EventRecordId::from_ulid(Ulid::new());

        let record = AuditRecord::started(id, &event, at(0));

        assert_eq!(record.id, id);
        assert_eq!(record.name, "vote");
        assert_eq!(record.signer.as_ref(), event.signer());
        assert_eq!(&record.params, event.params());
        assert!(!record.is_finished());
        assert_eq!(record.handler_count, None);
    }

    #[test]
    fn apply_sets_finish_fields() {
        let event = Event::new("flag.new");
        let mut record = AuditRecord::started(EventRecordId::from_ulid(Ulid::new()), &event, at(0));

        record.apply(&AuditCompletion {
            finished_at: at(2),
            elapsed: Duration::from_millis(1500),
            handler_count: 0,
        });

        assert!(record.is_finished());
        assert_eq!(record.finished_at, Some(at(2)));
        assert_eq!(record.elapsed, Some(Duration::from_millis(1500)));
        assert_eq!(record.handler_count, Some(0));
    }
}
