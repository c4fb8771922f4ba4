// gait-schema/src/event.rs
// ============================================================================
// Module: Job Event
// Description: Append-only journal entries for a job.
// Purpose: Strict-parse and validate `Event` per `spec.md` §3.
// Dependencies: gait-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Events are written one per line as `jobs/<job_id>/events.jsonl` via
//! `gait_core::append_line_locked`. This module owns the record shape only;
//! the journal itself lives in `gait-jobs`.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::SchemaError;

/// The kind of job event recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The job transitioned between statuses.
    StateTransition,
    /// A checkpoint was appended to the job's timeline.
    CheckpointAdded,
    /// An approval was granted against the job.
    ApprovalGranted,
    /// A dispatch was blocked, e.g. by emergency-stop preemption.
    DispatchBlocked,
    /// An emergency stop request was acknowledged.
    EmergencyStopAcknowledged,
}

/// A single append-only journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    /// Unique event identifier.
    pub event_id: String,
    /// The event's type.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// RFC 3339 creation instant.
    pub created_at: gait_core::Timestamp,
    /// Reason code explaining why this event was recorded.
    pub reason_code: String,
    /// Identity of the actor responsible for this event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Event-type-specific payload.
    pub payload: Value,
}

impl Event {
    /// Serializes this event as a single JSONL line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if serialization fails.
    pub fn to_jsonl_line(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Strict-parses a single event from one JSONL line.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on malformed JSON or an empty `event_id`.
    pub fn parse_line(line: &str) -> Result<Self, SchemaError> {
        let event: Self = serde_json::from_str(line)?;
        if event.event_id.trim().is_empty() {
            return Err(SchemaError::Invalid("event_id must be non-empty".to_string()));
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::Event;
    use super::EventType;
    use gait_core::Timestamp;
    use serde_json::json;

    #[test]
    fn roundtrips_through_jsonl() {
        let event = Event {
            event_id: "evt_1".to_string(),
            event_type: EventType::DispatchBlocked,
            created_at: Timestamp::from_unix_millis(0).unwrap(),
            reason_code: "emergency_stop_preempted".to_string(),
            actor: None,
            payload: json!({"job_id": "job_1"}),
        };
        let line = event.to_jsonl_line().expect("serialize");
        assert!(!line.ends_with('\n'));
        let parsed = Event::parse_line(&line).expect("parse");
        assert_eq!(parsed.event_id, "evt_1");
    }
}
