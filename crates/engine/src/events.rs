//! Job events and their wire shape.
//!
//! Each event serialises to one JSON object:
//!
//! ```json
//! {"job_id":"…","seq":3,"event":"success","payload":{"vertex_id":"a","output":{}}}
//! ```
//!
//! Within a job, `seq` starts at 0 and increases by one per event. The first
//! event is always `vertices_sorted`; the last is always `end`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::{JobId, JobStatus};

/// One entry in a job's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub seq: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Event type tag plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    /// The full execution order, before any vertex runs.
    VerticesSorted(Vec<String>),
    Start {
        vertex_id: String,
    },
    Success {
        vertex_id: String,
        output: Value,
    },
    Error {
        vertex_id: String,
        error: String,
    },
    End(EndPayload),
}

/// Payload of the terminal `end` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndPayload {
    pub status: JobStatus,
    /// Why the job errored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the job was cancelled but releasing completed vertices failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_error: Option<String>,
}

impl EndPayload {
    pub fn completed() -> Self {
        Self {
            status: JobStatus::Completed,
            error: None,
            cancellation_error: None,
        }
    }

    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Errored,
            error: Some(error.into()),
            cancellation_error: None,
        }
    }

    pub fn cancelled(cancellation_error: Option<String>) -> Self {
        Self {
            status: JobStatus::Cancelled,
            error: None,
            cancellation_error,
        }
    }
}

impl EventKind {
    /// Wire name of the event type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VerticesSorted(_) => "vertices_sorted",
            Self::Start { .. } => "start",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
            Self::End(_) => "end",
        }
    }

    /// The vertex this event concerns, if any.
    pub fn vertex_id(&self) -> Option<&str> {
        match self {
            Self::Start { vertex_id }
            | Self::Success { vertex_id, .. }
            | Self::Error { vertex_id, .. } => Some(vertex_id.as_str()),
            Self::VerticesSorted(_) | Self::End(_) => None,
        }
    }
}

impl JobEvent {
    pub fn new(job_id: JobId, seq: u64, kind: EventKind) -> Self {
        Self { job_id, seq, kind }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn vertex_id(&self) -> Option<&str> {
        self.kind.vertex_id()
    }

    pub fn is_end(&self) -> bool {
        matches!(self.kind, EventKind::End(_))
    }

    /// The `end` payload, if this is the terminal event.
    pub fn end(&self) -> Option<&EndPayload> {
        match &self.kind {
            EventKind::End(payload) => Some(payload),
            _ => None,
        }
    }

    /// Render as a single newline-terminated JSON line.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vertices_sorted_wire_shape() {
        let id = JobId::new();
        let event = JobEvent::new(id, 0, EventKind::VerticesSorted(vec!["a".into(), "b".into()]));

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "job_id": id.to_string(),
                "seq": 0,
                "event": "vertices_sorted",
                "payload": ["a", "b"],
            })
        );
    }

    #[test]
    fn vertex_event_wire_shape() {
        let id = JobId::new();
        let event = JobEvent::new(
            id,
            2,
            EventKind::Success {
                vertex_id: "a".into(),
                output: json!({ "n": 1 }),
            },
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "success");
        assert_eq!(value["payload"], json!({ "vertex_id": "a", "output": { "n": 1 } }));
        assert_eq!(event.vertex_id(), Some("a"));
    }

    #[test]
    fn end_payload_omits_absent_fields() {
        let event = JobEvent::new(JobId::new(), 5, EventKind::End(EndPayload::completed()));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "end");
        assert_eq!(value["payload"], json!({ "status": "completed" }));
        assert!(event.is_end());

        let cancelled = EndPayload::cancelled(Some("hook failed".into()));
        assert_eq!(
            serde_json::to_value(&cancelled).unwrap(),
            json!({ "status": "cancelled", "cancellation_error": "hook failed" })
        );
    }

    #[test]
    fn json_line_is_newline_terminated() {
        let event = JobEvent::new(
            JobId::new(),
            1,
            EventKind::Start {
                vertex_id: "a".into(),
            },
        );
        let line = event.to_json_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
