//! Event types and EventBus for triage modules
//!
//! The ingest module announces new findings and per-file failures here; any
//! number of listeners (console progress, report writers) subscribe.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Triage event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriageEvent {
    /// A finding was written to the evidence store
    FindingRecorded {
        /// Evidence record id
        finding_id: Uuid,
        /// Host file id the finding is attached to
        file_id: u64,
        /// Module that produced the finding
        set_name: String,
        /// Reported label
        label: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A file could not be classified; the scan continues
    FileFailed {
        file_id: u64,
        /// Human-readable failure reason
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Module shut down after a scan
    ScanCompleted {
        files_seen: u64,
        files_classified: u64,
        files_failed: u64,
        findings_recorded: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TriageEvent {
    /// Event type name, matching the serde tag
    pub fn event_type(&self) -> &str {
        match self {
            TriageEvent::FindingRecorded { .. } => "FindingRecorded",
            TriageEvent::FileFailed { .. } => "FileFailed",
            TriageEvent::ScanCompleted { .. } => "ScanCompleted",
        }
    }
}

/// Broadcast bus for [`TriageEvent`]s
///
/// Backed by `tokio::sync::broadcast`: publishing never blocks, slow
/// subscribers see a lag error instead of stalling the scan.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TriageEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TriageEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: TriageEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_event() -> TriageEvent {
        TriageEvent::FileFailed {
            file_id: 7,
            reason: "connection refused".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(4);
        bus.emit_lossy(failed_event());

        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        bus.emit_lossy(failed_event());

        match rx.recv().await.unwrap() {
            TriageEvent::FileFailed { file_id, reason, .. } => {
                assert_eq!(file_id, 7);
                assert_eq!(reason, "connection refused");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_serialization_uses_type_tag() {
        let json = serde_json::to_value(failed_event()).unwrap();
        assert_eq!(json["type"], "FileFailed");
        assert_eq!(failed_event().event_type(), "FileFailed");
    }
}
