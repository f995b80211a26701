//! Per-run ingest statistics

use serde::Serialize;

/// Counters accumulated between start-up and shut-down
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub files_seen: u64,
    /// Failed the eligibility filter, no network call made
    pub files_skipped: u64,
    pub files_classified: u64,
    pub files_failed: u64,
    pub findings_recorded: u64,
    /// Images the service itself reported as failed
    pub service_errors: u64,
}
