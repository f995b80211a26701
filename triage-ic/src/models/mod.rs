//! Data models for triage-ic

pub mod detection;
pub mod file;
pub mod finding;
pub mod summary;

pub use detection::{Detection, DetectionResult};
pub use file::{FileKind, ScannedFile};
pub use finding::{EvidenceRecord, Finding, ERROR_LABEL, NO_OBJECTS_LABEL};
pub use summary::IngestSummary;
