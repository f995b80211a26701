//! Services for triage-ic

pub mod decision_engine;
pub mod decoder;
pub mod eligibility;
pub mod evidence_store;
pub mod file_scanner;
pub mod finding_emitter;
pub mod ingest_module;
pub mod transport;

pub use decision_engine::decide;
pub use decoder::decode;
pub use eligibility::{is_eligible, rejection_reason, Rejection};
pub use evidence_store::{EvidenceStore, JsonLinesStore, MemoryStore};
pub use file_scanner::{FileScanner, ScanError};
pub use finding_emitter::FindingEmitter;
pub use ingest_module::{ImageClassificationModule, ProcessOutcome};
pub use transport::{probe, DetectionClient, TransportOptions};
