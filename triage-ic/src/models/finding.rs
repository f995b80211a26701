//! Findings and their stored form

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label for an image in which the service found nothing
pub const NO_OBJECTS_LABEL: &str = "No known objects found";

/// Label for an image the service failed to process
pub const ERROR_LABEL: &str = "ERROR - Processed with errors";

/// A reportable label attached to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub file_id: u64,
    pub label: String,
}

impl Finding {
    pub fn new(file_id: u64, label: impl Into<String>) -> Self {
        Self {
            file_id,
            label: label.into(),
        }
    }
}

/// A finding as persisted by an evidence store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: Uuid,
    pub file_id: u64,
    pub file_path: PathBuf,
    /// Module that produced the finding
    pub set_name: String,
    pub label: String,
    pub recorded_at: DateTime<Utc>,
}

impl EvidenceRecord {
    pub fn new(finding: &Finding, file_path: PathBuf, set_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_id: finding.file_id,
            file_path,
            set_name: set_name.to_string(),
            label: finding.label.clone(),
            recorded_at: Utc::now(),
        }
    }
}
