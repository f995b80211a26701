//! Finding emitter
//!
//! Hands each finding to the evidence store, indexes it for keyword search
//! and announces it on the event bus.

use std::path::Path;

use tracing::{error, info};
use triage_common::events::{EventBus, TriageEvent};

use crate::error::StoreError;
use crate::models::{EvidenceRecord, Finding};
use crate::services::evidence_store::EvidenceStore;

pub struct FindingEmitter {
    store: Box<dyn EvidenceStore>,
    event_bus: EventBus,
    set_name: String,
}

impl FindingEmitter {
    pub fn new(store: Box<dyn EvidenceStore>, event_bus: EventBus, set_name: &str) -> Self {
        Self {
            store,
            event_bus,
            set_name: set_name.to_string(),
        }
    }

    /// Record `finding` for the file at `file_path`
    ///
    /// A failed write is returned to the caller. A failed index only loses
    /// searchability, so it is logged and the finding still counts.
    pub fn emit(&mut self, finding: &Finding, file_path: &Path) -> Result<EvidenceRecord, StoreError> {
        let record = EvidenceRecord::new(finding, file_path.to_path_buf(), &self.set_name);
        self.store.add(&record)?;

        if let Err(e) = self.store.index(&record) {
            error!(id = %record.id, error = %e, "Error indexing evidence record");
        }

        info!(
            file = %file_path.display(),
            label = %record.label,
            "Finding recorded"
        );

        self.event_bus.emit_lossy(TriageEvent::FindingRecorded {
            finding_id: record.id,
            file_id: record.file_id,
            set_name: record.set_name.clone(),
            label: record.label.clone(),
            timestamp: record.recorded_at,
        });

        Ok(record)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn store(&self) -> &dyn EvidenceStore {
        self.store.as_ref()
    }

    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.store.flush()
    }
}
