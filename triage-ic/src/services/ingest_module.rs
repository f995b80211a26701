//! Image classification ingest module
//!
//! The per-file lifecycle the host scan drives:
//!
//! 1. [`ImageClassificationModule::start_up`] once, before any file. Invalid
//!    settings fail here and the whole run stops.
//! 2. [`ImageClassificationModule::process`] for every file, sequentially.
//!    Per-file failures are logged and counted, never returned.
//! 3. [`ImageClassificationModule::shut_down`] once, returning the run's
//!    statistics.

use chrono::Utc;
use tracing::{debug, error, info, warn};
use triage_common::events::TriageEvent;
use triage_common::settings::validate;
use triage_common::Settings;

use crate::models::{DetectionResult, IngestSummary, ScannedFile};
use crate::services::decision_engine::decide;
use crate::services::eligibility::{rejection_reason, Rejection};
use crate::services::finding_emitter::FindingEmitter;
use crate::services::transport::{probe, DetectionClient};

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Not eligible; no network call was made
    Skipped(Rejection),
    /// Round-trip completed; labels that were recorded, in order
    Classified { labels: Vec<String> },
    /// Transport or decoding failed; the file stays unclassified
    Failed(String),
}

pub struct ImageClassificationModule {
    settings: Settings,
    client: DetectionClient,
    emitter: FindingEmitter,
    summary: IngestSummary,
}

impl ImageClassificationModule {
    /// Validate settings, probe the service and get ready for files
    ///
    /// The module keeps its own snapshot of `settings` for the whole run. An
    /// unreachable service is only a warning: files will fail individually.
    pub async fn start_up(
        settings: &Settings,
        client: DetectionClient,
        emitter: FindingEmitter,
    ) -> triage_common::Result<Self> {
        let validated = validate(&settings.to_candidate())?;

        let address = validated.server.address();
        let reachable = probe(&address, client.options().connect_timeout).await;
        if reachable {
            info!(server = %address, "Detection service reachable");
        } else {
            warn!(server = %address, "Detection service not reachable, files will fail to classify");
        }

        Ok(Self {
            settings: validated.with_reachability(reachable),
            client,
            emitter,
            summary: IngestSummary::default(),
        })
    }

    /// Classify one file and record its findings
    pub async fn process(&mut self, file: &ScannedFile) -> ProcessOutcome {
        self.summary.files_seen += 1;

        if let Some(reason) = rejection_reason(&self.settings, file) {
            debug!(file = %file.path.display(), %reason, "Skipping file");
            self.summary.files_skipped += 1;
            return ProcessOutcome::Skipped(reason);
        }

        info!("Processing {}", file.path.display());

        let result = match self.client.classify(&self.settings, file).await {
            Ok(result) => result,
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "Classification failed");
                self.summary.files_failed += 1;
                self.emitter.event_bus().emit_lossy(TriageEvent::FileFailed {
                    file_id: file.id,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                return ProcessOutcome::Failed(e.to_string());
            }
        };

        self.summary.files_classified += 1;
        if matches!(result, DetectionResult::ServiceError { .. }) {
            self.summary.service_errors += 1;
        }

        let mut labels = Vec::new();
        for finding in decide(&self.settings, file.id, &result) {
            match self.emitter.emit(&finding, &file.path) {
                Ok(record) => {
                    self.summary.findings_recorded += 1;
                    labels.push(record.label);
                }
                Err(e) => {
                    error!(
                        file = %file.path.display(),
                        label = %finding.label,
                        error = %e,
                        "Failed to record finding"
                    );
                }
            }
        }

        debug!(file = %file.path.display(), findings = labels.len(), "Finished");
        ProcessOutcome::Classified { labels }
    }

    /// Flush the evidence store and report the run's statistics
    pub fn shut_down(mut self) -> IngestSummary {
        if let Err(e) = self.emitter.flush() {
            error!(error = %e, "Failed to flush evidence store");
        }

        let summary = self.summary;
        info!(
            seen = summary.files_seen,
            skipped = summary.files_skipped,
            classified = summary.files_classified,
            failed = summary.files_failed,
            findings = summary.findings_recorded,
            service_errors = summary.service_errors,
            "Image classification finished"
        );

        self.emitter.event_bus().emit_lossy(TriageEvent::ScanCompleted {
            files_seen: summary.files_seen,
            files_classified: summary.files_classified,
            files_failed: summary.files_failed,
            findings_recorded: summary.findings_recorded,
            timestamp: Utc::now(),
        });

        summary
    }

    /// The run's settings snapshot
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    pub fn emitter(&self) -> &FindingEmitter {
        &self.emitter
    }
}
