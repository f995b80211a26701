//! Decision engine
//!
//! Turns a [`DetectionResult`] into the findings worth reporting:
//! - nothing found (either protocol form) → one "No known objects found"
//! - detections → one titlecased label per detection that clears the
//!   probability threshold and matches an enabled class of interest
//! - service error → one "ERROR - Processed with errors"

use tracing::{debug, warn};
use triage_common::Settings;

use crate::models::{DetectionResult, Finding, ERROR_LABEL, NO_OBJECTS_LABEL};

/// Decide which findings `result` produces for `file_id`
///
/// Findings follow detection order. Repeated classes are not deduplicated:
/// two people in one image give two "Person" findings.
pub fn decide(settings: &Settings, file_id: u64, result: &DetectionResult) -> Vec<Finding> {
    match result {
        DetectionResult::Empty => vec![Finding::new(file_id, NO_OBJECTS_LABEL)],
        DetectionResult::Detections(detections) if detections.is_empty() => {
            vec![Finding::new(file_id, NO_OBJECTS_LABEL)]
        }
        DetectionResult::Detections(detections) => {
            let threshold = f64::from(settings.min_probability);

            detections
                .iter()
                .filter_map(|detection| {
                    if detection.probability < threshold {
                        debug!(
                            class = %detection.class_name,
                            probability = detection.probability,
                            threshold,
                            "Detection below threshold"
                        );
                        return None;
                    }

                    match settings.find_class(&detection.class_name) {
                        Some(class) if class.enabled => {
                            Some(Finding::new(file_id, titlecase(&detection.class_name)))
                        }
                        _ => {
                            debug!(class = %detection.class_name, "Class not of interest");
                            None
                        }
                    }
                })
                .collect()
        }
        DetectionResult::ServiceError { code, message } => {
            warn!(file_id, code, message = %message, "Detection service failed to process image");
            vec![Finding::new(file_id, ERROR_LABEL)]
        }
    }
}

/// Capitalise the first letter of every run of letters, lowercase the rest
///
/// `"traffic light"` → `"Traffic Light"`, `"tvmonitor"` → `"Tvmonitor"`.
pub fn titlecase(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;

    for c in name.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }

    out
}
