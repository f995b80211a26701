//! Detection service results

use serde::{Deserialize, Serialize};

/// One object the service found in an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub class_name: String,
    /// Confidence on a 0-100 scale
    pub probability: f64,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, probability: f64) -> Self {
        Self {
            class_name: class_name.into(),
            probability,
        }
    }
}

/// Outcome of one classification round-trip
///
/// `Empty` and `Detections(vec![])` both mean "nothing found" but come from
/// different protocol generations: the first is a zero-length payload, the
/// second an explicit empty JSON list. They are kept apart here and only
/// merged by the decision engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionResult {
    /// Service announced a zero-length payload
    Empty,
    /// Decoded detection list, possibly empty
    Detections(Vec<Detection>),
    /// Service reported it could not process the image
    ServiceError { code: i64, message: String },
}
