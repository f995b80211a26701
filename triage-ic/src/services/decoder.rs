//! Detection response decoder
//!
//! The service answers with one of two JSON shapes:
//!
//! ```json
//! [{"className": "dog", "probability": 95}, ...]
//! {"errorCode": 500, "errorMessage": "out of memory"}
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::ClassifyError;
use crate::models::{Detection, DetectionResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceErrorBody {
    error_code: i64,
    #[serde(default)]
    error_message: String,
}

/// Decode a raw response payload
///
/// An explicit empty list decodes to `Detections(vec![])`, never to
/// [`DetectionResult::Empty`], which is reserved for a zero-length payload.
pub fn decode(raw: &[u8]) -> Result<DetectionResult, ClassifyError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ClassifyError::Decode(format!("payload is not UTF-8: {}", e)))?;

    let value: Value = serde_json::from_str(text)
        .map_err(|e| ClassifyError::Decode(format!("malformed JSON: {}", e)))?;

    match value {
        Value::Array(_) => {
            let detections: Vec<Detection> = serde_json::from_value(value)
                .map_err(|e| ClassifyError::Decode(format!("invalid detection: {}", e)))?;
            Ok(DetectionResult::Detections(detections))
        }
        Value::Object(_) => {
            let body: ServiceErrorBody = serde_json::from_value(value)
                .map_err(|e| ClassifyError::Decode(format!("invalid error object: {}", e)))?;
            Ok(DetectionResult::ServiceError {
                code: body.error_code,
                message: body.error_message,
            })
        }
        other => Err(ClassifyError::Decode(format!(
            "expected a list or an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
