//! Error types for triage-ic

use std::time::Duration;

use thiserror::Error;

/// Per-file classification failure
///
/// Every variant is isolated to the file being classified: the ingest module
/// logs it, counts the file as failed and moves on to the next file.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Detection service could not be reached
    #[error("Cannot connect to detection service at {address}: {reason}")]
    Connect { address: String, reason: String },

    /// Service kept asking for the body to be resent
    #[error("Transfer failed: service requested a resend {attempts} times")]
    Transfer { attempts: u32 },

    /// Connection closed before the announced payload arrived
    #[error("Truncated response: received {received} of {expected} bytes")]
    TruncatedResponse { received: usize, expected: usize },

    /// Payload was not a detection list or service error object
    #[error("Cannot decode detection response: {0}")]
    Decode(String),

    /// Service sent a value the protocol does not allow
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// A socket operation did not complete in time
    #[error("Timed out after {timeout:?} while {operation}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// I/O error reading the image or talking to the service
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Evidence store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
