//! triage-ic library interface
//!
//! Image classification ingest module: for each eligible image found during a
//! scan, asks a remote object-detection service what the image contains and
//! records the interesting object classes as findings.

pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ClassifyError, StoreError};

/// Name the module reports findings under
pub const MODULE_NAME: &str = "Image Classification";
