//! # Triage Common Library
//!
//! Shared code for the triage ingest modules:
//! - Error types
//! - Runtime settings model (load / validate / save)
//! - Bootstrap TOML configuration and path resolution
//! - Event types and EventBus

pub mod classes;
pub mod config;
pub mod error;
pub mod events;
pub mod settings;

pub use error::{Error, Result};
pub use settings::{ClassOfInterest, ServerEndpoint, Settings, SettingsCandidate, ValidationError};
