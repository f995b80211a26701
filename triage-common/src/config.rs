//! Bootstrap configuration and path resolution
//!
//! Two tiers:
//! 1. **TOML bootstrap**: logging and transport tuning, read once at start-up
//! 2. **Runtime settings**: the JSON document handled by [`crate::settings`]
//!
//! Missing bootstrap files are not an error: a warning is logged and the
//! built-in defaults are used.
//!
//! # Path priority
//!
//! 1. Command-line argument
//! 2. Environment variable (`TRIAGE_CONFIG` / `TRIAGE_SETTINGS`)
//! 3. TOML `settings_path` (settings document only)
//! 4. OS-dependent default under the user config directory

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

/// Environment variable overriding the bootstrap TOML path
pub const CONFIG_ENV_VAR: &str = "TRIAGE_CONFIG";
/// Environment variable overriding the settings document path
pub const SETTINGS_ENV_VAR: &str = "TRIAGE_SETTINGS";

const CONFIG_DIR_NAME: &str = "triage";
const CONFIG_FILE_NAME: &str = "triage-ic.toml";
const SETTINGS_FILE_NAME: &str = "image-classification.json";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Settings document location (optional)
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Detection transport tuning
///
/// The service protocol itself has no retry ceiling; `max_resend_attempts`
/// bounds how many times a body is retransmitted after a resend status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Applies to every individual socket read and write
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,

    #[serde(default = "default_max_resend_attempts")]
    pub max_resend_attempts: u32,

    /// Fixed pause before each retransmission
    #[serde(default = "default_resend_backoff_ms")]
    pub resend_backoff_ms: u64,

    /// Largest response payload the service may announce
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
            max_resend_attempts: default_max_resend_attempts(),
            resend_backoff_ms: default_resend_backoff_ms(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_io_timeout_ms() -> u64 {
    30_000
}

fn default_max_resend_attempts() -> u32 {
    5
}

fn default_resend_backoff_ms() -> u64 {
    250
}

fn default_max_payload_bytes() -> usize {
    16 * 1024 * 1024
}

impl TomlConfig {
    /// Load bootstrap configuration, using defaults if the file is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Resolve the bootstrap TOML path
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    default_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Resolve the settings document path
pub fn resolve_settings_path(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(SETTINGS_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    if let Some(path) = &toml_config.settings_path {
        return Ok(path.clone());
    }

    default_config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME))
}

/// `~/.config/triage` on Linux, the platform equivalent elsewhere
fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}
