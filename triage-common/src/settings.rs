//! Runtime settings for the image classification module
//!
//! Settings are created from built-in defaults or from a persisted JSON
//! document, and only change through [`Settings::apply`], which validates a
//! candidate and persists it in one step. A scan works on its own snapshot
//! (a clone) so a concurrent save can never tear an in-flight classification.
//!
//! # Persisted document
//!
//! ```json
//! {
//!   "server": { "host": "127.0.0.1", "port": 1337 },
//!   "imageFormats": ["jpeg", "jpg", "png"],
//!   "minFileSize": 5,
//!   "minProbability": 50,
//!   "classesOfInterest": [{ "name": "person", "enabled": true }]
//! }
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classes::OBJECT_CLASSES;
use crate::Result;

/// Default detection service host
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default detection service port
pub const DEFAULT_PORT: u16 = 1337;
/// Default image extensions (lowercase, no leading dot)
pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];
/// Default minimum file size in KB
pub const DEFAULT_MIN_FILE_SIZE_KB: u64 = 5;
/// Default minimum detection probability (0-100 scale)
pub const DEFAULT_MIN_PROBABILITY: u8 = 50;

/// Settings validation failures
///
/// Each rule has its own variant so the configuration surface can point at
/// the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server host must not be blank")]
    BlankHost,

    #[error("server port must be an integer between 0 and 65535, got {0:?}")]
    InvalidPort(String),

    #[error("at least one image format is required")]
    NoImageFormats,

    #[error("minimum probability must be an integer between 0 and 100, got {0:?}")]
    InvalidMinProbability(String),

    #[error("minimum file size must be a non-negative integer, got {0:?}")]
    InvalidMinFileSize(String),

    #[error("class of interest name must not be blank")]
    BlankClassName,

    #[error("duplicate class of interest: {0}")]
    DuplicateClass(String),
}

/// Detection service address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    /// `host:port` form accepted by `TcpStream::connect`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One entry of the classes-of-interest allowlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOfInterest {
    pub name: String,
    pub enabled: bool,
}

impl ClassOfInterest {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }
}

/// Validated runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerEndpoint,
    /// Lowercase extensions without the leading dot, never empty
    pub image_extensions: BTreeSet<String>,
    pub min_file_size_kb: u64,
    /// Minimum probability on the service's 0-100 scale
    pub min_probability: u8,
    pub classes_of_interest: Vec<ClassOfInterest>,
    /// Result of the last reachability probe. Never persisted.
    pub server_reachable: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerEndpoint {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            image_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            min_file_size_kb: DEFAULT_MIN_FILE_SIZE_KB,
            min_probability: DEFAULT_MIN_PROBABILITY,
            classes_of_interest: OBJECT_CLASSES
                .iter()
                .map(|name| ClassOfInterest::new(*name, true))
                .collect(),
            server_reachable: false,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults if the file is missing
    ///
    /// A persisted document goes through the same validation as a UI edit, so
    /// a hand-edited file cannot start a scan with invalid settings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Settings file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let document: SettingsDocument = serde_json::from_str(&content)?;
        let settings = validate(&SettingsCandidate::from(document))?;

        info!(
            path = %path.display(),
            server = %settings.server.address(),
            classes = settings.classes_of_interest.len(),
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Persist settings to `path`
    ///
    /// Writes to a sibling temp file and renames it into place so a crash
    /// never leaves a half-written document behind. Settings that would not
    /// pass validation are refused and nothing is written.
    pub fn save(&self, path: &Path) -> Result<()> {
        validate(&self.to_candidate())?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&SettingsDocument::from(self))?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;

        debug!("Settings written to {}", path.display());
        Ok(())
    }

    /// Validate `candidate` and persist it to `path`
    ///
    /// The only way settings change once loaded. Nothing is written when
    /// validation fails.
    pub fn apply(candidate: &SettingsCandidate, path: &Path) -> Result<Self> {
        let settings = validate(candidate)?;
        settings.save(path)?;
        info!("Settings updated and saved to {}", path.display());
        Ok(settings)
    }

    /// Snapshot of these settings carrying a fresh reachability result
    pub fn with_reachability(&self, reachable: bool) -> Self {
        Self {
            server_reachable: reachable,
            ..self.clone()
        }
    }

    /// Look up a class of interest by name, ignoring ASCII case
    pub fn find_class(&self, name: &str) -> Option<&ClassOfInterest> {
        self.classes_of_interest
            .iter()
            .find(|class| class.name.eq_ignore_ascii_case(name))
    }

    /// Editable text form of these settings
    pub fn to_candidate(&self) -> SettingsCandidate {
        SettingsCandidate::from(SettingsDocument::from(self))
    }
}

/// Unvalidated settings as collected by a configuration surface
///
/// Numeric fields stay textual so that "not an integer" and "out of range"
/// are both reported by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsCandidate {
    pub host: String,
    pub port: String,
    /// Extensions separated by commas and/or whitespace; leading dots allowed
    pub image_formats: String,
    pub min_file_size: String,
    pub min_probability: String,
    pub classes_of_interest: Vec<ClassOfInterest>,
}

/// Validate a candidate into [`Settings`]
///
/// Rules are checked in field order and the first failure is returned.
pub fn validate(candidate: &SettingsCandidate) -> std::result::Result<Settings, ValidationError> {
    let host = candidate.host.trim();
    if host.is_empty() {
        return Err(ValidationError::BlankHost);
    }

    let port = candidate
        .port
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|p| u16::try_from(p).ok())
        .ok_or_else(|| ValidationError::InvalidPort(candidate.port.clone()))?;

    let image_extensions = parse_extensions(&candidate.image_formats);
    if image_extensions.is_empty() {
        return Err(ValidationError::NoImageFormats);
    }

    let min_probability = candidate
        .min_probability
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|p| (0..=100).contains(p))
        .map(|p| p as u8)
        .ok_or_else(|| ValidationError::InvalidMinProbability(candidate.min_probability.clone()))?;

    let min_file_size_kb = candidate
        .min_file_size
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|s| u64::try_from(s).ok())
        .ok_or_else(|| ValidationError::InvalidMinFileSize(candidate.min_file_size.clone()))?;

    let mut seen = HashSet::new();
    let mut classes_of_interest = Vec::with_capacity(candidate.classes_of_interest.len());
    for class in &candidate.classes_of_interest {
        let name = class.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankClassName);
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ValidationError::DuplicateClass(name.to_string()));
        }
        classes_of_interest.push(ClassOfInterest::new(name, class.enabled));
    }

    Ok(Settings {
        server: ServerEndpoint {
            host: host.to_string(),
            port,
        },
        image_extensions,
        min_file_size_kb,
        min_probability,
        classes_of_interest,
        server_reachable: false,
    })
}

fn parse_extensions(raw: &str) -> BTreeSet<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// On-disk JSON shape
///
/// Numbers are read wide so out-of-range values reach [`validate`] instead
/// of failing inside serde with a less useful message.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsDocument {
    server: ServerDocument,
    image_formats: Vec<String>,
    min_file_size: i64,
    min_probability: i64,
    classes_of_interest: Vec<ClassOfInterest>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ServerDocument {
    host: String,
    port: i64,
}

impl From<&Settings> for SettingsDocument {
    fn from(settings: &Settings) -> Self {
        Self {
            server: ServerDocument {
                host: settings.server.host.clone(),
                port: i64::from(settings.server.port),
            },
            image_formats: settings.image_extensions.iter().cloned().collect(),
            min_file_size: settings.min_file_size_kb as i64,
            min_probability: i64::from(settings.min_probability),
            classes_of_interest: settings.classes_of_interest.clone(),
        }
    }
}

impl From<SettingsDocument> for SettingsCandidate {
    fn from(document: SettingsDocument) -> Self {
        Self {
            host: document.server.host,
            port: document.server.port.to_string(),
            image_formats: document.image_formats.join(","),
            min_file_size: document.min_file_size.to_string(),
            min_probability: document.min_probability.to_string(),
            classes_of_interest: document.classes_of_interest,
        }
    }
}
