//! File eligibility filter
//!
//! Decides, before any network call, whether a file is worth sending to the
//! detection service. Pure function of the file metadata and the settings.

use std::fmt;

use triage_common::Settings;

use crate::models::{FileKind, ScannedFile};

/// Why a file was not classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Unallocated/unused block range, directory or special file
    NotRegularFile(FileKind),
    /// Name does not end with a configured image extension
    ExtensionNotAllowed,
    /// Smaller than the configured minimum
    TooSmall { size_kb: u64, min_kb: u64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotRegularFile(kind) => write!(f, "not a regular file ({:?})", kind),
            Rejection::ExtensionNotAllowed => write!(f, "extension not in image formats"),
            Rejection::TooSmall { size_kb, min_kb } => {
                write!(f, "{} KB is below the {} KB minimum", size_kb, min_kb)
            }
        }
    }
}

/// Returns the first rule `file` fails, or `None` if it should be classified
pub fn rejection_reason(settings: &Settings, file: &ScannedFile) -> Option<Rejection> {
    if file.kind != FileKind::Regular {
        return Some(Rejection::NotRegularFile(file.kind));
    }

    let name = file.name.to_lowercase();
    let allowed = settings
        .image_extensions
        .iter()
        .any(|ext| name.ends_with(&format!(".{}", ext)));
    if !allowed {
        return Some(Rejection::ExtensionNotAllowed);
    }

    if file.size_kb() < settings.min_file_size_kb {
        return Some(Rejection::TooSmall {
            size_kb: file.size_kb(),
            min_kb: settings.min_file_size_kb,
        });
    }

    None
}

/// True if `file` qualifies for classification
pub fn is_eligible(settings: &Settings, file: &ScannedFile) -> bool {
    rejection_reason(settings, file).is_none()
}
