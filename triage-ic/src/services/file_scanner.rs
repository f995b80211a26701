//! Evidence directory scanner
//!
//! Walks an extracted disk image and reports every entry as a
//! [`ScannedFile`], in the order the host would hand files to an ingest
//! module. Nothing is filtered here: deciding what to classify is the
//! eligibility filter's job.
//!
//! Extraction tools place carved block ranges in `$Unalloc` and `$Unused`
//! folders; entries directly under those are reported as block ranges rather
//! than regular files.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::models::{FileKind, ScannedFile};

const UNALLOCATED_DIR: &str = "$Unalloc";
const UNUSED_DIR: &str = "$Unused";

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Evidence directory scanner
#[derive(Debug, Default)]
pub struct FileScanner {
    max_depth: Option<usize>,
}

impl FileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how deep below the root the walk descends
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// List every entry under `root_path`, root excluded
    ///
    /// Unreadable entries are logged and skipped; one bad directory does not
    /// abort the scan. Ids are assigned in walk order starting at 1.
    pub fn scan(&self, root_path: &Path) -> Result<Vec<ScannedFile>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }
        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .min_depth(1)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name();

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    let id = files.len() as u64 + 1;
                    match to_scanned_file(id, &entry) {
                        Ok(file) => files.push(file),
                        Err(e) => {
                            tracing::warn!("Cannot read metadata for {}: {}", entry.path().display(), e)
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!(
            "Scan of {} complete: {} entries",
            root_path.display(),
            files.len()
        );

        Ok(files)
    }
}

fn to_scanned_file(id: u64, entry: &DirEntry) -> Result<ScannedFile, walkdir::Error> {
    let metadata = entry.metadata()?;
    let path = std::path::absolute(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());

    Ok(ScannedFile {
        id,
        name: entry.file_name().to_string_lossy().into_owned(),
        size: metadata.len(),
        kind: classify_entry(entry),
        path,
    })
}

fn classify_entry(entry: &DirEntry) -> FileKind {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return FileKind::Directory;
    }
    if !file_type.is_file() {
        return FileKind::Other;
    }

    let parent = entry
        .path()
        .parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy());

    match parent.as_deref() {
        Some(UNALLOCATED_DIR) => FileKind::UnallocatedBlocks,
        Some(UNUSED_DIR) => FileKind::UnusedBlocks,
        _ => FileKind::Regular,
    }
}
