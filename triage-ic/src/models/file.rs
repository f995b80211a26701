//! Host file metadata

use std::path::PathBuf;

/// What kind of object the host handed us
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    /// Carved range of unallocated blocks, not a real file
    UnallocatedBlocks,
    /// Range of unused blocks, not a real file
    UnusedBlocks,
    /// Symlinks, devices, sockets
    Other,
}

/// A file encountered during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Host-assigned id, stable for the duration of the scan
    pub id: u64,
    /// File name as it appears in the image, original case
    pub name: String,
    /// Absolute path of the local copy
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    pub kind: FileKind,
}

impl ScannedFile {
    /// Size in whole KB, rounded down
    pub fn size_kb(&self) -> u64 {
        self.size / 1024
    }

    /// Extension with its leading dot, as sent to the detection service
    ///
    /// Taken from the name rather than the path so carved files keep the
    /// extension the image recorded.
    pub fn dotted_extension(&self) -> String {
        match self.name.rfind('.') {
            Some(idx) => self.name[idx..].to_lowercase(),
            None => String::new(),
        }
    }
}
