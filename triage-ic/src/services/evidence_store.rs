//! Evidence stores
//!
//! The store is where findings end up for the examiner. [`JsonLinesStore`]
//! appends one JSON record per line to a case file and keeps a keyword index
//! in memory so findings can be searched by label during the run.
//! [`MemoryStore`] keeps everything in memory and is used by tests.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::EvidenceRecord;

/// Destination for findings
pub trait EvidenceStore: Send {
    /// Persist a record
    fn add(&mut self, record: &EvidenceRecord) -> Result<(), StoreError>;

    /// Make a persisted record searchable by its label
    fn index(&mut self, record: &EvidenceRecord) -> Result<(), StoreError>;

    /// Ids of records whose label contains `keyword`, ignoring case
    fn search(&self, keyword: &str) -> Vec<Uuid>;

    /// Flush buffered records to durable storage
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Lowercased label → record ids
#[derive(Debug, Default)]
struct KeywordIndex {
    entries: HashMap<String, Vec<Uuid>>,
}

impl KeywordIndex {
    fn insert(&mut self, record: &EvidenceRecord) {
        self.entries
            .entry(record.label.to_lowercase())
            .or_default()
            .push(record.id);
    }

    fn search(&self, keyword: &str) -> Vec<Uuid> {
        let keyword = keyword.to_lowercase();
        let mut ids: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|(label, _)| label.contains(&keyword))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        ids.sort();
        ids
    }
}

/// Append-only JSON-lines evidence file
///
/// Every record is on disk once `add` returns.
pub struct JsonLinesStore {
    path: PathBuf,
    writer: BufWriter<File>,
    index: KeywordIndex,
}

impl JsonLinesStore {
    /// Open `path` for appending, indexing any records already in it
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut index = KeywordIndex::default();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let mut existing = 0usize;
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: EvidenceRecord = serde_json::from_str(&line)?;
                index.insert(&record);
                existing += 1;
            }
            info!(path = %path.display(), records = existing, "Reopened evidence file");
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EvidenceStore for JsonLinesStore {
    fn add(&mut self, record: &EvidenceRecord) -> Result<(), StoreError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        debug!(id = %record.id, label = %record.label, "Evidence record written");
        Ok(())
    }

    fn index(&mut self, record: &EvidenceRecord) -> Result<(), StoreError> {
        self.index.insert(record);
        Ok(())
    }

    fn search(&self, keyword: &str) -> Vec<Uuid> {
        self.index.search(keyword)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<EvidenceRecord>,
    index: KeywordIndex,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    /// Labels in insertion order
    pub fn labels(&self) -> Vec<String> {
        self.records.iter().map(|r| r.label.clone()).collect()
    }
}

impl EvidenceStore for MemoryStore {
    fn add(&mut self, record: &EvidenceRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn index(&mut self, record: &EvidenceRecord) -> Result<(), StoreError> {
        self.index.insert(record);
        Ok(())
    }

    fn search(&self, keyword: &str) -> Vec<Uuid> {
        self.index.search(keyword)
    }
}
