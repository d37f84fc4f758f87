//! Snapshot catalog
//!
//! The catalog is a flat text file with one record per line (see
//! [`codec`]). It is read fully into memory on [`Catalog::load`], changed
//! only in memory by [`Catalog::put`], and written back in full by
//! [`Catalog::flush`]. Concurrent writers to the same file are not supported.

pub mod codec;
pub mod predicate;
pub mod record;

pub use codec::NO_TAGS_MARKER;
pub use predicate::{matches_all, Predicate};
pub use record::{validate_tag, SnapshotRecord};

use crate::fingerprint::SnapshotDigest;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use stowage_core::{CatalogError, Result};
use tempfile::NamedTempFile;
use tracing::debug;

/// In-memory snapshot table backed by the catalog file
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    records: HashMap<SnapshotDigest, SnapshotRecord>,
}

impl Catalog {
    /// Empty catalog that will flush to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: HashMap::new(),
        }
    }

    /// Load the catalog file. A missing file is an empty catalog.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut catalog = Self::new(path);

        let content = match fs::read_to_string(&catalog.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No catalog at {}, starting empty", catalog.path.display());
                return Ok(catalog);
            }
            Err(e) => return Err(e.into()),
        };

        let lines = content.lines().filter(|line| !line.trim().is_empty());
        for (i, line) in lines.enumerate() {
            let record = codec::decode_record(line, i + 1)?;
            catalog.records.insert(record.digest.clone(), record);
        }

        debug!(
            "Loaded {} catalog records from {}",
            catalog.records.len(),
            catalog.path.display()
        );
        Ok(catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace the record for its digest. Memory only.
    pub fn put(&mut self, record: SnapshotRecord) {
        self.records.insert(record.digest.clone(), record);
    }

    pub fn get(&self, digest: &SnapshotDigest) -> Result<&SnapshotRecord> {
        self.records.get(digest).ok_or_else(|| {
            CatalogError::NotFound {
                digest: digest.to_hex(),
            }
            .into()
        })
    }

    pub fn exists(&self, digest: &SnapshotDigest) -> bool {
        self.records.contains_key(digest)
    }

    /// Drop an unflushed record after a failed flush
    pub(crate) fn discard(&mut self, digest: &SnapshotDigest) {
        self.records.remove(digest);
    }

    /// All records in file order: ascending `created_at`, then digest
    pub fn records(&self) -> Vec<&SnapshotRecord> {
        let mut records: Vec<&SnapshotRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.digest.cmp(&b.digest))
        });
        records
    }

    /// Records satisfying every predicate, in file order
    pub fn query(&self, predicates: &[Predicate]) -> Vec<&SnapshotRecord> {
        self.records()
            .into_iter()
            .filter(|record| matches_all(predicates, record))
            .collect()
    }

    /// The newest record satisfying every predicate. Equal timestamps are
    /// broken by the greater digest.
    pub fn query_latest(&self, predicates: &[Predicate]) -> Result<&SnapshotRecord> {
        self.query(predicates)
            .pop()
            .ok_or_else(|| CatalogError::EmptyResult.into())
    }

    /// Rewrite the catalog file with every record.
    ///
    /// The content goes to a temporary file in the same directory which then
    /// replaces the catalog, so readers see either the old or the new file.
    pub fn flush(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut content = String::new();
        for record in self.records() {
            content.push_str(&codec::encode_record(record));
            content.push('\n');
        }

        let mut staging = NamedTempFile::new_in(&parent)?;
        staging.write_all(content.as_bytes())?;
        staging.as_file().sync_all()?;
        staging.persist(&self.path).map_err(|e| e.error)?;

        debug!(
            "Flushed {} catalog records to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }
}
