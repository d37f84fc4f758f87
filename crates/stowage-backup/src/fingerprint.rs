//! Snapshot fingerprints.
//!
//! A snapshot digest is one hash over every selected file, taken in walk
//! order: the `/`-separated relative path, then the full file content.

use crate::walker::SelectedFile;
use md5::Md5;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use stowage_core::types::HashAlgorithm;
use stowage_core::{Error, Result};
use tracing::debug;

/// Content fingerprint identifying one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotDigest(Vec<u8>);

impl SnapshotDigest {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parses a hex string. Returns `None` for odd lengths, non-hex
    /// characters and the empty string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.is_empty() || hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
            .collect::<Option<Vec<u8>>>()
            .map(Self)
    }

    /// First 12 hex characters, for log lines and tables
    pub fn short(&self) -> String {
        let hex = self.to_hex();
        hex.chars().take(12).collect()
    }
}

impl fmt::Display for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SnapshotDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Running hash over the selected algorithm.
enum Accumulator {
    Md5(Md5),
    Sha256(Sha256),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Accumulator::Md5(Md5::new()),
            HashAlgorithm::Sha256 => Accumulator::Sha256(Sha256::new()),
        }
    }

    fn update_path(&mut self, name: &[u8]) {
        match self {
            Accumulator::Md5(h) => h.update(name),
            Accumulator::Sha256(h) => h.update(name),
        }
    }

    fn finalize(self) -> SnapshotDigest {
        match self {
            Accumulator::Md5(h) => SnapshotDigest::from_bytes(h.finalize().to_vec()),
            Accumulator::Sha256(h) => SnapshotDigest::from_bytes(h.finalize().to_vec()),
        }
    }
}

impl Write for Accumulator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Accumulator::Md5(h) => h.update(buf),
            Accumulator::Sha256(h) => h.update(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Computes snapshot digests with a fixed algorithm.
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    algorithm: HashAlgorithm,
}

impl Fingerprinter {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Folds every file, in the given order, into one digest.
    ///
    /// Each file contributes its raw `/`-separated relative name followed by
    /// its content, with no delimiter between the two or between files. Two
    /// file sets that concatenate to the same byte stream (file `a` holding
    /// `bc` and file `ab` holding `c`) therefore share a digest.
    ///
    /// A file that vanished or cannot be read fails the whole fingerprint.
    pub fn fingerprint(&self, files: &[SelectedFile]) -> Result<SnapshotDigest> {
        let mut accumulator = Accumulator::new(self.algorithm);

        for file in files {
            accumulator.update_path(&file.name_bytes());

            let mut handle =
                File::open(&file.path).map_err(|e| Error::file_read(file.path.display(), e))?;
            io::copy(&mut handle, &mut accumulator)
                .map_err(|e| Error::file_read(file.path.display(), e))?;
        }

        let digest = accumulator.finalize();
        debug!(
            "Fingerprinted {} files with {}: {}",
            files.len(),
            self.algorithm,
            digest
        );
        Ok(digest)
    }
}
