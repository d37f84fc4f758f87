//! Storage backend trait definitions

use async_trait::async_trait;
use std::path::Path;
use stowage_core::Result;

/// A transport able to check, store and fetch archives by blob key.
///
/// `exists` reports a missing key as `Ok(false)`; only genuine transport
/// failures are errors. `upload` must be safe to re-run with the same key and
/// bytes. `download` fails with `StorageError::NotFound` when the key is absent.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Human readable backend identity, used in logs and errors
    fn name(&self) -> String;

    /// Check whether the blob key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Store the file at `source` under the blob key
    async fn upload(&self, key: &str, source: &Path) -> Result<()>;

    /// Fetch the blob key into the file at `destination`
    async fn download(&self, key: &str, destination: &Path) -> Result<()>;
}
