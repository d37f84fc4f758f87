//! Multi-target replication and restore failover.
//!
//! Both loops walk the backends in configuration order, one at a time.

use std::path::{Path, PathBuf};
use stowage_core::{Result, StorageError};
use stowage_storage::StorageBackend;
use tokio::fs;
use tracing::{info, warn};

/// Uploads `source` under `key` to every backend. The first failure aborts.
pub async fn replicate(
    backends: &[Box<dyn StorageBackend>],
    key: &str,
    source: &Path,
) -> Result<usize> {
    for backend in backends {
        info!("Uploading {} to {}", key, backend.name());
        backend.upload(key, source).await?;
    }
    Ok(backends.len())
}

/// Downloads `key` into `destination` from the first backend that has it and
/// returns that backend's name.
///
/// Each attempt writes to a `.partial` sibling that only replaces
/// `destination` once the download completes.
pub async fn fetch_with_failover(
    backends: &[Box<dyn StorageBackend>],
    key: &str,
    destination: &Path,
) -> Result<String> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }
    let partial = partial_path(destination);

    for backend in backends {
        match backend.download(key, &partial).await {
            Ok(()) => {
                fs::rename(&partial, destination).await?;
                info!("Fetched {} from {}", key, backend.name());
                return Ok(backend.name());
            }
            Err(e) => {
                warn!("Could not fetch {} from {}: {}", key, backend.name(), e);
                let _ = fs::remove_file(&partial).await;
            }
        }
    }

    Err(StorageError::NoAvailableStores {
        key: key.to_string(),
        attempted: backends.len(),
    }
    .into())
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::Error;
    use stowage_storage::LocalBackend;
    use tempfile::TempDir;

    fn boxed(backend: LocalBackend) -> Box<dyn StorageBackend> {
        Box::new(backend)
    }

    #[tokio::test]
    async fn test_replicate_to_every_backend() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("k.tar.gz");
        std::fs::write(&source, "bytes").unwrap();
        let backends = vec![
            boxed(LocalBackend::new(temp.path().join("a"))),
            boxed(LocalBackend::new(temp.path().join("b"))),
        ];

        assert_eq!(replicate(&backends, "k.tar.gz", &source).await.unwrap(), 2);
        assert!(temp.path().join("a/k.tar.gz").exists());
        assert!(temp.path().join("b/k.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_failover_uses_second_backend() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("k.tar.gz");
        std::fs::write(&source, "bytes").unwrap();
        let second = LocalBackend::new(temp.path().join("b"));
        second.upload("k.tar.gz", &source).await.unwrap();
        let backends = vec![boxed(LocalBackend::new(temp.path().join("a"))), boxed(second)];

        let destination = temp.path().join("cache/k.tar.gz");
        let name = fetch_with_failover(&backends, "k.tar.gz", &destination)
            .await
            .unwrap();

        assert!(name.ends_with("/b"));
        assert_eq!(std::fs::read(&destination).unwrap(), b"bytes");
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_no_backends_is_no_available_stores() {
        let temp = TempDir::new().unwrap();
        let err = fetch_with_failover(&[], "k.tar.gz", &temp.path().join("k.tar.gz"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Storage(StorageError::NoAvailableStores { attempted: 0, .. })
        ));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/c/abc.tar.gz")),
            PathBuf::from("/c/abc.tar.gz.partial")
        );
    }
}
