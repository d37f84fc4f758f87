//! Local filesystem backend

use crate::traits::StorageBackend;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use stowage_core::{Result, StorageError};
use tokio::fs;
use tracing::debug;

/// Stores archives as plain files in one directory
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `root`. The directory is created on first upload.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the archives
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn transport(&self, message: impl std::fmt::Display) -> StorageError {
        StorageError::transport(self.name(), message)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> String {
        format!("local:{}", self.root.display())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.object_path(key);
        match fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self
                .transport(format!("stat {}: {}", path.display(), e))
                .into()),
        }
    }

    async fn upload(&self, key: &str, source: &Path) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            self.transport(format!("create {}: {}", self.root.display(), e))
        })?;

        // Copy next to the target then rename so readers never see a partial object.
        let path = self.object_path(key);
        let staging = self.root.join(format!(".{}.upload", key));
        fs::copy(source, &staging).await.map_err(|e| {
            self.transport(format!(
                "copy {} to {}: {}",
                source.display(),
                staging.display(),
                e
            ))
        })?;
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(self
                .transport(format!("rename into {}: {}", path.display(), e))
                .into());
        }

        debug!("Uploaded {} to {}", key, self.root.display());
        Ok(())
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<()> {
        let path = self.object_path(key);
        match fs::copy(&path, destination).await {
            Ok(bytes) => {
                debug!("Downloaded {} ({} bytes) from {}", key, bytes, self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound && !path.exists() => {
                Err(StorageError::not_found(key).into())
            }
            Err(e) => Err(self
                .transport(format!(
                    "copy {} to {}: {}",
                    path.display(),
                    destination.display(),
                    e
                ))
                .into()),
        }
    }
}
