//! Backend construction from configuration

use crate::local::LocalBackend;
use crate::remote::RemoteBackend;
use crate::s3::S3Backend;
use crate::traits::StorageBackend;
use std::path::Path;
use stowage_core::types::StorageTargetConfig;
use stowage_core::Result;
use tracing::debug;

/// Build the backend for one configured storage target.
///
/// Relative local paths resolve against `root`.
pub async fn create_backend(
    config: &StorageTargetConfig,
    root: &Path,
) -> Result<Box<dyn StorageBackend>> {
    let backend: Box<dyn StorageBackend> = match config {
        StorageTargetConfig::Local(local) => {
            let path = if local.path.is_absolute() {
                local.path.clone()
            } else {
                root.join(&local.path)
            };
            Box::new(LocalBackend::new(path))
        }
        StorageTargetConfig::Remote(remote) => Box::new(RemoteBackend::new(remote)),
        StorageTargetConfig::S3(s3) => Box::new(S3Backend::new(s3).await?),
    };

    debug!("Configured storage backend {}", backend.name());
    Ok(backend)
}

/// Build every configured backend, preserving configuration order
pub async fn create_backends(
    configs: &[StorageTargetConfig],
    root: &Path,
) -> Result<Vec<Box<dyn StorageBackend>>> {
    let mut backends = Vec::with_capacity(configs.len());
    for config in configs {
        backends.push(create_backend(config, root).await?);
    }
    Ok(backends)
}
