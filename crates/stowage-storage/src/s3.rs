//! S3 backend for archive storage
//!
//! Supports AWS S3 and S3-compatible storage (MinIO, Wasabi, DigitalOcean Spaces).

use crate::traits::StorageBackend;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use stowage_core::types::S3StorageConfig;
use stowage_core::{Result, StorageError};
use tokio::fs::File;
use tracing::debug;

/// Stores archives as objects in an S3 bucket
pub struct S3Backend {
    /// S3 client
    client: Client,
    /// Bucket name
    bucket: String,
    /// Key prefix for archives
    prefix: String,
}

impl S3Backend {
    /// Create a new S3 backend from configuration
    pub async fn new(config: &S3StorageConfig) -> Result<Self> {
        let client = Self::create_client(config).await;

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.prefix_path.clone(),
        })
    }

    async fn create_client(config: &S3StorageConfig) -> Client {
        let region = Region::new(config.region.clone());

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            debug!("Using static credentials for bucket {}", config.bucket);
            s3_config_builder = s3_config_builder.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "stowage",
            ));
        }

        if let Some(endpoint_url) = &config.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint_url);
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true); // Required for MinIO and many S3-compatible services
        }

        Client::from_conf(s3_config_builder.build())
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn make_key(&self, key: &str) -> String {
        make_key(&self.prefix, key)
    }

    fn transport(&self, message: impl std::fmt::Display) -> StorageError {
        StorageError::transport(self.name(), message)
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let object_key = self.make_key(key);
        debug!("Checking s3://{}/{}", self.bucket, object_key);

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(self
                        .transport(format!("head {}: {}", object_key, service_error))
                        .into())
                }
            }
        }
    }

    async fn upload(&self, key: &str, source: &Path) -> Result<()> {
        let object_key = self.make_key(key);
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| self.transport(format!("read {}: {}", source.display(), e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .content_type("application/gzip")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                self.transport(format!("put {}: {}", object_key, e.into_service_error()))
            })?;

        debug!("Uploaded s3://{}/{}", self.bucket, object_key);
        Ok(())
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<()> {
        let object_key = self.make_key(key);

        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(StorageError::not_found(key).into());
                }
                return Err(self
                    .transport(format!("get {}: {}", object_key, service_error))
                    .into());
            }
        };

        let mut file = File::create(destination)
            .await
            .map_err(|e| self.transport(format!("create {}: {}", destination.display(), e)))?;
        let mut reader = resp.body.into_async_read();
        let bytes = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| self.transport(format!("read body of {}: {}", object_key, e)))?;

        debug!(
            "Downloaded {} bytes from s3://{}/{}",
            bytes, self.bucket, object_key
        );
        Ok(())
    }
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Join a prefix and blob key, normalizing double slashes
fn make_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_start_matches('/');
    if prefix.is_empty() {
        return key.to_string();
    }
    format!("{}/{}", prefix.trim_end_matches('/'), key.trim_start_matches('/'))
}
