//! Configuration types for stowage.yaml

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default gzip compression level (6 = balanced speed/ratio).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Root stowage.yaml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StowageConfigFile {
    /// Configuration schema version
    #[serde(default = "default_version")]
    pub version: String,

    /// Workspace configuration (paths, identity, hooks, options)
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Which files under the target root are backed up
    #[serde(default)]
    pub target: TargetConfig,

    /// Ordered list of storage targets archives are replicated to
    #[serde(default)]
    pub backups: Vec<StorageTargetConfig>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Default for StowageConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace: WorkspaceConfig::default(),
            target: TargetConfig::default(),
            backups: Vec::new(),
        }
    }
}

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace root; defaults to the directory holding the config file
    #[serde(default)]
    pub root_path: Option<PathBuf>,

    /// Local archive cache, relative to the root
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Catalog file, relative to the root
    #[serde(default = "default_versions_path")]
    pub versions_path: PathBuf,

    /// Author recorded on new snapshots
    #[serde(default = "default_user_identifier")]
    pub user_identifier: String,

    /// Static tags added to every backup
    #[serde(default, alias = "tags")]
    pub tags_generator: Vec<String>,

    /// Shell hooks
    #[serde(default)]
    pub hooks: HooksConfig,

    /// Archive and hashing options
    #[serde(default)]
    pub options: OptionsConfig,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_versions_path() -> PathBuf {
    PathBuf::from("./backups.txt")
}

fn default_user_identifier() -> String {
    "anonymous".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            cache_path: default_cache_path(),
            versions_path: default_versions_path(),
            user_identifier: default_user_identifier(),
            tags_generator: Vec::new(),
            hooks: HooksConfig::default(),
            options: OptionsConfig::default(),
        }
    }
}

/// Command lines run around each workflow, in order, fail-fast
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub pre_backup: Vec<String>,
    #[serde(default)]
    pub post_backup: Vec<String>,
    #[serde(default)]
    pub pre_restore: Vec<String>,
    #[serde(default)]
    pub post_restore: Vec<String>,
}

/// Archive and hashing options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Archive container format
    #[serde(default)]
    pub compress: ArchiveFormat,

    /// Compression level (1-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Snapshot fingerprint algorithm
    #[serde(default)]
    pub hash: HashAlgorithm,
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            compress: ArchiveFormat::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            hash: HashAlgorithm::default(),
        }
    }
}

impl OptionsConfig {
    /// Compression level clamped to the valid gzip range
    pub fn effective_compression_level(&self) -> u32 {
        self.compression_level.clamp(1, 9)
    }
}

/// Archive container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// gzip-compressed tar
    #[default]
    Tgz,
}

impl ArchiveFormat {
    /// File extension used for archives of this format
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Tgz => "tar.gz",
        }
    }
}

/// Digest algorithms available for snapshot fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// Legacy 128-bit digest, fast but not collision resistant
    Md5,
    /// SHA-256 (default)
    #[default]
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Md5 => write!(f, "md5"),
            HashAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Selection of files under the target root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target root, relative to the workspace root
    #[serde(default = "default_prefix_path")]
    pub prefix_path: PathBuf,

    /// Include rules; when non-empty only matching files are kept
    #[serde(default)]
    pub includes: Vec<String>,

    /// Exclude rules; matching files are dropped after the include filter
    #[serde(default)]
    pub excludes: Vec<String>,
}

fn default_prefix_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            prefix_path: default_prefix_path(),
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

/// One configured storage target, selected by `driver`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum StorageTargetConfig {
    /// Directory on the local filesystem
    Local(LocalStorageConfig),
    /// Directory on a remote host reached over ssh
    Remote(RemoteStorageConfig),
    /// S3 or S3-compatible object store
    S3(S3StorageConfig),
}

impl StorageTargetConfig {
    /// Driver name as written in the config file
    pub fn driver(&self) -> &'static str {
        match self {
            StorageTargetConfig::Local(_) => "local",
            StorageTargetConfig::Remote(_) => "remote",
            StorageTargetConfig::S3(_) => "s3",
        }
    }
}

impl fmt::Display for StorageTargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageTargetConfig::Local(local) => write!(f, "local:{}", local.path.display()),
            StorageTargetConfig::Remote(remote) => {
                write!(f, "remote:{}:{}", remote.destination(), remote.path)
            }
            StorageTargetConfig::S3(s3) => write!(f, "s3://{}/{}", s3.bucket, s3.prefix_path),
        }
    }
}

/// Local directory storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Directory holding archives; relative paths resolve against the workspace root
    pub path: PathBuf,
}

/// Remote directory storage over ssh/scp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStorageConfig {
    /// Remote host name or address
    pub host: String,

    /// Login user; the ssh client default when unset
    #[serde(default)]
    pub user: Option<String>,

    /// Directory on the remote host
    pub path: String,

    /// ssh port
    #[serde(default)]
    pub port: Option<u16>,

    /// Identity file passed to ssh/scp
    #[serde(default, alias = "identity_file")]
    pub ssh_credential_file: Option<PathBuf>,
}

impl RemoteStorageConfig {
    /// `user@host` or `host`
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

/// S3 object storage
#[derive(Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// Bucket name
    pub bucket: String,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom S3-compatible endpoint (MinIO, Wasabi, ...)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Key prefix prepended to every blob key
    #[serde(default)]
    pub prefix_path: String,

    /// Static access key; the default provider chain is used when unset
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Static secret key
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl fmt::Debug for S3StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3StorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("prefix_path", &self.prefix_path)
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}
