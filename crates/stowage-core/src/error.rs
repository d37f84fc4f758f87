//! Error types for stowage

use std::fmt;
use thiserror::Error;

/// Result type alias using stowage-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for stowage
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// The workspace root or one of its entries could not be traversed
    #[error("Cannot traverse {path}: {reason}")]
    Traversal { path: String, reason: String },

    /// A selected file vanished or became unreadable while hashing or archiving
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Archive packing or unpacking error
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Storage backend error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A hook command exited unsuccessfully
    #[error("Hook `{command}` failed ({}){}", describe_status(.status), describe_stderr(.stderr))]
    Hook {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A tag that cannot be recorded in the catalog
    #[error("Invalid tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A workflow step failed; wraps the underlying error with the phase it happened in
    #[error("{phase} failed: {source}")]
    Phase {
        phase: WorkflowPhase,
        #[source]
        source: Box<Error>,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "no exit status".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a traversal error
    pub fn traversal(path: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Traversal {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: impl fmt::Display, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.to_string(),
            source,
        }
    }

    /// Create an invalid tag error
    pub fn invalid_tag(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTag {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Attach the workflow phase to an error. Errors that already carry a phase keep it.
    pub fn in_phase(self, phase: WorkflowPhase) -> Self {
        match self {
            Self::Phase { .. } => self,
            other => Self::Phase {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// The phase this error was raised in, if the engine recorded one
    pub fn phase(&self) -> Option<WorkflowPhase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Strip any phase wrappers and return the underlying error
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Self::Phase { source, .. } = current {
            current = source;
        }
        current
    }
}

/// Archive container errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive holds an entry kind that unpack does not understand
    #[error("Unsupported archive entry {path} (type {kind})")]
    UnsupportedEntry { path: String, kind: String },

    /// The entry path is absolute or escapes the destination root
    #[error("Refusing to unpack entry outside the destination root: {path}")]
    UnsafePath { path: String },

    /// The container could not be decoded
    #[error("Corrupt archive: {reason}")]
    Corrupt { reason: String },
}

/// Storage backend errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// The blob key does not exist on the backend
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// The transport failed (I/O, network, remote command)
    #[error("Transport failure on {backend}: {message}")]
    Transport { backend: String, message: String },

    /// Every configured store failed, or none are configured
    #[error("No available stores for {key} ({attempted} attempted)")]
    NoAvailableStores { key: String, attempted: usize },
}

impl StorageError {
    /// Create a not found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a transport failure
    pub fn transport(backend: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            backend: backend.into(),
            message: message.to_string(),
        }
    }
}

/// Catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A record in the backing file could not be decoded (1-based record index)
    #[error("Malformed catalog record #{index}: {reason}")]
    Malformed { index: usize, reason: String },

    /// No record exists for the digest
    #[error("Snapshot {digest} not found in catalog")]
    NotFound { digest: String },

    /// A query matched no records
    #[error("No snapshots match the query")]
    EmptyResult,
}

/// Steps of the backup and restore workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    PreBackupHook,
    Walk,
    Fingerprint,
    DedupCheck,
    Archive,
    Replicate,
    Record,
    PostBackupHook,
    PreRestoreHook,
    ResolveTarget,
    Fetch,
    Unpack,
    PostRestoreHook,
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreBackupHook => "pre-backup hook",
            Self::Walk => "walk",
            Self::Fingerprint => "fingerprint",
            Self::DedupCheck => "dedup check",
            Self::Archive => "archive",
            Self::Replicate => "replicate",
            Self::Record => "record",
            Self::PostBackupHook => "post-backup hook",
            Self::PreRestoreHook => "pre-restore hook",
            Self::ResolveTarget => "resolve target",
            Self::Fetch => "fetch",
            Self::Unpack => "unpack",
            Self::PostRestoreHook => "post-restore hook",
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
