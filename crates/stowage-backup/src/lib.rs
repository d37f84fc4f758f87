//! Stowage snapshot engine
//!
//! This crate turns a directory tree into content-addressed snapshots and
//! back again.
//!
//! # Backup
//! - **Selection**: include/exclude glob rules over root-relative paths
//! - **Fingerprinting**: one digest over the sorted relative paths and contents
//! - **Deduplication**: an unchanged file set is never archived twice
//! - **Replication**: the archive is uploaded to every configured backend in order
//! - **Catalog**: each snapshot is recorded with its author, time and tags
//!
//! # Restore
//! - **Tag queries**: the latest snapshot carrying every requested tag
//! - **Failover**: backends are tried in order until one has the archive
//! - **Unpack**: files are written back under the target root, overwriting
//!
//! # Examples
//!
//! ```no_run
//! use stowage_backup::{Engine, Predicate};
//! use stowage_core::StowageConfig;
//!
//! #[tokio::main]
//! async fn main() -> stowage_core::Result<()> {
//!     let config = StowageConfig::load(None)?;
//!     let mut engine = Engine::from_config(&config).await?;
//!
//!     let record = engine.backup(&["release".to_string()]).await?;
//!     println!("snapshot {}", record.digest);
//!
//!     engine.restore(&[Predicate::has_tag("release")]).await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod catalog;
pub mod engine;
pub mod filters;
pub mod fingerprint;
pub mod hooks;
pub mod replication;
pub mod walker;

// Re-export commonly used types
pub use archive::{archive_key, Archiver};
pub use catalog::{Catalog, Predicate, SnapshotRecord, NO_TAGS_MARKER};
pub use engine::{Engine, EngineSettings, RestoreOutcome};
pub use filters::SelectionRules;
pub use fingerprint::{Fingerprinter, SnapshotDigest};
pub use hooks::{HookRunner, ShellHookRunner};
pub use walker::{walk, SelectedFile};
