//! # stowage-core
//!
//! Core library for stowage providing:
//! - The error taxonomy shared by every stowage crate
//! - Configuration file parsing (stowage.yaml)
//! - Configuration type definitions for workspaces, selection rules and storage targets

pub mod config;
pub mod error;
pub mod types;

pub use config::StowageConfig;
pub use error::{ArchiveError, CatalogError, Error, Result, StorageError, WorkflowPhase};
