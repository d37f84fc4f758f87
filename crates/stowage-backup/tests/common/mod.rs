//! Common test utilities for stowage-backup
//!
//! - In-memory storage backend with call counters and failure injection
//! - Recording hook runner
//! - Workspace fixtures on temporary directories

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
