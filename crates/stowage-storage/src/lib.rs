//! # stowage-storage
//!
//! Storage backends for snapshot archives. Every backend implements the same
//! three operations ([`StorageBackend::exists`], [`StorageBackend::upload`],
//! [`StorageBackend::download`]) and differs only in transport:
//!
//! - [`LocalBackend`]: a directory on the local filesystem
//! - [`RemoteBackend`]: a directory on a remote host, reached with `ssh`/`scp`
//! - [`S3Backend`]: an S3 or S3-compatible object store
//!
//! Backends are built from configuration with [`create_backend`].

pub mod factory;
pub mod local;
pub mod remote;
pub mod s3;
pub mod traits;

pub use factory::{create_backend, create_backends};
pub use local::LocalBackend;
pub use remote::RemoteBackend;
pub use s3::S3Backend;
pub use traits::StorageBackend;
