//! Configuration loading and management

mod loader;

pub use loader::{StowageConfig, CONFIG_FILE_NAMES};
