//! Command implementations

pub mod backup;
pub mod list;
pub mod restore;
