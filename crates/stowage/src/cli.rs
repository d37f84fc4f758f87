//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

pub use crate::commands::backup::BackupArgs;
pub use crate::commands::list::ListArgs;
pub use crate::commands::restore::RestoreArgs;

/// Stowage - content-addressed backups replicated to every configured store
#[derive(Parser, Debug)]
#[command(name = "stowage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to stowage.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Snapshot the workspace target and replicate it
    Backup(BackupArgs),

    /// Restore the latest snapshot matching the given tags
    Restore(RestoreArgs),

    /// List catalog snapshots
    List(ListArgs),
}
