//! Backup command

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::Args;
use stowage_backup::Engine;
use stowage_core::StowageConfig;
use tracing::debug;

use crate::output;

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Extra tag for the new snapshot (repeatable)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

pub async fn run(
    args: BackupArgs,
    config_path: Option<&Utf8Path>,
    quiet: bool,
) -> Result<()> {
    let config = StowageConfig::load(config_path).context("Failed to load configuration")?;
    debug!("Loaded configuration from {}", config.config_path());

    if !quiet {
        output::header("Backup Workspace");
        output::kv("Source", &config.target_root().display().to_string());
        output::kv("Catalog", &config.catalog_path().display().to_string());
        for target in config.backups() {
            output::kv("Target", &target.to_string());
        }
        if config.backups().is_empty() {
            output::warning("No storage targets configured; the archive stays in the local cache");
        }
        println!();
    }

    let mut engine = Engine::from_config(&config).await?;

    let spinner = output::spinner("Creating snapshot...", quiet);
    let result = engine.backup(&args.tags).await;
    spinner.finish_and_clear();
    let record = result?;
    debug!("Backup finished with snapshot {}", record.digest);

    if quiet {
        return Ok(());
    }

    output::success(&format!("Snapshot {}", record.digest.short()));
    output::kv("Digest", &record.digest.to_hex());
    output::kv(
        "Created",
        &record.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    output::kv("Author", &record.author);
    output::kv("Tags", &output::format_tags(&record.tags));

    Ok(())
}
