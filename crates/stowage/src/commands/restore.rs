//! Restore command

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::Args;
use stowage_backup::{Engine, Predicate};
use stowage_core::StowageConfig;
use tracing::debug;

use crate::output;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Only consider snapshots carrying this tag (repeatable, all must match)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

pub async fn run(
    args: RestoreArgs,
    config_path: Option<&Utf8Path>,
    quiet: bool,
) -> Result<()> {
    let config = StowageConfig::load(config_path).context("Failed to load configuration")?;
    debug!("Loaded configuration from {}", config.config_path());

    if !quiet {
        output::header("Restore Workspace");
        output::kv("Destination", &config.target_root().display().to_string());
        if args.tags.is_empty() {
            output::kv("Selection", "latest snapshot");
        } else {
            output::kv("Selection", &format!("latest with tags {}", args.tags.join(", ")));
        }
        output::warning("Files at the same paths under the destination will be overwritten");
        println!();
    }

    let predicates = Predicate::for_tags(args.tags.iter().cloned());
    debug!("Restore predicates: {:?}", predicates);
    let mut engine = Engine::from_config(&config).await?;

    let spinner = output::spinner("Restoring snapshot...", quiet);
    let result = engine.restore(&predicates).await;
    spinner.finish_and_clear();
    let outcome = result?;

    if quiet {
        return Ok(());
    }

    output::success(&format!(
        "Restored {} files from snapshot {}",
        outcome.files.len(),
        outcome.record.digest.short()
    ));
    output::kv(
        "Created",
        &outcome
            .record
            .created_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
    );
    output::kv("Tags", &output::format_tags(&outcome.record.tags));
    match &outcome.fetched_from {
        Some(backend) => output::kv("Fetched from", backend),
        None => output::kv("Fetched from", "local cache"),
    }

    Ok(())
}
