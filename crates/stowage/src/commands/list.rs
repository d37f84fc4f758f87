//! List command

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::Args;
use stowage_backup::{Catalog, Predicate, SnapshotRecord};
use stowage_core::StowageConfig;
use tabled::{settings::Style, Table, Tabled};

use crate::output;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list snapshots carrying this tag (repeatable, all must match)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Only list snapshots by this author
    #[arg(long)]
    pub author: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct SnapshotRow {
    digest: String,
    created: String,
    author: String,
    tags: String,
}

impl From<&SnapshotRecord> for SnapshotRow {
    fn from(record: &SnapshotRecord) -> Self {
        Self {
            digest: record.digest.short(),
            created: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            author: record.author.clone(),
            tags: output::format_tags(&record.tags),
        }
    }
}

fn predicates(args: &ListArgs) -> Vec<Predicate> {
    let mut predicates = Predicate::for_tags(args.tags.iter().cloned());
    if let Some(author) = &args.author {
        predicates.push(Predicate::AuthoredBy(author.clone()));
    }
    predicates
}

pub fn run(args: ListArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = StowageConfig::load(config_path).context("Failed to load configuration")?;
    let catalog = Catalog::load(config.catalog_path())?;
    let records = catalog.query(&predicates(&args));

    if args.json {
        let json = serde_json::to_string_pretty(&records)
            .context("Failed to serialize snapshots to JSON")?;
        println!("{}", json);
    } else if records.is_empty() {
        output::info("No snapshots match");
    } else {
        let rows: Vec<SnapshotRow> = records.iter().map(|r| SnapshotRow::from(*r)).collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }

    Ok(())
}
