//! Backup and restore workflows.
//!
//! Backup: pre-backup hooks, walk, fingerprint, dedup check, then archive,
//! replicate and record unless the snapshot already exists, then post-backup
//! hooks. Restore: pre-restore hooks, resolve the latest matching record,
//! fetch the archive if it is not cached, unpack, post-restore hooks.
//!
//! Every step runs to completion before the next starts. Fatal errors are
//! returned wrapped with the [`WorkflowPhase`] they happened in.

use crate::archive::{archive_key, Archiver};
use crate::catalog::{validate_tag, Catalog, Predicate, SnapshotRecord};
use crate::filters::SelectionRules;
use crate::fingerprint::Fingerprinter;
use crate::hooks::{run_hooks, HookRunner, ShellHookRunner};
use crate::replication::{fetch_with_failover, replicate};
use crate::walker::walk;
use chrono::Utc;
use std::path::{self, PathBuf};
use stowage_core::types::{ArchiveFormat, HashAlgorithm, HooksConfig, StorageTargetConfig};
use stowage_core::{Result, StowageConfig, WorkflowPhase};
use stowage_storage::{create_backends, StorageBackend};
use tracing::{debug, info};

/// Everything the workflows read from configuration
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Root of the files that are backed up and restored
    pub target_root: PathBuf,
    /// Local archive cache
    pub cache_dir: PathBuf,
    /// Author recorded on new snapshots
    pub author: String,
    /// Tags added to every new snapshot
    pub static_tags: Vec<String>,
    pub hooks: HooksConfig,
    pub rules: SelectionRules,
    pub hash: HashAlgorithm,
    pub format: ArchiveFormat,
    pub compression_level: u32,
}

impl EngineSettings {
    /// Settings for a loaded configuration.
    ///
    /// The cache, the catalog, the configuration file and local mirrors are
    /// reserved out of the selection when they lie under the target root.
    pub fn from_config(config: &StowageConfig) -> Result<Self> {
        let workspace = config.workspace();
        let options = config.options();
        let target = config.target();

        for tag in &workspace.tags_generator {
            validate_tag(tag)?;
        }

        let target_root = config.target_root();
        let mut rules = SelectionRules::new(&target.includes, &target.excludes)?;
        if let Ok(root) = path::absolute(&target_root) {
            for owned in owned_paths(config) {
                let Ok(owned) = path::absolute(&owned) else {
                    continue;
                };
                if let Ok(relative) = owned.strip_prefix(&root) {
                    if !relative.as_os_str().is_empty() {
                        debug!("Reserving {} from snapshots", relative.display());
                        rules.reserve(relative);
                    }
                }
            }
        }

        Ok(Self {
            target_root,
            cache_dir: config.cache_dir(),
            author: workspace.user_identifier.clone(),
            static_tags: workspace.tags_generator.clone(),
            hooks: config.hooks().clone(),
            rules,
            hash: options.hash,
            format: options.compress,
            compression_level: options.effective_compression_level(),
        })
    }
}

/// Paths stowage writes to on its own
fn owned_paths(config: &StowageConfig) -> Vec<PathBuf> {
    let mut paths = vec![
        config.cache_dir(),
        config.catalog_path(),
        config.config_path().as_std_path().to_path_buf(),
    ];
    for target in config.backups() {
        if let StorageTargetConfig::Local(local) = target {
            paths.push(config.resolve(&local.path));
        }
    }
    paths
}

/// Result of a restore
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// The snapshot that was restored
    pub record: SnapshotRecord,
    /// Restored paths, relative to the target root
    pub files: Vec<PathBuf>,
    /// Backend the archive was downloaded from; `None` on a cache hit
    pub fetched_from: Option<String>,
}

/// Runs backups and restores for one workspace.
///
/// The engine owns the catalog for its whole lifetime.
pub struct Engine {
    settings: EngineSettings,
    catalog: Catalog,
    backends: Vec<Box<dyn StorageBackend>>,
    hooks: Box<dyn HookRunner>,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        catalog: Catalog,
        backends: Vec<Box<dyn StorageBackend>>,
        hooks: Box<dyn HookRunner>,
    ) -> Self {
        Self {
            settings,
            catalog,
            backends,
            hooks,
        }
    }

    /// Builds the engine for a loaded configuration: settings, storage
    /// backends in configuration order, a shell hook runner and the catalog.
    pub async fn from_config(config: &StowageConfig) -> Result<Self> {
        let settings = EngineSettings::from_config(config)?;
        let catalog = Catalog::load(config.catalog_path())?;
        let backends = create_backends(config.backups(), config.root_path()).await?;
        let hooks = Box::new(ShellHookRunner::new(config.root_path()));

        Ok(Self::new(settings, catalog, backends, hooks))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Snapshots the target root. Returns the new record, or the stored one
    /// when the same content was already backed up.
    pub async fn backup(&mut self, extra_tags: &[String]) -> Result<SnapshotRecord> {
        for tag in extra_tags {
            validate_tag(tag)?;
        }

        run_hooks(
            self.hooks.as_ref(),
            &self.settings.hooks.pre_backup,
            "pre-backup",
        )
        .await
        .map_err(|e| e.in_phase(WorkflowPhase::PreBackupHook))?;

        let files = walk(&self.settings.target_root, &self.settings.rules)
            .map_err(|e| e.in_phase(WorkflowPhase::Walk))?;

        let digest = Fingerprinter::new(self.settings.hash)
            .fingerprint(&files)
            .map_err(|e| e.in_phase(WorkflowPhase::Fingerprint))?;

        let record = if self.catalog.exists(&digest) {
            let existing = self
                .catalog
                .get(&digest)
                .map_err(|e| e.in_phase(WorkflowPhase::DedupCheck))?
                .clone();
            info!(
                "Snapshot {} unchanged since {}, skipping archive",
                digest.short(),
                existing.created_at
            );
            existing
        } else {
            let key = archive_key(&digest, self.settings.format);
            let archive_path = self.settings.cache_dir.join(&key);

            let packed = Archiver::new(self.settings.compression_level)
                .pack(&files, &archive_path)
                .map_err(|e| e.in_phase(WorkflowPhase::Archive))?;
            info!("Archived {} files into {}", packed, archive_path.display());

            let replicas = replicate(&self.backends, &key, &archive_path)
                .await
                .map_err(|e| e.in_phase(WorkflowPhase::Replicate))?;
            debug!("Replicated {} to {} backends", key, replicas);

            let tags = self
                .settings
                .static_tags
                .iter()
                .chain(extra_tags.iter())
                .cloned();
            let record = SnapshotRecord::new(digest, Utc::now(), &self.settings.author, tags)
                .map_err(|e| e.in_phase(WorkflowPhase::Record))?;
            self.commit(record.clone())
                .map_err(|e| e.in_phase(WorkflowPhase::Record))?;
            info!("Recorded snapshot {}", record.digest.short());
            record
        };

        run_hooks(
            self.hooks.as_ref(),
            &self.settings.hooks.post_backup,
            "post-backup",
        )
        .await
        .map_err(|e| e.in_phase(WorkflowPhase::PostBackupHook))?;

        Ok(record)
    }

    /// Restores the latest snapshot matching every predicate into the target
    /// root, overwriting files at the same paths.
    pub async fn restore(&mut self, predicates: &[Predicate]) -> Result<RestoreOutcome> {
        run_hooks(
            self.hooks.as_ref(),
            &self.settings.hooks.pre_restore,
            "pre-restore",
        )
        .await
        .map_err(|e| e.in_phase(WorkflowPhase::PreRestoreHook))?;

        let record = self
            .catalog
            .query_latest(predicates)
            .map_err(|e| e.in_phase(WorkflowPhase::ResolveTarget))?
            .clone();
        info!(
            "Restoring snapshot {} from {}",
            record.digest.short(),
            record.created_at
        );

        let key = archive_key(&record.digest, self.settings.format);
        let archive_path = self.settings.cache_dir.join(&key);

        let fetched_from = if archive_path.is_file() {
            debug!("Using cached archive {}", archive_path.display());
            None
        } else {
            let name = fetch_with_failover(&self.backends, &key, &archive_path)
                .await
                .map_err(|e| e.in_phase(WorkflowPhase::Fetch))?;
            Some(name)
        };

        let files = Archiver::new(self.settings.compression_level)
            .unpack(&archive_path, &self.settings.target_root)
            .map_err(|e| e.in_phase(WorkflowPhase::Unpack))?;
        info!(
            "Restored {} files into {}",
            files.len(),
            self.settings.target_root.display()
        );

        run_hooks(
            self.hooks.as_ref(),
            &self.settings.hooks.post_restore,
            "post-restore",
        )
        .await
        .map_err(|e| e.in_phase(WorkflowPhase::PostRestoreHook))?;

        Ok(RestoreOutcome {
            record,
            files,
            fetched_from,
        })
    }

    /// Puts the record and flushes; a failed flush leaves the table unchanged.
    fn commit(&mut self, record: SnapshotRecord) -> Result<()> {
        let digest = record.digest.clone();
        self.catalog.put(record);
        if let Err(e) = self.catalog.flush() {
            self.catalog.discard(&digest);
            return Err(e);
        }
        Ok(())
    }
}
