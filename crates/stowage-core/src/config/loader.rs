//! Configuration file loading and parsing

use crate::error::{Error, Result};
use crate::types::{
    HooksConfig, OptionsConfig, StorageTargetConfig, StowageConfigFile, TargetConfig,
    WorkspaceConfig,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["stowage.yaml", "stowage.yml"];

/// Loaded stowage configuration with its resolved workspace root
#[derive(Debug, Clone)]
pub struct StowageConfig {
    /// The parsed configuration
    pub config: StowageConfigFile,

    /// Path to the configuration file
    pub config_path: Utf8PathBuf,

    /// Absolute workspace root every relative path resolves against
    pub root_path: PathBuf,
}

impl StowageConfig {
    /// Load configuration from the specified path or search for it
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let (config_path, content) = if let Some(p) = path {
            let content = fs::read_to_string(p).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::config_not_found(p.as_str())
                } else {
                    Error::Io(e)
                }
            })?;
            (p.to_owned(), content)
        } else {
            Self::find_config()?
        };

        Self::parse(&content, config_path)
    }

    /// Parse configuration text as if it had been read from `config_path`
    pub fn parse(content: &str, config_path: Utf8PathBuf) -> Result<Self> {
        let expanded = expand_env(content);
        let config: StowageConfigFile = serde_yaml_ng::from_str(&expanded)?;

        let config_dir = match config_path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.as_std_path().to_path_buf(),
            _ => PathBuf::from("."),
        };

        let root_path = match &config.workspace.root_path {
            Some(root) => config_dir.join(root),
            None => config_dir,
        };
        let root_path = std::path::absolute(&root_path)?;

        let loaded = Self {
            config,
            config_path,
            root_path,
        };
        loaded.validate()?;

        debug!(
            "Loaded configuration {} (root: {})",
            loaded.config_path,
            loaded.root_path.display()
        );

        Ok(loaded)
    }

    /// Find configuration file in current directory or parent directories
    fn find_config() -> Result<(Utf8PathBuf, String)> {
        let cwd = std::env::current_dir().map_err(Error::Io)?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))?;

        let mut current = cwd.as_path();

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let content = fs::read_to_string(&path)?;
                    return Ok((path, content));
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(Error::config_not_found(
            "stowage.yaml (searched current and parent directories)",
        ))
    }

    fn validate(&self) -> Result<()> {
        if self.config.workspace.user_identifier.contains(['\t', '\n', '\r']) {
            return Err(Error::invalid_config(
                "workspace.user_identifier must not contain tabs or newlines",
            ));
        }

        for (index, target) in self.config.backups.iter().enumerate() {
            let missing = match target {
                StorageTargetConfig::Local(local) if local.path.as_os_str().is_empty() => {
                    Some("path")
                }
                StorageTargetConfig::Remote(remote) if remote.host.is_empty() => Some("host"),
                StorageTargetConfig::Remote(remote) if remote.path.is_empty() => Some("path"),
                StorageTargetConfig::S3(s3) if s3.bucket.is_empty() => Some("bucket"),
                _ => None,
            };
            if let Some(field) = missing {
                return Err(Error::invalid_config(format!(
                    "backups[{}] ({}) is missing `{}`",
                    index,
                    target.driver(),
                    field
                )));
            }
        }

        Ok(())
    }

    /// Get the inner configuration file
    pub fn inner(&self) -> &StowageConfigFile {
        &self.config
    }

    /// Get workspace configuration
    pub fn workspace(&self) -> &WorkspaceConfig {
        &self.config.workspace
    }

    /// Get target selection configuration
    pub fn target(&self) -> &TargetConfig {
        &self.config.target
    }

    /// Get hooks configuration
    pub fn hooks(&self) -> &HooksConfig {
        &self.config.workspace.hooks
    }

    /// Get archive and hashing options
    pub fn options(&self) -> &OptionsConfig {
        &self.config.workspace.options
    }

    /// Get the ordered storage targets
    pub fn backups(&self) -> &[StorageTargetConfig] {
        &self.config.backups
    }

    /// Get the path the configuration was loaded from
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Get the workspace root
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Resolve a possibly relative path against the workspace root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_path.join(path)
        }
    }

    /// Local archive cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.config.workspace.cache_path)
    }

    /// Catalog file path
    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.config.workspace.versions_path)
    }

    /// Root of the files that get backed up and restored
    pub fn target_root(&self) -> PathBuf {
        self.resolve(&self.config.target.prefix_path)
    }
}

/// Expand `$VAR` and `${VAR}` from the process environment.
///
/// Unknown variables are left as written so hook command lines can still
/// reference them when the shell runs.
fn expand_env(content: &str) -> String {
    shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok()).into_owned()
}
