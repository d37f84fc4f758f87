//! File selection rules for snapshots.
//!
//! Rules are glob patterns over paths relative to the target root:
//! - `*` matches within one path component, `**` spans directories
//! - A rule ending in `/` is a directory rule and matches everything beneath it
//! - A leading `./` is ignored
//!
//! When include rules are present a file must match at least one of them.
//! Exclude rules are applied after that and always win. Reserved paths (see
//! [`SelectionRules::reserve`]) are dropped regardless of either.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use stowage_core::{Error, Result};

/// Compiled include/exclude rules for one workspace target.
#[derive(Debug, Clone)]
pub struct SelectionRules {
    /// Include rules, `None` when every file is eligible
    includes: Option<GlobSet>,

    /// Exclude rules
    excludes: GlobSet,

    /// Directories that exclude directory rules cover entirely
    pruned: GlobSet,

    /// Root-relative files and directories that are never selected
    reserved: Vec<PathBuf>,
}

impl SelectionRules {
    /// Compiles include and exclude rules.
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self> {
        let includes = if includes.is_empty() {
            None
        } else {
            Some(build_set(includes, "include")?)
        };
        let excludes_set = build_set(excludes, "exclude")?;

        let mut pruned = GlobSetBuilder::new();
        for rule in excludes {
            let rule = normalize(rule);
            if let Some(dir) = rule.strip_suffix('/') {
                if !dir.is_empty() {
                    pruned.add(compile(dir, rule)?);
                }
            }
        }
        let pruned = pruned
            .build()
            .map_err(|e| Error::invalid_config(format!("Failed to build exclude rules: {}", e)))?;

        Ok(Self {
            includes,
            excludes: excludes_set,
            pruned,
            reserved: Vec::new(),
        })
    }

    /// Rules that select every file.
    pub fn all() -> Self {
        Self {
            includes: None,
            excludes: GlobSet::empty(),
            pruned: GlobSet::empty(),
            reserved: Vec::new(),
        }
    }

    /// Excludes a root-relative file or directory, and everything beneath it,
    /// by location rather than by pattern.
    pub fn reserve(&mut self, relative: impl Into<PathBuf>) {
        self.reserved.push(relative.into());
    }

    fn is_reserved(&self, relative: &Path) -> bool {
        self.reserved.iter().any(|path| relative.starts_with(path))
    }

    /// Returns true if a root-relative file path belongs in the snapshot.
    pub fn is_selected(&self, relative: &Path) -> bool {
        let included = match &self.includes {
            Some(set) => set.is_match(relative),
            None => true,
        };
        included && !self.excludes.is_match(relative) && !self.is_reserved(relative)
    }

    /// Returns true if a root-relative directory is excluded as a whole, so the
    /// walk does not need to descend into it.
    pub fn is_pruned(&self, relative_dir: &Path) -> bool {
        self.pruned.is_match(relative_dir) || self.is_reserved(relative_dir)
    }
}

fn normalize(rule: &str) -> &str {
    let mut rule = rule.trim();
    while let Some(stripped) = rule.strip_prefix("./") {
        rule = stripped;
    }
    rule
}

fn build_set(rules: &[String], polarity: &str) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for rule in rules {
        let rule = normalize(rule);
        let pattern = match rule.strip_suffix('/') {
            Some("") => "**".to_string(),
            Some(dir) => format!("{}/**", dir),
            None => rule.to_string(),
        };
        builder.add(compile(&pattern, rule)?);
    }

    builder.build().map_err(|e| {
        Error::invalid_config(format!("Failed to build {} rules: {}", polarity, e))
    })
}

fn compile(pattern: &str, rule: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::invalid_config(format!("Invalid selection rule '{}': {}", rule, e)))
}
