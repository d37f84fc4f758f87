//! Workspace fixtures

#![allow(dead_code)]

use crate::common::mocks::{MockBackend, MockHookRunner};
use std::fs;
use std::path::{Path, PathBuf};
use stowage_backup::{Catalog, Engine, EngineSettings, SelectionRules};
use stowage_core::types::{ArchiveFormat, HashAlgorithm, HooksConfig};
use tempfile::TempDir;

/// A temporary workspace with `data/` as the target root
pub struct TestWorkspace {
    pub temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("data")).unwrap();
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn data(&self) -> PathBuf {
        self.root().join("data")
    }

    pub fn cache(&self) -> PathBuf {
        self.root().join("cache")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root().join("backups.txt")
    }

    /// Write a file under the target root, creating parent directories
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.data().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.data().join(relative)).unwrap()
    }

    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            target_root: self.data(),
            cache_dir: self.cache(),
            author: "tester".to_string(),
            static_tags: Vec::new(),
            hooks: HooksConfig::default(),
            rules: SelectionRules::all(),
            hash: HashAlgorithm::Sha256,
            format: ArchiveFormat::Tgz,
            compression_level: 6,
        }
    }

    /// Engine over the given settings, loading the workspace catalog
    pub fn engine_with(
        &self,
        settings: EngineSettings,
        backends: &[&MockBackend],
        hooks: &MockHookRunner,
    ) -> Engine {
        let catalog = Catalog::load(self.catalog_path()).unwrap();
        Engine::new(
            settings,
            catalog,
            backends.iter().map(|b| b.boxed()).collect(),
            hooks.boxed(),
        )
    }

    pub fn engine(&self, backends: &[&MockBackend]) -> Engine {
        self.engine_with(self.settings(), backends, &MockHookRunner::new())
    }
}
