//! Mock implementations for testing
//!
//! Storage and hooks without network or process execution.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use stowage_backup::HookRunner;
use stowage_core::{Error, Result, StorageError};
use stowage_storage::StorageBackend;

/// Calls made against a [`MockBackend`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub exists: usize,
    pub upload: usize,
    pub download: usize,
}

/// In-memory storage backend. Clones share state, so a test can keep one
/// handle while the engine owns another.
#[derive(Clone, Debug)]
pub struct MockBackend {
    name: String,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    calls: Arc<Mutex<MockCalls>>,
    fail_uploads: Arc<Mutex<bool>>,
    fail_downloads: Arc<Mutex<bool>>,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            objects: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(MockCalls::default())),
            fail_uploads: Arc::new(Mutex::new(false)),
            fail_downloads: Arc::new(Mutex::new(false)),
        }
    }

    pub fn boxed(&self) -> Box<dyn StorageBackend> {
        Box::new(self.clone())
    }

    pub fn calls(&self) -> MockCalls {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        *self.calls.lock().unwrap() = MockCalls::default();
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn insert(&self, key: &str, bytes: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
    }

    pub fn remove(&self, key: &str) {
        self.objects.lock().unwrap().remove(key);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Make every upload fail with a transport error
    pub fn fail_uploads(&self, fail: bool) {
        *self.fail_uploads.lock().unwrap() = fail;
    }

    /// Make every download fail with a transport error
    pub fn fail_downloads(&self, fail: bool) {
        *self.fail_downloads.lock().unwrap() = fail;
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.calls.lock().unwrap().exists += 1;
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn upload(&self, key: &str, source: &Path) -> Result<()> {
        self.calls.lock().unwrap().upload += 1;
        if *self.fail_uploads.lock().unwrap() {
            return Err(StorageError::transport(&self.name, "injected upload failure").into());
        }
        let bytes = std::fs::read(source)?;
        self.insert(key, bytes);
        Ok(())
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<()> {
        self.calls.lock().unwrap().download += 1;
        if *self.fail_downloads.lock().unwrap() {
            return Err(StorageError::transport(&self.name, "injected download failure").into());
        }
        let bytes = self
            .object(key)
            .ok_or_else(|| Error::from(StorageError::not_found(key)))?;
        std::fs::write(destination, bytes)?;
        Ok(())
    }
}

/// Hook runner that records command lines and fails on request
#[derive(Clone, Debug, Default)]
pub struct MockHookRunner {
    invocations: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl MockHookRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn HookRunner> {
        Box::new(self.clone())
    }

    /// Make `command` exit with status 1
    pub fn fail_on(&self, command: &str) {
        self.failing.lock().unwrap().push(command.to_string());
    }

    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl HookRunner for MockHookRunner {
    async fn run(&self, command: &str) -> Result<()> {
        self.invocations.lock().unwrap().push(command.to_string());
        if self.failing.lock().unwrap().iter().any(|c| c == command) {
            return Err(Error::Hook {
                command: command.to_string(),
                status: Some(1),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}
