//! Shared test utilities for integration tests

use kspawn::config::{builtin_defaults, ClusterPatch};
use kspawn::store::{FileStore, CONFIG_FILE_NAME};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A file store rooted in a fresh temporary directory.
pub struct TestStore {
    pub dir: TempDir,
    pub store: FileStore,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        Self { dir, store }
    }

    pub fn path(&self, cluster: &str) -> PathBuf {
        self.dir.path().join(cluster).join(CONFIG_FILE_NAME)
    }

    /// Write a document by hand, as a user editing the file would.
    pub fn write(&self, cluster: &str, text: &str) {
        let path = self.path(cluster);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn read(&self, cluster: &str) -> String {
        fs::read_to_string(self.path(cluster)).unwrap()
    }
}

/// Built-in defaults, the lowest layer.
pub fn defaults() -> ClusterPatch {
    builtin_defaults().unwrap()
}
