//! File layout of the data directory.

use std::path::{Path, PathBuf};

use crate::file_store::JsonFileStore;

#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rate_limits(&self) -> PathBuf {
        self.root.join("rate_limits.json")
    }

    pub fn publish_queue(&self) -> PathBuf {
        self.root.join("publish_queue.json")
    }

    pub fn publish_record(&self) -> PathBuf {
        self.root.join("publish_record.json")
    }

    pub fn published_log(&self) -> PathBuf {
        self.root.join("published_log.json")
    }

    pub fn handled_sources(&self) -> PathBuf {
        self.root.join("handled_sources.json")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join("garble.lock")
    }

    /// Boxed JSON store for one of the paths above.
    pub fn json_store<T>(&self, path: PathBuf) -> Box<JsonFileStore<T>> {
        Box::new(JsonFileStore::new(path))
    }
}
