//! Load/save backends for the durable structures.
//!
//! Each structure (rate limits, queue, publish record, ...) owns one
//! `StateStore` and reads it once on open; every mutation writes the whole
//! value back. `JsonFileStore` stages writes in a temp file next to the
//! destination and renames it into place, so readers never see a torn file.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StoreError, StoreResult};

/// A small repository holding one serialized value.
pub trait StateStore<T>: Send + Sync {
    /// Read the stored value, `None` when nothing has been saved yet.
    fn load(&self) -> StoreResult<Option<T>>;

    /// Replace the stored value.
    fn save(&self, value: &T) -> StoreResult<()>;
}

impl<T, S> StateStore<T> for Arc<S>
where
    S: StateStore<T> + ?Sized,
{
    fn load(&self) -> StoreResult<Option<T>> {
        (**self).load()
    }

    fn save(&self, value: &T) -> StoreResult<()> {
        (**self).save(value)
    }
}

/// Pretty-printed JSON file with atomic rename-on-write.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> StateStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> StoreResult<Option<T>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, value: &T) -> StoreResult<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| StoreError::NoParentDir(self.path.display().to_string()))?;
        fs::create_dir_all(dir)?;

        let data = serde_json::to_vec_pretty(value)?;
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&data)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.display().to_string(),
            source: e.error,
        })?;
        Ok(())
    }
}

/// In-process store, used by tests and dry runs.
pub struct MemoryStore<T> {
    value: Mutex<Option<T>>,
    fail_saves: AtomicBool,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn with_value(value: T) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `save` fail with an IO error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StateStore<T> for MemoryStore<T>
where
    T: Clone + Send,
{
    fn load(&self) -> StoreResult<Option<T>> {
        let value = self.value.lock().expect("MemoryStore lock poisoned");
        Ok(value.clone())
    }

    fn save(&self, value: &T) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("simulated write failure")));
        }
        let mut slot = self.value.lock().expect("MemoryStore lock poisoned");
        *slot = Some(value.clone());
        Ok(())
    }
}

/// Read a value, falling back to `T::default()` when the store is empty or unreadable.
pub(crate) fn load_or_default<T: Default>(store: &dyn StateStore<T>, what: &str) -> T {
    match store.load() {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("failed to load {what}, starting empty: {e}");
            T::default()
        }
    }
}

/// Re-read a value into `current`. An empty store resets it to the default;
/// an unreadable one leaves `current` untouched.
pub(crate) fn reload_into<T: Default>(store: &dyn StateStore<T>, current: &mut T, what: &str) {
    match store.load() {
        Ok(Some(value)) => *current = value,
        Ok(None) => *current = T::default(),
        Err(e) => tracing::warn!("failed to reload {what}, keeping the in-memory copy: {e}"),
    }
}

/// Save a value, logging instead of failing: the in-memory copy stays authoritative.
pub(crate) fn save_logged<T>(store: &dyn StateStore<T>, value: &T, what: &str) {
    if let Err(e) = store.save(value) {
        tracing::warn!("failed to persist {what}, continuing in memory: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<Vec<String>> = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_dirs_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = JsonFileStore::new(&path);

        let mut value = BTreeMap::new();
        value.insert("publish".to_string(), 3u32);
        store.save(&value).unwrap();

        assert!(path.exists());
        assert_eq!(store.load().unwrap(), Some(value));
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        store.save(&vec![1, 2, 3]).unwrap();
        store.save(&vec![4]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.load().unwrap(), Some(vec![4]));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let store: JsonFileStore<Vec<u32>> = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
        assert!(load_or_default(&store, "test state").is_empty());
    }

    #[test]
    fn reload_keeps_current_value_when_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::new(&path);
        store.save(&vec![7u32]).unwrap();

        let mut current = vec![1u32, 2];
        fs::write(&path, "{not json").unwrap();
        reload_into(&store, &mut current, "test state");
        assert_eq!(current, [1, 2]);

        store.save(&vec![3u32]).unwrap();
        reload_into(&store, &mut current, "test state");
        assert_eq!(current, [3]);

        fs::remove_file(&path).unwrap();
        reload_into(&store, &mut current, "test state");
        assert!(current.is_empty());
    }

    #[test]
    fn memory_store_can_simulate_write_failures() {
        let store = MemoryStore::with_value(1u32);
        store.set_fail_saves(true);
        assert!(store.save(&2).is_err());
        assert_eq!(store.load().unwrap(), Some(1));

        store.set_fail_saves(false);
        store.save(&2).unwrap();
        assert_eq!(store.load().unwrap(), Some(2));
    }
}
