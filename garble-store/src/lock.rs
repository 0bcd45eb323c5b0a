//! Cross-process advisory lock guarding a tick.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{StoreError, StoreResult};

/// Exclusive `flock` on a lock file, released when dropped.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Take the lock without blocking; `StoreError::Locked` if another process holds it.
    pub fn try_acquire(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| StoreError::Locked(path.display().to_string()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_first_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garble.lock");

        let first = InstanceLock::try_acquire(&path).unwrap();
        assert!(matches!(
            InstanceLock::try_acquire(&path),
            Err(StoreError::Locked(_))
        ));

        drop(first);
        let again = InstanceLock::try_acquire(&path).unwrap();
        assert_eq!(again.path(), path.as_path());
    }
}
