use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::StoreError;

/// Exclusive advisory lock held for a whole invocation, so that overlapping
/// scheduler runs cannot interleave their read-then-write of the same keys.
pub struct RunLock {
    path: PathBuf,
    lock: RwLock<File>,
}

impl RunLock {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        Ok(Self { path, lock: RwLock::new(file) })
    }

    /// Blocks until any other invocation releases the lock
    pub fn acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>, StoreError> {
        let path = &self.path;
        self.lock
            .write()
            .map_err(|source| StoreError::Io { path: path.clone(), source })
    }

    /// Fails immediately if another invocation holds the lock
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>, StoreError> {
        let path = &self.path;
        self.lock
            .try_write()
            .map_err(|source| StoreError::Io { path: path.clone(), source })
    }
}
