use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};

use crate::BuildError;

/// An exclusive advisory lock serializing builds of one base name.
///
/// Builds of the same library from several processes would otherwise race on
/// the install step. The lock file lives in the library directory and is
/// unlocked when the value is dropped.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Blocks until the lock for `base` in `libs_dir` is acquired.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub fn acquire(libs_dir: &Path, base: &str) -> Result<Self, BuildError> {
        let path = libs_dir.join(format!(".{base}.lock"));
        let lock_err = |source| BuildError::Lock {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(libs_dir).map_err(lock_err)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(lock_err)?;
        file.lock().map_err(lock_err)?;

        log::debug!("acquired install lock {}", path.display());
        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            log::warn!("failed to unlock {}: {err}", self.path.display());
        }
    }
}
