//! Per-destination install lock

use pinst_errors::{Error, InstallError};
use pinst_types::InstallTarget;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Exclusive claim on one destination path, released on drop.
///
/// Two installs aiming at the same file would race on the final rename;
/// the second one fails fast with `DestinationLocked` instead.
#[derive(Debug)]
pub struct DestinationLock {
    path: PathBuf,
}

impl DestinationLock {
    /// Lock file used for `target`
    #[must_use]
    pub fn lock_path(target: &InstallTarget) -> PathBuf {
        target
            .directory
            .join(format!(".{}.pinst.lock", target.file_name))
    }

    /// Acquire the lock
    ///
    /// # Errors
    ///
    /// Returns `DestinationLocked` if another install holds it.
    pub async fn acquire(target: &InstallTarget) -> Result<Self, Error> {
        let path = Self::lock_path(target);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    InstallError::DestinationLocked {
                        path: target.path().display().to_string(),
                    }
                } else {
                    InstallError::from_io("create lock", &path, &e)
                }
            })?;

        let lock = Self { path };
        file.write_all(format!("{}\n", std::process::id()).as_bytes())
            .await
            .map_err(|e| InstallError::from_io("write lock", &lock.path, &e))?;
        tracing::debug!(lock = %lock.path.display(), "acquired destination lock");
        Ok(lock)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DestinationLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}
