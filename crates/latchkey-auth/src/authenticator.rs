//! Reloading token authenticator.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::error::{AuthError, Result};
use crate::hashfile::HashFile;

#[derive(Debug)]
struct Table {
    file: HashFile,
    modified: SystemTime,
}

/// Checks tokens against a hash file on disk.
///
/// The file is re-read when its modification time differs from the one
/// seen at the last successful load. If that read fails, the request is
/// denied and the previous table stays in place for the next attempt.
#[derive(Debug)]
pub struct TokenAuthenticator {
    path: PathBuf,
    table: Mutex<Table>,
}

impl TokenAuthenticator {
    /// Load the hash file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or malformed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let modified = modified(&path)?;
        let file = HashFile::read(&path)?;

        tracing::info!(
            path = %path.display(),
            enabled = file.enabled_count(),
            "hash file loaded"
        );

        Ok(Self {
            path,
            table: Mutex::new(Table { file, modified }),
        })
    }

    /// Path of the hash file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of enabled records in the current table.
    pub fn enabled_count(&self) -> usize {
        self.lock().file.enabled_count()
    }

    /// Re-read the file if it changed on disk.
    ///
    /// Returns `true` when a new table was loaded.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be loaded. The previous
    /// table is kept.
    pub fn reload(&self) -> Result<bool> {
        let mut table = self.lock();
        let modified = modified(&self.path)?;
        if modified == table.modified {
            return Ok(false);
        }

        let file = HashFile::read(&self.path)?;
        tracing::info!(
            path = %self.path.display(),
            enabled = file.enabled_count(),
            "hash file reloaded"
        );

        *table = Table { file, modified };
        Ok(true)
    }

    /// Returns `true` if `token` belongs to an enabled identity.
    pub fn authenticate(&self, token: &str) -> bool {
        if let Err(e) = self.reload() {
            tracing::warn!(error = %e, "hash file unavailable, denying");
            return false;
        }

        let table = self.lock();
        match table.file.find(token) {
            Some(record) => {
                tracing::info!(identity = %record.identity, "authenticated");
                true
            }
            None => {
                tracing::warn!("authentication denied");
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn modified(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| AuthError::io(path, e))
}
