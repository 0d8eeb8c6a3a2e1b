//! Advisory lock serialising ledger read-merge-write cycles per site.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use volcano_common::{MonitorError, MonitorResult};

/// Lock file name inside a site directory.
pub const LOCK_FILE: &str = ".metadata.lock";

/// Exclusive lock on a site's ledger, released on drop.
#[derive(Debug)]
pub struct LedgerLock {
    file: File,
    path: PathBuf,
}

impl LedgerLock {
    /// Block until the lock for `site_dir` is held.
    pub fn acquire(site_dir: &Path) -> MonitorResult<Self> {
        fs::create_dir_all(site_dir).map_err(|e| MonitorError::filesystem(site_dir, e))?;

        let path = site_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| MonitorError::filesystem(&path, e))?;

        file.lock().map_err(|e| MonitorError::filesystem(&path, e))?;
        debug!(lock = %path.display(), "Acquired ledger lock");

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(lock = %self.path.display(), error = %e, "Failed to release ledger lock");
        }
    }
}
