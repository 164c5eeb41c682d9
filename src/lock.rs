//! Cross-process advisory lock on a budget root.

use crate::error::{BudgetError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lock file created in the budget root.
pub const LOCK_FILE: &str = ".budget.lock";

/// Exclusive lock held for the lifetime of the value.
///
/// Hold one around a read-then-write cycle
/// ([`Budget::assemble`](crate::Budget::assemble) followed by
/// [`Budget::write_changes`](crate::Budget::write_changes)) when other
/// processes may write the same budget.
#[derive(Debug)]
pub struct BudgetLock {
    file: File,
    path: PathBuf,
}

impl BudgetLock {
    /// Take the lock without waiting. Fails with `Locked` if another holder
    /// exists.
    pub fn acquire(budget_root: impl AsRef<Path>) -> Result<Self> {
        let root = budget_root.as_ref();
        if !root.is_dir() {
            return Err(BudgetError::NotFound(root.to_path_buf()));
        }

        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive().map_err(|_| BudgetError::Locked)?;

        debug!(path = %path.display(), "Acquired budget lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BudgetLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
