//! Per-resource mutual exclusion for mutating operations.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async locks keyed by resolved filesystem path.
///
/// Entries are created on first use and kept for the life of the process.
#[derive(Debug, Default)]
pub struct ResourceLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `path`. Access is released when the
    /// returned guard is dropped.
    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        // The map shard guard must not be held across the await.
        let mutex = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Number of paths that have ever been locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
