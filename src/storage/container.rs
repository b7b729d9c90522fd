//! Container directories.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{ErrorCode, StorageError, StorageResult};

use super::{PathResolver, ResourceLocks};

/// Creates containers and answers existence checks.
#[derive(Debug, Clone)]
pub struct ContainerStore {
    paths: Arc<PathResolver>,
    locks: Arc<ResourceLocks>,
}

impl ContainerStore {
    pub fn new(paths: Arc<PathResolver>, locks: Arc<ResourceLocks>) -> Self {
        Self { paths, locks }
    }

    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    pub fn locks(&self) -> &ResourceLocks {
        &self.locks
    }

    /// Creates the container directory and its staging directory.
    ///
    /// If the staging directory cannot be created the container directory
    /// is removed again.
    pub async fn create(&self, container: &str) -> StorageResult<()> {
        let dir = self.paths.container_path(container)?;
        let staging = self.paths.staging_dir(container)?;

        let _guard = self.locks.lock(&dir).await;
        create_dirs(&dir, &staging).await?;

        debug!("Created container {}", container);
        Ok(())
    }

    pub async fn exists(&self, container: &str) -> StorageResult<bool> {
        let dir = self.paths.container_path(container)?;
        match fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io("Failed to stat container", e)),
        }
    }

    /// Returns the container directory, or `ContainerNotFound`.
    pub async fn require(&self, container: &str) -> StorageResult<PathBuf> {
        if !self.exists(container).await? {
            return Err(StorageError::new(ErrorCode::ContainerNotFound));
        }
        self.paths.container_path(container)
    }
}

/// Creates `dir` and then `staging`, removing `dir` again if the second
/// step fails.
async fn create_dirs(dir: &Path, staging: &Path) -> StorageResult<()> {
    match fs::create_dir(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(StorageError::new(ErrorCode::ContainerAlreadyExists));
        }
        Err(e) => return Err(StorageError::io("Failed to create container", e)),
    }

    if let Err(e) = fs::create_dir(staging).await {
        if let Err(rollback) = fs::remove_dir(dir).await {
            warn!(
                "Failed to roll back container directory {}: {}",
                dir.display(),
                rollback
            );
        }
        return Err(StorageError::io("Failed to create staging directory", e));
    }
    Ok(())
}
