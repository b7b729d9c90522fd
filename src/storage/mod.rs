//! Filesystem-backed storage layer.
//!
//! Containers are directories under `<location>/blob`, blobs are files in
//! them and staged blocks live in each container's `uncommitted` directory.
//! Every write lands in a temp file first and is renamed into place.

mod blob;
mod block;
mod container;
mod locks;
mod paths;

pub use blob::*;
pub use block::*;
pub use container::*;
pub use locks::*;
pub use paths::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{StorageError, StorageResult};

/// The stores sharing one root, one path resolver and one lock table.
#[derive(Debug, Clone)]
pub struct Storage {
    pub containers: ContainerStore,
    pub blobs: BlobStore,
    pub blocks: BlockStagingStore,
    paths: Arc<PathResolver>,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let paths = Arc::new(PathResolver::new(root));
        let locks = Arc::new(ResourceLocks::new());
        let containers = ContainerStore::new(paths.clone(), locks.clone());

        Self {
            blobs: BlobStore::new(containers.clone()),
            blocks: BlockStagingStore::new(containers.clone()),
            containers,
            paths,
        }
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Creates the storage root and any missing parents.
    pub async fn init(&self) -> StorageResult<()> {
        fs::create_dir_all(self.root())
            .await
            .map_err(|e| StorageError::io("Failed to create storage directory", e))?;
        tracing::debug!("Storage root ready at {}", self.root().display());
        Ok(())
    }
}

/// Writes `data` to `temp`, flushes it to disk and renames it over `dest`.
/// The temp file is removed if any step fails.
pub(crate) async fn write_atomic(temp: &Path, dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let result = async {
        let mut file = fs::File::create(temp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(temp, dest).await
    }
    .await;

    if result.is_err() {
        discard_temp(temp).await;
    }
    result
}

/// Best-effort removal of an abandoned temp file.
pub(crate) async fn discard_temp(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove temp file {}: {}", temp.display(), e);
        }
    }
}
