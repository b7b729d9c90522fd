//! Block staging and block list commit.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{ErrorCode, StorageError, StorageResult};

use super::{discard_temp, write_atomic, ContainerStore};

/// Stages uncommitted blocks and assembles them into blobs.
#[derive(Debug, Clone)]
pub struct BlockStagingStore {
    containers: ContainerStore,
}

impl BlockStagingStore {
    pub fn new(containers: ContainerStore) -> Self {
        Self { containers }
    }

    /// Stages a block for a blob, replacing any block with the same id.
    pub async fn put_block(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
        data: &[u8],
    ) -> StorageResult<()> {
        let paths = self.containers.paths();
        let blob_path = paths.blob_path(container, blob)?;
        let block_path = paths.block_path(container, blob, block_id)?;
        let temp = paths.temp_path(container)?;

        self.containers.require(container).await?;
        let _guard = self.containers.locks().lock(&blob_path).await;

        write_atomic(&temp, &block_path, data)
            .await
            .map_err(|e| StorageError::io("Failed to stage block", e))?;

        debug!(
            "Staged block {} for {}/{} ({} bytes)",
            block_id,
            container,
            blob,
            data.len()
        );
        Ok(())
    }

    /// Replaces the blob with the concatenation of the named blocks, in the
    /// order given, then removes the consumed blocks.
    ///
    /// Every block is checked before anything is written; if one is missing
    /// the blob is left untouched. An id listed twice contributes its bytes
    /// twice. An empty list produces an empty blob, but an empty id is
    /// rejected.
    pub async fn commit(
        &self,
        container: &str,
        blob: &str,
        block_ids: &[String],
    ) -> StorageResult<()> {
        let paths = self.containers.paths();
        let blob_path = paths.blob_path(container, blob)?;
        if block_ids.iter().any(String::is_empty) {
            return Err(StorageError::with_message(
                ErrorCode::InvalidBlockList,
                "Block list names an empty block id",
            ));
        }
        let sources = block_ids
            .iter()
            .map(|id| paths.block_path(container, blob, id))
            .collect::<StorageResult<Vec<PathBuf>>>()?;
        let temp = paths.temp_path(container)?;

        self.containers.require(container).await?;
        let _guard = self.containers.locks().lock(&blob_path).await;

        for (id, source) in block_ids.iter().zip(&sources) {
            match fs::metadata(source).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => return Err(block_not_found(id)),
                Err(e) if e.kind() == ErrorKind::NotFound => return Err(block_not_found(id)),
                Err(e) => return Err(StorageError::io("Failed to stat block", e)),
            }
        }

        assemble(&sources, &temp, &blob_path)
            .await
            .map_err(|e| StorageError::io("Failed to commit block list", e))?;

        let mut removed = HashSet::new();
        for source in &sources {
            if !removed.insert(source) {
                continue;
            }
            if let Err(e) = fs::remove_file(source).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove committed block {}: {}", source.display(), e);
                }
            }
        }

        debug!(
            "Committed {} blocks to {}/{}",
            block_ids.len(),
            container,
            blob
        );
        Ok(())
    }
}

/// Streams `sources` into `temp` in order and renames it over `dest`.
async fn assemble(sources: &[PathBuf], temp: &Path, dest: &Path) -> std::io::Result<()> {
    let result = async {
        let mut out = fs::File::create(temp).await?;
        for source in sources {
            let mut block = fs::File::open(source).await?;
            tokio::io::copy(&mut block, &mut out).await?;
        }
        out.sync_all().await?;
        fs::rename(temp, dest).await
    }
    .await;

    if result.is_err() {
        discard_temp(temp).await;
    }
    result
}

fn block_not_found(block_id: &str) -> StorageError {
    StorageError::with_message(
        ErrorCode::InvalidBlockList,
        format!("Block {} not found", block_id),
    )
}
