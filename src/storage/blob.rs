//! Whole-blob reads, writes, deletes and listings.

use bytes::Bytes;
use chrono::Utc;
use std::io::ErrorKind;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{BlobContent, BlobItem, BlobProperties};

use super::{write_atomic, ContainerStore};

#[derive(Debug, Clone)]
pub struct BlobStore {
    containers: ContainerStore,
}

impl BlobStore {
    pub fn new(containers: ContainerStore) -> Self {
        Self { containers }
    }

    /// Reads a blob in full along with its properties.
    pub async fn get(&self, container: &str, blob: &str) -> StorageResult<BlobContent> {
        let path = self.containers.paths().blob_path(container, blob)?;

        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::new(ErrorCode::BlobNotFound));
            }
            Err(e) => return Err(StorageError::io("Failed to open blob", e)),
        };

        let metadata = file
            .metadata()
            .await
            .map_err(|e| StorageError::io("Failed to stat blob", e))?;
        if metadata.is_dir() {
            return Err(StorageError::new(ErrorCode::BlobNotFound));
        }

        let mut data = Vec::with_capacity(metadata.len() as usize);
        file.read_to_end(&mut data)
            .await
            .map_err(|e| StorageError::io("Failed to read blob", e))?;

        let mut properties = BlobProperties::from_metadata(&metadata);
        properties.content_length = data.len() as u64;

        Ok(BlobContent {
            data: Bytes::from(data),
            properties,
        })
    }

    /// Creates or replaces a blob with `data`.
    pub async fn put(&self, container: &str, blob: &str, data: &[u8]) -> StorageResult<()> {
        let paths = self.containers.paths();
        let path = paths.blob_path(container, blob)?;
        let temp = paths.temp_path(container)?;

        self.containers.require(container).await?;
        let _guard = self.containers.locks().lock(&path).await;

        write_atomic(&temp, &path, data)
            .await
            .map_err(|e| StorageError::io("Failed to write blob", e))?;

        debug!("Wrote blob {}/{} ({} bytes)", container, blob, data.len());
        Ok(())
    }

    pub async fn delete(&self, container: &str, blob: &str) -> StorageResult<()> {
        let path = self.containers.paths().blob_path(container, blob)?;
        let _guard = self.containers.locks().lock(&path).await;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted blob {}/{}", container, blob);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::new(ErrorCode::BlobNotFound))
            }
            Err(e) => Err(StorageError::io("Failed to delete blob", e)),
        }
    }

    /// Lists the blobs in a container, sorted by name. Directories, including
    /// the staging area, are skipped.
    pub async fn list(
        &self,
        container: &str,
        prefix: Option<&str>,
    ) -> StorageResult<Vec<BlobItem>> {
        let dir = self.containers.paths().container_path(container)?;

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::new(ErrorCode::ContainerNotFound));
            }
            Err(e) => return Err(StorageError::io("Failed to list container", e)),
        };

        let snapshot = Utc::now();
        let mut items = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("Failed to list container", e))?
        {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!("Skipping non UTF-8 file name {:?}", raw);
                    continue;
                }
            };
            if let Some(prefix) = prefix {
                if !name.starts_with(prefix) {
                    continue;
                }
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Deleted between readdir and stat.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io("Failed to stat blob", e)),
            };
            if metadata.is_dir() {
                continue;
            }

            items.push(BlobItem {
                name,
                snapshot,
                properties: BlobProperties::from_metadata(&metadata),
            });
        }

        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}
