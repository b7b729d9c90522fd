//! Blob data models.
//!
//! Nothing beyond the file itself is persisted, so every property here is
//! derived from filesystem state at read time.

use chrono::{DateTime, Utc};
use std::fs::Metadata;

/// Blob type reported for stored files. Every file is a block blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobType {
    #[default]
    BlockBlob,
}

impl BlobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobType::BlockBlob => "BlockBlob",
        }
    }
}

/// Blob properties synthesized from a filesystem stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobProperties {
    pub last_modified: DateTime<Utc>,
    pub content_length: u64,
    pub blob_type: BlobType,
}

impl BlobProperties {
    /// Creates properties from a modification time and a size.
    pub fn new(last_modified: DateTime<Utc>, content_length: u64) -> Self {
        Self {
            last_modified,
            content_length,
            blob_type: BlobType::BlockBlob,
        }
    }

    /// Creates properties from file metadata. Platforms without an mtime
    /// report the current time.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Self::new(last_modified, metadata.len())
    }
}

/// A blob entry in a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    /// Point-in-time timestamp of the listing.
    pub snapshot: DateTime<Utc>,
    pub properties: BlobProperties,
}

/// A blob read back in full.
#[derive(Debug, Clone)]
pub struct BlobContent {
    pub data: bytes::Bytes,
    pub properties: BlobProperties,
}
