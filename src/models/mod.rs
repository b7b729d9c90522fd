//! Data models for Azure Blob Storage.

mod blob;

pub use blob::*;
