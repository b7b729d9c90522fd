//! azurite-fs: Azure Blob Storage emulator backed by the local filesystem.
//!
//! Containers map to directories and blobs to files under
//! `<location>/blob`. Requests are authenticated with SharedKey headers or
//! query-string shared access signatures, and block blobs are staged and
//! committed the way the Blob Storage REST API does it.
//!
//! # Example
//!
//! ```no_run
//! use azurite_fs::{BlobServer, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = BlobServer::new(Config::default()).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod server;
pub mod storage;
pub mod xml;

// Re-exports for convenience
pub use config::{
    Account, Args, Config, DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_KEY, DEFAULT_API_VERSION,
    DEFAULT_BLOB_PORT,
};
pub use error::{ErrorCode, StorageError, StorageResult};
pub use server::{BlobServer, BlobServerBuilder};
pub use storage::Storage;
