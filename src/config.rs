//! Server configuration.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::Parser;
use std::path::PathBuf;

use crate::error::{ErrorCode, StorageError, StorageResult};

/// Default account name for development storage.
pub const DEFAULT_ACCOUNT: &str = "devstoreaccount1";

/// Default account key for development storage (base64 encoded).
pub const DEFAULT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Default blob service port.
pub const DEFAULT_BLOB_PORT: u16 = 10000;

/// Default API version.
pub const DEFAULT_API_VERSION: &str = "2021-10-04";

/// Default workspace directory, relative to the working directory.
pub const DEFAULT_LOCATION: &str = "data";

/// Default request body limit (256 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 256 * 1024 * 1024;

/// Command-line arguments for the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "azurite-fs")]
#[command(about = "Azure Blob Storage emulator backed by the local filesystem")]
#[command(version)]
pub struct Args {
    /// Host address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port for blob service.
    #[arg(long, default_value_t = DEFAULT_BLOB_PORT)]
    pub blob_port: u16,

    /// Location for workspace data.
    #[arg(long, short = 'l', default_value = DEFAULT_LOCATION)]
    pub location: PathBuf,

    /// Name of the emulated storage account.
    #[arg(long, default_value = DEFAULT_ACCOUNT)]
    pub account_name: String,

    /// Base64 encoded key of the emulated storage account.
    #[arg(long, default_value = DEFAULT_ACCOUNT_KEY)]
    pub account_key: String,

    /// Maximum accepted request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: usize,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (minimal logging).
    #[arg(long, short = 's')]
    pub silent: bool,
}

/// Server configuration derived from command-line arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port for blob service.
    pub blob_port: u16,
    /// Location for workspace data; blobs live under `<location>/blob`.
    pub location: PathBuf,
    /// Maximum accepted request body size in bytes.
    pub max_body_size: usize,
    /// Enable debug logging.
    pub debug: bool,
    /// Account credentials.
    pub account: AccountConfig,
}

/// Account configuration.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub name: String,
    pub key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            blob_port: DEFAULT_BLOB_PORT,
            location: PathBuf::from(DEFAULT_LOCATION),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            debug: false,
            account: AccountConfig {
                name: DEFAULT_ACCOUNT.to_string(),
                key: DEFAULT_ACCOUNT_KEY.to_string(),
            },
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            blob_port: args.blob_port,
            location: args.location,
            max_body_size: args.max_body_size,
            debug: args.debug,
            account: AccountConfig {
                name: args.account_name,
                key: args.account_key,
            },
        }
    }
}

impl Config {
    /// Returns the bind address for the blob service.
    pub fn blob_bind_address(&self) -> String {
        format!("{}:{}", self.host, self.blob_port)
    }

    /// Returns the directory holding all containers.
    pub fn blob_root(&self) -> PathBuf {
        self.location.join("blob")
    }
}

/// The emulated storage account, with its key decoded once at startup.
#[derive(Clone)]
pub struct Account {
    name: String,
    key: Vec<u8>,
}

impl Account {
    /// Creates an account from a name and raw key bytes.
    pub fn new(name: impl Into<String>, key: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// Builds the account from configuration, decoding the base64 key.
    pub fn from_config(config: &AccountConfig) -> StorageResult<Self> {
        let key = BASE64.decode(&config.key).map_err(|_| {
            StorageError::with_message(ErrorCode::InternalError, "Invalid account key encoding")
        })?;
        Ok(Self::new(config.name.clone(), key))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("key", &"<redacted>")
            .finish()
    }
}
