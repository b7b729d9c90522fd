//! HTTP server for the filesystem-backed blob emulator.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Account, Config};
use crate::router::{create_router, AppState};
use crate::storage::Storage;
use crate::StorageResult;

/// Blob storage server.
#[derive(Debug)]
pub struct BlobServer {
    config: Arc<Config>,
    account: Arc<Account>,
    storage: Storage,
}

impl BlobServer {
    /// Creates a new blob server storing data under `config.location`.
    ///
    /// Fails if the account key is not valid base64.
    pub fn new(config: Config) -> StorageResult<Self> {
        let account = Account::from_config(&config.account)?;
        let storage = Storage::new(config.blob_root());

        Ok(Self {
            config: Arc::new(config),
            account: Arc::new(account),
            storage,
        })
    }

    /// Returns the router with all middleware applied.
    pub fn router(&self) -> Router {
        let state = AppState {
            config: self.config.clone(),
            account: self.account.clone(),
            storage: self.storage.clone(),
        };

        create_router(state)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
                    .expose_headers(Any),
            )
            .layer(TraceLayer::new_for_http())
    }

    /// Serves requests on an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.storage.init().await?;

        let app = self.router();
        info!(
            "Azurite Blob service is listening at http://{}",
            listener.local_addr()?
        );
        info!(
            "Account: {}, data location: {}",
            self.account.name(),
            self.storage.root().display()
        );

        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Binds the configured address and runs the server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.blob_bind_address().parse()?;
        info!("Azurite Blob service is starting at http://{}", addr);

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Returns the bind address.
    pub fn bind_address(&self) -> String {
        self.config.blob_bind_address()
    }

    /// Returns the base URL for the blob service.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.bind_address())
    }

    pub fn account(&self) -> &Account {
        &self.account
    }
}

/// Builder for creating a blob server.
#[derive(Debug, Default)]
pub struct BlobServerBuilder {
    config: Config,
}

impl BlobServerBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the blob service port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.blob_port = port;
        self
    }

    /// Sets the workspace directory.
    pub fn location(mut self, location: impl Into<std::path::PathBuf>) -> Self {
        self.config.location = location.into();
        self
    }

    /// Sets the account name and base64 encoded key.
    pub fn account(mut self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.config.account.name = name.into();
        self.config.account.key = key.into();
        self
    }

    /// Builds the server.
    pub fn build(self) -> StorageResult<BlobServer> {
        BlobServer::new(self.config)
    }
}
