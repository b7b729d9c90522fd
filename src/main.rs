//! azurite-fs: Azure Blob Storage emulator backed by the local filesystem.

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use azurite_fs::{Args, BlobServer, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from(args);
    let location = config.location.clone();
    let server = BlobServer::new(config)?;

    println!(
        r#"
Azurite Blob service is starting at {}

Account: {}
Data location: {}

Connection string:
DefaultEndpointsProtocol=http;AccountName={};AccountKey=<configured key>;BlobEndpoint={}/{};

Press Ctrl+C to stop the server.
"#,
        server.bind_address(),
        server.account().name(),
        location.display(),
        server.account().name(),
        server.base_url(),
        server.account().name()
    );

    server.run().await
}
