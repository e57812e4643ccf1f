//! tiny-httpd: a minimal HTTP/1.1 server
//!
//! Serves one request per connection on four routes:
//! - `/` returns an empty 200
//! - `/echo/<text>` echoes the text back
//! - `/user-agent` echoes the `User-Agent` header
//! - `/files/<name>` reads or writes a file under `--directory`
//!
//! Configuration via CLI arguments or TOML file.

mod config;
mod http;
mod server;

use config::Config;
use server::Server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let workers = config.worker_threads();

    info!(
        listen = %config.listen,
        directory = ?config.directory,
        workers,
        max_connections = ?config.max_connections,
        read_timeout = ?config.read_timeout,
        max_body_bytes = config.max_body_bytes,
        "Starting tiny-httpd"
    );

    if config.directory.is_none() {
        warn!("No files directory configured; /files requests will fail");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()?;

    let server = Server::new(config);
    runtime.block_on(server.run())?;
    Ok(())
}
