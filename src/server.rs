//! TCP server for handling HTTP connections.
//!
//! Binds the listener, accepts connections and hands each one to its own
//! task. Nothing is shared between tasks except the read-only `Context`.

use crate::config::Config;
use crate::http::{handle_connection, Context, HttpError};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Listen backlog
const BACKLOG: i32 = 1024;

/// Server instance
pub struct Server {
    config: Config,
    context: Arc<Context>,
    connection_limit: Option<Arc<Semaphore>>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let context = Arc::new(Context::from_config(&config));
        let connection_limit = config
            .max_connections
            .map(|max| Arc::new(Semaphore::new(max)));

        Server {
            config,
            context,
            connection_limit,
        }
    }

    /// Bind the configured address and begin accepting connections
    pub async fn run(&self) -> io::Result<()> {
        let listener = self.bind().map_err(|e| {
            error!(address = %self.config.listen, error = %e, "Failed to bind");
            e
        })?;
        info!(address = %listener.local_addr()?, "Server listening");

        self.serve(listener).await
    }

    /// Create the listening socket.
    pub fn bind(&self) -> io::Result<TcpListener> {
        let listener = create_listener(self.config.listen)?;
        TcpListener::from_std(listener)
    }

    /// Accept connections on `listener` until an unrecoverable error.
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        loop {
            // Wait for a connection slot when a cap is configured
            let permit = match &self.connection_limit {
                Some(limit) => Some(
                    Arc::clone(limit)
                        .acquire_owned()
                        .await
                        .map_err(io::Error::other)?,
                ),
                None => None,
            };

            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "New connection");

                    let context = Arc::clone(&self.context);

                    tokio::spawn(async move {
                        match handle_connection(stream, context).await {
                            Ok(()) => {}
                            Err(HttpError::Io(e)) => {
                                debug!(peer = %addr, error = %e, "Connection I/O error")
                            }
                            Err(e) => debug!(peer = %addr, error = %e, "Connection error"),
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Create a nonblocking TCP listener with SO_REUSEADDR.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    Ok(socket.into())
}
