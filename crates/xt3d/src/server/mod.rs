//! TCP server for the game authority.
//!
//! The server:
//! - Listens on a TCP address for participant connections
//! - Spawns a ConnectionHandler for each connection
//! - Caps the number of simultaneous connections
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ AuthorityServer │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│   GameHandle    │
//! │ (per connection)│     │                 │
//! └───────┬─────────┘     └────────┬────────┘
//!         │ replies                │ notifications
//!         ▼                        ▼
//! ┌──────────────────────────────────────────┐
//! │   outbound queue ──▶ OutboundWriter task │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and the server keeps accepting

mod connection;

pub use connection::{
    ConnectionError, ConnectionHandler, ConnectionSettings, OutboundWriter, MAX_MESSAGE_SIZE,
};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use xt3_protocol::AuthorityMessage;

use crate::config::AuthorityConfig;
use crate::game::GameHandle;

/// TCP server for the game authority.
pub struct AuthorityServer {
    /// Bound listener
    listener: TcpListener,

    /// Handle to the game actor
    game: GameHandle,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Per-connection limits
    settings: ConnectionSettings,

    /// Maximum simultaneous connections
    max_connections: usize,

    /// Connection counter for generating client IDs
    connection_counter: AtomicU64,

    /// Currently open connections
    active: Arc<AtomicUsize>,
}

impl AuthorityServer {
    /// Binds the listener described by `config`.
    ///
    /// # Errors
    ///
    /// - `ServerError::Bind` if the address cannot be bound
    pub async fn bind(
        config: &AuthorityConfig,
        game: GameHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(config.listen)
                .await
                .map_err(|e| ServerError::Bind {
                    addr: config.listen,
                    error: e.to_string(),
                })?;

        Ok(Self {
            listener,
            game,
            cancel_token,
            settings: ConnectionSettings::from(config),
            max_connections: config.max_connections,
            connection_counter: AtomicU64::new(0),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// - `ServerError::Bind` if the socket has no local address
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(|e| ServerError::Bind {
            addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            error: e.to_string(),
        })
    }

    /// Accepts connections until the cancellation token is triggered.
    pub async fn run(&self) -> Result<(), ServerError> {
        info!(addr = ?self.listener.local_addr().ok(), "Authority listening");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            debug!(peer = %peer, connection = conn_num, "Accepted connection");
                            self.handle_connection(stream, conn_num);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        info!("Server stopped accepting connections");
        Ok(())
    }

    /// Spawns a handler task, or turns the connection away at capacity.
    fn handle_connection(&self, stream: TcpStream, connection_number: u64) {
        if self.active.load(Ordering::Relaxed) >= self.max_connections {
            warn!(
                connection = connection_number,
                max = self.max_connections,
                "Too many connections, rejecting"
            );
            let reason = ServerError::TooManyConnections {
                max: self.max_connections,
            }
            .to_string();
            tokio::spawn(reject(stream, reason));
            return;
        }

        let guard = ActiveGuard::new(Arc::clone(&self.active));
        let handler = ConnectionHandler::new(
            stream,
            self.game.clone(),
            self.settings,
            self.cancel_token.clone(),
            connection_number,
        );

        tokio::spawn(async move {
            let _guard = guard;
            let client_id = handler.run().await;
            debug!(client_id = ?client_id, "Connection task finished");
        });
    }
}

/// Writes a single `rejected` line and closes the stream.
async fn reject(mut stream: TcpStream, reason: String) {
    let Ok(json) = serde_json::to_string(&AuthorityMessage::rejected(&reason)) else {
        return;
    };

    let result = async {
        stream.write_all(json.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.shutdown().await
    }
    .await;

    if let Err(e) = result {
        debug!(error = %e, "Failed to send rejection");
    }
}

/// Counts a connection as active for as long as it lives.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::Relaxed);
        Self(active)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Too many connections (max: {max})")]
    TooManyConnections { max: usize },

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: SocketAddr::from(([127, 0, 0, 1], 10001)),
            error: "address in use".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:10001"));
        assert!(err.to_string().contains("address in use"));
    }

    #[test]
    fn test_active_guard_counts() {
        let active = Arc::new(AtomicUsize::new(0));
        {
            let _a = ActiveGuard::new(Arc::clone(&active));
            let _b = ActiveGuard::new(Arc::clone(&active));
            assert_eq!(active.load(Ordering::Relaxed), 2);
        }
        assert_eq!(active.load(Ordering::Relaxed), 0);
    }
}
