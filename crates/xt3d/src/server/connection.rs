//! Connection handler for individual participant connections.
//!
//! Each TCP connection gets its own `ConnectionHandler` that:
//! - Performs protocol version negotiation
//! - Parses incoming requests and routes them to the game actor
//! - Owns the connection's outbound queue, shared by replies and pushes
//! - Releases the seat it registered when the connection goes away
//!
//! Writes happen in a separate [`OutboundWriter`] task draining the
//! outbound queue, so a reply is always written after any notification
//! the actor queued before it.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Connection errors are logged and result in graceful disconnect

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use xt3_core::PlayerToken;
use xt3_protocol::{AuthorityMessage, ClientMessage, MessageType, ProtocolVersion};

use crate::config::AuthorityConfig;
use crate::game::{GameError, GameHandle};

/// Maximum message size (64 KiB)
pub const MAX_MESSAGE_SIZE: usize = 65_536;

/// Per-connection limits taken from the authority config.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub queue_depth: usize,
}

impl From<&AuthorityConfig> for ConnectionSettings {
    fn from(config: &AuthorityConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            queue_depth: config.queue_depth,
        }
    }
}

/// The seat this connection registered.
#[derive(Debug, Clone)]
struct Binding {
    token: PlayerToken,
    name: String,
}

/// Connection handler for a single participant.
pub struct ConnectionHandler {
    /// Buffered reader for incoming requests
    reader: BufReader<OwnedReadHalf>,

    /// Writer task, spawned when the handler starts
    writer: Option<OutboundWriter>,

    /// Outbound queue (replies and, once registered, notifications)
    outbound: mpsc::Sender<AuthorityMessage>,

    /// Handle to the game actor
    game: GameHandle,

    /// Shutdown signal
    cancel_token: CancellationToken,

    /// Unique client identifier (assigned after handshake)
    client_id: Option<String>,

    /// Seat registered over this connection
    bound: Option<Binding>,

    read_timeout: Duration,
    connection_number: u64,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    pub fn new(
        stream: TcpStream,
        game: GameHandle,
        settings: ConnectionSettings,
        cancel_token: CancellationToken,
        connection_number: u64,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        let (outbound, queue) = mpsc::channel(settings.queue_depth);

        Self {
            reader: BufReader::new(reader),
            writer: Some(OutboundWriter {
                writer: BufWriter::new(writer),
                queue,
                write_timeout: settings.write_timeout,
                connection_number,
            }),
            outbound,
            game,
            cancel_token,
            client_id: None,
            bound: None,
            read_timeout: settings.read_timeout,
            connection_number,
        }
    }

    /// Runs the connection handler until the connection closes.
    ///
    /// Returns the client ID assigned during the handshake, if any.
    pub async fn run(mut self) -> Option<String> {
        debug!(connection = self.connection_number, "New client connected");

        let writer_task = self.writer.take().map(|writer| tokio::spawn(writer.run()));

        match self.handle_handshake().await {
            Ok(()) => {
                info!(client_id = ?self.client_id, "Client handshake completed");

                if let Err(e) = self.process_messages().await {
                    debug!(client_id = ?self.client_id, error = %e, "Connection closed");
                }
            }
            Err(e) => {
                warn!(
                    connection = self.connection_number,
                    error = %e,
                    "Handshake failed"
                );
            }
        }

        self.release_seat().await;
        info!(client_id = ?self.client_id, "Client disconnected");

        let client_id = self.client_id.clone();

        // Dropping the handler closes our end of the outbound queue; the
        // writer flushes whatever is left and exits.
        drop(self);
        if let Some(task) = writer_task {
            let _ = task.await;
        }

        client_id
    }

    /// Expects a `Connect` message, validates the protocol version, and
    /// responds with `Connected` or `Rejected`.
    async fn handle_handshake(&mut self) -> Result<(), ConnectionError> {
        let msg = match timeout(self.read_timeout, self.read_message()).await {
            Ok(result) => result?,
            Err(_) => return Err(ConnectionError::Timeout),
        };

        let client_version = msg.protocol_version;
        if !client_version.is_compatible_with(&ProtocolVersion::CURRENT) {
            warn!(
                client_version = %client_version,
                server_version = %ProtocolVersion::CURRENT,
                "Protocol version mismatch"
            );

            self.send_message(AuthorityMessage::rejected(&format!(
                "Protocol version {} not compatible with server version {}",
                client_version,
                ProtocolVersion::CURRENT
            )))
            .await?;

            return Err(ConnectionError::VersionMismatch {
                client: client_version,
                server: ProtocolVersion::CURRENT,
            });
        }

        match msg.message {
            MessageType::Connect { client_id } => {
                let assigned_id =
                    client_id.unwrap_or_else(|| format!("client-{}", self.connection_number));

                self.client_id = Some(assigned_id.clone());
                self.send_message(AuthorityMessage::connected(assigned_id))
                    .await
            }
            other => {
                self.send_message(AuthorityMessage::error(
                    "Expected Connect message for handshake",
                ))
                .await?;

                Err(ConnectionError::UnexpectedMessage(other.kind().to_string()))
            }
        }
    }

    /// Reads and processes requests until EOF, timeout, shutdown or an
    /// unrecoverable error.
    async fn process_messages(&mut self) -> Result<(), ConnectionError> {
        let cancel_token = self.cancel_token.clone();

        loop {
            let read = tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!(client_id = ?self.client_id, "Shutdown, closing connection");
                    return Ok(());
                }
                read = timeout(self.read_timeout, self.read_message()) => read,
            };

            let msg = match read {
                Ok(Ok(msg)) => msg,
                Ok(Err(ConnectionError::Eof)) => {
                    debug!(client_id = ?self.client_id, "Client sent EOF");
                    return Ok(());
                }
                Ok(Err(ConnectionError::ParseError(e))) => {
                    debug!(client_id = ?self.client_id, error = %e, "Malformed request");
                    self.send_message(AuthorityMessage::error_with_code(&e, "parse_error"))
                        .await?;
                    continue;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    debug!(client_id = ?self.client_id, "Connection timed out");
                    return Err(ConnectionError::Timeout);
                }
            };

            match self.handle_message(msg).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => return Ok(()),
                Err(e @ ConnectionError::Game(_)) => {
                    error!(client_id = ?self.client_id, error = %e, "Error handling message");
                    // Report and keep serving; the next request may succeed.
                    let _ = self
                        .send_message(AuthorityMessage::error(&e.to_string()))
                        .await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Handles a single request.
    async fn handle_message(&mut self, msg: ClientMessage) -> Result<Flow, ConnectionError> {
        match msg.message {
            MessageType::Connect { .. } => {
                self.send_message(AuthorityMessage::error("Already connected"))
                    .await?;
            }

            MessageType::Register { name } => {
                self.handle_register(name).await?;
            }

            MessageType::Unregister { token, name } => {
                self.game.unregister(token, name).await?;
                if self.bound.as_ref().is_some_and(|b| b.token == token) {
                    self.bound = None;
                }
                self.send_message(AuthorityMessage::Unregistered).await?;
            }

            MessageType::SubmitMove { cell, token } => {
                let reply = match self.game.submit_move(cell, token).await {
                    Ok(report) => AuthorityMessage::MoveAccepted { cell: report.cell },
                    Err(GameError::Move(err)) => AuthorityMessage::move_rejected(err),
                    Err(e) => return Err(e.into()),
                };
                self.send_message(reply).await?;
            }

            MessageType::Reset => {
                self.game.reset().await?;
                self.send_message(AuthorityMessage::ResetComplete).await?;
            }

            MessageType::CurrentOutcome => {
                let outcome = self.game.current_outcome().await?;
                self.send_message(AuthorityMessage::outcome(outcome.into()))
                    .await?;
            }

            MessageType::GameDone => {
                let token = self
                    .bound
                    .as_ref()
                    .map_or(PlayerToken::INVALID, |b| b.token);
                self.game.game_done(token).await?;
                self.send_message(AuthorityMessage::GameDoneAck).await?;
            }

            MessageType::Snapshot => {
                let snapshot = self.game.snapshot().await?;
                self.send_message(AuthorityMessage::snapshot(snapshot))
                    .await?;
            }

            MessageType::Ping { seq } => {
                self.send_message(AuthorityMessage::pong(seq)).await?;
            }

            MessageType::Disconnect => {
                debug!(client_id = ?self.client_id, "Client requested disconnect");
                return Ok(Flow::Close);
            }
        }

        Ok(Flow::Continue)
    }

    async fn handle_register(&mut self, name: String) -> Result<(), ConnectionError> {
        if let Some(binding) = &self.bound {
            let reply = AuthorityMessage::error_with_code(
                &format!("Already registered as {}", binding.name),
                "already_registered",
            );
            return self.send_message(reply).await;
        }

        match self.game.register(name.clone(), self.outbound.clone()).await {
            Ok(registration) => {
                self.bound = Some(Binding {
                    token: registration.token,
                    name,
                });
                self.send_message(AuthorityMessage::registered(
                    registration.token,
                    registration.seat,
                ))
                .await
            }
            Err(GameError::Session(_)) => {
                info!(client_id = ?self.client_id, name = %name, "Registration refused, session full");
                self.send_message(AuthorityMessage::session_full()).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Unregisters the seat this connection holds, if any.
    async fn release_seat(&mut self) {
        let Some(binding) = self.bound.take() else {
            return;
        };

        match self.game.unregister(binding.token, binding.name).await {
            Ok(true) => debug!(
                client_id = ?self.client_id,
                token = %binding.token.short(),
                "Released seat of closed connection"
            ),
            Ok(false) => {}
            Err(e) => warn!(
                client_id = ?self.client_id,
                error = %e,
                "Failed to release seat"
            ),
        }
    }

    /// Reads a single request line.
    async fn read_message(&mut self) -> Result<ClientMessage, ConnectionError> {
        let mut line = String::new();

        // One byte over the limit is enough to detect an oversized line.
        let mut limited = (&mut self.reader).take(MAX_MESSAGE_SIZE as u64 + 1);
        let bytes_read = limited
            .read_line(&mut line)
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;

        if bytes_read == 0 {
            return Err(ConnectionError::Eof);
        }

        if line.len() > MAX_MESSAGE_SIZE {
            return Err(ConnectionError::MessageTooLarge {
                size: line.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let msg: ClientMessage = serde_json::from_str(line.trim_end())
            .map_err(|e| ConnectionError::ParseError(e.to_string()))?;

        debug!(
            client_id = ?self.client_id,
            message_type = msg.message.kind(),
            "Received message"
        );

        Ok(msg)
    }

    /// Queues a message for the writer task.
    async fn send_message(&self, msg: AuthorityMessage) -> Result<(), ConnectionError> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| ConnectionError::WriterClosed)
    }
}

/// Whether the request loop keeps going.
enum Flow {
    Continue,
    Close,
}

/// Drains a connection's outbound queue onto the socket.
pub struct OutboundWriter {
    writer: BufWriter<OwnedWriteHalf>,
    queue: mpsc::Receiver<AuthorityMessage>,
    write_timeout: Duration,
    connection_number: u64,
}

impl OutboundWriter {
    /// Writes queued messages until every sender is gone or a write fails.
    ///
    /// Exiting drops the receiver, which is how the game actor learns the
    /// participant is unreachable.
    pub async fn run(mut self) {
        while let Some(msg) = self.queue.recv().await {
            if let Err(e) = self.write(&msg).await {
                debug!(
                    connection = self.connection_number,
                    kind = msg.kind(),
                    error = %e,
                    "Outbound write failed"
                );
                break;
            }
        }

        let _ = self.writer.shutdown().await;
    }

    async fn write(&mut self, msg: &AuthorityMessage) -> Result<(), ConnectionError> {
        let json =
            serde_json::to_string(msg).map_err(|e| ConnectionError::ParseError(e.to_string()))?;

        let writer = &mut self.writer;
        match timeout(self.write_timeout, async {
            writer.write_all(json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ConnectionError::Io(e.to_string())),
            Err(_) => Err(ConnectionError::WriteTimeout),
        }
    }
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Protocol version mismatch: client {client}, server {server}")]
    VersionMismatch {
        client: ProtocolVersion,
        server: ProtocolVersion,
    },

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Eof,

    #[error("Read timeout")]
    Timeout,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Outbound writer closed")]
    WriterClosed,

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::VersionMismatch {
            client: ProtocolVersion::new(2, 0),
            server: ProtocolVersion::new(1, 0),
        };
        assert!(err.to_string().contains("2.0"));
        assert!(err.to_string().contains("1.0"));
    }

    #[test]
    fn test_message_size_error() {
        let err = ConnectionError::MessageTooLarge {
            size: 70_000,
            max: MAX_MESSAGE_SIZE,
        };
        assert!(err.to_string().contains("70000"));
        assert!(err.to_string().contains("65536"));
    }

    #[test]
    fn test_settings_from_config() {
        let config = AuthorityConfig {
            read_timeout_secs: 7,
            queue_depth: 3,
            ..AuthorityConfig::default()
        };
        let settings = ConnectionSettings::from(&config);

        assert_eq!(settings.read_timeout, Duration::from_secs(7));
        assert_eq!(settings.queue_depth, 3);
    }
}
