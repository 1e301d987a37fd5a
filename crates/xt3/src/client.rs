//! Authority connection client.
//!
//! This module provides the `AuthorityClient` which handles:
//! - Connection to the authority over TCP
//! - Automatic reconnection with exponential backoff
//! - Registration under the player's name (again after every reconnect)
//! - Parsing authority messages into events for the main loop
//! - Answering `game_finished` with `current_outcome` and `game_done`
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ClientError, Result};
use crate::input::{ClientCommand, Event};
use xt3_core::PlayerToken;
use xt3_protocol::{AuthorityMessage, ClientMessage, OutcomeView, ProtocolVersion};

/// Default authority address.
pub const DEFAULT_SERVER: &str = "127.0.0.1:10001";

/// Environment variable overriding the authority address.
pub const SERVER_ENV: &str = "XT3_SERVER";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the authority client.
///
/// # Example
///
/// ```rust
/// use xt3_client::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig {
///     retry_initial_delay: Duration::from_millis(500),
///     ..ClientConfig::new("192.168.1.20:10001", "Alice")
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Authority address, `host:port`.
    pub server: String,

    /// Display name to register under.
    pub name: String,

    /// Initial delay before first retry after connection failure.
    pub retry_initial_delay: Duration,

    /// Maximum delay between retry attempts.
    pub retry_max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry).
    pub retry_multiplier: f64,

    /// How often to ping an otherwise quiet connection, so the authority's
    /// idle timeout does not drop a player who is thinking.
    pub keepalive_interval: Duration,
}

impl ClientConfig {
    pub fn new(server: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            name: name.into(),
            retry_initial_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            retry_multiplier: 2.0,
            keepalive_interval: Duration::from_secs(60),
        }
    }

    /// Next backoff delay after `delay`, capped at `retry_max_delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        let next_delay_ms = (delay.as_millis() as f64 * self.retry_multiplier) as u64;
        Duration::from_millis(next_delay_ms).min(self.retry_max_delay)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER, "Player")
    }
}

// ============================================================================
// Authority Client
// ============================================================================

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closed {
    /// We left on purpose (Leave, shutdown, main loop gone).
    Left,
    /// The authority went away; reconnect.
    Lost,
}

/// Client for one participant's connection to the authority.
///
/// # Connection Lifecycle
///
/// 1. Connect over TCP, retrying with exponential backoff
/// 2. Send `connect` and wait for `connected`
/// 3. Send `register` with the player's name
/// 4. Forward pushes to the main loop and commands to the authority
/// 5. On disconnect, notify the main loop and start over from 1
///
/// `SessionFull` and a protocol mismatch end the client for good.
pub struct AuthorityClient {
    /// Configuration for connection behavior.
    config: ClientConfig,

    /// Channel to send events to the main loop.
    event_tx: mpsc::UnboundedSender<Event>,

    /// Channel to receive commands from the main loop.
    command_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ClientCommand>>,

    /// Cancellation token for graceful shutdown.
    cancel_token: CancellationToken,
}

impl AuthorityClient {
    #[must_use]
    pub fn new(
        config: ClientConfig,
        event_tx: mpsc::UnboundedSender<Event>,
        command_rx: mpsc::UnboundedReceiver<ClientCommand>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            event_tx,
            command_rx: tokio::sync::Mutex::new(command_rx),
            cancel_token,
        }
    }

    /// Keeps the player connected until they leave, the client is
    /// cancelled, or a fatal error occurs.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Left the session or cancelled
    /// * `Err(ClientError)` - Session full or incompatible authority
    pub async fn run(&self) -> Result<()> {
        info!(
            server = %self.config.server,
            name = %self.config.name,
            "Authority client starting"
        );

        loop {
            if self.cancel_token.is_cancelled() {
                info!("Authority client shutting down (cancelled)");
                return Ok(());
            }

            match self.connect_with_retry().await {
                Ok(stream) => {
                    info!(server = %self.config.server, "Connected to authority");

                    match self.handle_connection(stream).await {
                        Ok(Closed::Left) => {
                            info!("Left the session");
                            return Ok(());
                        }
                        Ok(Closed::Lost) => {}
                        Err(e) if e.is_fatal() => {
                            error!(error = %e, "Giving up on authority");
                            return Err(e);
                        }
                        Err(e) => {
                            warn!(error = %e, "Connection ended with error");
                        }
                    }

                    if self.cancel_token.is_cancelled() {
                        return Ok(());
                    }
                    let _ = self.event_tx.send(Event::Disconnected);
                }
                Err(e) => {
                    // Only log if not cancelled - connect_with_retry returns early on cancel
                    if !self.cancel_token.is_cancelled() {
                        error!(error = %e, "Failed to connect to authority");
                    }
                }
            }
        }
    }

    /// Attempts to connect with exponential backoff until successful or
    /// cancelled.
    async fn connect_with_retry(&self) -> Result<TcpStream> {
        let mut delay = self.config.retry_initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);

            debug!(attempt, server = %self.config.server, "Attempting to connect to authority");

            match TcpStream::connect(&self.config.server).await {
                Ok(stream) => {
                    debug!(attempt, "Connection successful");
                    return Ok(stream);
                }
                Err(e) if attempt == 1 => {
                    warn!(
                        server = %self.config.server,
                        error = %e,
                        "Authority not reachable, will retry"
                    );
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Connection attempt failed");
                }
            }

            tokio::select! {
                _ = sleep(delay) => {
                    delay = self.config.next_delay(delay);
                }
                _ = self.cancel_token.cancelled() => {
                    info!("Connection retry cancelled");
                    return Err(ClientError::Connection("cancelled".to_string()));
                }
            }
        }
    }

    /// Performs the handshake, registers, and runs the message loop.
    async fn handle_connection(&self, stream: TcpStream) -> Result<Closed> {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        self.send_message(&mut writer, &ClientMessage::connect(None))
            .await?;

        let line = lines.next_line().await?.ok_or_else(|| {
            ClientError::Connection("authority closed the connection during handshake".into())
        })?;

        match serde_json::from_str::<AuthorityMessage>(line.trim())? {
            AuthorityMessage::Connected {
                protocol_version,
                client_id,
            } => {
                if !ProtocolVersion::CURRENT.is_compatible_with(&protocol_version) {
                    return Err(ClientError::VersionMismatch {
                        client_version: ProtocolVersion::CURRENT.to_string(),
                        authority_version: protocol_version.to_string(),
                    });
                }
                info!(client_id, protocol_version = %protocol_version, "Handshake complete");
            }
            AuthorityMessage::Rejected {
                reason,
                protocol_version,
            } => {
                if !ProtocolVersion::CURRENT.is_compatible_with(&protocol_version) {
                    return Err(ClientError::VersionMismatch {
                        client_version: ProtocolVersion::CURRENT.to_string(),
                        authority_version: protocol_version.to_string(),
                    });
                }
                return Err(ClientError::Rejected(reason));
            }
            other => {
                return Err(ClientError::ProtocolError(format!(
                    "Unexpected response to connect: {other:?}"
                )));
            }
        }

        let _ = self.event_tx.send(Event::Connected);

        self.send_message(&mut writer, &ClientMessage::register(&self.config.name))
            .await?;

        self.message_loop(&mut lines, &mut writer).await
    }

    /// Serializes `message` as one JSON line.
    async fn send_message<W: AsyncWriteExt + Unpin>(
        &self,
        writer: &mut W,
        message: &ClientMessage,
    ) -> Result<()> {
        let json = serde_json::to_string(message)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        debug!(message_type = message.message.kind(), "Sent message to authority");
        Ok(())
    }

    /// Handles authority messages, player commands and keepalive pings
    /// until the connection ends.
    async fn message_loop<R, W>(&self, lines: &mut Lines<R>, writer: &mut W) -> Result<Closed>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWriteExt + Unpin,
    {
        let mut command_rx = self.command_rx.lock().await;
        let mut token: Option<PlayerToken> = None;

        let keepalive_period = self.config.keepalive_interval;
        let mut keepalive = interval_at(Instant::now() + keepalive_period, keepalive_period);
        let mut ping_seq = 0u64;

        loop {
            tokio::select! {
                read = lines.next_line() => {
                    let line = match read? {
                        Some(line) => line,
                        None => {
                            info!("Authority closed connection");
                            return Ok(Closed::Lost);
                        }
                    };

                    match self.handle_message(line.trim(), &mut token) {
                        Ok(Some(reply)) => self.send_message(writer, &reply).await?,
                        Ok(None) => {}
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            // Don't disconnect on a single bad line
                            warn!(error = %e, line = %line.trim(), "Failed to handle message");
                        }
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(command) => {
                            if let Some(closed) = self.handle_command(command, token, writer).await? {
                                return Ok(closed);
                            }
                        }
                        None => {
                            debug!("Command channel closed");
                            return Ok(Closed::Left);
                        }
                    }
                }

                _ = keepalive.tick() => {
                    ping_seq = ping_seq.wrapping_add(1);
                    self.send_message(writer, &ClientMessage::ping(ping_seq)).await?;
                }

                _ = self.cancel_token.cancelled() => {
                    debug!("Message loop cancelled");
                    return Ok(Closed::Left);
                }
            }
        }
    }

    /// Sends one player command to the authority.
    ///
    /// Returns `Some` if the command ends the connection.
    async fn handle_command<W: AsyncWriteExt + Unpin>(
        &self,
        command: ClientCommand,
        token: Option<PlayerToken>,
        writer: &mut W,
    ) -> Result<Option<Closed>> {
        match command {
            ClientCommand::Move(cell) => match token {
                Some(token) => {
                    self.send_message(writer, &ClientMessage::submit_move(cell, token))
                        .await?;
                }
                None => {
                    let _ = self
                        .event_tx
                        .send(Event::Notice("Not seated yet, wait for registration".into()));
                }
            },
            ClientCommand::NewGame => {
                self.send_message(writer, &ClientMessage::reset()).await?;
            }
            ClientCommand::Leave => {
                if let Some(token) = token {
                    self.send_message(
                        writer,
                        &ClientMessage::unregister(token, &self.config.name),
                    )
                    .await?;
                }
                self.send_message(writer, &ClientMessage::disconnect())
                    .await?;
                return Ok(Some(Closed::Left));
            }
        }
        Ok(None)
    }

    /// Handles a single message from the authority.
    ///
    /// Forwards what the player needs to see to the main loop and returns
    /// the follow-up request to send, if any.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(msg))` - Send `msg` to the authority
    /// * `Ok(None)` - Nothing to send
    /// * `Err(ClientError::SessionFull)` - Registration refused
    /// * `Err(ClientError::ParseError)` - Not a valid authority message
    fn handle_message(
        &self,
        line: &str,
        token: &mut Option<PlayerToken>,
    ) -> Result<Option<ClientMessage>> {
        let message: AuthorityMessage = serde_json::from_str(line)?;

        match message {
            AuthorityMessage::Registered {
                token: granted,
                seat,
                mark,
            } => {
                info!(token = %granted.short(), seat = %seat, "Registered");
                *token = Some(granted);
                let _ = self.event_tx.send(Event::Registered { seat, mark });
            }
            AuthorityMessage::SessionFull { .. } => {
                warn!(name = %self.config.name, "Session is full");
                let _ = self.event_tx.send(Event::SessionFull);
                return Err(ClientError::SessionFull);
            }
            AuthorityMessage::Unregistered => {
                *token = None;
            }
            AuthorityMessage::RosterChanged { names } => {
                debug!(count = names.len(), "Roster changed");
                let _ = self.event_tx.send(Event::Roster(names));
            }
            AuthorityMessage::BoardChanged { cells } => {
                let _ = self.event_tx.send(Event::Board(cells));
            }
            AuthorityMessage::ControlsHint { enabled } => {
                let _ = self.event_tx.send(Event::ControlsHint(enabled));
            }
            AuthorityMessage::GameFinished => {
                debug!("Game finished, querying outcome");
                return Ok(Some(ClientMessage::current_outcome()));
            }
            AuthorityMessage::Outcome { outcome } => {
                if outcome == OutcomeView::None {
                    // A reset landed between game_finished and our query.
                    debug!("Outcome no longer terminal");
                    return Ok(None);
                }
                let _ = self.event_tx.send(Event::GameOver(outcome.announcement()));
                return Ok(Some(ClientMessage::game_done()));
            }
            AuthorityMessage::MoveRejected { error } => {
                debug!(error = %error, "Move rejected");
                let _ = self.event_tx.send(Event::MoveRejected(error));
            }
            AuthorityMessage::Snapshot { snapshot } => {
                let _ = self.event_tx.send(Event::Roster(snapshot.names));
                let _ = self.event_tx.send(Event::Board(snapshot.cells));
            }
            AuthorityMessage::Error { message, code } => {
                warn!(
                    error_message = %message,
                    error_code = ?code,
                    "Received error from authority"
                );
                let _ = self.event_tx.send(Event::Notice(message));
            }
            AuthorityMessage::MoveAccepted { cell } => {
                debug!(cell, "Move accepted");
            }
            AuthorityMessage::ResetComplete | AuthorityMessage::GameDoneAck => {
                debug!(kind = message.kind(), "Acknowledged");
            }
            AuthorityMessage::Pong { seq } => {
                debug!(seq, "Received pong");
            }
            AuthorityMessage::Connected { .. } | AuthorityMessage::Rejected { .. } => {
                warn!("Received unexpected handshake message after connection");
            }
        }

        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================
