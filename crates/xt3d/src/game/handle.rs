//! Client interface for interacting with the GameActor.
//!
//! The `GameHandle` is a cheap-to-clone front for the actor. Every
//! connection holds one; all of them feed the same command queue, which
//! is what serializes access to the game.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `GameError::ChannelClosed`

use tokio::sync::{mpsc, oneshot};

use xt3_core::{MoveReport, Outcome, PlayerToken};
use xt3_protocol::GameSnapshot;

use super::commands::{GameCommand, GameError, Registration};
use super::fanout::ParticipantSink;

/// Handle for interacting with the game actor.
///
/// ```no_run
/// use std::time::Duration;
/// use xt3d::game::{spawn_game, GameError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), GameError> {
///     let game = spawn_game(Duration::from_secs(5));
///     let (sink, _outbound) = tokio::sync::mpsc::channel(32);
///
///     let registration = game.register("Alice", sink).await?;
///     game.submit_move(4, registration.token).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct GameHandle {
    sender: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    /// Create a new game handle.
    pub fn new(sender: mpsc::Sender<GameCommand>) -> Self {
        Self { sender }
    }

    /// Sends a command and waits for its reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> GameCommand,
    ) -> Result<T, GameError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(build(tx))
            .await
            .map_err(|_| GameError::ChannelClosed)?;

        rx.await.map_err(|_| GameError::ChannelClosed)
    }

    /// Claim a seat for `name`.
    ///
    /// `sink` receives every notification for this participant, starting
    /// with the roster change, the current board and the controls hint.
    ///
    /// # Errors
    ///
    /// - `GameError::Session` if both seats are taken
    /// - `GameError::ChannelClosed` if the actor has shut down
    pub async fn register(
        &self,
        name: impl Into<String>,
        sink: ParticipantSink,
    ) -> Result<Registration, GameError> {
        let name = name.into();
        self.request(|respond_to| GameCommand::Register {
            name,
            sink,
            respond_to,
        })
        .await?
    }

    /// Release the seat held by `token`.
    ///
    /// Returns `Ok(false)` if the token was not registered.
    ///
    /// # Errors
    ///
    /// - `GameError::ChannelClosed` if the actor has shut down
    pub async fn unregister(
        &self,
        token: PlayerToken,
        name: impl Into<String>,
    ) -> Result<bool, GameError> {
        let name = name.into();
        self.request(|respond_to| GameCommand::Unregister {
            token,
            name,
            respond_to,
        })
        .await
    }

    /// Submit a move for the participant holding `token`.
    ///
    /// # Errors
    ///
    /// - `GameError::Move` if the arbiter rejects the move
    /// - `GameError::ChannelClosed` if the actor has shut down
    pub async fn submit_move(
        &self,
        cell: usize,
        token: PlayerToken,
    ) -> Result<MoveReport, GameError> {
        self.request(|respond_to| GameCommand::SubmitMove {
            cell,
            token,
            respond_to,
        })
        .await?
    }

    /// Clear the board, First to move.
    ///
    /// # Errors
    ///
    /// - `GameError::ChannelClosed` if the actor has shut down
    pub async fn reset(&self) -> Result<(), GameError> {
        self.request(|respond_to| GameCommand::Reset { respond_to })
            .await
    }

    /// Get the current outcome.
    ///
    /// # Errors
    ///
    /// - `GameError::ChannelClosed` if the actor has shut down
    pub async fn current_outcome(&self) -> Result<Outcome, GameError> {
        self.request(|respond_to| GameCommand::CurrentOutcome { respond_to })
            .await
    }

    /// Acknowledge the finished game for `token`.
    ///
    /// A no-op while the game is still in progress.
    ///
    /// # Errors
    ///
    /// - `GameError::ChannelClosed` if the actor has shut down
    pub async fn game_done(&self, token: PlayerToken) -> Result<(), GameError> {
        self.request(|respond_to| GameCommand::GameDone { token, respond_to })
            .await
    }

    /// Get a full snapshot of the session.
    ///
    /// # Errors
    ///
    /// - `GameError::ChannelClosed` if the actor has shut down
    pub async fn snapshot(&self) -> Result<GameSnapshot, GameError> {
        self.request(|respond_to| GameCommand::Snapshot { respond_to })
            .await
    }

    /// Ask the actor to drop participants whose queue has closed.
    ///
    /// # Errors
    ///
    /// - `GameError::ChannelClosed` if the actor has shut down
    pub async fn prune(&self) -> Result<(), GameError> {
        self.sender
            .send(GameCommand::Prune)
            .await
            .map_err(|_| GameError::ChannelClosed)
    }

    /// Returns true if the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_actor_maps_to_channel_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = GameHandle::new(tx);

        assert!(handle.is_closed());
        assert_eq!(handle.reset().await, Err(GameError::ChannelClosed));
        assert_eq!(
            handle.submit_move(0, PlayerToken::generate()).await.unwrap_err(),
            GameError::ChannelClosed
        );
    }

    #[tokio::test]
    async fn test_dropped_reply_maps_to_channel_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = GameHandle::new(tx);

        // An actor that swallows the command without replying.
        tokio::spawn(async move {
            let _ = rx.recv().await;
        });

        assert_eq!(
            handle.current_outcome().await,
            Err(GameError::ChannelClosed)
        );
    }
}
