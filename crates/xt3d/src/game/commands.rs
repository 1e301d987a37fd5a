//! Game actor commands and errors.
//!
//! This module defines the message types for communicating with the `GameActor`:
//! - `GameCommand`: Commands sent to the actor
//! - `GameError`: Errors surfaced to callers of the handle
//! - `Registration`: What a successful registration hands back

use thiserror::Error;
use tokio::sync::oneshot;

use xt3_core::{MoveError, MoveReport, Outcome, PlayerToken, Seat, SessionError};
use xt3_protocol::GameSnapshot;

use super::fanout::ParticipantSink;

/// Commands sent to the game actor.
///
/// Each request carries a oneshot channel for the reply. `Prune` is
/// fire-and-forget and only issued by the prune task.
#[derive(Debug)]
pub enum GameCommand {
    /// Claim a seat.
    ///
    /// # Errors
    /// - `GameError::Session(SessionFull)` if both seats are taken
    Register {
        /// Display name
        name: String,
        /// Outbound queue the participant's notifications go to
        sink: ParticipantSink,
        respond_to: oneshot::Sender<Result<Registration, GameError>>,
    },

    /// Release a seat. Replies true if a seat was actually freed.
    Unregister {
        token: PlayerToken,
        name: String,
        respond_to: oneshot::Sender<bool>,
    },

    /// Submit a move on behalf of `token`.
    ///
    /// # Errors
    /// - `GameError::Move` for every arbitration failure
    SubmitMove {
        cell: usize,
        token: PlayerToken,
        respond_to: oneshot::Sender<Result<MoveReport, GameError>>,
    },

    /// Clear the board and hand the move back to First.
    Reset { respond_to: oneshot::Sender<()> },

    /// Read the current outcome.
    CurrentOutcome { respond_to: oneshot::Sender<Outcome> },

    /// Acknowledge a finished game.
    GameDone {
        token: PlayerToken,
        respond_to: oneshot::Sender<()>,
    },

    /// Read a full session snapshot.
    Snapshot {
        respond_to: oneshot::Sender<GameSnapshot>,
    },

    /// Drop participants whose outbound queue has closed.
    Prune,
}

/// Seat granted by a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub token: PlayerToken,
    pub seat: Seat,
}

/// Errors returned by [`GameHandle`](super::GameHandle) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Move rejected: {0}")]
    Move(#[from] MoveError),

    #[error("Game actor channel closed")]
    ChannelClosed,
}

impl GameError {
    /// Returns the move error, if this is a rejected move.
    pub fn as_move_error(&self) -> Option<MoveError> {
        match self {
            Self::Move(err) => Some(*err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_error_display() {
        let err = GameError::from(MoveError::CellOccupied { cell: 4 });
        assert!(err.to_string().contains("4"));
        assert_eq!(err.as_move_error(), Some(MoveError::CellOccupied { cell: 4 }));

        let err = GameError::from(SessionError::SessionFull);
        assert!(err.as_move_error().is_none());
        assert!(!err.to_string().is_empty());
    }
}
