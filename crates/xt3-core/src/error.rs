//! Domain-specific error types following panic-free policy.

use crate::Seat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from placing a mark on the board.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    /// The cell already holds a mark
    #[error("cell {cell} is already occupied")]
    Occupied { cell: usize },

    /// The index is outside the 3x3 grid
    #[error("cell {cell} is outside the board (0-8)")]
    OutOfRange { cell: usize },
}

/// Reasons a submitted move is rejected.
///
/// These are reported to the requester only; a rejected move never
/// changes the board or the turn and is never broadcast.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveError {
    /// The requester's seat is not the one to move
    #[error("not your turn (waiting for {expected})")]
    NotYourTurn { expected: Seat },

    /// The target cell already holds a mark
    #[error("cell {cell} is already occupied")]
    CellOccupied { cell: usize },

    /// The target cell does not exist
    #[error("cell {cell} is outside the board (0-8)")]
    InvalidCell { cell: usize },

    /// The game has a winner or is drawn; only a reset resumes play
    #[error("game is already over")]
    GameAlreadyOver,

    /// The token is not registered in this session
    #[error("unknown player token")]
    UnknownToken,
}

impl From<PlaceError> for MoveError {
    fn from(err: PlaceError) -> Self {
        match err {
            PlaceError::Occupied { cell } => Self::CellOccupied { cell },
            PlaceError::OutOfRange { cell } => Self::InvalidCell { cell },
        }
    }
}

/// Errors from session admission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Both seats are taken
    #[error("there are already two players, no seat is available")]
    SessionFull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_error_maps_to_move_error() {
        assert_eq!(
            MoveError::from(PlaceError::Occupied { cell: 4 }),
            MoveError::CellOccupied { cell: 4 }
        );
        assert_eq!(
            MoveError::from(PlaceError::OutOfRange { cell: 9 }),
            MoveError::InvalidCell { cell: 9 }
        );
    }

    #[test]
    fn test_move_error_display() {
        let err = MoveError::NotYourTurn {
            expected: Seat::First,
        };
        assert_eq!(err.to_string(), "not your turn (waiting for first (X))");
        assert_eq!(MoveError::GameAlreadyOver.to_string(), "game is already over");
    }

    #[test]
    fn test_move_error_wire_format() {
        let json = serde_json::to_string(&MoveError::CellOccupied { cell: 4 }).unwrap();
        assert_eq!(json, r#"{"kind":"cell_occupied","cell":4}"#);

        let parsed: MoveError = serde_json::from_str(r#"{"kind":"unknown_token"}"#).unwrap();
        assert_eq!(parsed, MoveError::UnknownToken);
    }
}
