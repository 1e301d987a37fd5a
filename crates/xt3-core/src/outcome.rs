//! Game outcome.

use crate::Seat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of evaluating a board.
///
/// Always recomputed from board contents, never stored as independent
/// truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "result", content = "seat", rename_all = "snake_case")]
pub enum Outcome {
    /// Moves are still possible and nobody has three in a row
    #[default]
    InProgress,

    /// The seat completed one of the eight lines
    Win(Seat),

    /// Every cell is filled and no line is complete
    Draw,
}

impl Outcome {
    /// Returns true for `Win` and `Draw`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Returns the winning seat, if any.
    pub fn winner(&self) -> Option<Seat> {
        match self {
            Self::Win(seat) => Some(*seat),
            Self::InProgress | Self::Draw => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in progress"),
            Self::Win(seat) => write!(f, "{} wins", seat.symbol()),
            Self::Draw => write!(f, "draw"),
        }
    }
}
