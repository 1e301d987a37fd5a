//! Read-only views of game state sent over the wire.

use serde::{Deserialize, Serialize};
use xt3_core::{Outcome, Seat, TurnArbiter, BOARD_CELLS};

/// Outcome as reported to participants: `none | win(mark) | draw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OutcomeView {
    /// No winner yet
    None,

    /// A seat completed a line
    Win {
        /// Mark symbol of the winner
        mark: char,
        /// Seat of the winner
        seat: Seat,
    },

    /// Board full, no line
    Draw,
}

impl OutcomeView {
    /// Human-readable result line, e.g. "Game Over! X is the winner."
    pub fn announcement(&self) -> String {
        match self {
            Self::None => "Game in progress.".to_string(),
            Self::Win { mark, .. } => format!("Game Over! {mark} is the winner."),
            Self::Draw => "Game Over! It's a draw!".to_string(),
        }
    }
}

impl From<Outcome> for OutcomeView {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::InProgress => Self::None,
            Outcome::Win(seat) => Self::Win {
                mark: seat.symbol(),
                seat,
            },
            Outcome::Draw => Self::Draw,
        }
    }
}

/// Full picture of the session, for late joiners and reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Board symbols in row-major order
    pub cells: [char; BOARD_CELLS],

    /// Registered names in seat order
    pub names: Vec<String>,

    /// Seat to move, `None` once the game is over
    pub whose_turn: Option<Seat>,

    /// Current outcome
    pub outcome: OutcomeView,
}

impl GameSnapshot {
    /// Builds a snapshot from the arbiter and roster names.
    pub fn capture(arbiter: &TurnArbiter, names: Vec<String>) -> Self {
        Self {
            cells: arbiter.board().symbols(),
            names,
            whose_turn: arbiter.whose_turn(),
            outcome: arbiter.outcome().into(),
        }
    }
}
