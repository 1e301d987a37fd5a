//! Turn arbitration.
//!
//! The arbiter is the only mutator of the board. Its state machine has
//! two states, both derived from board contents rather than stored:
//!
//! ```text
//!             accepted move (InProgress)
//!            ┌──────────────────────────┐
//!            ▼                          │
//!   ┌──────────────────┐        ┌───────┴────────┐
//!   │ AwaitingMove(s)  │───────▶│ AwaitingMove(s')│
//!   └────────┬─────────┘        └────────────────┘
//!            │ accepted move (Win / Draw)
//!            ▼
//!   ┌──────────────────┐   reset()   ┌────────────────────┐
//!   │ Terminal(outcome)│────────────▶│ AwaitingMove(First)│
//!   └──────────────────┘             └────────────────────┘
//! ```

use crate::{Board, MoveError, Outcome, Seat};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Current arbitration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArbiterState {
    /// Waiting for the given seat to move
    AwaitingMove { seat: Seat },

    /// The game is over; only a reset leaves this state
    Terminal { outcome: Outcome },
}

/// What an accepted move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    /// The cell that was marked
    pub cell: usize,

    /// The seat that moved
    pub seat: Seat,

    /// Outcome after the move
    pub outcome: Outcome,

    /// True if this was the first mark on an empty board
    pub opened_game: bool,
}

/// Validates and applies moves against the board.
#[derive(Debug, Clone, Default)]
pub struct TurnArbiter {
    board: Board,
}

impl TurnArbiter {
    /// Creates an arbiter with an empty board, First to move.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the current state, derived from the board.
    pub fn state(&self) -> ArbiterState {
        match self.board.evaluate() {
            Outcome::InProgress => ArbiterState::AwaitingMove {
                seat: self.board.next_to_move(),
            },
            outcome => ArbiterState::Terminal { outcome },
        }
    }

    /// Returns the current outcome.
    pub fn outcome(&self) -> Outcome {
        self.board.evaluate()
    }

    /// Returns whose turn it is, or `None` once the game is over.
    pub fn whose_turn(&self) -> Option<Seat> {
        match self.state() {
            ArbiterState::AwaitingMove { seat } => Some(seat),
            ArbiterState::Terminal { .. } => None,
        }
    }

    /// Submits a move for `requester`.
    ///
    /// # Errors
    ///
    /// - `MoveError::GameAlreadyOver` if the game is terminal
    /// - `MoveError::NotYourTurn` if `requester` is not the seat to move
    /// - `MoveError::CellOccupied` / `MoveError::InvalidCell` if the board
    ///   refuses the mark
    ///
    /// A rejected move leaves the board untouched.
    pub fn submit_move(&mut self, cell: usize, requester: Seat) -> Result<MoveReport, MoveError> {
        let expected = match self.state() {
            ArbiterState::Terminal { .. } => return Err(MoveError::GameAlreadyOver),
            ArbiterState::AwaitingMove { seat } => seat,
        };

        if requester != expected {
            return Err(MoveError::NotYourTurn { expected });
        }

        let opened_game = self.board.is_empty();
        self.board.place(cell, requester)?;
        let outcome = self.board.evaluate();

        debug!(cell, seat = requester.label(), outcome = %outcome, "Move applied");

        Ok(MoveReport {
            cell,
            seat: requester,
            outcome,
            opened_game,
        })
    }

    /// Clears the board and hands the move back to First, from any state.
    pub fn reset(&mut self) {
        self.board.reset();
    }
}
