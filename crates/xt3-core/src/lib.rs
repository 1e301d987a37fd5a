//! XT3 Core - Shared domain types for two-player tic-tac-toe
//!
//! This crate provides the game model shared between the authority
//! (xt3d) and the participant client (xt3):
//! - `board` - the 9-cell grid, win lines and outcome evaluation
//! - `arbiter` - turn arbitration on top of the board
//! - `roster` - the two-seat participant registry
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod arbiter;
pub mod board;
pub mod error;
pub mod outcome;
pub mod roster;
pub mod seat;
pub mod token;

// Re-exports for convenience
pub use arbiter::{ArbiterState, MoveReport, TurnArbiter};
pub use board::{Board, Cell, BOARD_CELLS, WIN_LINES};
pub use error::{MoveError, PlaceError, SessionError};
pub use outcome::Outcome;
pub use roster::{Participant, Roster, MAX_PARTICIPANTS};
pub use seat::Seat;
pub use token::PlayerToken;
