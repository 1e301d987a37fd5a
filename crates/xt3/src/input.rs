//! Events, commands and console input handling.

use xt3_core::{MoveError, Seat, BOARD_CELLS};

use crate::state::ClientState;

// ============================================================================
// Event Types
// ============================================================================

/// Events delivered to the main loop by the authority client task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Handshake completed.
    Connected,

    /// A seat was granted under our name.
    Registered {
        seat: Seat,
        mark: char,
    },

    /// Registration refused, both seats are taken.
    SessionFull,

    /// Names of the registered participants, in seat order.
    Roster(Vec<String>),

    /// The board changed.
    Board([char; BOARD_CELLS]),

    /// Whether "New Game" should be enabled.
    ControlsHint(bool),

    /// The game ended; carries the result line to show.
    GameOver(String),

    /// Our move was refused.
    MoveRejected(MoveError),

    /// An error reported by the authority.
    Notice(String),

    /// Connection to the authority was lost.
    Disconnected,
}

// ============================================================================
// Client Commands
// ============================================================================

/// Commands sent from the main loop to the authority client task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Place our mark on a cell.
    Move(usize),

    /// Start a new game.
    NewGame,

    /// Give up the seat and disconnect.
    Leave,
}

// ============================================================================
// Action Types
// ============================================================================

/// What the main loop should do with a line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action required.
    None,

    /// Forward a command to the authority.
    Command(ClientCommand),

    /// Print the board again.
    Redraw,

    /// Print the command summary.
    Help,

    /// Leave the session and exit.
    Quit,

    /// Show a message to the player without contacting the authority.
    Notice(String),
}

pub const HELP: &str = "\
Commands:
  0-8      place your mark on a cell
  new      start a new game (when the game is over)
  board    show the board again
  help     show this help
  quit     leave the session";

// ============================================================================
// Input Handler
// ============================================================================

/// Maps one line of console input to an action.
///
/// Cell numbers are forwarded as-is; the authority decides whether the
/// move is legal. Only "new" is gated locally, by the controls hint.
pub fn parse_line(line: &str, state: &ClientState) -> Action {
    let line = line.trim();
    if line.is_empty() {
        return Action::None;
    }

    if let Ok(cell) = line.parse::<usize>() {
        return Action::Command(ClientCommand::Move(cell));
    }

    match line.to_ascii_lowercase().as_str() {
        "n" | "new" => {
            if state.new_game_enabled {
                Action::Command(ClientCommand::NewGame)
            } else {
                Action::Notice("New Game is available once the current game is over".into())
            }
        }
        "b" | "board" => Action::Redraw,
        "h" | "help" | "?" => Action::Help,
        "q" | "quit" | "exit" => Action::Quit,
        _ => Action::Notice(format!("Unknown command: {line} (type 'help')")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_controls(enabled: bool) -> ClientState {
        let mut state = ClientState::new("Alice");
        state.apply(&Event::ControlsHint(enabled));
        state
    }

    #[test]
    fn test_digits_become_moves() {
        let state = ClientState::new("Alice");
        assert_eq!(
            parse_line("4", &state),
            Action::Command(ClientCommand::Move(4))
        );
        assert_eq!(
            parse_line("  0 \n", &state),
            Action::Command(ClientCommand::Move(0))
        );
    }

    #[test]
    fn test_out_of_range_cell_is_still_forwarded() {
        let state = ClientState::new("Alice");
        assert_eq!(
            parse_line("12", &state),
            Action::Command(ClientCommand::Move(12))
        );
    }

    #[test]
    fn test_new_game_follows_controls_hint() {
        assert_eq!(
            parse_line("new", &state_with_controls(true)),
            Action::Command(ClientCommand::NewGame)
        );
        assert!(matches!(
            parse_line("NEW", &state_with_controls(false)),
            Action::Notice(_)
        ));
    }

    #[test]
    fn test_other_commands() {
        let state = ClientState::new("Alice");
        assert_eq!(parse_line("", &state), Action::None);
        assert_eq!(parse_line("q", &state), Action::Quit);
        assert_eq!(parse_line("board", &state), Action::Redraw);
        assert_eq!(parse_line("?", &state), Action::Help);
        assert!(matches!(parse_line("dance", &state), Action::Notice(msg) if msg.contains("dance")));
    }
}
