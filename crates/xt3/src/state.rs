//! Headless client state, updated only by the main loop.

use xt3_core::{Seat, BOARD_CELLS};

use crate::input::Event;

/// Everything the console shows about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    /// Our display name.
    pub name: String,

    /// Seat granted by the authority, if registered.
    pub seat: Option<Seat>,

    /// Registered names in seat order.
    pub roster: Vec<String>,

    /// Board symbols in row-major order.
    pub cells: [char; BOARD_CELLS],

    /// Whether "New Game" is currently allowed.
    pub new_game_enabled: bool,

    /// Connected to the authority.
    pub connected: bool,

    /// Last status line shown to the player.
    pub status: Option<String>,
}

impl ClientState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seat: None,
            roster: Vec::new(),
            cells: [' '; BOARD_CELLS],
            new_game_enabled: true,
            connected: false,
            status: None,
        }
    }

    /// Our mark, once seated.
    pub fn mark(&self) -> Option<char> {
        self.seat.map(Seat::symbol)
    }

    /// The other registered participant's name.
    ///
    /// Matches by name, so two players sharing a name never see an
    /// opponent.
    pub fn opponent_name(&self) -> Option<&str> {
        self.roster
            .iter()
            .map(String::as_str)
            .find(|name| *name != self.name)
    }

    /// Applies one event. Returns true if the board should be redrawn.
    pub fn apply(&mut self, event: &Event) -> bool {
        match event {
            Event::Connected => {
                self.connected = true;
                self.status = Some("Connected".into());
                false
            }
            Event::Registered { seat, mark } => {
                self.seat = Some(*seat);
                self.status = Some(format!(
                    "You are the {} player, your mark is {mark}",
                    seat.label()
                ));
                true
            }
            Event::SessionFull => {
                self.seat = None;
                self.status = Some("There are already two players".into());
                false
            }
            Event::Roster(names) => {
                self.roster = names.clone();
                true
            }
            Event::Board(cells) => {
                self.cells = *cells;
                if cells.iter().all(|c| *c == ' ') {
                    self.status = None;
                }
                true
            }
            Event::ControlsHint(enabled) => {
                self.new_game_enabled = *enabled;
                false
            }
            Event::GameOver(announcement) => {
                self.status = Some(announcement.clone());
                true
            }
            Event::MoveRejected(error) => {
                self.status = Some(format!("Move rejected: {error}"));
                false
            }
            Event::Notice(message) => {
                self.status = Some(message.clone());
                false
            }
            Event::Disconnected => {
                self.connected = false;
                self.seat = None;
                self.roster.clear();
                self.status = Some("Disconnected from authority, reconnecting...".into());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xt3_core::MoveError;

    #[test]
    fn test_new_state() {
        let state = ClientState::new("Alice");
        assert_eq!(state.seat, None);
        assert_eq!(state.mark(), None);
        assert!(state.new_game_enabled);
        assert!(!state.connected);
        assert_eq!(state.cells, [' '; BOARD_CELLS]);
    }

    #[test]
    fn test_opponent_is_the_other_roster_name() {
        let mut state = ClientState::new("Bob");
        assert_eq!(state.opponent_name(), None);

        state.apply(&Event::Roster(vec!["Bob".into()]));
        assert_eq!(state.opponent_name(), None);

        state.apply(&Event::Roster(vec!["Alice".into(), "Bob".into()]));
        assert_eq!(state.opponent_name(), Some("Alice"));
    }

    #[test]
    fn test_registration_sets_seat_and_mark() {
        let mut state = ClientState::new("Bob");
        assert!(state.apply(&Event::Registered {
            seat: Seat::Second,
            mark: 'O'
        }));
        assert_eq!(state.seat, Some(Seat::Second));
        assert_eq!(state.mark(), Some('O'));
    }

    #[test]
    fn test_board_updates_request_redraw() {
        let mut state = ClientState::new("Alice");
        let mut cells = [' '; BOARD_CELLS];
        cells[4] = 'X';

        assert!(state.apply(&Event::Board(cells)));
        assert_eq!(state.cells, cells);
    }

    #[test]
    fn test_cleared_board_drops_game_over_status() {
        let mut state = ClientState::new("Alice");
        state.apply(&Event::GameOver("Game Over! It's a draw!".into()));
        assert_eq!(state.status.as_deref(), Some("Game Over! It's a draw!"));

        state.apply(&Event::Board([' '; BOARD_CELLS]));
        assert_eq!(state.status, None);
    }

    #[test]
    fn test_controls_hint() {
        let mut state = ClientState::new("Alice");
        assert!(!state.apply(&Event::ControlsHint(false)));
        assert!(!state.new_game_enabled);
        state.apply(&Event::ControlsHint(true));
        assert!(state.new_game_enabled);
    }

    #[test]
    fn test_move_rejection_is_shown() {
        let mut state = ClientState::new("Alice");
        state.apply(&Event::MoveRejected(MoveError::CellOccupied { cell: 4 }));
        assert_eq!(
            state.status.as_deref(),
            Some("Move rejected: cell 4 is already occupied")
        );
    }

    #[test]
    fn test_disconnect_forgets_seat() {
        let mut state = ClientState::new("Alice");
        state.apply(&Event::Connected);
        state.apply(&Event::Registered {
            seat: Seat::First,
            mark: 'X',
        });
        state.apply(&Event::Roster(vec!["Alice".into(), "Bob".into()]));

        state.apply(&Event::Disconnected);

        assert!(!state.connected);
        assert_eq!(state.seat, None);
        assert!(state.roster.is_empty());
    }
}
