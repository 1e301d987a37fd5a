//! Seat identification and mark symbols.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two seats at the board.
///
/// The seat decides both move order (First always opens) and the mark
/// symbol a participant plays with for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    /// Opens every game, plays `X`
    First,

    /// Moves second, plays `O`
    Second,
}

impl Seat {
    /// Both seats in assignment order.
    pub const ALL: [Seat; 2] = [Seat::First, Seat::Second];

    /// Returns the mark symbol for this seat.
    pub const fn symbol(self) -> char {
        match self {
            Self::First => 'X',
            Self::Second => 'O',
        }
    }

    /// Returns the opposing seat.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Looks up the seat playing a mark symbol.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'X' => Some(Self::First),
            'O' => Some(Self::Second),
            _ => None,
        }
    }

    /// Returns a lowercase label for logs and display.
    pub fn label(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_symbols_are_distinct() {
        assert_eq!(Seat::First.symbol(), 'X');
        assert_eq!(Seat::Second.symbol(), 'O');
        assert_ne!(Seat::First.symbol(), Seat::Second.symbol());
    }

    #[test]
    fn test_seat_other() {
        assert_eq!(Seat::First.other(), Seat::Second);
        assert_eq!(Seat::Second.other(), Seat::First);
    }

    #[test]
    fn test_seat_from_symbol() {
        assert_eq!(Seat::from_symbol('X'), Some(Seat::First));
        assert_eq!(Seat::from_symbol('O'), Some(Seat::Second));
        assert_eq!(Seat::from_symbol(' '), None);
    }

    #[test]
    fn test_seat_serialization() {
        let json = serde_json::to_string(&Seat::Second).unwrap();
        assert_eq!(json, "\"second\"");
    }
}
