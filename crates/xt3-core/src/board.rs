//! The 3x3 board, its winning lines and outcome evaluation.
//!
//! Cells are addressed 0-8 in row-major order:
//!
//! ```text
//!  0 | 1 | 2
//! ---+---+---
//!  3 | 4 | 5
//! ---+---+---
//!  6 | 7 | 8
//! ```

use crate::{Outcome, PlaceError, Seat};
use serde::{Deserialize, Serialize};

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// Every line that wins the game: 3 rows, 3 columns, 2 diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Symbol rendered for an empty cell.
pub const EMPTY_SYMBOL: char = ' ';

/// A single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    Marked(Seat),
}

impl Cell {
    /// Returns the character shown for this cell.
    pub fn symbol(self) -> char {
        match self {
            Self::Empty => EMPTY_SYMBOL,
            Self::Marked(seat) => seat.symbol(),
        }
    }

    /// Returns the seat holding this cell, if any.
    pub fn seat(self) -> Option<Seat> {
        match self {
            Self::Empty => None,
            Self::Marked(seat) => Some(seat),
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// The canonical game board.
///
/// A marked cell is only ever cleared by [`Board::reset`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell at `index`, or `None` outside 0-8.
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Returns all cells in row-major order.
    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.cells
    }

    /// Marks an empty cell for `seat`.
    ///
    /// Fails without touching the board if the cell is already marked
    /// (by either seat) or the index is out of range.
    pub fn place(&mut self, index: usize, seat: Seat) -> Result<(), PlaceError> {
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(PlaceError::OutOfRange { cell: index })?;

        if !cell.is_empty() {
            return Err(PlaceError::Occupied { cell: index });
        }

        *cell = Cell::Marked(seat);
        Ok(())
    }

    /// Clears every cell.
    pub fn reset(&mut self) {
        self.cells = [Cell::Empty; BOARD_CELLS];
    }

    /// Evaluates the board against the winning lines.
    pub fn evaluate(&self) -> Outcome {
        for line in WIN_LINES {
            if let Some(seat) = self.line_owner(line) {
                return Outcome::Win(seat);
            }
        }

        if self.is_full() {
            Outcome::Draw
        } else {
            Outcome::InProgress
        }
    }

    /// Returns the seat holding all three cells of `line`, if any.
    fn line_owner(&self, line: [usize; 3]) -> Option<Seat> {
        let [a, b, c] = line;
        let first = self.get(a)?.seat()?;
        let owned = |i| self.get(i).and_then(Cell::seat) == Some(first);
        (owned(b) && owned(c)).then_some(first)
    }

    /// Counts the marks placed by `seat`.
    pub fn marks_by(&self, seat: Seat) -> usize {
        self.cells
            .iter()
            .filter(|c| c.seat() == Some(seat))
            .count()
    }

    /// Derives whose turn it is from the mark counts.
    ///
    /// First opens, so First is to move whenever both seats have placed
    /// the same number of marks.
    pub fn next_to_move(&self) -> Seat {
        if self.marks_by(Seat::First) > self.marks_by(Seat::Second) {
            Seat::Second
        } else {
            Seat::First
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// Renders the board as nine symbols (space, `X` or `O`).
    pub fn symbols(&self) -> [char; BOARD_CELLS] {
        self.cells.map(Cell::symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from(marks: &[(usize, Seat)]) -> Board {
        let mut board = Board::new();
        for &(index, seat) in marks {
            board.place(index, seat).unwrap();
        }
        board
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        assert!(board.is_empty());
        assert_eq!(board.evaluate(), Outcome::InProgress);
        assert_eq!(board.symbols(), [' '; BOARD_CELLS]);
    }

    #[test]
    fn test_place_marks_cell() {
        let mut board = Board::new();
        board.place(4, Seat::First).unwrap();
        assert_eq!(board.get(4), Some(Cell::Marked(Seat::First)));
        assert_eq!(board.symbols()[4], 'X');
    }

    #[test]
    fn test_place_on_occupied_cell_fails_without_change() {
        let mut board = Board::new();
        board.place(4, Seat::First).unwrap();
        let before = board.clone();

        assert_eq!(
            board.place(4, Seat::Second),
            Err(PlaceError::Occupied { cell: 4 })
        );
        assert_eq!(
            board.place(4, Seat::First),
            Err(PlaceError::Occupied { cell: 4 })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_place_out_of_range() {
        let mut board = Board::new();
        assert_eq!(
            board.place(9, Seat::First),
            Err(PlaceError::OutOfRange { cell: 9 })
        );
        assert!(board.is_empty());
        assert_eq!(board.get(9), None);
    }

    #[test]
    fn test_every_line_wins() {
        for line in WIN_LINES {
            for seat in Seat::ALL {
                let marks: Vec<_> = line.iter().map(|&i| (i, seat)).collect();
                let board = board_from(&marks);
                assert_eq!(board.evaluate(), Outcome::Win(seat), "line {line:?}");
            }
        }
    }

    #[test]
    fn test_mixed_line_does_not_win() {
        let board = board_from(&[(0, Seat::First), (1, Seat::Second), (2, Seat::First)]);
        assert_eq!(board.evaluate(), Outcome::InProgress);
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        // X O X
        // X O O
        // O X X
        let board = board_from(&[
            (0, Seat::First),
            (1, Seat::Second),
            (2, Seat::First),
            (3, Seat::First),
            (4, Seat::Second),
            (5, Seat::Second),
            (6, Seat::Second),
            (7, Seat::First),
            (8, Seat::First),
        ]);
        assert!(board.is_full());
        assert_eq!(board.evaluate(), Outcome::Draw);
    }

    #[test]
    fn test_win_on_full_board_beats_draw() {
        // X X X
        // O O X
        // X O O
        let board = board_from(&[
            (0, Seat::First),
            (1, Seat::First),
            (2, Seat::First),
            (3, Seat::Second),
            (4, Seat::Second),
            (5, Seat::First),
            (6, Seat::First),
            (7, Seat::Second),
            (8, Seat::Second),
        ]);
        assert_eq!(board.evaluate(), Outcome::Win(Seat::First));
    }

    #[test]
    fn test_reset_clears_all_cells() {
        let mut board = board_from(&[(0, Seat::First), (4, Seat::Second), (8, Seat::First)]);
        board.reset();
        assert!(board.is_empty());
        assert_eq!(board.next_to_move(), Seat::First);
    }

    #[test]
    fn test_next_to_move_alternates() {
        let mut board = Board::new();
        assert_eq!(board.next_to_move(), Seat::First);
        board.place(0, Seat::First).unwrap();
        assert_eq!(board.next_to_move(), Seat::Second);
        board.place(1, Seat::Second).unwrap();
        assert_eq!(board.next_to_move(), Seat::First);
    }
}
