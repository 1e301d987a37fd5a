//! Plain-text rendering of the board and session header.

use xt3_core::BOARD_CELLS;

use crate::state::ClientState;

const ROW_SEPARATOR: &str = "---+---+---";

/// Renders the 3x3 grid. Empty cells show their index so the player
/// knows what to type.
pub fn render_board(cells: &[char; BOARD_CELLS]) -> String {
    let rows: Vec<String> = cells
        .chunks(3)
        .enumerate()
        .map(|(row, chunk)| {
            chunk
                .iter()
                .enumerate()
                .map(|(col, symbol)| {
                    if *symbol == ' ' {
                        format!(" {} ", row * 3 + col)
                    } else {
                        format!(" {symbol} ")
                    }
                })
                .collect::<Vec<_>>()
                .join("|")
        })
        .collect();

    rows.join(&format!("\n{ROW_SEPARATOR}\n"))
}

/// Renders the header line: who we are and who we play against.
pub fn render_header(state: &ClientState) -> String {
    let me = match state.mark() {
        Some(mark) => format!("{} ({mark})", state.name),
        None => state.name.clone(),
    };

    match state.opponent_name() {
        Some(opponent) => format!("{me} vs {opponent}"),
        None => format!("{me} - waiting for an opponent"),
    }
}

/// Renders header, board and status line as one block.
pub fn render_screen(state: &ClientState) -> String {
    let mut out = String::new();
    out.push_str(&render_header(state));
    out.push_str("\n\n");
    out.push_str(&render_board(&state.cells));
    out.push('\n');
    if let Some(status) = &state.status {
        out.push('\n');
        out.push_str(status);
        out.push('\n');
    }
    out
}
