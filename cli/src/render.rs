// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII board rendering for the CLI.

use rengo_core::{column_letter, Board, Color, Coord, BOARD_SIZE};

/// Render the board as text, top row first, with the last move highlighted
pub fn render_board(board: &Board, last_move: Option<Coord>) -> String {
    let size = BOARD_SIZE as u8;
    let mut output = String::new();

    let labels = column_labels(size);
    output.push_str(&labels);

    for row in (0..size).rev() {
        output.push_str(&format!("{:2} ", row + 1));

        for col in 0..size {
            let coord = Coord::new(row, col);
            let symbol = match (board.get(coord), Some(coord) == last_move) {
                (Some(Color::Black), false) => "●",
                (Some(Color::White), false) => "○",
                (Some(Color::Black), true) => "◆",
                (Some(Color::White), true) => "◇",
                (None, _) if is_star_point(coord) => "+",
                (None, _) => "·",
            };
            output.push_str(&format!(" {}", symbol));
        }

        output.push_str(&format!(" {}", row + 1));
        output.push('\n');
    }

    output.push_str(&labels);
    output
}

fn column_labels(size: u8) -> String {
    let mut labels = String::from("   ");
    for col in 0..size {
        labels.push_str(&format!(" {}", column_letter(col)));
    }
    labels.push('\n');
    labels
}

/// Star points of a 19x19 board
fn is_star_point(coord: Coord) -> bool {
    matches!(coord.row, 3 | 9 | 15) && matches!(coord.col, 3 | 9 | 15)
}
