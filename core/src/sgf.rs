// SPDX-License-Identifier: MIT OR Apache-2.0

//! SGF (Smart Game Format) generation

use crate::{Coord, Session, BOARD_SIZE};

/// Generate an SGF string for a session.
///
/// Setup stones go into the root node as `AB`, each move is a node carrying the
/// player's name as a comment, and the final node marks the last move (`CR`)
/// and any ko point (`SQ`).
pub fn write_game(session: &Session) -> String {
    let record = &session.record;
    let mut sgf = String::new();

    // Root node with game info
    sgf.push_str("(;");
    sgf.push_str(&format!("FF[4]GM[1]SZ[{}]CA[UTF-8]AP[rengo]", BOARD_SIZE));
    sgf.push_str(&format!("KM[{}]", record.setup.komi));
    if record.setup.has_stones() {
        sgf.push_str(&format!("HA[{}]AB", record.setup.handicap));
        for &point in &record.setup.handicap_points {
            sgf.push_str(&format!("[{}]", point_value(point)));
        }
    }
    sgf.push_str(&format!(
        "DT[{}]GC[{} game in channel {}]",
        session.created_at.format("%Y-%m-%d"),
        session.mode,
        escape(&session.channel_id)
    ));
    if !session.black.is_empty() {
        sgf.push_str(&format!("PB[{}]", escape(&session.black.join(", "))));
    }
    if !session.white.is_empty() {
        sgf.push_str(&format!("PW[{}]", escape(&session.white.join(", "))));
    }
    if let Some(outcome) = session.result {
        sgf.push_str(&format!("RE[{}]", outcome.result_string()));
    }

    let moves = record.moves();
    for (index, mv) in moves.iter().enumerate() {
        sgf.push_str(&format!(
            "\n;{}[{}]C[{}]",
            mv.color.sgf_letter(),
            point_value(mv.point),
            escape(&mv.player)
        ));
        if index + 1 == moves.len() {
            sgf.push_str(&format!("CR[{}]", point_value(mv.point)));
            if let Some(ko) = mv.ko {
                sgf.push_str(&format!("SQ[{}]", point_value(ko)));
            }
        }
    }

    sgf.push_str(")\n");
    sgf
}

/// SGF point value: column letter then row letter, row `a` at the top
fn point_value(point: Coord) -> String {
    let x = (b'a' + point.col) as char;
    let y = (b'a' + (BOARD_SIZE as u8 - 1 - point.row)) as char;
    format!("{}{}", x, y)
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace(']', "\\]")
}
