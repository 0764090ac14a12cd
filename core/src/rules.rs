// SPDX-License-Identifier: MIT OR Apache-2.0

//! Game rules: capture resolution, suicide and ko detection

use crate::{board::Board, Color, Coord, Rejection};

/// The result of a legal stone placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Board after the stone was placed and captures were removed
    pub board: Board,
    /// Point the opponent may not retake on their next move
    pub ko_point: Option<Coord>,
    /// Opponent stones removed by this move, sorted
    pub captured: Vec<Coord>,
}

/// Place a stone of `color` at `point` on a copy of `board`.
///
/// Captures are resolved before the suicide check, so a move that fills its
/// own last liberty while capturing is legal. Ko is not checked here: the
/// caller compares `point` with the ko point of the preceding move.
pub fn apply(board: &Board, color: Color, point: Coord) -> Result<Placement, Rejection> {
    if !point.is_valid() {
        return Err(Rejection::OutOfBounds);
    }
    if board.get(point).is_some() {
        return Err(Rejection::Occupied);
    }

    let mut next = board.clone();
    next.place(point, color);

    let opponent = color.opposite();
    let mut captured = Vec::new();
    for neighbor in next.adjacent_coords(point) {
        if next.get(neighbor) != Some(opponent) {
            continue;
        }
        let group = next.group(neighbor);
        if next.liberties(&group).is_empty() {
            next.remove_group(&group);
            captured.extend(group);
        }
    }
    captured.sort();
    captured.dedup();

    let own_group = next.group(point);
    let own_liberties = next.liberties(&own_group);
    if own_liberties.is_empty() {
        return Err(Rejection::Suicide);
    }

    let ko_point = match captured.as_slice() {
        [single] if own_group.len() == 1
            && own_liberties.len() == 1
            && own_liberties.contains(single) =>
        {
            Some(*single)
        }
        _ => None,
    };

    if !captured.is_empty() {
        tracing::trace!(?point, ?color, captured = captured.len(), ?ko_point, "stones captured");
    }

    Ok(Placement {
        board: next,
        ko_point,
        captured,
    })
}
