// SPDX-License-Identifier: MIT OR Apache-2.0

//! Komi and handicap setup for a new game

use crate::Coord;
use serde::{Deserialize, Serialize};

/// Largest supported handicap
pub const MAX_HANDICAP: u8 = 9;

/// Komi used when none is given
pub const DEFAULT_KOMI: f32 = 6.5;

const LOWER_LEFT: Coord = Coord::new(3, 3);
const UPPER_RIGHT: Coord = Coord::new(15, 15);
const UPPER_LEFT: Coord = Coord::new(15, 3);
const LOWER_RIGHT: Coord = Coord::new(3, 15);
const CENTER: Coord = Coord::new(9, 9);
const MID_LEFT: Coord = Coord::new(9, 3);
const MID_RIGHT: Coord = Coord::new(9, 15);
const MID_BOTTOM: Coord = Coord::new(3, 9);
const MID_TOP: Coord = Coord::new(15, 9);

/// Setup record at the root of a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    /// Compensation for white; recorded only
    pub komi: f32,
    /// Number of handicap stones, already clamped
    pub handicap: u8,
    /// Black stones placed before the first move
    pub handicap_points: Vec<Coord>,
}

impl Default for Setup {
    fn default() -> Self {
        Self::new(0, DEFAULT_KOMI)
    }
}

impl Setup {
    /// Build a setup, clamping the handicap to [`MAX_HANDICAP`].
    ///
    /// A komi that is not a finite number cannot be stored and falls back to
    /// [`DEFAULT_KOMI`].
    pub fn new(handicap: u8, komi: f32) -> Self {
        let handicap = handicap.min(MAX_HANDICAP);
        let komi = if komi.is_finite() {
            komi
        } else {
            tracing::warn!(komi, "Komi is not a finite number, using the default");
            DEFAULT_KOMI
        };
        Self {
            komi,
            handicap,
            handicap_points: handicap_points(handicap),
        }
    }

    /// Whether any setup stones are on the board
    pub fn has_stones(&self) -> bool {
        !self.handicap_points.is_empty()
    }
}

/// Star points for a handicap count, in placement order.
///
/// Handicaps of 0 and 1 place no stones; counts above 9 use the 9-stone layout.
pub fn handicap_points(handicap: u8) -> Vec<Coord> {
    let points: &[Coord] = match handicap.min(MAX_HANDICAP) {
        0 | 1 => &[],
        2 => &[LOWER_LEFT, UPPER_RIGHT],
        3 => &[LOWER_LEFT, UPPER_RIGHT, UPPER_LEFT],
        4 => &[LOWER_LEFT, UPPER_RIGHT, UPPER_LEFT, LOWER_RIGHT],
        5 => &[LOWER_LEFT, UPPER_RIGHT, UPPER_LEFT, LOWER_RIGHT, CENTER],
        6 => &[LOWER_LEFT, UPPER_RIGHT, UPPER_LEFT, LOWER_RIGHT, MID_LEFT, MID_RIGHT],
        7 => &[LOWER_LEFT, UPPER_RIGHT, UPPER_LEFT, LOWER_RIGHT, MID_LEFT, MID_RIGHT, CENTER],
        8 => &[
            LOWER_LEFT, UPPER_RIGHT, UPPER_LEFT, LOWER_RIGHT, MID_LEFT, MID_RIGHT, MID_BOTTOM,
            MID_TOP,
        ],
        _ => &[
            LOWER_LEFT, UPPER_RIGHT, UPPER_LEFT, LOWER_RIGHT, MID_LEFT, MID_RIGHT, MID_BOTTOM,
            MID_TOP, CENTER,
        ],
    };
    points.to_vec()
}
