// SPDX-License-Identifier: MIT OR Apache-2.0

//! The game record: setup plus the committed move sequence.
//!
//! The record is the only stored form of a game. Boards are rebuilt from it by
//! [`GameRecord::rebuild`] on every call, so replay must be deterministic and
//! must refuse a record that does not replay cleanly.

use crate::{board::Board, rules, Color, Coord, ReplayError, Setup};
use serde::{Deserialize, Serialize};

/// A committed move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Color that played
    pub color: Color,
    /// Point played
    pub point: Coord,
    /// Display name of the player who played it
    pub player: String,
    /// Opponent stones removed by this move
    #[serde(default)]
    pub captured: Vec<Coord>,
    /// Ko point created by this move
    #[serde(default)]
    pub ko: Option<Coord>,
}

/// Board and ko state after replaying a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// The rebuilt board
    pub board: Board,
    /// Ko point created by the final move, if any
    pub ko_point: Option<Coord>,
}

/// Setup record and ordered moves of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Handicap stones and komi
    pub setup: Setup,
    /// Committed moves, oldest first
    moves: Vec<MoveRecord>,
}

impl GameRecord {
    /// Create an empty record rooted at `setup`
    pub fn new(setup: Setup) -> Self {
        Self {
            setup,
            moves: Vec::new(),
        }
    }

    /// Committed moves, oldest first
    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    /// Number of committed moves (setup stones excluded)
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// True if no move has been committed yet
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Most recent committed move
    pub fn last(&self) -> Option<&MoveRecord> {
        self.moves.last()
    }

    /// Color whose turn it is.
    ///
    /// White moves first when handicap stones were placed.
    pub fn color_to_move(&self) -> Color {
        match self.moves.last() {
            Some(last) => last.color.opposite(),
            None if self.setup.has_stones() => Color::White,
            None => Color::Black,
        }
    }

    /// Append a committed move.
    ///
    /// The record only checks turn order; legality is established by the caller
    /// against the rebuilt position before appending.
    pub fn append(&mut self, record: MoveRecord) -> Result<(), ReplayError> {
        let expected = self.color_to_move();
        if record.color != expected {
            return Err(ReplayError::OutOfTurn {
                index: self.moves.len(),
                expected,
                found: record.color,
            });
        }
        self.moves.push(record);
        Ok(())
    }

    /// Remove and return the most recent move. Setup stones are never removed.
    pub fn retract_last(&mut self) -> Option<MoveRecord> {
        self.moves.pop()
    }

    /// Replay the record onto an empty board.
    pub fn rebuild(&self) -> Result<Position, ReplayError> {
        let mut board = Board::new();
        for &point in &self.setup.handicap_points {
            if !board.place(point, Color::Black) {
                return Err(ReplayError::BadSetup { point });
            }
        }

        let mut ko_point = None;
        let mut expected = if self.setup.has_stones() {
            Color::White
        } else {
            Color::Black
        };

        for (index, mv) in self.moves.iter().enumerate() {
            if mv.color != expected {
                return Err(ReplayError::OutOfTurn {
                    index,
                    expected,
                    found: mv.color,
                });
            }
            if ko_point == Some(mv.point) {
                return Err(ReplayError::KoBanned {
                    index,
                    point: mv.point,
                });
            }

            let placement =
                rules::apply(&board, mv.color, mv.point).map_err(|source| ReplayError::Illegal {
                    index,
                    point: mv.point,
                    source,
                })?;
            board = placement.board;
            ko_point = placement.ko_point;
            expected = expected.opposite();
        }

        Ok(Position { board, ko_point })
    }
}

impl Default for GameRecord {
    fn default() -> Self {
        Self::new(Setup::default())
    }
}
