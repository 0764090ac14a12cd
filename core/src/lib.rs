// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rengo Core - Game Rules and Session Logic
//!
//! This crate provides the core functionality for team Go played in chat
//! channels:
//! - 19x19 board representation and capture/ko/suicide rules
//! - The game record, from which every board is rebuilt by replay
//! - Per-channel sessions with team queues, edits and resignation
//! - A channel registry that serializes work per channel and persists
//!   every mutation through a [`store::SessionStore`]
//! - SGF export of running and finished games

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod board;
pub mod error;
pub mod record;
pub mod registry;
pub mod rules;
pub mod session;
pub mod setup;
pub mod sgf;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use board::{Board, BOARD_SIZE};
pub use error::{EngineError, Rejection, ReplayError};
pub use record::{GameRecord, MoveRecord, Position};
pub use registry::Registry;
pub use session::{
    ChannelId, FinishedGame, Mode, NewGame, Outcome, PlayerId, QueueEntry, Session, Status,
    EDIT_WINDOW,
};
pub use setup::Setup;
pub use store::{JsonFileStore, LoadedSessions, MemoryStore, SessionStore};

/// Player color in a Go game (Black or White)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Black player (moves first in an even game)
    Black,
    /// White player
    White,
}

impl Color {
    /// Returns the opposite color
    pub fn opposite(&self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Lowercase team name, as used in replies
    pub fn name(&self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
        }
    }

    /// SGF property letter for this color
    pub fn sgf_letter(&self) -> char {
        match self {
            Color::Black => 'B',
            Color::White => 'W',
        }
    }
}

/// Board coordinate. Row 0 is the bottom line, column 0 is the `A` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// Row, counted from the bottom (text row `1` is row 0)
    pub row: u8,
    /// Column, counted from the left (`A` is column 0)
    pub col: u8,
}

impl Coord {
    /// Create a new coordinate
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Check if the coordinate lies on the board
    pub fn is_valid(&self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    /// Parse a text coordinate such as `Q16` or `d4`.
    ///
    /// Column letters run `A`..`T` and skip `I`. Input that does not look like
    /// a coordinate at all is [`Rejection::BadFormat`]; a well-formed
    /// coordinate that falls off the board is [`Rejection::OutOfBounds`].
    pub fn parse(text: &str) -> Result<Self, Rejection> {
        let text = text.trim();
        let mut chars = text.chars();
        let letter = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or(Rejection::BadFormat)?
            .to_ascii_uppercase();
        let digits = chars.as_str();
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Rejection::BadFormat);
        }
        if letter == 'I' {
            return Err(Rejection::BadFormat);
        }

        let number: u8 = digits.parse().map_err(|_| Rejection::BadFormat)?;
        let col = column_index(letter).ok_or(Rejection::OutOfBounds)?;
        if number == 0 || number as usize > BOARD_SIZE {
            return Err(Rejection::OutOfBounds);
        }

        Ok(Self::new(number - 1, col))
    }

    /// Column letter of this coordinate (skipping `I`)
    pub fn column_letter(&self) -> char {
        column_letter(self.col)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letter(), self.row + 1)
    }
}

impl FromStr for Coord {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coord::parse(s)
    }
}

/// Convert a column index to its letter (A-T, skipping I)
pub fn column_letter(col: u8) -> char {
    if col < 8 {
        (b'A' + col) as char
    } else {
        (b'A' + col + 1) as char
    }
}

fn column_index(letter: char) -> Option<u8> {
    let offset = (letter as u8).checked_sub(b'A')?;
    let col = match offset {
        0..=7 => offset,
        8 => return None,
        _ => offset - 1,
    };
    ((col as usize) < BOARD_SIZE).then_some(col)
}
