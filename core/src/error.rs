// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the rules engine and sessions

use crate::{Color, Coord};
use thiserror::Error;

/// Expected, user-facing reasons an action is refused.
///
/// Each variant has one stable message; the command layer sends it verbatim.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The move text is not a coordinate
    #[error("I don't understand the move! Please input it in the format `play Q16`.")]
    BadFormat,

    /// The coordinate is outside the board
    #[error("That point is not on the board!")]
    OutOfBounds,

    /// The position is already occupied
    #[error("Illegal move! There is a stone there.")]
    Occupied,

    /// The move would leave its own group without liberties
    #[error("Illegal move! No self-captures allowed.")]
    Suicide,

    /// The move retakes a ko immediately
    #[error("Ko banned move!")]
    KoViolation,

    /// The actor is not queued for the color to move
    #[error("It's not your team's turn! Join with `join` and wait for your color.")]
    NotInRoster,

    /// There is no game in this channel
    #[error("No active game in this channel!")]
    NoActiveGame,

    /// The channel already has a running game
    #[error("A game is already active in this channel!")]
    GameAlreadyActive,

    /// The actor is already in one of the rosters
    #[error("Player already in this game!")]
    AlreadyJoined,

    /// The actor is in neither roster
    #[error("Player not in this game!")]
    NotInGame,

    /// Random games have no queue
    #[error("This game has no queue! No need to join, just `play` whenever you want :P")]
    NoQueueNeeded,

    /// The last move cannot be edited by this actor any more
    #[error("You cannot edit this move!")]
    EditWindowExpired,

    /// Admin-only action attempted by a non-admin
    #[error("You don't have permission to use this command!")]
    PermissionDenied,
}

/// A recorded game that does not replay cleanly.
///
/// This means persisted state is corrupt; it is never shown to players as an
/// ordinary rejection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// A recorded move has the wrong color for its position in the sequence
    #[error("move {index} is {found:?} but {expected:?} was to play")]
    OutOfTurn {
        index: usize,
        expected: Color,
        found: Color,
    },

    /// A recorded move retakes the ko point of the move before it
    #[error("move {index} at {point} retakes a ko")]
    KoBanned { index: usize, point: Coord },

    /// A recorded move is illegal on the board it was played on
    #[error("move {index} at {point} is illegal")]
    Illegal {
        index: usize,
        point: Coord,
        #[source]
        source: Rejection,
    },

    /// A handicap stone is off the board or stacked on another
    #[error("setup stone at {point} cannot be placed")]
    BadSetup { point: Coord },

    /// The stored session could not be read back at all
    #[error("stored session cannot be read: {reason}")]
    Unreadable { reason: String },
}

/// Everything a registry or session operation can fail with
#[derive(Debug, Error)]
pub enum EngineError {
    /// An ordinary refusal, reported to the user
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The channel's stored history no longer replays; the channel is not served
    #[error("game record for channel {channel} is corrupt")]
    CorruptHistory {
        channel: String,
        #[source]
        source: ReplayError,
    },

    /// The new state could not be saved, so it was not committed
    #[error("failed to persist channel state")]
    Persistence(#[source] anyhow::Error),
}

impl EngineError {
    /// The user-facing rejection, if this is one
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            EngineError::Rejected(rejection) => Some(*rejection),
            _ => None,
        }
    }
}

impl PartialEq<Rejection> for EngineError {
    fn eq(&self, other: &Rejection) -> bool {
        self.rejection() == Some(*other)
    }
}
