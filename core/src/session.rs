// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel game sessions: modes, team rosters, moves, edits, resignation

use crate::{
    board::Board, record::MoveRecord, rules, sgf, Color, Coord, EngineError, GameRecord,
    Position, Rejection, ReplayError, Setup,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Chat channel identifier
pub type ChannelId = String;

/// Chat user identifier
pub type PlayerId = String;

/// How long after a move its author may still replace it
pub const EDIT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Who may play a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Anyone may play whichever color is to move
    Random,
    /// Players join a team and only play for that team
    Queue,
    /// Students join black; white is played by the configured teachers
    Teachers,
}

impl Mode {
    /// Whether players must be in a roster to move
    pub fn uses_rosters(&self) -> bool {
        !matches!(self, Mode::Random)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Random => "random",
            Mode::Queue => "queue",
            Mode::Teachers => "teachers",
        };
        f.write_str(name)
    }
}

impl FromStr for Mode {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Mode::Random),
            "queue" => Ok(Mode::Queue),
            "teachers" => Ok(Mode::Teachers),
            _ => Err(Rejection::BadFormat),
        }
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Moves are being accepted
    Active,
    /// The game ended; no further changes
    Finished,
}

/// Final result of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Color credited with the win
    pub winner: Color,
}

impl Outcome {
    /// Result by resignation of `loser`
    pub fn resignation(loser: Color) -> Self {
        Self {
            winner: loser.opposite(),
        }
    }

    /// SGF `RE` value, e.g. `W+R`
    pub fn result_string(&self) -> String {
        format!("{}+R", self.winner.sgf_letter())
    }
}

/// Parameters for starting a game
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    /// Play mode
    pub mode: Mode,
    /// Requested handicap; clamped to 9
    pub handicap: u8,
    /// Komi
    pub komi: f32,
    /// White roster for teachers mode; ignored otherwise
    pub teachers: Vec<PlayerId>,
}

impl NewGame {
    /// Even game in `mode` with default komi
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            handicap: 0,
            komi: crate::setup::DEFAULT_KOMI,
            teachers: Vec::new(),
        }
    }

    /// Set the handicap
    pub fn with_handicap(mut self, handicap: u8) -> Self {
        self.handicap = handicap;
        self
    }

    /// Set the komi
    pub fn with_komi(mut self, komi: f32) -> Self {
        self.komi = komi;
        self
    }

    /// Set the teachers who play white in teachers mode
    pub fn with_teachers(mut self, teachers: Vec<PlayerId>) -> Self {
        self.teachers = teachers;
        self
    }
}

/// One line of the queue display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Team of the player
    pub color: Color,
    /// Player id
    pub player: PlayerId,
}

/// A game that ended, handed to the store for archiving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedGame {
    /// Final session state, status [`Status::Finished`]
    pub session: Session,
    /// When the game ended
    pub finished_at: DateTime<Utc>,
}

impl FinishedGame {
    /// SGF of the finished game, including its result
    pub fn sgf(&self) -> String {
        self.session.sgf()
    }
}

/// A game running in one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Channel the game is played in
    pub channel_id: ChannelId,
    /// Play mode
    pub mode: Mode,
    /// Black roster, in queue order
    pub black: Vec<PlayerId>,
    /// White roster, in queue order
    pub white: Vec<PlayerId>,
    /// Setup and moves; the source of every board
    pub record: GameRecord,
    /// When the game was created
    pub created_at: DateTime<Utc>,
    /// When the last move was committed
    pub last_move_time: Option<DateTime<Utc>>,
    /// Who committed the last move
    pub last_mover: Option<PlayerId>,
    /// Lifecycle state
    pub status: Status,
    /// Set once the game is finished
    #[serde(default)]
    pub result: Option<Outcome>,
}

impl Session {
    /// Start a new game in `channel_id`
    pub fn new(channel_id: impl Into<ChannelId>, game: NewGame, now: DateTime<Utc>) -> Self {
        let white = match game.mode {
            Mode::Teachers => game.teachers,
            _ => Vec::new(),
        };
        Self {
            channel_id: channel_id.into(),
            mode: game.mode,
            black: Vec::new(),
            white,
            record: GameRecord::new(Setup::new(game.handicap, game.komi)),
            created_at: now,
            last_move_time: None,
            last_mover: None,
            status: Status::Active,
            result: None,
        }
    }

    /// Whether the game still accepts changes
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    fn ensure_active(&self) -> Result<(), Rejection> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Rejection::NoActiveGame)
        }
    }

    /// Color whose turn it is
    pub fn color_to_move(&self) -> Color {
        self.record.color_to_move()
    }

    /// Roster of a color
    pub fn roster(&self, color: Color) -> &[PlayerId] {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    fn roster_mut(&mut self, color: Color) -> &mut Vec<PlayerId> {
        match color {
            Color::Black => &mut self.black,
            Color::White => &mut self.white,
        }
    }

    /// Team the player is on, if any
    pub fn team_of(&self, player: &str) -> Option<Color> {
        [Color::Black, Color::White]
            .into_iter()
            .find(|&color| self.roster(color).iter().any(|p| p == player))
    }

    /// Replay the record
    pub fn position(&self) -> Result<Position, EngineError> {
        self.record.rebuild().map_err(|source| self.corrupt(source))
    }

    /// Current board, for rendering
    pub fn current_board(&self) -> Result<Board, EngineError> {
        self.position().map(|position| position.board)
    }

    fn corrupt(&self, source: ReplayError) -> EngineError {
        tracing::error!(channel = %self.channel_id, error = %source, "game record does not replay");
        EngineError::CorruptHistory {
            channel: self.channel_id.clone(),
            source,
        }
    }

    /// Play the next move for the color to move.
    ///
    /// `actor` is checked against the rosters; `player_name` is recorded as
    /// the move annotation.
    pub fn submit_move(
        &mut self,
        actor: &str,
        player_name: &str,
        coordinate: &str,
        now: DateTime<Utc>,
    ) -> Result<&MoveRecord, EngineError> {
        self.ensure_active()?;
        let point = Coord::parse(coordinate)?;
        let position = self.position()?;
        let color = self.color_to_move();

        if self.mode.uses_rosters() && !self.roster(color).iter().any(|p| p == actor) {
            return Err(Rejection::NotInRoster.into());
        }
        if position.ko_point == Some(point) {
            return Err(Rejection::KoViolation.into());
        }

        let placement = rules::apply(&position.board, color, point)?;
        let record = MoveRecord {
            color,
            point,
            player: player_name.to_string(),
            captured: placement.captured,
            ko: placement.ko_point,
        };
        self.record
            .append(record)
            .map_err(|source| self.corrupt(source))?;
        self.last_move_time = Some(now);
        self.last_mover = Some(actor.to_string());

        tracing::debug!(
            channel = %self.channel_id,
            %point,
            ?color,
            actor,
            move_number = self.record.len(),
            "move committed"
        );

        self.record
            .last()
            .ok_or_else(|| Rejection::NoActiveGame.into())
    }

    /// Whether `actor` may still replace the last move at `now`
    pub fn can_edit(&self, actor: &str, now: DateTime<Utc>) -> bool {
        if self.record.is_empty() || self.last_mover.as_deref() != Some(actor) {
            return false;
        }
        match self.last_move_time {
            Some(at) => {
                let elapsed = now.signed_duration_since(at);
                elapsed.num_milliseconds() <= EDIT_WINDOW.as_millis() as i64
            }
            None => false,
        }
    }

    /// Replace the last move with a move at `coordinate`.
    ///
    /// The edit is all or nothing: if the new move is rejected the original
    /// move stays in place.
    pub fn edit_move(
        &mut self,
        actor: &str,
        player_name: &str,
        coordinate: &str,
        now: DateTime<Utc>,
    ) -> Result<&MoveRecord, EngineError> {
        self.ensure_active()?;
        if !self.can_edit(actor, now) {
            return Err(Rejection::EditWindowExpired.into());
        }

        let mut edited = self.clone();
        edited.record.retract_last();
        edited.submit_move(actor, player_name, coordinate, now)?;
        *self = edited;

        self.record
            .last()
            .ok_or_else(|| Rejection::NoActiveGame.into())
    }

    /// Add `actor` to a team, returning the team joined
    pub fn join(&mut self, actor: &str) -> Result<Color, Rejection> {
        self.ensure_active()?;
        if !self.mode.uses_rosters() {
            return Err(Rejection::NoQueueNeeded);
        }
        if self.team_of(actor).is_some() {
            return Err(Rejection::AlreadyJoined);
        }

        let team = match self.mode {
            Mode::Teachers => Color::Black,
            _ if self.black.len() <= self.white.len() => Color::Black,
            _ => Color::White,
        };
        self.roster_mut(team).push(actor.to_string());
        Ok(team)
    }

    /// Remove `actor` from their team, returning the team left
    pub fn leave(&mut self, actor: &str) -> Result<Color, Rejection> {
        self.ensure_active()?;
        let team = self.team_of(actor).ok_or(Rejection::NotInGame)?;
        self.roster_mut(team).retain(|p| p != actor);
        Ok(team)
    }

    /// End the game with `loser` resigning
    pub fn resign(&mut self, loser: Color, now: DateTime<Utc>) -> Result<FinishedGame, Rejection> {
        self.ensure_active()?;
        self.status = Status::Finished;
        self.result = Some(Outcome::resignation(loser));
        Ok(FinishedGame {
            session: self.clone(),
            finished_at: now,
        })
    }

    /// Who is up next, for display.
    ///
    /// Queue mode interleaves both teams starting with the color to move;
    /// teachers mode lists the students only.
    pub fn queue_listing(&self) -> Result<Vec<QueueEntry>, Rejection> {
        match self.mode {
            Mode::Random => Err(Rejection::NoQueueNeeded),
            Mode::Teachers => Ok(self
                .black
                .iter()
                .map(|player| QueueEntry {
                    color: Color::Black,
                    player: player.clone(),
                })
                .collect()),
            Mode::Queue => {
                let first = self.color_to_move();
                let order = [first, first.opposite()];
                let rounds = self.black.len().max(self.white.len());
                let mut listing = Vec::with_capacity(self.black.len() + self.white.len());
                for round in 0..rounds {
                    for color in order {
                        if let Some(player) = self.roster(color).get(round) {
                            listing.push(QueueEntry {
                                color,
                                player: player.clone(),
                            });
                        }
                    }
                }
                Ok(listing)
            }
        }
    }

    /// Teams with fewer than two members in queue mode
    pub fn needs_members(&self) -> Vec<Color> {
        if self.mode != Mode::Queue {
            return Vec::new();
        }
        [Color::Black, Color::White]
            .into_iter()
            .filter(|&color| self.roster(color).len() < 2)
            .collect()
    }

    /// Head of the roster whose turn it is
    pub fn next_player(&self) -> Option<&PlayerId> {
        self.roster(self.color_to_move()).first()
    }

    /// SGF text of the game so far
    pub fn sgf(&self) -> String {
        sgf::write_game(self)
    }
}
