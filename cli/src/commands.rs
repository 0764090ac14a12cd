// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat command parsing and the replies the bot sends back.
//!
//! Input lines look like `<channel> <user> <command> [args]`. The user token
//! doubles as player id and display name.

use crate::config::Config;
use crate::render::render_board;
use rengo_core::setup::MAX_HANDICAP;
use rengo_core::{Color, EngineError, Mode, NewGame, Registry, Rejection, Session};
use std::fmt::Write as _;

const HELP: &[(&str, &str)] = &[
    ("help", "shows this help"),
    ("join", "join the game in this channel"),
    ("leave", "leave the game in this channel"),
    (
        "play <move>",
        "play a move. For example, `play Q16`. Passing is not implemented!",
    ),
    (
        "edit <move>",
        "if you make a mistake in your move, you have 5 minutes to correct it with this command",
    ),
    ("sgf", "get the SGF file of the game"),
    ("board", "shows the current board"),
    ("queue", "get the queue of players"),
    (
        "newgame <queue/random/teachers> <handicap> <komi>",
        "starts a game in this channel (admin only!)",
    ),
    (
        "resign <B/W>",
        "<B/W> resigns the game in this channel. It returns its SGF file (admin only!)",
    ),
];

/// A parsed chat command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    NewGame {
        mode: Mode,
        handicap: u32,
        komi: Option<f32>,
    },
    Play(String),
    Edit(String),
    Join,
    Leave,
    Queue,
    Board,
    Sgf,
    Resign(String),
}

impl Command {
    /// Parse a command word and its arguments.
    ///
    /// The error is a usage hint to send back to the user.
    pub fn parse(word: &str, args: &[&str]) -> Result<Self, String> {
        let command = match (word.to_ascii_lowercase().as_str(), args) {
            ("help", _) => Command::Help,
            ("join", _) => Command::Join,
            ("leave", _) => Command::Leave,
            ("queue", _) => Command::Queue,
            ("board", _) => Command::Board,
            ("sgf", _) => Command::Sgf,
            ("play", [mv, ..]) => Command::Play(mv.to_string()),
            ("edit", [mv, ..]) => Command::Edit(mv.to_string()),
            ("play" | "edit", []) => return Err(Rejection::BadFormat.to_string()),
            ("resign", [color, ..]) => Command::Resign(color.to_string()),
            ("resign", []) => return Err(INVALID_COLOR.to_string()),
            ("newgame", [mode, rest @ ..]) => {
                let usage = || "Usage: `newgame <queue|random|teachers> [handicap] [komi]`".to_string();
                let mode = mode.parse::<Mode>().map_err(|_| usage())?;
                let handicap = match rest.first() {
                    Some(h) => h.parse::<u32>().map_err(|_| usage())?,
                    None => 0,
                };
                let komi = match rest.get(1) {
                    Some(k) => match k.parse::<f32>() {
                        Ok(komi) if komi.is_finite() => Some(komi),
                        _ => return Err(usage()),
                    },
                    None => None,
                };
                Command::NewGame {
                    mode,
                    handicap,
                    komi,
                }
            }
            ("newgame", []) => {
                return Err("Usage: `newgame <queue|random|teachers> [handicap] [komi]`".to_string())
            }
            (other, _) => return Err(format!("Unknown command `{}`. Try `help`.", other)),
        };
        Ok(command)
    }

    fn admin_only(&self) -> bool {
        matches!(self, Command::NewGame { .. } | Command::Resign(_))
    }
}

const INVALID_COLOR: &str = "Invalid color! Use `B` for Black or `W` for White.";

/// One input line split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub channel: String,
    pub user: String,
    pub command: Result<Command, String>,
}

impl Request {
    /// Split an input line. Blank lines, comments and lines without a
    /// command word give `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [channel, user, word, args @ ..] => Some(Request {
                channel: channel.to_string(),
                user: user.to_string(),
                command: Command::parse(word, args),
            }),
            _ => None,
        }
    }
}

/// Dispatches commands to the registry and formats replies
pub struct Bot {
    registry: Registry,
    config: Config,
}

impl Bot {
    pub fn new(registry: Registry, config: Config) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle one input line, returning the reply to send, if any
    pub fn handle(&self, line: &str) -> Option<String> {
        let request = Request::parse(line)?;
        if !self.config.is_permitted(&request.channel) {
            tracing::debug!(channel = %request.channel, "Ignoring line from unpermitted channel");
            return None;
        }

        let command = match request.command {
            Ok(command) => command,
            Err(usage) => return Some(usage),
        };
        if command.admin_only() && !self.config.is_admin(&request.user) {
            return Some(Rejection::PermissionDenied.to_string());
        }

        let reply = self.execute(&request.channel, &request.user, command);
        Some(reply.unwrap_or_else(|e| self.describe(&request.channel, e)))
    }

    fn execute(&self, channel: &str, user: &str, command: Command) -> Result<String, EngineError> {
        match command {
            Command::Help => Ok(help_text()),
            Command::NewGame {
                mode,
                handicap,
                komi,
            } => self.new_game(channel, mode, handicap, komi),
            Command::Play(mv) => {
                self.registry.submit_move(channel, user, user, &mv)?;
                self.turn_notice(channel)
            }
            Command::Edit(mv) => {
                self.registry.edit_move(channel, user, user, &mv)?;
                self.board(channel)
            }
            Command::Join => {
                let team = self.registry.join(channel, user)?;
                Ok(format!("{} joined Team {}!", user, team_name(team)))
            }
            Command::Leave => {
                let team = self.registry.leave(channel, user)?;
                Ok(format!("{} left Team {} :(", user, team_name(team)))
            }
            Command::Queue => self.queue(channel),
            Command::Board => self.board(channel),
            Command::Sgf => self.registry.sgf(channel),
            Command::Resign(color) => {
                let loser = match color.to_ascii_lowercase().as_str() {
                    "b" => Color::Black,
                    "w" => Color::White,
                    _ => {
                        // A missing game is reported before a bad color
                        self.registry.snapshot(channel)?;
                        return Ok(INVALID_COLOR.to_string());
                    }
                };
                let finished = self.registry.resign(channel, loser)?;
                Ok(format!(
                    "Team {} has resigned! Game over.\n{}",
                    team_name(loser),
                    finished.sgf()
                ))
            }
        }
    }

    fn new_game(
        &self,
        channel: &str,
        mode: Mode,
        handicap: u32,
        komi: Option<f32>,
    ) -> Result<String, EngineError> {
        let mut reply = String::new();
        if handicap > u32::from(MAX_HANDICAP) {
            let _ = writeln!(
                reply,
                "The maximum allowed handicap is {} stones.",
                MAX_HANDICAP
            );
        }
        let handicap = handicap.min(u32::from(MAX_HANDICAP)) as u8;

        let game = NewGame::new(mode)
            .with_handicap(handicap)
            .with_komi(komi.unwrap_or(self.config.default_komi))
            .with_teachers(self.config.teachers.clone());
        self.registry.create_session(channel, game)?;

        if mode.uses_rosters() {
            reply.push_str("A new game has started! Join with `join`.\n");
        } else {
            reply.push_str("A new game has started! Play with `play <move>`.\n");
        }
        reply.push_str(&self.board(channel)?);
        Ok(reply)
    }

    fn board(&self, channel: &str) -> Result<String, EngineError> {
        let session = self.registry.snapshot(channel)?;
        let board = session.current_board()?;
        let last_move = session.record.last().map(|m| m.point);
        Ok(format!(
            "{}{}",
            render_board(&board, last_move),
            turn_line(&session)
        ))
    }

    fn turn_notice(&self, channel: &str) -> Result<String, EngineError> {
        let session = self.registry.snapshot(channel)?;
        Ok(turn_line(&session))
    }

    fn queue(&self, channel: &str) -> Result<String, EngineError> {
        let listing = self.registry.queue_listing(channel)?;
        let session = self.registry.snapshot(channel)?;

        if session.mode == Mode::Teachers {
            let mut output = String::from("Player list for Team Black:\n");
            for (idx, entry) in listing.iter().enumerate() {
                let _ = writeln!(output, "{:3}. {}", idx + 1, entry.player);
            }
            return Ok(output.trim_end().to_string());
        }

        if listing.is_empty() {
            return Ok("Nobody yet! Join us with `join`".to_string());
        }

        let mut output = String::from("Player list:\n");
        for (idx, entry) in listing.iter().enumerate() {
            let _ = writeln!(output, "{} {:3}. {}", stone(entry.color), idx + 1, entry.player);
        }
        for color in session.needs_members() {
            let _ = write!(output, "\nTeam {} needs more members!", team_name(color));
        }
        Ok(output.trim_end().to_string())
    }

    fn describe(&self, channel: &str, error: EngineError) -> String {
        match &error {
            EngineError::Rejected(rejection) => rejection.to_string(),
            EngineError::CorruptHistory { .. } => {
                tracing::error!(%channel, error = %error, "Refusing command on corrupt channel");
                "This channel's game record is damaged. Ask an admin to restore it.".to_string()
            }
            EngineError::Persistence(_) => {
                tracing::error!(%channel, error = %error, "Command not saved");
                "Something went wrong saving the game. Please try again.".to_string()
            }
        }
    }
}

fn turn_line(session: &Session) -> String {
    if !session.mode.uses_rosters() {
        return format!("Team {} to play.", team_name(session.color_to_move()));
    }
    match session.next_player() {
        Some(player) => format!("{}'s turn! ⭐", player),
        None => "Waiting for players to join!".to_string(),
    }
}

fn team_name(color: Color) -> &'static str {
    match color {
        Color::Black => "Black",
        Color::White => "White",
    }
}

fn stone(color: Color) -> &'static str {
    match color {
        Color::Black => "⚫",
        Color::White => "⚪",
    }
}

fn help_text() -> String {
    let mut text = String::from("RengoBot Help\nList of available commands:\n");
    for (command, description) in HELP {
        let _ = writeln!(text, "  {:<50} {}", command, description);
    }
    text.trim_end().to_string()
}
