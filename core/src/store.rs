// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session persistence.
//!
//! The registry saves a channel's session through a [`SessionStore`] after
//! every successful change and before the caller sees the result, so a crash
//! never loses a committed move.

use crate::{ChannelId, FinishedGame, Session};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything a store holds at startup
#[derive(Debug, Default)]
pub struct LoadedSessions {
    /// Readable sessions, keyed by channel
    pub sessions: HashMap<ChannelId, Session>,
    /// Channels whose stored session could not be read, with the reason
    pub unreadable: HashMap<ChannelId, String>,
}

/// Durable storage for active sessions and finished games
pub trait SessionStore: Send + Sync {
    /// Load every stored session.
    ///
    /// A session that exists but cannot be read is reported in
    /// [`LoadedSessions::unreadable`] so the channel is never handed out as
    /// free.
    fn load_all(&self) -> Result<LoadedSessions>;

    /// Durably store the current state of a session
    fn save(&self, session: &Session) -> Result<()>;

    /// Forget the session of a channel
    fn remove(&self, channel: &str) -> Result<()>;

    /// Keep a finished game
    fn archive(&self, finished: &FinishedGame) -> Result<()>;
}

/// Stores each session as `<channel>.json` in a directory.
///
/// Channel ids are escaped with [`file_stem`], so distinct channels never
/// share a file. Finished games go to `finished/` as an SGF file plus a JSON
/// copy of the final session, named `<channel>~<uuid>`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join("finished"))
            .with_context(|| format!("Failed to create state directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Root directory of the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory finished games are archived to
    pub fn finished_dir(&self) -> PathBuf {
        self.dir.join("finished")
    }

    fn session_path(&self, channel: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(channel)))
    }

    fn read_session(&self, path: &Path) -> std::result::Result<Session, String> {
        let data = std::fs::read(path).map_err(|e| e.to_string())?;
        let session = serde_json::from_slice::<Session>(&data).map_err(|e| e.to_string())?;
        if self.session_path(&session.channel_id) != path {
            return Err(format!(
                "file holds channel {:?}, which belongs in another file",
                session.channel_id
            ));
        }
        Ok(session)
    }
}

impl SessionStore for JsonFileStore {
    fn load_all(&self) -> Result<LoadedSessions> {
        let mut loaded = LoadedSessions::default();
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read state directory {}", self.dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            let is_tmp = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| n.starts_with(".tmp_"));
            if is_tmp || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_session(&path) {
                Ok(session) => {
                    loaded.sessions.insert(session.channel_id.clone(), session);
                }
                Err(reason) => {
                    let stem = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or_default();
                    let channel = channel_from_stem(stem).unwrap_or_else(|| stem.to_string());
                    tracing::error!(path = %path.display(), %reason, "Unreadable session file");
                    loaded.unreadable.insert(channel, reason);
                }
            }
        }

        tracing::info!(
            count = loaded.sessions.len(),
            unreadable = loaded.unreadable.len(),
            dir = %self.dir.display(),
            "Loaded sessions"
        );
        Ok(loaded)
    }

    fn save(&self, session: &Session) -> Result<()> {
        let data = serde_json::to_vec_pretty(session).context("Failed to serialize session")?;
        write_atomic(&self.session_path(&session.channel_id), &data)
    }

    fn remove(&self, channel: &str) -> Result<()> {
        let path = self.session_path(channel);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    fn archive(&self, finished: &FinishedGame) -> Result<()> {
        let base = format!(
            "{}~{}",
            file_stem(&finished.session.channel_id),
            uuid::Uuid::new_v4().simple()
        );
        let dir = self.finished_dir();

        write_atomic(&dir.join(format!("{}.sgf", base)), finished.sgf().as_bytes())?;
        let data = serde_json::to_vec_pretty(finished).context("Failed to serialize finished game")?;
        write_atomic(&dir.join(format!("{}.json", base)), &data)?;

        tracing::info!(channel = %finished.session.channel_id, file = %base, "Game archived");
        Ok(())
    }
}

/// Write through a temporary file and rename for atomic replacement
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("State file has no name")?;
    let tmp_path = dir.join(format!(".tmp_{}", name));
    {
        let mut file = std::fs::File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        file.write_all(data).context("Failed to write state data")?;
        file.sync_all().context("Failed to sync state file")?;
    }
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename {} into place", tmp_path.display()))?;
    Ok(())
}

/// Escape a channel id into a file name stem.
///
/// Lowercase ASCII letters, digits and `-` are kept; every other byte becomes
/// `_XX` in uppercase hex. The mapping is injective, also on case-insensitive
/// file systems.
fn file_stem(channel: &str) -> String {
    let mut stem = String::with_capacity(channel.len());
    for byte in channel.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' => stem.push(byte as char),
            _ => stem.push_str(&format!("_{:02X}", byte)),
        }
    }
    stem
}

/// Inverse of [`file_stem`]
fn channel_from_stem(stem: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(stem.len());
    let mut rest = stem.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        if first == b'_' {
            let hex = std::str::from_utf8(tail.get(..2)?).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
            rest = &tail[2..];
        } else {
            bytes.push(first);
            rest = tail;
        }
    }
    String::from_utf8(bytes).ok()
}

/// In-memory store, mainly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<ChannelId, Session>>,
    archived: Mutex<Vec<FinishedGame>>,
    failing: AtomicBool,
    failing_removes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later write fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only `remove` fail (or succeed again)
    pub fn set_failing_removes(&self, failing: bool) {
        self.failing_removes.store(failing, Ordering::SeqCst);
    }

    /// Stored session of a channel
    pub fn session(&self, channel: &str) -> Option<Session> {
        self.sessions.lock().get(channel).cloned()
    }

    /// Replace a stored session without validation
    pub fn insert(&self, session: Session) {
        self.sessions.lock().insert(session.channel_id.clone(), session);
    }

    /// Finished games archived so far
    pub fn archived(&self) -> Vec<FinishedGame> {
        self.archived.lock().clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("store is unavailable");
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn load_all(&self) -> Result<LoadedSessions> {
        Ok(LoadedSessions {
            sessions: self.sessions.lock().clone(),
            unreadable: HashMap::new(),
        })
    }

    fn save(&self, session: &Session) -> Result<()> {
        self.check()?;
        self.insert(session.clone());
        Ok(())
    }

    fn remove(&self, channel: &str) -> Result<()> {
        self.check()?;
        if self.failing_removes.load(Ordering::SeqCst) {
            anyhow::bail!("session cannot be removed");
        }
        self.sessions.lock().remove(channel);
        Ok(())
    }

    fn archive(&self, finished: &FinishedGame) -> Result<()> {
        self.check()?;
        self.archived.lock().push(finished.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mode, NewGame};
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn json_store_round_trips_sessions() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        let mut session = Session::new("guild/7", NewGame::new(Mode::Queue).with_handicap(3), Utc::now());
        session.join("b1").unwrap();
        store.save(&session).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.sessions.get("guild/7"), Some(&session));
        assert!(loaded.unreadable.is_empty());
        assert!(dir.path().join("guild_2F7.json").exists());

        store.remove("guild/7").unwrap();
        assert!(store.load_all().unwrap().sessions.is_empty());
        store.remove("guild/7").unwrap();
    }

    #[test]
    fn json_store_archives_sgf_and_json() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let mut session = Session::new("9", NewGame::new(Mode::Random), Utc::now());
        let finished = session.resign(crate::Color::Black, Utc::now()).unwrap();

        store.archive(&finished).unwrap();

        let names: Vec<String> = std::fs::read_dir(store.finished_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.starts_with("9~") && n.ends_with(".sgf")));
        assert!(names.iter().any(|n| n.starts_with("9~") && n.ends_with(".json")));
    }

    #[test]
    fn similar_channel_ids_get_their_own_files() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let channels = ["a/b", "a_b", "a b", "A_b", "a-b", "ab", "héllo"];
        for channel in channels {
            store
                .save(&Session::new(channel, NewGame::new(Mode::Random), Utc::now()))
                .unwrap();
        }

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.sessions.len(), channels.len());
        for channel in channels {
            assert_eq!(loaded.sessions[channel].channel_id, channel);
            assert_eq!(channel_from_stem(&file_stem(channel)).as_deref(), Some(channel));
        }
    }

    #[test]
    fn unreadable_files_are_reported() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join(format!("{}.json", file_stem("go/1"))), b"{not json").unwrap();

        let loaded = store.load_all().unwrap();
        assert!(loaded.sessions.is_empty());
        assert!(loaded.unreadable.contains_key("go/1"));
    }

    #[test]
    fn session_in_the_wrong_file_is_unreadable() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let session = Session::new("right", NewGame::new(Mode::Random), Utc::now());
        std::fs::write(
            dir.path().join("wrong.json"),
            serde_json::to_vec(&session).unwrap(),
        )
        .unwrap();

        let loaded = store.load_all().unwrap();
        assert!(loaded.sessions.is_empty());
        assert!(loaded.unreadable.contains_key("wrong"));
    }

    #[test]
    fn failing_memory_store_rejects_writes() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let session = Session::new("1", NewGame::new(Mode::Random), Utc::now());
        assert!(store.save(&session).is_err());
        assert!(store.session("1").is_none());
    }
}
