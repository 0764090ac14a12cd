// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel registry: at most one active game per channel.
//!
//! Every channel has its own lock. An operation holds it for the whole
//! replay-check-append-persist sequence, so two submissions to one channel can
//! never both build on the same history, while different channels proceed in
//! parallel. Changes are made on a copy of the session and only become visible
//! once the store has saved them.

use crate::{
    board::Board, ChannelId, Color, EngineError, FinishedGame, MoveRecord, NewGame, QueueEntry,
    Rejection, ReplayError, Session, SessionStore,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

type Clock = dyn Fn() -> DateTime<Utc> + Send + Sync;

/// Per-channel state guarded by the channel lock
#[derive(Debug, Default)]
struct Slot {
    session: Option<Session>,
    /// Set once the stored record failed to replay; the channel is then refused
    corrupt: Option<ReplayError>,
}

impl Slot {
    fn serving(&self, channel: &str) -> Result<&Session, EngineError> {
        if let Some(source) = &self.corrupt {
            return Err(EngineError::CorruptHistory {
                channel: channel.to_string(),
                source: source.clone(),
            });
        }
        self.session
            .as_ref()
            .filter(|s| s.is_active())
            .ok_or(EngineError::Rejected(Rejection::NoActiveGame))
    }
}

/// Maps channels to their sessions and persists every change
pub struct Registry {
    channels: RwLock<HashMap<ChannelId, Arc<Mutex<Slot>>>>,
    store: Arc<dyn SessionStore>,
    clock: Arc<Clock>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("channels", &self.channels.read().len())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry writing to `store`
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            store,
            clock: Arc::new(Utc::now),
        }
    }

    /// Create a registry holding every session the store has.
    ///
    /// Each session is replayed once; a channel whose record does not replay,
    /// or whose file cannot be read, is kept but refused until an operator
    /// repairs the stored state.
    pub fn load(store: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let registry = Self::new(store);
        let loaded = registry.store.load_all()?;
        let mut channels = registry.channels.write();

        for (channel, reason) in loaded.unreadable {
            tracing::error!(%channel, %reason, "Stored game cannot be read; channel disabled");
            let slot = Slot {
                session: None,
                corrupt: Some(ReplayError::Unreadable { reason }),
            };
            channels.insert(channel, Arc::new(Mutex::new(slot)));
        }

        for (channel, session) in loaded.sessions {
            let corrupt = match session.record.rebuild() {
                Ok(_) => None,
                Err(e) => {
                    tracing::error!(%channel, error = %e, "Stored game does not replay; channel disabled");
                    Some(e)
                }
            };
            let slot = Slot {
                session: Some(session),
                corrupt,
            };
            channels.insert(channel, Arc::new(Mutex::new(slot)));
        }
        drop(channels);

        Ok(registry)
    }

    /// Use `clock` instead of the system clock for timestamps
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn slot(&self, channel: &str) -> Result<Arc<Mutex<Slot>>, EngineError> {
        self.channels
            .read()
            .get(channel)
            .cloned()
            .ok_or(EngineError::Rejected(Rejection::NoActiveGame))
    }

    fn slot_or_insert(&self, channel: &str) -> Arc<Mutex<Slot>> {
        if let Some(slot) = self.channels.read().get(channel) {
            return slot.clone();
        }
        self.channels
            .write()
            .entry(channel.to_string())
            .or_default()
            .clone()
    }

    fn read<T>(
        &self,
        channel: &str,
        f: impl FnOnce(&Session) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let slot = self.slot(channel)?;
        let mut guard = slot.lock();
        let result = f(guard.serving(channel)?);
        Self::note_corruption(&mut guard, result)
    }

    fn mutate<T>(
        &self,
        channel: &str,
        f: impl FnOnce(&mut Session) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let slot = self.slot(channel)?;
        let mut guard = slot.lock();
        let mut next = guard.serving(channel)?.clone();

        let value = match Self::note_corruption(&mut guard, f(&mut next)) {
            Ok(value) => value,
            Err(EngineError::Rejected(rejection)) => {
                tracing::warn!(%channel, %rejection, "Action rejected");
                return Err(rejection.into());
            }
            Err(e) => return Err(e),
        };

        self.store.save(&next).map_err(|e| {
            tracing::error!(%channel, error = %e, "Failed to save session; change discarded");
            EngineError::Persistence(e)
        })?;
        guard.session = Some(next);
        Ok(value)
    }

    fn note_corruption<T>(
        slot: &mut Slot,
        result: Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        if let Err(EngineError::CorruptHistory { source, .. }) = &result {
            slot.corrupt = Some(source.clone());
        }
        result
    }

    /// Start a new game in `channel`
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn create_session(&self, channel: &str, game: NewGame) -> Result<Session, EngineError> {
        let slot = self.slot_or_insert(channel);
        let mut guard = slot.lock();

        match guard.serving(channel) {
            Ok(_) => return Err(Rejection::GameAlreadyActive.into()),
            Err(EngineError::Rejected(Rejection::NoActiveGame)) => {}
            Err(e) => return Err(e),
        }

        let session = Session::new(channel, game, self.now());
        self.store.save(&session).map_err(EngineError::Persistence)?;
        guard.session = Some(session.clone());

        tracing::info!(
            %channel,
            mode = %session.mode,
            handicap = session.record.setup.handicap,
            komi = session.record.setup.komi,
            "New game started"
        );
        Ok(session)
    }

    /// Play the next move in `channel`
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn submit_move(
        &self,
        channel: &str,
        actor: &str,
        player_name: &str,
        coordinate: &str,
    ) -> Result<MoveRecord, EngineError> {
        let now = self.now();
        self.mutate(channel, |session| {
            session
                .submit_move(actor, player_name, coordinate, now)
                .cloned()
        })
    }

    /// Replace the last move in `channel`
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn edit_move(
        &self,
        channel: &str,
        actor: &str,
        player_name: &str,
        coordinate: &str,
    ) -> Result<MoveRecord, EngineError> {
        let now = self.now();
        self.mutate(channel, |session| {
            session
                .edit_move(actor, player_name, coordinate, now)
                .cloned()
        })
    }

    /// Put `actor` on a team
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn join(&self, channel: &str, actor: &str) -> Result<Color, EngineError> {
        self.mutate(channel, |session| Ok(session.join(actor)?))
    }

    /// Take `actor` off their team
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn leave(&self, channel: &str, actor: &str) -> Result<Color, EngineError> {
        self.mutate(channel, |session| Ok(session.leave(actor)?))
    }

    /// End the game in `channel` with `loser` resigning.
    ///
    /// The finished game is archived and the channel is freed for a new game.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn resign(&self, channel: &str, loser: Color) -> Result<FinishedGame, EngineError> {
        let slot = self.slot(channel)?;
        let mut guard = slot.lock();
        let mut next = guard.serving(channel)?.clone();
        let finished = next.resign(loser, self.now())?;

        self.store.archive(&finished).map_err(|e| {
            tracing::error!(%channel, error = %e, "Failed to archive finished game");
            EngineError::Persistence(e)
        })?;
        // The archive is the record of the result from here on
        if let Err(e) = self.store.remove(channel) {
            tracing::error!(%channel, error = %e, "Finished game archived but its session file was not removed");
        }
        guard.session = None;
        drop(guard);

        self.reclaim(channel, &slot);
        tracing::info!(%channel, winner = ?loser.opposite(), "Game finished by resignation");
        Ok(finished)
    }

    /// Drop the channel's slot if nobody else is using it
    fn reclaim(&self, channel: &str, slot: &Arc<Mutex<Slot>>) {
        let mut channels = self.channels.write();
        // The map and the caller hold the only references.
        if Arc::strong_count(slot) == 2 && slot.lock().session.is_none() {
            channels.remove(channel);
        }
    }

    /// Board of the game in `channel`, for rendering
    pub fn current_board(&self, channel: &str) -> Result<Board, EngineError> {
        self.read(channel, |session| session.current_board())
    }

    /// Queue display for `channel`
    pub fn queue_listing(&self, channel: &str) -> Result<Vec<QueueEntry>, EngineError> {
        self.read(channel, |session| Ok(session.queue_listing()?))
    }

    /// Copy of the session in `channel`
    pub fn snapshot(&self, channel: &str) -> Result<Session, EngineError> {
        self.read(channel, |session| Ok(session.clone()))
    }

    /// SGF of the game so far in `channel`
    pub fn sgf(&self, channel: &str) -> Result<String, EngineError> {
        self.read(channel, |session| Ok(session.sgf()))
    }

    /// Channels with an active game
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<_> = self
            .channels
            .read()
            .iter()
            .filter(|(_, slot)| slot.lock().session.as_ref().is_some_and(Session::is_active))
            .map(|(channel, _)| channel.clone())
            .collect();
        channels.sort();
        channels
    }
}
