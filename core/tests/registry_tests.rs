// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry behaviour: one game per channel, persistence and serialization

use chrono::{Duration, TimeZone, Utc};
use rengo_core::{
    Color, Coord, EngineError, GameRecord, JsonFileStore, MemoryStore, Mode, MoveRecord, NewGame,
    Registry, Rejection, Session, SessionStore,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;

fn memory_registry() -> (Arc<MemoryStore>, Registry) {
    let store = Arc::new(MemoryStore::new());
    let registry = Registry::new(store.clone());
    (store, registry)
}

#[test]
fn one_active_game_per_channel() {
    let (store, registry) = memory_registry();
    registry.create_session("c1", NewGame::new(Mode::Queue)).unwrap();

    let err = registry
        .create_session("c1", NewGame::new(Mode::Random))
        .unwrap_err();
    assert_eq!(err, Rejection::GameAlreadyActive);

    // Other channels are independent
    registry.create_session("c2", NewGame::new(Mode::Random)).unwrap();
    assert_eq!(registry.channels(), vec!["c1", "c2"]);

    let finished = registry.resign("c1", Color::White).unwrap();
    assert_eq!(finished.session.result.unwrap().winner, Color::Black);
    assert!(store.session("c1").is_none());
    assert_eq!(store.archived().len(), 1);
    assert_eq!(registry.channels(), vec!["c2"]);

    // The channel is free again
    registry.create_session("c1", NewGame::new(Mode::Random)).unwrap();
}

#[test]
fn operations_without_a_game_are_rejected() {
    let (_, registry) = memory_registry();
    assert_eq!(
        registry.submit_move("none", "a", "a", "D4").unwrap_err(),
        Rejection::NoActiveGame
    );
    assert_eq!(registry.join("none", "a").unwrap_err(), Rejection::NoActiveGame);
    assert_eq!(registry.leave("none", "a").unwrap_err(), Rejection::NoActiveGame);
    assert_eq!(
        registry.resign("none", Color::Black).unwrap_err(),
        Rejection::NoActiveGame
    );
    assert_eq!(
        registry.current_board("none").unwrap_err(),
        Rejection::NoActiveGame
    );
}

#[test]
fn resigned_channel_rejects_further_moves() {
    let (_, registry) = memory_registry();
    registry.create_session("c", NewGame::new(Mode::Random)).unwrap();
    registry.resign("c", Color::Black).unwrap();
    assert_eq!(
        registry.submit_move("c", "a", "a", "D4").unwrap_err(),
        Rejection::NoActiveGame
    );
}

#[test]
fn every_change_is_saved_before_returning() {
    let (store, registry) = memory_registry();
    registry.create_session("c", NewGame::new(Mode::Queue)).unwrap();
    assert!(store.session("c").is_some());

    registry.join("c", "b1").unwrap();
    assert_eq!(store.session("c").unwrap().black, vec!["b1"]);

    registry.submit_move("c", "b1", "Bee", "D4").unwrap();
    let saved = store.session("c").unwrap();
    assert_eq!(saved.record.len(), 1);
    assert_eq!(saved.record.last().unwrap().player, "Bee");
    assert_eq!(saved.last_mover.as_deref(), Some("b1"));
}

#[test]
fn failed_save_discards_the_change() {
    let (store, registry) = memory_registry();
    registry.create_session("c", NewGame::new(Mode::Random)).unwrap();
    store.set_failing(true);

    let err = registry.submit_move("c", "a", "a", "D4").unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));
    assert!(registry.snapshot("c").unwrap().record.is_empty());

    store.set_failing(false);
    registry.submit_move("c", "a", "a", "D4").unwrap();
    assert_eq!(registry.snapshot("c").unwrap().record.len(), 1);
}

#[test]
fn edit_window_uses_registry_clock() {
    let store = Arc::new(MemoryStore::new());
    let offset = Arc::new(AtomicI64::new(0));
    let clock_offset = offset.clone();
    let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let registry = Registry::new(store)
        .with_clock(move || base + Duration::seconds(clock_offset.load(Ordering::SeqCst)));

    registry.create_session("c", NewGame::new(Mode::Random)).unwrap();
    registry.submit_move("c", "alice", "Alice", "D4").unwrap();

    offset.store(240, Ordering::SeqCst);
    let edited = registry.edit_move("c", "alice", "Alice", "E5").unwrap();
    assert_eq!(edited.point, Coord::parse("E5").unwrap());

    offset.store(240 + 301, Ordering::SeqCst);
    assert_eq!(
        registry.edit_move("c", "alice", "Alice", "F6").unwrap_err(),
        Rejection::EditWindowExpired
    );
    assert_eq!(registry.snapshot("c").unwrap().record.len(), 1);
}

#[test]
fn reload_from_disk_serves_the_same_board() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let registry = Registry::new(store.clone());

    registry
        .create_session("c", NewGame::new(Mode::Random).with_handicap(2))
        .unwrap();
    for (i, mv) in ["K10", "C3", "R17", "C4"].iter().enumerate() {
        registry.submit_move("c", &i.to_string(), "p", mv).unwrap();
    }
    let board = registry.current_board("c").unwrap();
    drop(registry);

    let reloaded = Registry::load(store).unwrap();
    assert_eq!(reloaded.current_board("c").unwrap(), board);
    assert_eq!(reloaded.snapshot("c").unwrap().record.len(), 4);
    assert_eq!(
        reloaded.create_session("c", NewGame::new(Mode::Random)).unwrap_err(),
        Rejection::GameAlreadyActive
    );
}

#[test]
fn corrupt_history_disables_the_channel() {
    let store = Arc::new(MemoryStore::new());

    let mut record = GameRecord::default();
    for color in [Color::Black, Color::White] {
        record
            .append(MoveRecord {
                color,
                point: Coord::new(3, 3),
                player: "x".into(),
                captured: Vec::new(),
                ko: None,
            })
            .unwrap();
    }
    let mut session = Session::new("bad", NewGame::new(Mode::Random), Utc::now());
    session.record = record;
    store.insert(session);
    store.save(&Session::new("good", NewGame::new(Mode::Random), Utc::now())).unwrap();

    let registry = Registry::load(store).unwrap();
    for err in [
        registry.submit_move("bad", "a", "a", "Q16").unwrap_err(),
        registry.current_board("bad").unwrap_err(),
        registry.create_session("bad", NewGame::new(Mode::Random)).unwrap_err(),
    ] {
        assert!(matches!(err, EngineError::CorruptHistory { .. }), "{:?}", err);
    }

    registry.submit_move("good", "a", "a", "Q16").unwrap();
}

#[test]
fn concurrent_moves_on_one_channel_are_serialized() {
    let (store, registry) = memory_registry();
    let registry = Arc::new(registry);
    registry.create_session("c", NewGame::new(Mode::Random)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let registry = registry.clone();
            thread::spawn(move || {
                let mut committed = 0;
                for i in 0..40u32 {
                    let row = (worker * 2 + i / 19) % 19 + 1;
                    let col = rengo_core::column_letter((i % 19) as u8);
                    let mv = format!("{}{}", col, row);
                    if registry.submit_move("c", &worker.to_string(), "p", &mv).is_ok() {
                        committed += 1;
                    }
                }
                committed
            })
        })
        .collect();

    let committed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let session = registry.snapshot("c").unwrap();
    assert_eq!(session.record.len(), committed);
    assert!(session.record.rebuild().is_ok());
    for pair in session.record.moves().windows(2) {
        assert_ne!(pair[0].color, pair[1].color);
    }
    assert_eq!(store.session("c").unwrap(), session);
}

#[test]
fn parallel_channels_do_not_interfere() {
    let (_, registry) = memory_registry();
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let registry = registry.clone();
            thread::spawn(move || {
                let channel = format!("chan-{}", n);
                registry
                    .create_session(&channel, NewGame::new(Mode::Random))
                    .unwrap();
                for mv in ["D4", "Q16", "D16", "Q4"] {
                    registry.submit_move(&channel, "p", "p", mv).unwrap();
                }
                registry.resign(&channel, Color::Black).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(registry.channels().is_empty());
}

#[test]
fn non_finite_komi_survives_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let registry = Registry::new(store.clone());

    registry
        .create_session("c", NewGame::new(Mode::Random).with_komi(f32::INFINITY))
        .unwrap();
    registry.submit_move("c", "a", "a", "D4").unwrap();
    drop(registry);

    let reloaded = Registry::load(store).unwrap();
    let session = reloaded.snapshot("c").unwrap();
    assert_eq!(session.record.setup.komi, rengo_core::setup::DEFAULT_KOMI);
    assert_eq!(session.record.len(), 1);
    assert_eq!(
        reloaded.create_session("c", NewGame::new(Mode::Random)).unwrap_err(),
        Rejection::GameAlreadyActive
    );
}

#[test]
fn channels_with_similar_names_keep_separate_games() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let registry = Registry::new(store.clone());

    registry.create_session("a/b", NewGame::new(Mode::Random)).unwrap();
    registry.create_session("a_b", NewGame::new(Mode::Random)).unwrap();
    registry.submit_move("a/b", "p", "p", "D4").unwrap();
    drop(registry);

    let reloaded = Registry::load(store).unwrap();
    assert_eq!(reloaded.channels(), vec!["a/b", "a_b"]);
    assert_eq!(reloaded.snapshot("a/b").unwrap().record.len(), 1);
    assert!(reloaded.snapshot("a_b").unwrap().record.is_empty());
}

#[test]
fn unreadable_session_file_disables_the_channel() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let registry = Registry::new(store.clone());
    registry.create_session("c", NewGame::new(Mode::Random)).unwrap();
    registry.submit_move("c", "a", "a", "D4").unwrap();
    drop(registry);

    let path = store.dir().join("c.json");
    std::fs::write(&path, b"{\"channel_id\": \"c\", \"mode\":").unwrap();

    let reloaded = Registry::load(store).unwrap();
    for err in [
        reloaded.create_session("c", NewGame::new(Mode::Random)).unwrap_err(),
        reloaded.submit_move("c", "a", "a", "Q16").unwrap_err(),
        reloaded.current_board("c").unwrap_err(),
    ] {
        assert!(matches!(err, EngineError::CorruptHistory { .. }), "{:?}", err);
    }
    assert!(reloaded.channels().is_empty());

    // The damaged file is left for an operator
    assert_eq!(std::fs::read(&path).unwrap(), b"{\"channel_id\": \"c\", \"mode\":");
}

#[test]
fn resign_succeeds_once_the_game_is_archived() {
    let (store, registry) = memory_registry();
    registry.create_session("c", NewGame::new(Mode::Random)).unwrap();
    registry.submit_move("c", "a", "a", "D4").unwrap();

    store.set_failing_removes(true);
    let finished = registry.resign("c", Color::Black).unwrap();
    assert_eq!(finished.session.record.len(), 1);
    assert_eq!(store.archived().len(), 1);

    // A second resign finds no game and archives nothing
    assert_eq!(
        registry.resign("c", Color::Black).unwrap_err(),
        Rejection::NoActiveGame
    );
    assert_eq!(store.archived().len(), 1);
    assert!(registry.channels().is_empty());
}
