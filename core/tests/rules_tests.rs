// SPDX-License-Identifier: MIT OR Apache-2.0

use rengo_core::{board::Board, rules, Color, Coord, Rejection};

fn at(text: &str) -> Coord {
    Coord::parse(text).unwrap()
}

fn board_with(black: &[&str], white: &[&str]) -> Board {
    let mut board = Board::new();
    for p in black {
        assert!(board.place(at(p), Color::Black));
    }
    for p in white {
        assert!(board.place(at(p), Color::White));
    }
    board
}

#[test]
fn ko_capture_records_ko_point() {
    // White F6 is surrounded on three sides; black G6 is surrounded by white
    // on the other three.
    let board = board_with(&["F7", "F5", "E6"], &["F6", "G7", "G5", "H6"]);

    let placement = rules::apply(&board, Color::Black, at("G6")).unwrap();
    assert_eq!(placement.captured, vec![at("F6")]);
    assert_eq!(placement.ko_point, Some(at("F6")));
    assert_eq!(placement.board.get(at("F6")), None);
}

#[test]
fn capturing_two_stones_is_not_ko() {
    let board = board_with(&["A3", "B2", "C1"], &["A2", "B1"]);
    let placement = rules::apply(&board, Color::Black, at("A1")).unwrap();
    assert_eq!(placement.captured.len(), 2);
    assert_eq!(placement.ko_point, None);
}

#[test]
fn single_capture_with_extra_liberties_is_not_ko() {
    let board = board_with(&["F7", "F5", "E6"], &["F6"]);
    let placement = rules::apply(&board, Color::Black, at("G6")).unwrap();
    assert_eq!(placement.captured, vec![at("F6")]);
    assert_eq!(placement.ko_point, None);
}

#[test]
fn self_capture() {
    // White stones surrounding an empty point
    let board = board_with(&[], &["A2", "B1", "B3", "C2"]);

    // Black can't play at B2, but White can
    assert_eq!(
        rules::apply(&board, Color::Black, at("B2")),
        Err(Rejection::Suicide)
    );
    assert!(rules::apply(&board, Color::White, at("B2")).is_ok());
}

#[test]
fn capture_detection() {
    // Two white stones with a single liberty left at D4
    let board = board_with(&["C5", "D6", "E6", "F5", "E4"], &["D5", "E5"]);

    let placement = rules::apply(&board, Color::Black, at("D4")).unwrap();
    let mut captured = placement.captured.clone();
    captured.sort();
    assert_eq!(captured, vec![at("D5"), at("E5")]);
    assert_eq!(placement.board.count_stones_for(Color::White), 0);
}

#[test]
fn group_with_two_liberties_is_never_removed() {
    let board = board_with(&["C5", "D6", "E6", "F5"], &["D5", "E5"]);

    for point in ["D4", "E4"] {
        let placement = rules::apply(&board, Color::Black, at(point)).unwrap();
        assert!(placement.captured.is_empty(), "{} should not capture", point);
    }
}

#[test]
fn corner_capture() {
    let board = board_with(&["B1"], &["A1"]);
    let placement = rules::apply(&board, Color::Black, at("A2")).unwrap();
    assert_eq!(placement.captured, vec![at("A1")]);
}

#[test]
fn placement_does_not_mutate_input() {
    let board = board_with(&["D4"], &[]);
    let before = board.clone();
    let _ = rules::apply(&board, Color::White, at("D5")).unwrap();
    assert_eq!(board, before);
}

#[test]
fn apply_is_deterministic() {
    let board = board_with(&["F7", "F5", "E6"], &["F6", "G7", "G5", "H6"]);
    let first = rules::apply(&board, Color::Black, at("G6")).unwrap();
    let second = rules::apply(&board, Color::Black, at("G6")).unwrap();
    assert_eq!(first, second);
}
