use std::fs;
use shakmaty::{Chess, Position};
use tempfile::tempdir;
use expstore::core::types::{Fingerprint, Move, IMPORT_DEPTH, IMPORT_VALUE};
use expstore::import::converter::{convert_args, convert_from_game_records, ImportOptions};
use expstore::storage::experience_file::load;
use expstore::storage::record::{Format, Record};

const GAMES: &str = r#"[Event "Club"]
[White "W"]
[Black "B"]
[Result "1-0"]

1. e4 e5 2. Nf3 (2. f4 exf4) Nc6 3. Bb5 {Ruy Lopez} a6 $1 4. Ba4 Nf6 5. O-O 1-0

[Event "Club"]
[Result "0-1"]

1. e4 c5 2. Nf3 d6 0-1

[Event "Endgame"]
[FEN "8/8/8/8/8/8/8/K6k w - - 0 1"]

1. Kb2 Kg2 *
"#;

fn mv(uci: &str) -> Move {
    Move::from_uci(uci).unwrap()
}

fn options() -> ImportOptions {
    ImportOptions { workers: 2 }
}

#[test]
fn converts_games_into_placeholder_records() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("games.pgn");
    let output = dir.path().join("games.exp");
    fs::write(&source, GAMES).unwrap();

    let summary = convert_from_game_records(&source, &output, &options()).unwrap();
    // 9 + 4 + 2 plies; only 1.e4 is shared by the first two games
    assert_eq!(summary.records_read, 15);
    assert_eq!(summary.duplicates_merged, 1);
    assert_eq!(summary.records_written, 14);
    assert!(summary.to_string().starts_with("convert:"));

    let (index, _) = load(&output).unwrap();
    let start = Fingerprint::of(&Chess::default());
    let e4 = index.find_move(start, mv("e2e4")).unwrap();
    assert_eq!((e4.value, e4.depth, e4.count), (IMPORT_VALUE, IMPORT_DEPTH, 2));
    assert!(index.iter().all(|r| r.depth == IMPORT_DEPTH));

    // the variation 2. f4 was not learned
    let mut after_e5 = Chess::default();
    for uci in ["e2e4", "e7e5"] {
        let m = shakmaty::uci::UciMove::from_ascii(uci.as_bytes()).unwrap().to_move(&after_e5).unwrap();
        after_e5.play_unchecked(&m);
    }
    let key = Fingerprint::of(&after_e5);
    assert!(index.find_move(key, mv("g1f3")).is_some());
    assert!(index.find_move(key, mv("f2f4")).is_none());

    // castling is stored king to rook
    assert!(index.iter().any(|r| r.mv == Move::castling(4, 7)));
}

#[test]
fn converting_into_existing_file_merges() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("one.pgn");
    let output = dir.path().join("existing.exp");
    fs::write(&source, "1. d4 d5 *").unwrap();

    let start = Fingerprint::of(&Chess::default());
    fs::write(&output, Record::new(start, mv("d2d4"), 40, 16, 3).to_bytes(Format::V2)).unwrap();

    let summary = convert_args(&[source, output.clone()], &options()).unwrap();
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.duplicates_merged, 1);

    let (index, _) = load(&output).unwrap();
    let d4 = index.find_move(start, mv("d2d4")).unwrap();
    // deeper searched evidence is kept, the observation still counts
    assert_eq!((d4.value, d4.depth, d4.count), (40, 16, 4));
}

#[test]
fn escaped_tag_values_keep_the_game() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("escaped.pgn");
    let output = dir.path().join("escaped.exp");
    fs::write(
        &source,
        "[FEN \"8/8/8/8/8/8/8/K6k w - - 0 1\"]\n[Event \"The \\\"Big\\\" One\"]\n1. Kb2 Kg2 *\n",
    )
    .unwrap();

    let summary = convert_from_game_records(&source, &output, &options()).unwrap();
    assert_eq!(summary.records_read, 2);
}

#[test]
fn unplayable_moves_cut_the_game_short() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("broken.pgn");
    let output = dir.path().join("broken.exp");
    fs::write(&source, "1. e4 e5 2. Qxf7 Nc6 1-0\n1. c4 *\n").unwrap();

    let summary = convert_from_game_records(&source, &output, &options()).unwrap();
    assert_eq!(summary.records_read, 3);
    assert_eq!(summary.records_written, 3);
}

#[test]
fn missing_source_is_reported() {
    let dir = tempdir().unwrap();
    let err = convert_from_game_records(&dir.path().join("nope.pgn"), &dir.path().join("out.exp"), &options())
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!dir.path().join("out.exp").exists());
    assert!(!dir.path().join("out.exp.lock").exists());
}
