use std::fs;
use std::path::{Path, PathBuf};
use rayon::prelude::*;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{CastlingMode, Chess, Position};
use tracing::{debug, info, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Fingerprint, Move, IMPORT_DEPTH, IMPORT_VALUE};
use crate::import::game_record::{parse_games, GameRecord};
use crate::index::position_index::{InsertOutcome, PositionIndex};
use crate::storage::experience_file;
use crate::storage::file_lock::FileLock;
use crate::storage::maintenance::MaintenanceSummary;
use crate::storage::record::Record;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub workers: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            workers: num_cpus::get(),
        }
    }
}

/// Facts recovered from one game
#[derive(Debug, Clone, Default)]
pub struct GameFacts {
    pub records: Vec<Record>,
    pub plies: usize,
    /// Replay stopped early on a move that did not parse or was illegal
    pub truncated: bool,
}

/// Position the game starts from: the `FEN` tag when present, else the
/// standard initial position. FENs with Chess960 castling rights are accepted.
pub fn starting_position(game: &GameRecord) -> Result<Chess> {
    let Some(text) = game.tag("FEN") else {
        return Ok(Chess::default());
    };

    let fen: Fen = text
        .trim()
        .parse()
        .map_err(|e| Error::new(ErrorKind::Parse, format!("Invalid FEN '{}': {}", text, e)))?;

    match fen.clone().into_position::<Chess>(CastlingMode::Standard) {
        Ok(pos) => Ok(pos),
        Err(_) => fen
            .into_position::<Chess>(CastlingMode::Chess960)
            .map_err(|e| Error::new(ErrorKind::Parse, format!("Illegal FEN '{}': {}", text, e))),
    }
}

/// Replays the main line and emits one placeholder record per played move.
pub fn replay(game: &GameRecord) -> GameFacts {
    let mut facts = GameFacts::default();
    let mut pos = match starting_position(game) {
        Ok(pos) => pos,
        Err(e) => {
            debug!(error = %e, "skipping game");
            facts.truncated = true;
            return facts;
        }
    };

    for text in &game.moves {
        let text = text.trim_end_matches(['!', '?']);
        let m = match text.parse::<SanPlus>().map(|san| san.san.to_move(&pos)) {
            Ok(Ok(m)) => m,
            _ => {
                debug!(san = text, ply = facts.plies, "stopping replay at unplayable move");
                facts.truncated = true;
                break;
            }
        };

        facts.records.push(Record::clamped(
            Fingerprint::of(&pos),
            Move::from(&m),
            IMPORT_VALUE,
            IMPORT_DEPTH,
        ));
        facts.plies += 1;
        pos.play_unchecked(&m);
    }
    facts
}

/// Converts a file of recorded games into experience, merging into `output`
/// when it already exists.
pub fn convert_from_game_records(source: &Path, output: &Path, options: &ImportOptions) -> Result<MaintenanceSummary> {
    let bytes = fs::read(source).map_err(|e| {
        let e = Error::from(e);
        Error::new(e.kind, format!("{}: {}", source.display(), e.context))
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let games = parse_games(&text);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .build()
        .map_err(|e| Error::new(ErrorKind::InvalidState, format!("Failed to start import workers: {}", e)))?;
    let replayed: Vec<GameFacts> = pool.install(|| games.par_iter().map(replay).collect());

    let truncated_games = replayed.iter().filter(|facts| facts.truncated).count();
    if truncated_games > 0 {
        warn!(games = truncated_games, "some games contained unplayable moves and were cut short");
    }

    let _lock = FileLock::acquire(output, true)?;
    let mut index = match experience_file::load(output) {
        Ok((index, _)) => index,
        Err(e) if e.is_not_found() => PositionIndex::new(),
        Err(e) => return Err(e),
    };

    let mut records_read = 0;
    let mut duplicates_merged = 0;
    for facts in replayed {
        records_read += facts.records.len();
        for record in facts.records {
            if index.insert(record) == InsertOutcome::Merged {
                duplicates_merged += 1;
            }
        }
    }

    experience_file::save(output, &index)?;

    let summary = MaintenanceSummary {
        operation: "convert".to_string(),
        files_read: 1,
        records_read,
        records_written: index.len(),
        positions: index.positions(),
        duplicates_merged,
        truncated_bytes: 0,
        output: output.to_path_buf(),
    };
    info!(%summary, games = games.len(), "imported recorded games");
    Ok(summary)
}

/// `convert <games> <output>` with a raw argument list
pub fn convert_args(args: &[PathBuf], options: &ImportOptions) -> Result<MaintenanceSummary> {
    match args {
        [source, output] => convert_from_game_records(source, output, options),
        _ => Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("convert expects a game file and an output file, got {} argument(s)", args.len()),
        )),
    }
}
