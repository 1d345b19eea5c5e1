use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};
use tracing::error;
use tracing_subscriber::EnvFilter;
use expstore::core::config::StoreConfig;
use expstore::core::error::{Error, ErrorKind, Result};
use expstore::core::store::ExperienceStore;
use expstore::core::types::LearningMode;
use expstore::import::converter::{convert_from_game_records, ImportOptions};
use expstore::scoring::quality::MaterialEvaluator;
use expstore::storage::maintenance::{defrag, merge};

#[derive(Parser)]
#[command(name = "expstore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Maintenance tools for engine experience files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold duplicate (position, move) records of a file in place
    Defrag {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Combine several experience files into one
    Merge {
        /// Input files followed by the output file
        #[arg(value_name = "FILE", num_args = 2.., required = true)]
        files: Vec<PathBuf>,
    },

    /// Import recorded games (PGN) into an experience file
    Convert {
        #[arg(value_name = "GAMES")]
        source: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Replay threads, defaults to the number of CPUs
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Print the stored moves of one position
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Position to look up, defaults to the initial position
        #[arg(long)]
        fen: Option<String>,

        /// Add a quality column
        #[arg(short, long)]
        extended: bool,
    },
}

fn parse_position(fen: Option<&str>) -> Result<Chess> {
    let Some(text) = fen else {
        return Ok(Chess::default());
    };
    let fen: Fen = text
        .parse()
        .map_err(|e| Error::new(ErrorKind::Parse, format!("Invalid FEN '{}': {}", text, e)))?;
    fen.into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| Error::new(ErrorKind::Parse, format!("Illegal FEN '{}': {}", text, e)))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Defrag { file } => println!("{}", defrag(&file)?),
        Commands::Merge { mut files } => {
            let output = files.pop().ok_or_else(|| {
                Error::new(ErrorKind::InvalidArgument, "merge needs an output file".to_string())
            })?;
            println!("{}", merge(&files, &output)?);
        }
        Commands::Convert { source, output, workers } => {
            let mut options = ImportOptions::default();
            if let Some(workers) = workers {
                options.workers = workers;
            }
            println!("{}", convert_from_game_records(&source, &output, &options)?);
        }
        Commands::Show { file, fen, extended } => {
            let pos = parse_position(fen.as_deref())?;
            let store = ExperienceStore::with_config(StoreConfig {
                mode: LearningMode::Standard,
                read_only: true,
                path: file,
                ..StoreConfig::default()
            })?;
            store.wait_for_loading_finished();

            let lines = store.show(&pos, extended, &MaterialEvaluator);
            if lines.is_empty() {
                println!("No experience for this position");
            }
            for line in lines {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
