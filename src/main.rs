use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Target};
use log::{LevelFilter, debug, warn};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod error;
mod feed;
mod labels;
mod livexy_api;
mod pipeline;
mod ptb;

use error::ErrorKind;
use labels::{BodyPosition, LabelEdit};
use livexy_api::{FeedSource, FileFeed, LiveXyClient};
use pipeline::{NO_DATA_MESSAGE, PtbOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "ptb-assessor",
    about = "Builds play-the-ball labelling sheets from LiveXY match feeds",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the raw LiveXY feed for a match
    Fetch {
        #[arg(long = "game-id")]
        game_id: i64,

        /// Output file (defaults to livexy_<game-id>.xml)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Build the play-the-ball table for a match and export it for labelling
    Extract {
        #[arg(long = "game-id")]
        game_id: i64,

        /// Read a saved feed instead of calling the API
        #[arg(long)]
        xml: Option<PathBuf>,

        #[arg(long = "out-dir", default_value = ".")]
        out_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },

    /// Set the labels of one row in an exported file
    Label {
        #[arg(long)]
        file: PathBuf,

        /// 1-based data row
        #[arg(long)]
        row: usize,

        #[arg(long, conflicts_with = "lost")]
        won: bool,

        #[arg(long)]
        lost: bool,

        /// front, back, standing or none
        #[arg(long = "body-position")]
        body_position: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn init_logging() {
    let mut builder = Builder::new();
    builder.target(Target::Stderr).filter_level(LevelFilter::Warn);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() -> ExitCode {
    init_logging();
    let args = Cli::parse();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<ExitCode> {
    match args.command {
        Command::Fetch { game_id, out } => {
            let client = LiveXyClient::from_env()?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("livexy_{}.xml", game_id)));
            let bytes = livexy_api::download_and_save_feed(&client, game_id, &out)
                .with_context(|| format!("Failed to download feed for game {}", game_id))?;
            println!("Saved {} bytes to {}", bytes, out.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Extract {
            game_id,
            xml,
            out_dir,
            format,
        } => {
            let source: Box<dyn FeedSource> = match xml {
                Some(path) => Box::new(FileFeed::new(&path)),
                None => match LiveXyClient::from_env() {
                    Ok(client) => Box::new(client),
                    Err(err) => {
                        warn!("Game {}: {}", game_id, err);
                        return Ok(no_data(ErrorKind::ConfigMissing));
                    }
                },
            };

            let rows = match pipeline::load_play_the_balls(source.as_ref(), game_id) {
                PtbOutcome::Rows(rows) => rows,
                PtbOutcome::NoData(kind) => return Ok(no_data(kind)),
            };
            let labels = labels::label_rows(rows);

            match format {
                OutputFormat::Csv => {
                    let path = labels::export_labels(&out_dir, game_id, &labels, &Local::now())?;
                    println!(
                        "Successfully retrieved play the ball data: {} rows written to {}",
                        labels.len(),
                        path.display()
                    );
                }
                OutputFormat::Json => {
                    let stdout = std::io::stdout();
                    serde_json::to_writer_pretty(stdout.lock(), &labels)?;
                    println!();
                }
            }

            Ok(ExitCode::SUCCESS)
        }
        Command::Label {
            file,
            row,
            won,
            lost,
            body_position,
        } => {
            let edit = LabelEdit {
                ptb_won: match (won, lost) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                body_position: body_position
                    .as_deref()
                    .map(BodyPosition::parse)
                    .transpose()?,
            };

            let updated = labels::update_label(&file, row, edit)?;
            println!(
                "Row {}: {} set {} tackle {} -> PTB Won={}, Body Position={}",
                row,
                updated.player_name.as_deref().unwrap_or("-"),
                updated.set_count,
                updated.tackle_number,
                updated.ptb_won,
                updated
                    .body_position
                    .map(|p| format!("{:?}", p))
                    .unwrap_or_default()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn no_data(kind: ErrorKind) -> ExitCode {
    debug!("No data outcome: {:?}", kind);
    println!("{}", NO_DATA_MESSAGE);
    ExitCode::FAILURE
}
