//! arbor - play a looping generative sequence through the default output device
//!
//! Run with: cargo run -- --seconds 20 --direction ping-pong --mutation 0.3
//! Set `RUST_LOG=arbor_rt=debug` for engine logs.

mod app;
mod sequence_file;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use arbor_rt::sequencer::Direction;

use app::Arbor;
use sequence_file::SequenceFile;

#[derive(Parser)]
#[clap(version, about = "Plays a looping, self-mutating sequence.")]
struct Cli {
    /// JSON sequence file. Plays a built-in arpeggio when omitted.
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Tempo, overrides the file's bpm.
    #[arg(short, long)]
    bpm: Option<f64>,
    /// Step order, overrides the file's direction.
    #[arg(short, long, value_enum)]
    direction: Option<DirectionArg>,
    /// How long to play before stopping.
    #[arg(short, long, default_value_t = 16.0)]
    seconds: f64,
    /// Voice pool size.
    #[arg(short, long, default_value_t = 8)]
    voices: usize,
    /// Per-event chance of mutating at each loop.
    #[arg(short, long)]
    mutation: Option<f32>,
    /// Maximum mutation shift in scale degrees.
    #[arg(long, default_value_t = 2)]
    range: u8,
    /// Global probability applied to every event.
    #[arg(short, long, default_value_t = 1.0)]
    probability: f32,
    /// Random seed; the same seed replays the same performance.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Forward,
    Reverse,
    PingPong,
    Random,
    Brownian,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Forward => Direction::Forward,
            DirectionArg::Reverse => Direction::Reverse,
            DirectionArg::PingPong => Direction::PingPong,
            DirectionArg::Random => Direction::Random,
            DirectionArg::Brownian => Direction::Brownian,
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut sequence = match &cli.file {
        Some(path) => SequenceFile::load(path)?,
        None => SequenceFile::demo(),
    };
    if let Some(bpm) = cli.bpm {
        sequence.bpm = bpm;
    }
    if let Some(direction) = cli.direction {
        sequence.direction = direction.into();
    }
    if let Some(amount) = cli.mutation {
        sequence.mutation.amount = amount;
        sequence.mutation.range = cli.range;
    }

    Arbor::new(sequence)
        .voices(cli.voices)
        .probability(cli.probability)
        .seed(cli.seed)
        .run_for(cli.seconds)
}
