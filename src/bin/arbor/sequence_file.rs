//! On-disk sequence format.
//!
//! ```json
//! {
//!   "bpm": 110,
//!   "length_in_beats": 4,
//!   "direction": "PingPong",
//!   "events": [
//!     { "pitch": 60, "start": 0.0, "end": 0.5 },
//!     { "pitch": 67, "start": 1.0, "end": 2.0, "probability": 0.5, "ratchets": 3 }
//!   ]
//! }
//! ```

use std::{fs, path::Path};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use serde::Deserialize;

use arbor_rt::sequencer::{
    AccumulatorConfig, Direction, MutationConfig, Scale, ScaleKind, SequenceLoad, SequencerEvent,
};

#[derive(Debug, Deserialize)]
pub struct SequenceFile {
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    pub length_in_beats: f64,
    #[serde(default)]
    pub direction: Direction,
    pub events: Vec<NoteEntry>,
    #[serde(default)]
    pub mutation: MutationConfig,
    #[serde(default)]
    pub accumulator: AccumulatorConfig,
}

#[derive(Debug, Deserialize)]
pub struct NoteEntry {
    pub pitch: i32,
    pub start: f64,
    pub end: f64,
    #[serde(default = "one")]
    pub velocity: f32,
    #[serde(default = "one")]
    pub probability: f32,
    #[serde(default = "single")]
    pub ratchets: u8,
}

fn default_bpm() -> f64 {
    120.0
}

fn one() -> f32 {
    1.0
}

fn single() -> u8 {
    1
}

impl SequenceFile {
    pub fn load(path: &Path) -> EyreResult<Self> {
        let text = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let file: Self = serde_json::from_str(&text)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
        tracing::info!(path = %path.display(), events = file.events.len(), "loaded sequence");
        Ok(file)
    }

    /// Two bars of C minor pentatonic with a ratcheted accent.
    pub fn demo() -> Self {
        let pitches = [60, 63, 65, 67, 70, 67, 65, 63];
        let events = pitches
            .iter()
            .enumerate()
            .map(|(i, &pitch)| NoteEntry {
                pitch,
                start: i as f64 * 0.5,
                end: i as f64 * 0.5 + 0.4,
                velocity: if i % 4 == 0 { 1.0 } else { 0.7 },
                probability: if i % 2 == 0 { 1.0 } else { 0.75 },
                ratchets: if i == 4 { 3 } else { 1 },
            })
            .collect();

        Self {
            bpm: 112.0,
            length_in_beats: 4.0,
            direction: Direction::Forward,
            events,
            mutation: MutationConfig::new(0.0, 2, Scale::from_kind(0, ScaleKind::MinorPentatonic)),
            accumulator: AccumulatorConfig::default(),
        }
    }

    pub fn to_load(&self) -> SequenceLoad {
        let events = self
            .events
            .iter()
            .map(|note| {
                SequencerEvent::new(note.pitch, note.velocity, note.start, note.end)
                    .with_probability(note.probability)
                    .with_ratchets(note.ratchets)
            })
            .collect();

        SequenceLoad::new(events, self.length_in_beats)
            .with_direction(self.direction)
            .with_mutation(self.mutation)
            .with_accumulator(self.accumulator)
    }
}
