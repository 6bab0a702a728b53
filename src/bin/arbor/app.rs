//! Arbor - device setup and the control loop

use std::time::{Duration, Instant};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use arbor_rt::{sequencer::MAX_EVENTS, Engine, EngineConfig, SineVoice};

use super::sequence_file::SequenceFile;

/// How often the control loop snapshots and logs the mutated pitches.
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

pub struct Arbor {
    sequence: SequenceFile,
    voices: usize,
    probability: f32,
    seed: Option<u64>,
}

impl Arbor {
    pub fn new(sequence: SequenceFile) -> Self {
        Self {
            sequence,
            voices: 8,
            probability: 1.0,
            seed: None,
        }
    }

    pub fn voices(mut self, voices: usize) -> Self {
        self.voices = voices;
        self
    }

    pub fn probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Play for `seconds`, then stop the transport and let the tails ring out.
    pub fn run_for(self, seconds: f64) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let mut engine_config = EngineConfig::default()
            .with_sample_rate(sample_rate)
            .with_voices(self.voices);
        if let Some(seed) = self.seed {
            engine_config = engine_config.with_seed(seed);
        }

        let (mut engine, mut handle) = Engine::new(engine_config, &SineVoice::default)?;

        tracing::info!(
            sample_rate,
            channels,
            bpm = self.sequence.bpm,
            events = self.sequence.events.len(),
            direction = ?self.sequence.direction,
            "starting playback"
        );

        handle.load_sequence(self.sequence.to_load());
        handle.set_global_probability(self.probability);
        handle.set_gain(0.5);
        handle.start(self.sequence.bpm);

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| engine.process_interleaved(data, channels),
            |err| tracing::error!(%err, "audio stream error"),
            None,
        )?;
        stream.play()?;

        let reader = handle.mutation_reader();
        let mut pitches = vec![0u8; MAX_EVENTS];
        let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));

        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(REPORT_INTERVAL.min(remaining));
            handle.freeze_mutation();
            // Give the render thread a buffer to publish the snapshot
            std::thread::sleep(Duration::from_millis(50));
            let count = reader.frozen_pitches(&mut pitches);
            tracing::info!(pitches = ?&pitches[..count], "current pitches");
        }

        handle.stop();
        std::thread::sleep(Duration::from_millis(500));
        tracing::info!("stopped");
        Ok(())
    }
}
