//! Render loop and its control-side handle.
//!
//! `Engine` is owned by the audio callback. It applies queued commands once
//! per buffer, then for every sample advances the sequencer (which plays the
//! voice pool) and mixes the pool.
//!
//! `EngineHandle` lives on the control thread and is the only way to reach a
//! running engine.

mod handle;

pub use handle::EngineHandle;

use crate::{
    channel::{command_channel, Command, CommandReceiver},
    config::EngineConfig,
    error::ConfigError,
    sequencer::{event::clamp_velocity, MutationConfig, Sequencer},
    synth::{midi_to_freq, VoiceEngine, VoiceFactory, VoicePool},
};

pub struct Engine<V> {
    sequencer: Sequencer,
    voices: VoicePool<V>,
    commands: CommandReceiver,
    sample_rate: f32,
    gain: f32,
}

impl<V: VoiceEngine> Engine<V> {
    /// Build the render side and its handle. All allocation happens here.
    pub fn new<F>(config: EngineConfig, factory: &F) -> Result<(Self, EngineHandle), ConfigError>
    where
        F: VoiceFactory<Voice = V> + ?Sized,
    {
        config.validate()?;

        let (sender, commands) = command_channel(config.command_capacity);
        let sequencer = Sequencer::new(config.sample_rate, config.seed);
        let handle = EngineHandle::new(sender, sequencer.mutation_reader());

        tracing::debug!(
            sample_rate = config.sample_rate,
            voices = config.voices,
            command_capacity = commands.capacity(),
            "engine created"
        );

        let engine = Self {
            sequencer,
            voices: VoicePool::new(factory, config.voices, config.sample_rate),
            commands,
            sample_rate: config.sample_rate,
            gain: 1.0,
        };
        Ok((engine, handle))
    }

    /// Apply every queued command. Called once per buffer.
    pub fn drain_commands(&mut self) {
        while let Some(command) = self.commands.pop() {
            self.apply(&command);
            self.commands.recycle(command);
        }
    }

    fn apply(&mut self, command: &Command) {
        let Self {
            sequencer,
            voices,
            gain: master_gain,
            ..
        } = self;

        match *command {
            Command::NoteOn { pitch, velocity } => {
                let pitch = pitch.min(127);
                let velocity = clamp_velocity(velocity);
                voices.note_on(pitch, velocity, midi_to_freq(pitch));
            }
            Command::NoteOff { pitch } => voices.note_off(pitch),
            Command::AllNotesOff => voices.all_notes_off(),
            Command::LoadSequence(ref load) => sequencer.load(load, voices),
            Command::SetGlobalProbability(p) => sequencer.set_global_probability(p),
            Command::SetMutation {
                amount,
                range,
                scale,
            } => sequencer.set_mutation(MutationConfig::new(amount, range, scale)),
            Command::ResetMutation => sequencer.reset_mutation(),
            Command::FreezeMutation => sequencer.freeze_mutation(),
            Command::StartTransport { bpm } => sequencer.start(bpm, voices),
            Command::StopTransport => sequencer.stop(voices),
            Command::SetBpm(bpm) => sequencer.set_bpm(bpm),
            Command::SetDirection(direction) => sequencer.set_direction(direction, voices),
            Command::SetAccumulator(config) => sequencer.set_accumulator(config),
            Command::SetParameter { id, value } => voices.set_param(id, value),
            Command::SetGain(gain) => {
                if gain.is_finite() {
                    *master_gain = gain.max(0.0);
                }
            }
        }
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        self.sequencer.advance(&mut self.voices);
        self.voices.render_sample() * self.gain
    }

    /// Render a mono block.
    pub fn process_block(&mut self, out: &mut [f32]) {
        self.drain_commands();
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Render into an interleaved buffer, copying the mono mix to every channel.
    pub fn process_interleaved(&mut self, out: &mut [f32], channels: usize) {
        self.drain_commands();
        for frame in out.chunks_mut(channels.max(1)) {
            let sample = self.next_sample();
            frame.fill(sample);
        }
    }

    /// Follow a device whose rate differs from the configured one.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return;
        }
        self.sample_rate = sample_rate;
        self.sequencer.set_sample_rate(sample_rate);
        self.voices.set_sample_rate(sample_rate);
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn voices(&self) -> &VoicePool<V> {
        &self.voices
    }
}
