use crate::{
    channel::{Command, CommandSender},
    error::EngineError,
    sequencer::{AccumulatorConfig, Direction, MutationConfig, MutationReader, Scale, SequenceLoad},
};

/// Control-thread side of a running [`Engine`](super::Engine).
///
/// `try_send` reports a full queue to the caller. `send` and the typed
/// helpers are fire-and-forget: a dropped command is logged and forgotten.
pub struct EngineHandle {
    sender: CommandSender,
    mutation: MutationReader,
}

impl EngineHandle {
    pub(crate) fn new(sender: CommandSender, mutation: MutationReader) -> Self {
        Self { sender, mutation }
    }

    pub fn try_send(&mut self, command: Command) -> Result<(), EngineError> {
        self.sender
            .push(command)
            .map_err(|rejected| EngineError::QueueFull(rejected.name()))
    }

    /// Send, logging a warning if the queue is full.
    pub fn send(&mut self, command: Command) {
        if let Err(e) = self.try_send(command) {
            tracing::warn!(pending = self.sender.len(), "{e}");
        }
    }

    pub fn note_on(&mut self, pitch: u8, velocity: f32) {
        self.send(Command::NoteOn { pitch, velocity });
    }

    pub fn note_off(&mut self, pitch: u8) {
        self.send(Command::NoteOff { pitch });
    }

    pub fn all_notes_off(&mut self) {
        self.send(Command::AllNotesOff);
    }

    pub fn load_sequence(&mut self, load: SequenceLoad) {
        tracing::debug!(
            events = load.events.len(),
            length = load.length_in_beats,
            direction = ?load.direction,
            "loading sequence"
        );
        self.send(Command::LoadSequence(Box::new(load)));
    }

    pub fn start(&mut self, bpm: f64) {
        self.send(Command::StartTransport { bpm });
    }

    pub fn stop(&mut self) {
        self.send(Command::StopTransport);
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.send(Command::SetBpm(bpm));
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.send(Command::SetDirection(direction));
    }

    pub fn set_global_probability(&mut self, probability: f32) {
        self.send(Command::SetGlobalProbability(probability));
    }

    pub fn set_mutation(&mut self, amount: f32, range: u8, scale: Scale) {
        self.send(Command::SetMutation {
            amount,
            range,
            scale,
        });
    }

    pub fn set_mutation_config(&mut self, config: MutationConfig) {
        self.set_mutation(config.amount, config.range, config.scale);
    }

    pub fn reset_mutation(&mut self) {
        self.send(Command::ResetMutation);
    }

    /// Ask the render thread to publish its current mutated pitches.
    ///
    /// The snapshot is visible through [`mutation_reader`](Self::mutation_reader)
    /// once the next buffer has been processed.
    pub fn freeze_mutation(&mut self) {
        self.send(Command::FreezeMutation);
    }

    pub fn set_accumulator(&mut self, config: AccumulatorConfig) {
        self.send(Command::SetAccumulator(config));
    }

    pub fn set_parameter(&mut self, id: u32, value: f32) {
        self.send(Command::SetParameter { id, value });
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.send(Command::SetGain(gain));
    }

    pub fn mutation_reader(&self) -> MutationReader {
        self.mutation.clone()
    }

    /// Commands not yet picked up by the render thread.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}
