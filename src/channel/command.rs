use crate::sequencer::{AccumulatorConfig, Direction, Scale, SequenceLoad};

/// Control operations sent from the control thread to the render thread.
///
/// Everything except `LoadSequence` is plain data. `LoadSequence` owns a heap
/// allocation and is handed back to the producer after it is applied, see
/// [`CommandReceiver::recycle`](super::CommandReceiver::recycle).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NoteOn { pitch: u8, velocity: f32 },
    NoteOff { pitch: u8 },
    AllNotesOff,
    LoadSequence(Box<SequenceLoad>),
    SetGlobalProbability(f32),
    SetMutation { amount: f32, range: u8, scale: Scale },
    ResetMutation,
    FreezeMutation,
    StartTransport { bpm: f64 },
    StopTransport,
    SetBpm(f64),
    SetDirection(Direction),
    SetAccumulator(AccumulatorConfig),
    /// Patch parameter update broadcast to every voice
    SetParameter { id: u32, value: f32 },
    /// Master output gain
    SetGain(f32),
}

impl Command {
    /// Whether dropping this command frees memory.
    pub fn owns_heap(&self) -> bool {
        matches!(self, Command::LoadSequence(_))
    }

    /// Short variant name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Command::NoteOn { .. } => "NoteOn",
            Command::NoteOff { .. } => "NoteOff",
            Command::AllNotesOff => "AllNotesOff",
            Command::LoadSequence(_) => "LoadSequence",
            Command::SetGlobalProbability(_) => "SetGlobalProbability",
            Command::SetMutation { .. } => "SetMutation",
            Command::ResetMutation => "ResetMutation",
            Command::FreezeMutation => "FreezeMutation",
            Command::StartTransport { .. } => "StartTransport",
            Command::StopTransport => "StopTransport",
            Command::SetBpm(_) => "SetBpm",
            Command::SetDirection(_) => "SetDirection",
            Command::SetAccumulator(_) => "SetAccumulator",
            Command::SetParameter { .. } => "SetParameter",
            Command::SetGain(_) => "SetGain",
        }
    }
}
