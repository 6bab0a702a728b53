pub mod channel; // Control → render command delivery
pub mod config;
pub mod engine; // Render loop and control handle
pub mod error;
pub mod sequencer; // Beat clock, probability, ratchets, mutation
pub mod synth; // Voice allocation

pub use channel::{command_channel, Command, CommandReceiver, CommandSender};
pub use config::EngineConfig;
pub use engine::{Engine, EngineHandle};
pub use error::{ConfigError, EngineError};
pub use sequencer::{Direction, NoteSink, SequenceLoad, Sequencer, SequencerEvent};
pub use synth::{SineVoice, VoiceEngine, VoiceFactory, VoicePool};
