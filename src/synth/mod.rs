// Voice allocation: a fixed pool of engines behind the `VoiceEngine` seam.
// The sequencer and the command handler both drive the pool as a `NoteSink`.

pub mod factory;
pub mod pool;
pub mod sine;
pub mod voice;

pub use factory::VoiceFactory;
pub use pool::VoicePool;
pub use sine::SineVoice;
pub use voice::{VoiceEngine, VoiceSlot, VoiceState};

/// Equal-tempered frequency of a MIDI pitch, A4 (69) = 440 Hz.
pub fn midi_to_freq(pitch: u8) -> f32 {
    440.0 * 2.0_f32.powf((pitch as f32 - 69.0) / 12.0)
}
