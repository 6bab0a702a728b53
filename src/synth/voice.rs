/// Capability every synthesis engine exposes to the voice pool.
///
/// The pool only needs to start, stop and inspect a voice; how it produces
/// sound is the engine's business.
pub trait VoiceEngine: Send {
    fn trigger(&mut self, pitch: u8, velocity: f32, frequency: f32);

    /// Gate low: enter the release phase.
    fn release(&mut self);

    /// Silence immediately, skipping the release phase.
    fn kill(&mut self);

    /// True while the engine produces output, including its release tail.
    fn is_active(&self) -> bool;

    /// Current amplitude envelope in `[0, 1]`, used to pick a steal victim.
    fn envelope_level(&self) -> f32;

    fn next_sample(&mut self, sample_rate: f32) -> f32;

    /// Patch parameter update. Engines ignore ids they don't know.
    fn set_param(&mut self, _id: u32, _value: f32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // No binding, engine silent
    Gated,     // Note held
    Releasing, // Note released, engine still ringing
}

/// One entry of the voice pool: an engine plus its pitch binding.
pub struct VoiceSlot<V> {
    pitch: Option<u8>,
    state: VoiceState,
    engine: V,
}

impl<V: VoiceEngine> VoiceSlot<V> {
    pub fn new(engine: V) -> Self {
        Self {
            pitch: None,
            state: VoiceState::Free,
            engine,
        }
    }

    pub(crate) fn start(&mut self, pitch: u8, velocity: f32, frequency: f32) {
        self.pitch = Some(pitch);
        self.state = VoiceState::Gated;
        self.engine.trigger(pitch, velocity, frequency);
    }

    pub(crate) fn release(&mut self) {
        if self.state == VoiceState::Gated {
            self.state = VoiceState::Releasing;
            self.engine.release();
        }
    }

    pub(crate) fn kill(&mut self) {
        self.engine.kill();
        self.free();
    }

    pub(crate) fn render(&mut self, sample_rate: f32) -> f32 {
        if !self.engine.is_active() {
            if self.state != VoiceState::Free {
                self.free();
            }
            return 0.0;
        }

        let sample = self.engine.next_sample(sample_rate);
        if !self.engine.is_active() {
            self.free();
        }
        sample
    }

    fn free(&mut self) {
        self.pitch = None;
        self.state = VoiceState::Free;
    }

    /// Bound pitch, `None` when the slot is free.
    pub fn pitch(&self) -> Option<u8> {
        self.pitch
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_gated(&self) -> bool {
        self.state == VoiceState::Gated
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_active()
    }

    /// Silent and free to take a new note, even if the binding has not
    /// been cleared by a render yet.
    pub fn is_idle(&self) -> bool {
        !self.engine.is_active()
    }

    pub fn envelope_level(&self) -> f32 {
        self.engine.envelope_level()
    }

    pub fn engine(&self) -> &V {
        &self.engine
    }

    pub(crate) fn engine_mut(&mut self) -> &mut V {
        &mut self.engine
    }
}
