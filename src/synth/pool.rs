use crate::sequencer::NoteSink;

use super::{
    factory::VoiceFactory,
    midi_to_freq,
    voice::{VoiceEngine, VoiceSlot},
};

/// Fixed-size polyphonic voice pool.
///
/// Allocation order for a new note:
/// 1. a slot already bound to the same pitch (retrigger)
/// 2. any idle slot
/// 3. the slot with the strictly lowest envelope level (first one on ties)
///
/// A released voice keeps its pitch binding until its engine reports idle,
/// so a quick re-press of the same key reuses the ringing voice.
pub struct VoicePool<V> {
    slots: Vec<VoiceSlot<V>>,
    sample_rate: f32,
}

impl<V: VoiceEngine> VoicePool<V> {
    /// Allocates every slot up front; nothing allocates afterwards.
    pub fn new<F>(factory: &F, voices: usize, sample_rate: f32) -> Self
    where
        F: VoiceFactory<Voice = V> + ?Sized,
    {
        Self {
            slots: (0..voices)
                .map(|_| VoiceSlot::new(factory.create_voice()))
                .collect(),
            sample_rate,
        }
    }

    /// Start `pitch` and return the slot that plays it.
    ///
    /// `None` only for a pool with no slots.
    pub fn note_on(&mut self, pitch: u8, velocity: f32, frequency: f32) -> Option<usize> {
        let index = self.allocate(pitch)?;
        self.slots[index].start(pitch, velocity, frequency);
        Some(index)
    }

    fn allocate(&self, pitch: u8) -> Option<usize> {
        if let Some(index) = self.slots.iter().position(|s| s.pitch() == Some(pitch)) {
            return Some(index);
        }
        if let Some(index) = self.slots.iter().position(|s| s.is_idle()) {
            return Some(index);
        }

        let mut victim: Option<(usize, f32)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            let level = slot.envelope_level();
            match victim {
                Some((_, lowest)) if level >= lowest => {}
                _ => victim = Some((index, level)),
            }
        }
        victim.map(|(index, _)| index)
    }

    /// Release the first held voice bound to `pitch`.
    pub fn note_off(&mut self, pitch: u8) {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.is_gated() && s.pitch() == Some(pitch))
        {
            slot.release();
        }
    }

    /// Kill every sounding or bound voice without a release tail.
    pub fn all_notes_off(&mut self) {
        for slot in &mut self.slots {
            if slot.is_active() || slot.pitch().is_some() {
                slot.kill();
            }
        }
    }

    /// Mix one sample of every active voice.
    #[inline]
    pub fn render_sample(&mut self) -> f32 {
        let sample_rate = self.sample_rate;
        self.slots.iter_mut().map(|s| s.render(sample_rate)).sum()
    }

    pub fn render_block(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.render_sample();
        }
    }

    /// Broadcast a patch parameter to every engine.
    pub fn set_param(&mut self, id: u32, value: f32) {
        for slot in &mut self.slots {
            slot.engine_mut().set_param(id, value);
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Voices currently producing output.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&VoiceSlot<V>> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[VoiceSlot<V>] {
        &self.slots
    }
}

impl<V: VoiceEngine> NoteSink for VoicePool<V> {
    fn note_on(&mut self, pitch: u8, velocity: f32) {
        VoicePool::note_on(self, pitch, velocity, midi_to_freq(pitch));
    }

    fn note_off(&mut self, pitch: u8) {
        VoicePool::note_off(self, pitch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::voice::VoiceState;

    /// Engine whose level is set directly and decays by a fixed step once released.
    #[derive(Default)]
    struct TestVoice {
        level: f32,
        releasing: bool,
        pitch: u8,
        triggers: u32,
    }

    const RELEASE_STEP: f32 = 0.25;

    impl VoiceEngine for TestVoice {
        fn trigger(&mut self, pitch: u8, velocity: f32, _frequency: f32) {
            self.pitch = pitch;
            self.level = velocity;
            self.releasing = false;
            self.triggers += 1;
        }

        fn release(&mut self) {
            self.releasing = true;
        }

        fn kill(&mut self) {
            self.level = 0.0;
            self.releasing = false;
        }

        fn is_active(&self) -> bool {
            self.level > 0.0
        }

        fn envelope_level(&self) -> f32 {
            self.level
        }

        fn next_sample(&mut self, _sample_rate: f32) -> f32 {
            if self.releasing {
                self.level = (self.level - RELEASE_STEP).max(0.0);
            }
            self.level
        }

        fn set_param(&mut self, _id: u32, value: f32) {
            self.level = value;
        }
    }

    fn pool(voices: usize) -> VoicePool<TestVoice> {
        VoicePool::new(&TestVoice::default, voices, 48_000.0)
    }

    #[test]
    fn idle_slots_are_used_in_order() {
        let mut pool = pool(3);
        assert_eq!(pool.note_on(60, 1.0, 261.6), Some(0));
        assert_eq!(pool.note_on(64, 1.0, 329.6), Some(1));
        assert_eq!(pool.active_count(), 2);
        assert_eq!(pool.slot(1).and_then(|s| s.pitch()), Some(64));
    }

    #[test]
    fn same_pitch_reuses_its_slot() {
        let mut pool = pool(4);
        pool.note_on(60, 1.0, 261.6);
        pool.note_on(62, 1.0, 293.7);
        assert_eq!(pool.note_on(60, 0.5, 261.6), Some(0));
        assert_eq!(pool.slot(0).map(|s| s.engine().triggers), Some(2));
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn steals_the_strictly_lowest_level() {
        let mut pool = pool(3);
        pool.note_on(60, 0.9, 0.0);
        pool.note_on(62, 0.3, 0.0);
        pool.note_on(64, 0.6, 0.0);

        assert_eq!(pool.note_on(67, 1.0, 0.0), Some(1));
        assert_eq!(pool.slot(1).and_then(|s| s.pitch()), Some(67));
    }

    #[test]
    fn first_slot_wins_level_ties() {
        let mut pool = pool(3);
        pool.note_on(60, 0.5, 0.0);
        pool.note_on(62, 0.5, 0.0);
        pool.note_on(64, 0.5, 0.0);
        assert_eq!(pool.note_on(67, 1.0, 0.0), Some(0));
    }

    #[test]
    fn release_keeps_binding_until_idle() {
        let mut pool = pool(2);
        pool.note_on(60, 1.0, 0.0);
        pool.note_off(60);

        let slot = pool.slot(0).map(|s| (s.pitch(), s.state()));
        assert_eq!(slot, Some((Some(60), VoiceState::Releasing)));

        // 1.0 decays to zero in four samples
        for _ in 0..3 {
            pool.render_sample();
        }
        assert_eq!(pool.slot(0).and_then(|s| s.pitch()), Some(60));
        pool.render_sample();
        assert_eq!(pool.slot(0).and_then(|s| s.pitch()), None);
        assert_eq!(pool.slot(0).map(|s| s.state()), Some(VoiceState::Free));
    }

    #[test]
    fn note_off_ignores_released_voices() {
        let mut pool = pool(2);
        pool.note_on(60, 1.0, 0.0);
        pool.note_off(60);
        pool.note_off(60);
        pool.render_sample();
        assert_eq!(pool.slot(0).map(|s| s.envelope_level()), Some(0.75));
    }

    #[test]
    fn all_notes_off_kills_immediately() {
        let mut pool = pool(3);
        pool.note_on(60, 1.0, 0.0);
        pool.note_on(64, 1.0, 0.0);
        pool.note_off(64);

        pool.all_notes_off();
        assert_eq!(pool.active_count(), 0);
        assert!(pool.slots().iter().all(|s| s.pitch().is_none()));
        assert_eq!(pool.render_sample(), 0.0);
    }

    #[test]
    fn all_notes_off_on_a_silent_pool_is_a_no_op() {
        let mut pool = pool(2);
        pool.all_notes_off();
        pool.all_notes_off();
        assert_eq!(pool.active_count(), 0);
        assert!(pool.slots().iter().all(|s| s.state() == VoiceState::Free));
    }

    #[test]
    fn note_sink_derives_frequency_from_pitch() {
        let mut pool = pool(1);
        NoteSink::note_on(&mut pool, 69, 0.8);
        assert_eq!(pool.slot(0).map(|s| s.engine().pitch), Some(69));
        NoteSink::note_off(&mut pool, 69);
        assert_eq!(pool.slot(0).map(|s| s.state()), Some(VoiceState::Releasing));
    }

    #[test]
    fn set_param_reaches_every_voice() {
        let mut pool = pool(3);
        pool.set_param(0, 0.5);
        assert!(pool.slots().iter().all(|s| s.envelope_level() == 0.5));
    }

    #[test]
    fn empty_pool_refuses_notes() {
        let mut pool = pool(0);
        assert!(pool.is_empty());
        assert_eq!(pool.note_on(60, 1.0, 0.0), None);
        pool.note_off(60);
        assert_eq!(pool.render_sample(), 0.0);
    }
}
