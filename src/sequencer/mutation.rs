//! Scale-constrained pitch mutation and its cross-thread snapshot.
//!
//! The render thread owns the live pitches and writes them into whichever
//! of two atomic buffers is active. `freeze` copies the active buffer into
//! the inactive one and flips the flag with a release store; a reader on
//! another thread loads the flag with acquire ordering and reads the buffer
//! that is *not* active, which the render thread no longer writes.
//!
//! ```text
//!   render thread           flag            reader thread
//!   write A ...            active=A
//!   freeze: copy A -> B
//!           flip  ───────> active=B ──────> load(acquire) -> read A
//!   write B ...
//! ```

use std::sync::{
    atomic::{AtomicU8, AtomicUsize, Ordering},
    Arc,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{event::SequencerEvent, rng::Rng, scale::Scale, MAX_EVENTS};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationConfig {
    /// Per-event chance of mutating at each loop wrap, in [0, 1]
    pub amount: f32,
    /// Maximum shift in scale degrees, either direction
    pub range: u8,
    pub scale: Scale,
}

impl MutationConfig {
    pub fn new(amount: f32, range: u8, scale: Scale) -> Self {
        Self {
            amount,
            range,
            scale,
        }
        .sanitized()
    }

    pub fn sanitized(mut self) -> Self {
        self.amount = if self.amount.is_finite() {
            self.amount.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.scale = self.scale.sanitized();
        self
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            amount: 0.0,
            range: 0,
            scale: Scale::default(),
        }
    }
}

struct PitchBuffers {
    buffers: [[AtomicU8; MAX_EVENTS]; 2],
    active: AtomicUsize,
    len: AtomicUsize,
}

impl PitchBuffers {
    fn new() -> Self {
        Self {
            buffers: [
                std::array::from_fn(|_| AtomicU8::new(0)),
                std::array::from_fn(|_| AtomicU8::new(0)),
            ],
            active: AtomicUsize::new(0),
            len: AtomicUsize::new(0),
        }
    }
}

/// Read-only handle on the frozen mutation snapshot.
///
/// Cheap to clone and safe to hand to any non-realtime thread.
#[derive(Clone)]
pub struct MutationReader {
    shared: Arc<PitchBuffers>,
}

impl MutationReader {
    /// Number of events covered by the snapshot.
    pub fn len(&self) -> usize {
        self.shared.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pitch of event `index` as of the last freeze.
    pub fn frozen_pitch(&self, index: usize) -> Option<u8> {
        if index >= self.len() {
            return None;
        }
        let frozen = 1 - self.shared.active.load(Ordering::Acquire);
        Some(self.shared.buffers[frozen][index].load(Ordering::Relaxed))
    }

    /// Copy the frozen snapshot into `out`, returning how many pitches were written.
    pub fn frozen_pitches(&self, out: &mut [u8]) -> usize {
        let frozen = 1 - self.shared.active.load(Ordering::Acquire);
        let count = self.len().min(out.len());
        for (slot, pitch) in out.iter_mut().zip(&self.shared.buffers[frozen][..count]) {
            *slot = pitch.load(Ordering::Relaxed);
        }
        count
    }
}

/// Render-side mutation state: originals, live pitches and the published buffers.
pub struct MutationState {
    config: MutationConfig,
    original: [u8; MAX_EVENTS],
    live: [u8; MAX_EVENTS],
    len: usize,
    shared: Arc<PitchBuffers>,
}

impl MutationState {
    pub fn new() -> Self {
        Self {
            config: MutationConfig::default(),
            original: [0; MAX_EVENTS],
            live: [0; MAX_EVENTS],
            len: 0,
            shared: Arc::new(PitchBuffers::new()),
        }
    }

    pub fn reader(&self) -> MutationReader {
        MutationReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn configure(&mut self, config: MutationConfig) {
        self.config = config.sanitized();
    }

    /// Take new originals from a freshly loaded schedule.
    pub fn load(&mut self, events: &[SequencerEvent]) {
        let len = events.len().min(MAX_EVENTS);
        for (i, event) in events[..len].iter().enumerate() {
            self.original[i] = event.pitch;
            self.live[i] = event.pitch;
        }
        self.len = len;
        self.shared.len.store(len, Ordering::Release);
        self.publish();
        // Seed the frozen side too so a reader never sees the previous schedule
        self.freeze();
    }

    #[inline]
    pub fn live_pitch(&self, index: usize) -> u8 {
        self.live[index.min(MAX_EVENTS - 1)]
    }

    #[inline]
    pub fn original_pitch(&self, index: usize) -> u8 {
        self.original[index.min(MAX_EVENTS - 1)]
    }

    /// One mutation round, run at each loop wrap.
    pub fn mutate(&mut self, rng: &mut Rng) {
        let MutationConfig {
            amount,
            range,
            scale,
        } = self.config;
        if amount <= 0.0 || range == 0 || self.len == 0 {
            return;
        }

        for pitch in self.live[..self.len].iter_mut() {
            if rng.next_f32() < amount {
                let degrees = rng.next_signed(range as i32);
                *pitch = scale.transpose(*pitch, degrees);
            }
        }
        self.publish();
    }

    /// Restore every pitch to its loaded value.
    pub fn reset(&mut self) {
        self.live[..self.len].copy_from_slice(&self.original[..self.len]);
        self.publish();
    }

    /// Copy the active buffer into the inactive one and swap them.
    pub fn freeze(&mut self) {
        let active = self.shared.active.load(Ordering::Relaxed);
        let inactive = 1 - active;
        for i in 0..self.len {
            let pitch = self.shared.buffers[active][i].load(Ordering::Relaxed);
            self.shared.buffers[inactive][i].store(pitch, Ordering::Relaxed);
        }
        self.shared.active.store(inactive, Ordering::Release);
    }

    fn publish(&self) {
        let active = self.shared.active.load(Ordering::Relaxed);
        for (slot, pitch) in self.shared.buffers[active].iter().zip(&self.live[..self.len]) {
            slot.store(*pitch, Ordering::Relaxed);
        }
    }
}

impl Default for MutationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::scale::ScaleKind;

    fn events(pitches: &[i32]) -> Vec<SequencerEvent> {
        pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| SequencerEvent::new(p, 1.0, i as f64, i as f64 + 1.0))
            .collect()
    }

    #[test]
    fn mutation_stays_in_scale_and_resets() {
        let scale = Scale::from_kind(0, ScaleKind::Major);
        let mut state = MutationState::new();
        state.configure(MutationConfig::new(1.0, 3, scale));
        state.load(&events(&[60, 64, 67, 71]));

        let mut rng = Rng::from_seed(3);
        for _ in 0..50 {
            state.mutate(&mut rng);
            for i in 0..4 {
                assert!(scale.contains(state.live_pitch(i) as i32));
            }
        }

        state.reset();
        let live: Vec<u8> = (0..4).map(|i| state.live_pitch(i)).collect();
        assert_eq!(live, vec![60, 64, 67, 71]);
    }

    #[test]
    fn zero_amount_never_mutates() {
        let mut state = MutationState::new();
        state.configure(MutationConfig::new(0.0, 5, Scale::default()));
        state.load(&events(&[60, 61]));
        let mut rng = Rng::from_seed(11);
        for _ in 0..20 {
            state.mutate(&mut rng);
        }
        assert_eq!(state.live_pitch(0), 60);
        assert_eq!(state.live_pitch(1), 61);
    }

    #[test]
    fn reader_sees_snapshot_only_after_freeze() {
        let mut state = MutationState::new();
        state.configure(MutationConfig::new(1.0, 4, Scale::default()));
        state.load(&events(&[60, 62, 64]));
        let reader = state.reader();
        assert_eq!(reader.frozen_pitch(0), Some(60));

        let mut rng = Rng::from_seed(5);
        for _ in 0..10 {
            state.mutate(&mut rng);
        }
        // Not frozen yet: reader still sees the loaded pitches
        let mut before = [0u8; 3];
        assert_eq!(reader.frozen_pitches(&mut before), 3);
        assert_eq!(before, [60, 62, 64]);

        state.freeze();
        let mut after = [0u8; 3];
        reader.frozen_pitches(&mut after);
        let live = [state.live_pitch(0), state.live_pitch(1), state.live_pitch(2)];
        assert_eq!(after, live);
        assert_eq!(reader.frozen_pitch(3), None);
    }

    #[test]
    fn reader_crosses_threads() {
        let mut state = MutationState::new();
        state.load(&events(&[48, 50]));
        state.freeze();
        let reader = state.reader();
        let handle = std::thread::spawn(move || reader.frozen_pitch(1));
        assert_eq!(handle.join().ok().flatten(), Some(50));
    }
}
