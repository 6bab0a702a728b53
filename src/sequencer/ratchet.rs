use super::NoteSink;

pub const MAX_RATCHETS: usize = 32;

/// Fraction of each sub-span that a ratchet hit stays gated.
pub const RATCHET_GATE: f64 = 0.8;

/// Velocity multiplier applied to each successive hit.
pub const RATCHET_DECAY: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRatchet {
    pub pitch: u8,
    pub velocity: f32,
    pub beat_time: f64,
    pub end_beat_time: f64,
    pub is_active: bool,
    pub triggered_on: bool,
    pub triggered_off: bool,
}

impl PendingRatchet {
    const EMPTY: Self = Self {
        pitch: 0,
        velocity: 0.0,
        beat_time: 0.0,
        end_beat_time: 0.0,
        is_active: false,
        triggered_on: false,
        triggered_off: false,
    };
}

/// Fixed pool of scheduled sub-hits.
///
/// Slots are claimed by scanning for an inactive entry; when all 32 are in
/// flight further hits are dropped.
pub struct RatchetPool {
    slots: [PendingRatchet; MAX_RATCHETS],
    active: usize,
}

impl RatchetPool {
    pub fn new() -> Self {
        Self {
            slots: [PendingRatchet::EMPTY; MAX_RATCHETS],
            active: 0,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Split `[start, start + span)` into `count` hits.
    ///
    /// Returns how many hits found a slot.
    pub fn schedule(&mut self, pitch: u8, velocity: f32, start: f64, span: f64, count: u8) -> usize {
        let count = count.max(1);
        let sub_span = span.max(0.0) / count as f64;
        let mut hit_velocity = velocity;
        let mut scheduled = 0;

        for hit in 0..count {
            let beat_time = start + sub_span * hit as f64;
            let pending = PendingRatchet {
                pitch,
                velocity: hit_velocity,
                beat_time,
                end_beat_time: beat_time + sub_span * RATCHET_GATE,
                is_active: true,
                triggered_on: false,
                triggered_off: false,
            };

            match self.slots.iter_mut().find(|slot| !slot.is_active) {
                Some(slot) => {
                    *slot = pending;
                    self.active += 1;
                    scheduled += 1;
                }
                None => break,
            }

            hit_velocity *= RATCHET_DECAY;
        }

        scheduled
    }

    /// Fire every hit whose on or off time has been reached by `beat`.
    pub fn service<S: NoteSink + ?Sized>(&mut self, beat: f64, sink: &mut S) {
        if self.active == 0 {
            return;
        }

        for slot in self.slots.iter_mut().filter(|s| s.is_active) {
            if !slot.triggered_on && slot.beat_time <= beat {
                sink.note_on(slot.pitch, slot.velocity);
                slot.triggered_on = true;
            }
            if slot.triggered_on && !slot.triggered_off && slot.end_beat_time <= beat {
                sink.note_off(slot.pitch);
                slot.triggered_off = true;
                slot.is_active = false;
                self.active -= 1;
            }
        }
    }

    /// Release every sounding hit and discard the ones not yet fired.
    pub fn flush<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        if self.active == 0 {
            return;
        }

        for slot in self.slots.iter_mut().filter(|s| s.is_active) {
            if slot.triggered_on && !slot.triggered_off {
                sink.note_off(slot.pitch);
            }
            *slot = PendingRatchet::EMPTY;
        }
        self.active = 0;
    }
}

impl Default for RatchetPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::NoteLog;
    use approx::assert_relative_eq;

    #[test]
    fn schedule_splits_span_with_gate_and_decay() {
        let mut pool = RatchetPool::new();
        assert_eq!(pool.schedule(60, 1.0, 0.0, 1.0, 4), 4);

        let hits: Vec<PendingRatchet> = pool.slots.iter().copied().filter(|s| s.is_active).collect();
        assert_eq!(hits.len(), 4);
        assert_relative_eq!(hits[1].beat_time, 0.25);
        assert_relative_eq!(hits[1].end_beat_time, 0.25 + 0.25 * 0.8);
        assert_relative_eq!(hits[3].velocity, 0.85f32.powi(3), epsilon = 1e-6);
    }

    #[test]
    fn pool_exhaustion_drops_extra_hits() {
        let mut pool = RatchetPool::new();
        assert_eq!(pool.schedule(60, 1.0, 0.0, 1.0, 30), 30);
        assert_eq!(pool.schedule(62, 1.0, 0.0, 1.0, 5), 2);
        assert_eq!(pool.active_count(), MAX_RATCHETS);
        assert_eq!(pool.schedule(64, 1.0, 0.0, 1.0, 2), 0);
    }

    #[test]
    fn service_fires_on_then_off() {
        let mut pool = RatchetPool::new();
        let mut log = NoteLog::default();
        pool.schedule(60, 1.0, 0.0, 1.0, 2);

        pool.service(0.0, &mut log);
        assert_eq!(log.ons(), 1);
        pool.service(0.45, &mut log);
        assert_eq!(log.offs(), 1);
        pool.service(0.5, &mut log);
        pool.service(1.0, &mut log);
        assert_eq!(log.ons(), 2);
        assert_eq!(log.offs(), 2);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn flush_only_releases_sounding_hits() {
        let mut pool = RatchetPool::new();
        let mut log = NoteLog::default();
        pool.schedule(60, 1.0, 0.0, 1.0, 3);
        pool.service(0.1, &mut log);

        pool.flush(&mut log);
        assert_eq!(log.ons(), 1);
        assert_eq!(log.offs(), 1);
        assert_eq!(pool.active_count(), 0);
    }
}
