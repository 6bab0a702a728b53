#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single scheduled note in beats from the start of the loop.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerEvent {
    /// MIDI pitch (0-127)
    pub pitch: u8,
    /// Normalised velocity in (0, 1]
    pub velocity: f32,
    pub start_beat: f64,
    /// Never earlier than `start_beat`
    pub end_beat: f64,
    /// Chance to sound each loop, in (0, 1]
    pub probability: f32,
    /// Number of equal re-triggers across the event's span (1 = plain note)
    pub ratchet_count: u8,
}

/// Quietest velocity a trigger may carry. Zero would claim a voice for silence.
pub(crate) const MIN_VELOCITY: f32 = 1.0 / 127.0;
const MIN_PROBABILITY: f32 = 1.0e-3;

impl SequencerEvent {
    /// Create a plain note. Out-of-range input is clamped, never rejected.
    pub fn new(pitch: i32, velocity: f32, start_beat: f64, end_beat: f64) -> Self {
        Self {
            pitch: 0,
            velocity: 1.0,
            start_beat,
            end_beat,
            probability: 1.0,
            ratchet_count: 1,
        }
        .with_pitch(pitch)
        .with_velocity(velocity)
        .sanitized()
    }

    pub fn with_pitch(mut self, pitch: i32) -> Self {
        self.pitch = pitch.clamp(0, 127) as u8;
        self
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self.sanitized()
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self.sanitized()
    }

    pub fn with_ratchets(mut self, ratchet_count: u8) -> Self {
        self.ratchet_count = ratchet_count;
        self.sanitized()
    }

    pub fn duration(&self) -> f64 {
        self.end_beat - self.start_beat
    }

    /// Clamp every field into its documented range.
    ///
    /// Events arrive from an external project model; anything malformed is
    /// coerced here so the audio thread never has to check again.
    pub fn sanitized(mut self) -> Self {
        self.pitch = self.pitch.min(127);

        self.velocity = clamp_velocity(self.velocity);

        self.probability = if self.probability.is_finite() {
            self.probability.clamp(MIN_PROBABILITY, 1.0)
        } else {
            1.0
        };

        if !self.start_beat.is_finite() || self.start_beat < 0.0 {
            self.start_beat = 0.0;
        }
        if !self.end_beat.is_finite() || self.end_beat < self.start_beat {
            self.end_beat = self.start_beat;
        }

        self.ratchet_count = self.ratchet_count.max(1);
        self
    }
}

/// Order in which steps are visited within a loop.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Events play at their own start/end beats
    #[default]
    Forward,
    /// Step boundaries keep their timing, steps are visited last to first
    Reverse,
    /// Bounce between the first and last step
    PingPong,
    /// Uniform random step at every boundary
    Random,
    /// Random walk of one step up or down
    Brownian,
}

/// Clamp into (0, 1]. Non-finite input plays at full velocity.
pub(crate) fn clamp_velocity(velocity: f32) -> f32 {
    if velocity.is_finite() {
        velocity.clamp(MIN_VELOCITY, 1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_malformed_input() {
        let event = SequencerEvent::new(300, 4.0, 2.0, 1.0);
        assert_eq!(event.pitch, 127);
        assert_eq!(event.velocity, 1.0);
        assert_eq!(event.end_beat, 2.0);

        let event = SequencerEvent::new(-5, 0.0, -1.0, 0.5);
        assert_eq!(event.pitch, 0);
        assert!(event.velocity > 0.0);
        assert_eq!(event.start_beat, 0.0);
    }

    #[test]
    fn builders_keep_invariants() {
        let event = SequencerEvent::new(60, 0.8, 0.0, 1.0)
            .with_probability(0.0)
            .with_ratchets(0);
        assert!(event.probability > 0.0);
        assert_eq!(event.ratchet_count, 1);
    }

    #[test]
    fn nan_fields_fall_back() {
        let mut event = SequencerEvent::new(60, 0.5, 0.0, 1.0);
        event.velocity = f32::NAN;
        event.end_beat = f64::NAN;
        let event = event.sanitized();
        assert_eq!(event.velocity, 1.0);
        assert_eq!(event.end_beat, 0.0);
    }
}
