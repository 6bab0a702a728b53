//! Per-loop drift applied on top of the scheduled events.
//!
//! Each loop wrap moves the accumulator value by `step`. What happens at the
//! `±limit` boundary depends on the mode:
//!
//! ```text
//!   Clamp     ──────╱‾‾‾‾‾‾‾‾‾   saturates and stays
//!   Wrap      ╱│╱│╱│╱│           jumps to the opposite edge
//!   PingPong  ╱╲╱╲╱╲╱╲           reverses direction
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which trigger parameter the accumulated value is added to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccumulatorTarget {
    #[default]
    Off,
    /// Rounded to whole semitones
    Pitch,
    Velocity,
    /// Added to the probability threshold of each roll
    Probability,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccumulatorMode {
    #[default]
    Clamp,
    Wrap,
    PingPong,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulatorConfig {
    pub target: AccumulatorTarget,
    pub mode: AccumulatorMode,
    /// Amount added per loop (sign sets the initial direction)
    pub step: f32,
    /// Boundary magnitude, always non-negative
    pub limit: f32,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            target: AccumulatorTarget::Off,
            mode: AccumulatorMode::Clamp,
            step: 0.0,
            limit: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Accumulator {
    config: AccumulatorConfig,
    value: f32,
    direction: f32,
}

impl Accumulator {
    pub fn new(config: AccumulatorConfig) -> Self {
        let mut acc = Self {
            config: AccumulatorConfig::default(),
            value: 0.0,
            direction: 1.0,
        };
        acc.configure(config);
        acc
    }

    /// Replace the configuration and restart from zero.
    pub fn configure(&mut self, config: AccumulatorConfig) {
        let limit = if config.limit.is_finite() {
            config.limit.abs()
        } else {
            0.0
        };
        let step = if config.step.is_finite() { config.step } else { 0.0 };
        self.config = AccumulatorConfig {
            step,
            limit,
            ..config
        };
        self.reset();
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.direction = 1.0;
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advance one loop.
    pub fn step(&mut self) {
        let AccumulatorConfig {
            target, step, limit, ..
        } = self.config;
        if target == AccumulatorTarget::Off || step == 0.0 {
            return;
        }
        if limit <= 0.0 {
            self.value = 0.0;
            return;
        }

        match self.config.mode {
            AccumulatorMode::Clamp => {
                self.value = (self.value + step).clamp(-limit, limit);
            }
            AccumulatorMode::Wrap => {
                let span = 2.0 * limit;
                // Shift into [0, span), wrap, shift back into [-limit, limit)
                self.value = (self.value + step + limit).rem_euclid(span) - limit;
            }
            AccumulatorMode::PingPong => {
                let mut next = self.value + step * self.direction;
                if next > limit {
                    next = (2.0 * limit - next).max(-limit);
                    self.direction = -self.direction;
                } else if next < -limit {
                    next = (-2.0 * limit - next).min(limit);
                    self.direction = -self.direction;
                }
                self.value = next;
            }
        }
    }

    /// Semitone offset when targeting pitch, otherwise zero.
    pub fn pitch_offset(&self) -> i32 {
        match self.config.target {
            AccumulatorTarget::Pitch => self.value.round() as i32,
            _ => 0,
        }
    }

    pub fn velocity_offset(&self) -> f32 {
        match self.config.target {
            AccumulatorTarget::Velocity => self.value,
            _ => 0.0,
        }
    }

    pub fn probability_offset(&self) -> f32 {
        match self.config.target {
            AccumulatorTarget::Probability => self.value,
            _ => 0.0,
        }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(AccumulatorConfig::default())
    }
}
