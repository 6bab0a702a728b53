#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Construction-time settings for an [`Engine`](crate::engine::Engine).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Size of the voice pool
    pub voices: usize,
    /// Requested command ring size, rounded up to a power of two
    pub command_capacity: usize,
    /// Seed for probability, mutation and direction draws
    pub seed: u64,
}

impl EngineConfig {
    pub const DEFAULT_SEED: u64 = 0x5EED_1234_ABCD_0001;

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_voices(mut self, voices: usize) -> Self {
        self.voices = voices;
        self
    }

    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::NoCommandCapacity);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            voices: 8,
            command_capacity: 256,
            seed: Self::DEFAULT_SEED,
        }
    }
}
