use std::f32::consts::TAU;

use super::voice::VoiceEngine;

/*
Reference voice: sine oscillator through a linear attack/release envelope.

    level
      1 ┐   ╱‾‾‾‾‾‾‾‾‾‾╲
        │  ╱            ╲
      0 └─╱──────────────╲──→ t
         attack  hold   release

Release starts from whatever level the envelope is at, so a note released
during its attack fades out without a click. The release length is fixed
at note-off time and interpolated to exactly zero.
*/

pub const PARAM_ATTACK: u32 = 0;
pub const PARAM_RELEASE: u32 = 1;
pub const PARAM_LEVEL: u32 = 2;

const MIN_TIME: f32 = 1.0 / 48_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Hold,
    Release,
}

pub struct SineVoice {
    attack_time: f32,
    release_time: f32,
    output_level: f32,

    frequency: f32,
    velocity: f32,
    phase: f32,

    stage: EnvelopeStage,
    level: f32,
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl SineVoice {
    /// Attack and release in seconds.
    pub fn new(attack: f32, release: f32) -> Self {
        Self {
            attack_time: attack.max(MIN_TIME),
            release_time: release.max(MIN_TIME),
            output_level: 0.25,

            frequency: 440.0,
            velocity: 0.0,
            phase: 0.0,

            stage: EnvelopeStage::Idle,
            level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    fn advance_envelope(&mut self, sample_rate: f32) {
        match self.stage {
            EnvelopeStage::Idle => self.level = 0.0,
            EnvelopeStage::Attack => {
                self.level += 1.0 / (self.attack_time * sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Hold;
                }
            }
            EnvelopeStage::Hold => self.level = 1.0,
            EnvelopeStage::Release => {
                if self.release_total_samples == 0 {
                    self.release_total_samples =
                        (self.release_time * sample_rate).round().max(1.0) as u32;
                }
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);
                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
    }
}

impl Default for SineVoice {
    fn default() -> Self {
        Self::new(0.005, 0.08)
    }
}

impl VoiceEngine for SineVoice {
    fn trigger(&mut self, _pitch: u8, velocity: f32, frequency: f32) {
        self.frequency = frequency;
        self.velocity = velocity.clamp(0.0, 1.0);
        // Clean retrigger from zero
        self.level = 0.0;
        self.stage = EnvelopeStage::Attack;
        self.release_elapsed_samples = 0;
    }

    fn release(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        self.release_start_level = self.level;
        // Length in samples is resolved on the next sample, once the rate is known
        self.release_total_samples = 0;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeStage::Release;
    }

    fn kill(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.phase = 0.0;
    }

    fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    fn envelope_level(&self) -> f32 {
        self.level
    }

    fn next_sample(&mut self, sample_rate: f32) -> f32 {
        self.advance_envelope(sample_rate);

        let sample = (self.phase * TAU).sin();
        self.phase += self.frequency / sample_rate;
        self.phase -= self.phase.floor();

        sample * self.level * self.velocity * self.output_level
    }

    fn set_param(&mut self, id: u32, value: f32) {
        if !value.is_finite() {
            return;
        }
        match id {
            PARAM_ATTACK => self.attack_time = value.max(MIN_TIME),
            PARAM_RELEASE => self.release_time = value.max(MIN_TIME),
            PARAM_LEVEL => self.output_level = value.clamp(0.0, 1.0),
            _ => {}
        }
    }
}
