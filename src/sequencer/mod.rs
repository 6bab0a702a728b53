//! Sequencer - sample-accurate beat clock and event scheduler
//!
//! One `Sequencer` exists per playable node. It runs on the audio thread,
//! is advanced once per sample, and turns a loop of `SequencerEvent`s into
//! note on/off calls on a `NoteSink` (normally the voice pool).
//!
//! Per call to `advance`:
//!
//! ```text
//!   p = current_beat
//!   ┌─────────────────────┐   ┌──────────────────────┐   ┌─────────────┐
//!   │ service ratchets @p │ → │ dispatch direction @p │ → │ clock += dt │
//!   └─────────────────────┘   └──────────────────────┘   └──────┬──────┘
//!                                                               │ ≥ length?
//!                                  ┌────────────────────────────┘
//!                                  ↓
//!        force offs · wrap · loop++ · mutate · accumulate · re-roll
//! ```
//!
//! All state lives in fixed-capacity arrays sized at construction, so the
//! per-sample path never allocates, locks or blocks.

pub mod accumulator;
pub mod event;
pub mod mutation;
pub mod ratchet;
pub mod rng;
pub mod scale;

pub use accumulator::{Accumulator, AccumulatorConfig, AccumulatorMode, AccumulatorTarget};
pub use event::{Direction, SequencerEvent};
pub use mutation::{MutationConfig, MutationReader};
pub use ratchet::{PendingRatchet, MAX_RATCHETS};
pub use scale::{Scale, ScaleKind, MAX_SCALE_INTERVALS};

use self::{event::MIN_VELOCITY, mutation::MutationState, ratchet::RatchetPool, rng::Rng};

/// Maximum number of events a sequencer can hold.
pub const MAX_EVENTS: usize = 128;

pub const MIN_BPM: f64 = 1.0;
pub const MAX_BPM: f64 = 999.0;

/// Shortest loop accepted by `load`.
pub const MIN_LENGTH_BEATS: f64 = 1.0 / 64.0;

/// Tolerance for beat comparisons, absorbs accumulated clock rounding.
const BEAT_EPSILON: f64 = 1.0e-9;

/// Receiver of the note stream produced by the sequencer.
pub trait NoteSink {
    fn note_on(&mut self, pitch: u8, velocity: f32);
    fn note_off(&mut self, pitch: u8);
}

impl<S: NoteSink + ?Sized> NoteSink for &mut S {
    fn note_on(&mut self, pitch: u8, velocity: f32) {
        (**self).note_on(pitch, velocity)
    }

    fn note_off(&mut self, pitch: u8) {
        (**self).note_off(pitch)
    }
}

/// A complete schedule, as produced by the composition model.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceLoad {
    pub events: Vec<SequencerEvent>,
    pub length_in_beats: f64,
    pub direction: Direction,
    pub mutation: MutationConfig,
    pub accumulator: AccumulatorConfig,
}

impl SequenceLoad {
    /// Build a load, truncating to `MAX_EVENTS`.
    ///
    /// Runs on the control thread, so truncation is reported here rather
    /// than on the audio thread.
    pub fn new(mut events: Vec<SequencerEvent>, length_in_beats: f64) -> Self {
        if events.len() > MAX_EVENTS {
            tracing::warn!(
                events = events.len(),
                capacity = MAX_EVENTS,
                "sequence exceeds event capacity, truncating"
            );
            events.truncate(MAX_EVENTS);
        }
        Self {
            events,
            length_in_beats,
            direction: Direction::Forward,
            mutation: MutationConfig::default(),
            accumulator: AccumulatorConfig::default(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_mutation(mut self, mutation: MutationConfig) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn with_accumulator(mut self, accumulator: AccumulatorConfig) -> Self {
        self.accumulator = accumulator;
        self
    }
}

pub struct Sequencer {
    sample_rate: f64,
    bpm: f64,
    beats_per_sample: f64,
    current_beat: f64,
    length_in_beats: f64,
    playing: bool,
    loop_count: u64,
    direction: Direction,
    global_probability: f32,

    events: [SequencerEvent; MAX_EVENTS],
    event_count: usize,
    /// Event indices ordered by start beat (also the step order)
    by_start: [u8; MAX_EVENTS],
    /// Event indices ordered by end beat
    by_end: [u8; MAX_EVENTS],
    start_cursor: usize,
    end_cursor: usize,

    /// Passed this cycle's probability roll
    armed: [bool; MAX_EVENTS],
    sounding: [bool; MAX_EVENTS],
    sounding_pitch: [u8; MAX_EVENTS],
    release_beat: [f64; MAX_EVENTS],
    sounding_count: usize,

    // Step traversal for non-forward directions
    step: Option<usize>,
    step_cursor: usize,
    ping_pong_up: bool,

    ratchets: RatchetPool,
    mutation: MutationState,
    accumulator: Accumulator,
    rng: Rng,
}

impl Sequencer {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let mut sequencer = Self {
            sample_rate: sanitize_sample_rate(sample_rate as f64),
            bpm: 120.0,
            beats_per_sample: 0.0,
            current_beat: 0.0,
            length_in_beats: 4.0,
            playing: false,
            loop_count: 0,
            direction: Direction::Forward,
            global_probability: 1.0,

            events: [SequencerEvent::new(0, 1.0, 0.0, 0.0); MAX_EVENTS],
            event_count: 0,
            by_start: [0; MAX_EVENTS],
            by_end: [0; MAX_EVENTS],
            start_cursor: 0,
            end_cursor: 0,

            armed: [false; MAX_EVENTS],
            sounding: [false; MAX_EVENTS],
            sounding_pitch: [0; MAX_EVENTS],
            release_beat: [0.0; MAX_EVENTS],
            sounding_count: 0,

            step: None,
            step_cursor: 0,
            ping_pong_up: true,

            ratchets: RatchetPool::new(),
            mutation: MutationState::new(),
            accumulator: Accumulator::default(),
            rng: Rng::from_seed(seed),
        };
        sequencer.update_increment();
        sequencer
    }

    // --- transport -------------------------------------------------------

    /// Stopped → Playing. Restarts the clock, the accumulator and the cycle.
    pub fn start<S: NoteSink + ?Sized>(&mut self, bpm: f64, sink: &mut S) {
        self.release_all(sink);
        self.set_bpm(bpm);
        self.current_beat = 0.0;
        self.loop_count = 0;
        self.accumulator.reset();
        self.reset_steps();
        self.begin_cycle();
        self.playing = true;
    }

    /// Playing → Stopped, releasing anything still sounding. Idempotent.
    pub fn stop<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        self.playing = false;
        self.release_all(sink);
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        if !bpm.is_finite() {
            return;
        }
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.update_increment();
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sanitize_sample_rate(sample_rate as f64);
        self.update_increment();
    }

    fn update_increment(&mut self) {
        self.beats_per_sample = self.bpm / (60.0 * self.sample_rate);
    }

    // --- schedule --------------------------------------------------------

    /// Replace the schedule and every per-schedule setting.
    pub fn load<S: NoteSink + ?Sized>(&mut self, load: &SequenceLoad, sink: &mut S) {
        self.mutation.configure(load.mutation);
        self.accumulator.configure(load.accumulator);
        self.load_events(&load.events, load.length_in_beats, load.direction, sink);
    }

    /// Replace the events, loop length and direction.
    ///
    /// Events beyond `MAX_EVENTS` are dropped. Mutation starts over from the
    /// new pitches. When playing, the clock keeps its position (folded into
    /// the new length) and events already behind it wait for the next loop.
    pub fn load_events<S: NoteSink + ?Sized>(
        &mut self,
        events: &[SequencerEvent],
        length_in_beats: f64,
        direction: Direction,
        sink: &mut S,
    ) {
        self.release_all(sink);

        let count = events.len().min(MAX_EVENTS);
        for (slot, event) in self.events.iter_mut().zip(&events[..count]) {
            *slot = event.sanitized();
        }
        self.event_count = count;

        self.length_in_beats = if length_in_beats.is_finite() {
            length_in_beats.max(MIN_LENGTH_BEATS)
        } else {
            4.0
        };
        if self.current_beat >= self.length_in_beats {
            self.current_beat %= self.length_in_beats;
        }

        self.direction = direction;
        self.sort_indices();
        self.mutation.load(&self.events[..count]);
        self.reset_steps();
        self.begin_cycle();
        self.seek_cursors();
    }

    /// Change traversal order mid-loop. Sounding notes are released.
    pub fn set_direction<S: NoteSink + ?Sized>(&mut self, direction: Direction, sink: &mut S) {
        self.release_all(sink);
        self.direction = direction;
        self.reset_steps();
        self.seek_cursors();
    }

    /// Scales every event's probability. Takes effect at the next loop.
    pub fn set_global_probability(&mut self, probability: f32) {
        if probability.is_finite() {
            self.global_probability = probability.clamp(0.0, 1.0);
        }
    }

    pub fn set_mutation(&mut self, config: MutationConfig) {
        self.mutation.configure(config);
    }

    /// Restore every pitch to its loaded value.
    pub fn reset_mutation(&mut self) {
        self.mutation.reset();
    }

    /// Publish the current mutated pitches to `MutationReader`s.
    pub fn freeze_mutation(&mut self) {
        self.mutation.freeze();
    }

    pub fn set_accumulator(&mut self, config: AccumulatorConfig) {
        self.accumulator.configure(config);
    }

    fn sort_indices(&mut self) {
        let count = self.event_count;
        for i in 0..count {
            self.by_start[i] = i as u8;
            self.by_end[i] = i as u8;
        }

        let events = &self.events;
        self.by_start[..count].sort_unstable_by(|&a, &b| {
            let (ea, eb) = (&events[a as usize], &events[b as usize]);
            ea.start_beat.total_cmp(&eb.start_beat).then(a.cmp(&b))
        });
        self.by_end[..count].sort_unstable_by(|&a, &b| {
            let (ea, eb) = (&events[a as usize], &events[b as usize]);
            ea.end_beat.total_cmp(&eb.end_beat).then(a.cmp(&b))
        });
    }

    // --- per-sample ------------------------------------------------------

    /// Run one sample of the schedule.
    pub fn advance<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        if !self.playing {
            return;
        }

        let beat = self.current_beat + BEAT_EPSILON;

        self.ratchets.service(beat, sink);

        match self.direction {
            Direction::Forward => self.dispatch_forward(beat, sink),
            _ => self.dispatch_steps(beat, sink),
        }

        self.current_beat += self.beats_per_sample;
        if self.current_beat >= self.length_in_beats - BEAT_EPSILON {
            self.wrap(sink);
        }
    }

    fn dispatch_forward<S: NoteSink + ?Sized>(&mut self, beat: f64, sink: &mut S) {
        let count = self.event_count;

        // Offs before ons so back-to-back notes on one pitch retrigger cleanly
        while self.end_cursor < count {
            let index = self.by_end[self.end_cursor] as usize;
            if self.events[index].end_beat > beat {
                break;
            }
            if self.sounding[index] {
                self.release_event(index, sink);
            }
            self.end_cursor += 1;
        }

        while self.start_cursor < count {
            let index = self.by_start[self.start_cursor] as usize;
            let event = self.events[index];
            if event.start_beat > beat {
                break;
            }
            self.start_cursor += 1;
            self.trigger(index, event.start_beat, beat, sink);

            // Zero-length events: their end was already passed above
            if self.sounding[index] && event.end_beat <= beat {
                self.release_event(index, sink);
            }
        }
    }

    fn dispatch_steps<S: NoteSink + ?Sized>(&mut self, beat: f64, sink: &mut S) {
        let count = self.event_count;

        if self.sounding_count > 0 {
            for index in 0..count {
                if self.sounding[index] && self.release_beat[index] <= beat {
                    self.release_event(index, sink);
                }
            }
        }

        while self.step_cursor < count {
            let boundary = self.events[self.by_start[self.step_cursor] as usize].start_beat;
            if boundary > beat {
                break;
            }
            self.step_cursor += 1;

            let step = self.next_step(count);
            let index = self.by_start[step] as usize;
            self.trigger(index, self.current_beat, beat, sink);
        }
    }

    /// Pick the next step position according to the direction rule.
    fn next_step(&mut self, count: usize) -> usize {
        if count <= 1 {
            self.step = Some(0);
            return 0;
        }

        let last = count - 1;
        let next = match (self.direction, self.step.map(|s| s.min(last))) {
            (Direction::Forward, None) => 0,
            (Direction::Forward, Some(s)) => (s + 1) % count,
            (Direction::Reverse, None) => last,
            (Direction::Reverse, Some(s)) => {
                if s == 0 {
                    last
                } else {
                    s - 1
                }
            }
            (Direction::PingPong, None) => {
                self.ping_pong_up = true;
                0
            }
            (Direction::PingPong, Some(s)) => {
                if self.ping_pong_up {
                    if s >= last {
                        self.ping_pong_up = false;
                        s - 1
                    } else {
                        s + 1
                    }
                } else if s == 0 {
                    self.ping_pong_up = true;
                    1
                } else {
                    s - 1
                }
            }
            (Direction::Random, _) => self.rng.next_index(count),
            (Direction::Brownian, None) => 0,
            (Direction::Brownian, Some(s)) => {
                if self.rng.next_bool() {
                    (s + 1) % count
                } else {
                    (s + last) % count
                }
            }
        };

        self.step = Some(next);
        next
    }

    /// Sound event `index`, triggered at `at_beat` (the clock is at `beat`).
    fn trigger<S: NoteSink + ?Sized>(&mut self, index: usize, at_beat: f64, beat: f64, sink: &mut S) {
        if !self.armed[index] {
            return;
        }
        if self.sounding[index] {
            self.release_event(index, sink);
        }

        let event = self.events[index];
        let pitch = (self.mutation.live_pitch(index) as i32 + self.accumulator.pitch_offset())
            .clamp(0, 127) as u8;
        let velocity = (event.velocity + self.accumulator.velocity_offset()).clamp(MIN_VELOCITY, 1.0);

        if event.ratchet_count > 1 {
            self.ratchets
                .schedule(pitch, velocity, at_beat, event.duration(), event.ratchet_count);
            self.ratchets.service(beat, sink);
            return;
        }

        sink.note_on(pitch, velocity);
        self.sounding[index] = true;
        self.sounding_pitch[index] = pitch;
        self.release_beat[index] = at_beat + event.duration();
        self.sounding_count += 1;
    }

    fn release_event<S: NoteSink + ?Sized>(&mut self, index: usize, sink: &mut S) {
        if !self.sounding[index] {
            return;
        }
        sink.note_off(self.sounding_pitch[index]);
        self.sounding[index] = false;
        self.sounding_count = self.sounding_count.saturating_sub(1);
    }

    /// Release every sounding event and ratchet hit.
    fn release_all<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        if self.sounding_count > 0 {
            for index in 0..self.event_count {
                self.release_event(index, sink);
            }
        }
        self.sounding = [false; MAX_EVENTS];
        self.sounding_count = 0;
        self.ratchets.flush(sink);
    }

    fn wrap<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        self.release_all(sink);

        self.current_beat -= self.length_in_beats;
        if self.current_beat >= self.length_in_beats {
            self.current_beat %= self.length_in_beats;
        }
        self.current_beat = self.current_beat.max(0.0);

        self.loop_count += 1;
        self.mutation.mutate(&mut self.rng);
        self.accumulator.step();
        self.begin_cycle();
    }

    /// Roll probabilities and rewind the cursors for a new loop.
    ///
    /// The step position survives the wrap so reverse, ping-pong and
    /// brownian traversal continue where the previous loop left off.
    fn begin_cycle(&mut self) {
        let global = self.global_probability;
        let offset = self.accumulator.probability_offset();
        for index in 0..self.event_count {
            let threshold = (self.events[index].probability * global + offset).clamp(0.0, 1.0);
            self.armed[index] = self.rng.next_f32() < threshold;
        }
        self.start_cursor = 0;
        self.end_cursor = 0;
        self.step_cursor = 0;
    }

    fn reset_steps(&mut self) {
        self.step = None;
        self.ping_pong_up = true;
    }

    /// Skip cursors past everything strictly behind the clock.
    fn seek_cursors(&mut self) {
        let count = self.event_count;
        let now = self.current_beat;
        let events = &self.events;

        self.start_cursor = self.by_start[..count]
            .iter()
            .take_while(|&&i| events[i as usize].start_beat < now)
            .count();
        self.end_cursor = self.by_end[..count]
            .iter()
            .take_while(|&&i| events[i as usize].end_beat < now)
            .count();
        self.step_cursor = self.start_cursor;
    }

    // --- inspection ------------------------------------------------------

    pub fn current_beat(&self) -> f64 {
        self.current_beat
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn length_in_beats(&self) -> f64 {
        self.length_in_beats
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn global_probability(&self) -> f32 {
        self.global_probability
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn event(&self, index: usize) -> Option<&SequencerEvent> {
        self.events[..self.event_count].get(index)
    }

    /// Pitch event `index` will sound at, including mutation.
    pub fn live_pitch(&self, index: usize) -> Option<u8> {
        (index < self.event_count).then(|| self.mutation.live_pitch(index))
    }

    pub fn original_pitch(&self, index: usize) -> Option<u8> {
        (index < self.event_count).then(|| self.mutation.original_pitch(index))
    }

    pub fn sounding_count(&self) -> usize {
        self.sounding_count
    }

    pub fn active_ratchets(&self) -> usize {
        self.ratchets.active_count()
    }

    pub fn accumulator_value(&self) -> f32 {
        self.accumulator.value()
    }

    pub fn mutation_reader(&self) -> MutationReader {
        self.mutation.reader()
    }
}

fn sanitize_sample_rate(sample_rate: f64) -> f64 {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        sample_rate
    } else {
        48_000.0
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Note {
    On(u8, f32),
    Off(u8),
}

/// Records every note with the sample index it was emitted at.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct NoteLog {
    pub sample: u64,
    pub notes: Vec<(u64, Note)>,
}

#[cfg(test)]
impl NoteLog {
    pub fn ons(&self) -> usize {
        self.notes.iter().filter(|(_, n)| matches!(n, Note::On(..))).count()
    }

    pub fn offs(&self) -> usize {
        self.notes.iter().filter(|(_, n)| matches!(n, Note::Off(..))).count()
    }

    pub fn on_pitches(&self) -> Vec<u8> {
        self.notes
            .iter()
            .filter_map(|(_, n)| match n {
                Note::On(p, _) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl NoteSink for NoteLog {
    fn note_on(&mut self, pitch: u8, velocity: f32) {
        self.notes.push((self.sample, Note::On(pitch, velocity)));
    }

    fn note_off(&mut self, pitch: u8) {
        self.notes.push((self.sample, Note::Off(pitch)));
    }
}
