//! Benchmarks for per-sample sequencer advance.

use std::hint::black_box;

use arbor_rt::{
    sequencer::{Direction, MutationConfig, Scale, ScaleKind, SequenceLoad, SequencerEvent},
    NoteSink, Sequencer,
};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

/// Counts notes so the optimiser can't drop the calls.
#[derive(Default)]
struct Counter {
    ons: u64,
    offs: u64,
}

impl NoteSink for Counter {
    fn note_on(&mut self, pitch: u8, _velocity: f32) {
        self.ons += pitch as u64;
    }

    fn note_off(&mut self, pitch: u8) {
        self.offs += pitch as u64;
    }
}

/// 128 sixteenth notes, a third of them ratcheted.
fn dense_load(direction: Direction) -> SequenceLoad {
    let events = (0..128)
        .map(|i| {
            let start = i as f64 * 0.25;
            SequencerEvent::new(36 + (i % 48), 0.8, start, start + 0.2)
                .with_probability(0.7)
                .with_ratchets(if i % 3 == 0 { 4 } else { 1 })
        })
        .collect();
    SequenceLoad::new(events, 32.0)
        .with_direction(direction)
        .with_mutation(MutationConfig::new(0.4, 2, Scale::from_kind(2, ScaleKind::Dorian)))
}

pub fn bench_sequencer(c: &mut Criterion) {
    let mut group = c.benchmark_group("realtime/sequencer");

    for &size in BLOCK_SIZES {
        for (name, direction) in [
            ("forward", Direction::Forward),
            ("pingpong", Direction::PingPong),
            ("random", Direction::Random),
        ] {
            let mut sink = Counter::default();
            let mut sequencer = Sequencer::new(48_000.0, 42);
            sequencer.load(&dense_load(direction), &mut sink);
            // Fast tempo so the schedule and loop wraps are actually exercised
            sequencer.start(480.0, &mut sink);

            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                b.iter(|| {
                    for _ in 0..size {
                        sequencer.advance(black_box(&mut sink));
                    }
                })
            });
        }

        // Stopped: the cost of the early return
        let mut sink = Counter::default();
        let mut sequencer = Sequencer::new(48_000.0, 42);
        sequencer.load(&dense_load(Direction::Forward), &mut sink);
        group.bench_with_input(BenchmarkId::new("stopped", size), &size, |b, &size| {
            b.iter(|| {
                for _ in 0..size {
                    sequencer.advance(black_box(&mut sink));
                }
            })
        });
    }

    group.finish();
}
