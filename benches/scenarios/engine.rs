//! Benchmarks for complete engine blocks.

use std::hint::black_box;

use arbor_rt::{
    sequencer::{
        AccumulatorConfig, AccumulatorMode, AccumulatorTarget, Direction, SequenceLoad,
        SequencerEvent,
    },
    Engine, EngineConfig, SineVoice,
};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Generative patch: brownian walk over overlapping chords, velocity drift
        let config = EngineConfig::default().with_voices(16);
        let Ok((mut engine, mut handle)) = Engine::new(config, &SineVoice::default) else {
            return;
        };
        let events = (0..32)
            .map(|i| {
                let start = (i / 4) as f64 * 0.5;
                SequencerEvent::new(48 + (i % 4) * 4 + (i / 4), 0.7, start, start + 0.9)
                    .with_probability(0.8)
            })
            .collect();
        handle.load_sequence(SequenceLoad::new(events, 4.0).with_direction(Direction::Brownian));
        handle.set_accumulator(AccumulatorConfig {
            target: AccumulatorTarget::Velocity,
            mode: AccumulatorMode::PingPong,
            step: 0.05,
            limit: 0.3,
        });
        handle.start(240.0);

        group.bench_with_input(BenchmarkId::new("generative", size), &size, |b, _| {
            b.iter(|| {
                engine.process_block(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
