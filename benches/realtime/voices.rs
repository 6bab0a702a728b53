//! Benchmarks for voice allocation and pool rendering.

use std::hint::black_box;

use arbor_rt::{SineVoice, VoicePool};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("realtime/voices");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Full pool, every voice sounding
        let mut pool = VoicePool::new(&SineVoice::default, 16, 48_000.0);
        for pitch in 48..64 {
            pool.note_on(pitch, 0.8, 220.0);
        }
        group.bench_with_input(BenchmarkId::new("render_16", size), &size, |b, _| {
            b.iter(|| {
                pool.render_block(black_box(&mut buffer));
            })
        });
    }

    // Steady stealing: every note_on has to scan for the quietest voice
    let mut pool = VoicePool::new(&SineVoice::default, 16, 48_000.0);
    for pitch in 0..16 {
        pool.note_on(pitch, 0.5, 110.0);
    }
    let mut pitch = 16u8;
    group.bench_function("steal", |b| {
        b.iter(|| {
            pitch = if pitch >= 127 { 16 } else { pitch + 1 };
            black_box(pool.note_on(pitch, 0.7, 330.0));
            pool.render_sample();
        })
    });

    group.finish();
}
