//! Benchmarks for the realtime path.
//!
//! Run with: cargo bench
//!
//! Everything here runs on the audio thread and has to fit the buffer
//! deadline at 48kHz:
//!   - 64 samples  = 1.33ms
//!   - 128 samples = 2.67ms
//!   - 256 samples = 5.33ms
//!   - 512 samples = 10.67ms
//!
//! Benchmark groups:
//!   - realtime/*   Sequencer advance, voice pool, command channel
//!   - scenarios/*  Full engine blocks with a busy schedule

use criterion::{criterion_group, criterion_main};

mod realtime;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    realtime::bench_sequencer,
    realtime::bench_voices,
    realtime::bench_channel,
    scenarios::bench_engine,
);
criterion_main!(benches);
