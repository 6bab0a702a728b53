//! Benchmarks for the individual realtime components.

mod channel;
mod sequencer;
mod voices;

pub use channel::bench_channel;
pub use sequencer::bench_sequencer;
pub use voices::bench_voices;
