//! Real-world scenario benchmarks.
//!
//! A full engine block: command drain, sequencer and voice pool together.

mod engine;

pub use engine::bench_engine;
