//! Benchmarks for command push/pop on a single thread.

use std::hint::black_box;

use arbor_rt::{
    command_channel,
    sequencer::{SequenceLoad, SequencerEvent},
    Command,
};
use criterion::Criterion;

pub fn bench_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("realtime/channel");

    let (mut tx, mut rx) = command_channel(256);
    group.bench_function("note_on_round_trip", |b| {
        b.iter(|| {
            let _ = tx.push(black_box(Command::NoteOn {
                pitch: 60,
                velocity: 0.8,
            }));
            if let Some(command) = rx.pop() {
                rx.recycle(black_box(command));
            }
        })
    });

    let (mut tx, mut rx) = command_channel(256);
    let events = vec![SequencerEvent::new(60, 0.8, 0.0, 0.5); 64];
    group.bench_function("load_with_recycle", |b| {
        b.iter(|| {
            let load = SequenceLoad::new(events.clone(), 16.0);
            let _ = tx.push(Command::LoadSequence(Box::new(load)));
            if let Some(command) = rx.pop() {
                rx.recycle(black_box(command));
            }
        })
    });

    group.finish();
}
