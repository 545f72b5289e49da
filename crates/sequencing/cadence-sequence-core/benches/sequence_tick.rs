//! Benchmarks for sequence scheduling.
//!
//! Run with: cargo bench -p cadence-sequence-core --bench sequence_tick

use std::hint::black_box;
use std::time::Duration;

use cadence_sequence_core::{AnimationSequence, BoxedUnit, Config, TimedAnimation};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn queue_of(len: usize) -> Vec<BoxedUnit> {
    (0..len)
        .map(|_| {
            Box::new(TimedAnimation::fixed(None, Duration::from_millis(100)).blocking(true))
                as BoxedUnit
        })
        .collect()
}

fn bench_continuous(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_continuous");
    for len in [8usize, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| {
                let mut sequence = AnimationSequence::new(Config::default());
                sequence.enqueue_add_primary(queue_of(black_box(len)));
                sequence
                    .calculate_continuous(Duration::from_millis(25))
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_event_driven(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_event_driven");
    for len in [8usize, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| {
                let mut sequence = AnimationSequence::new(Config::default());
                sequence.enqueue_add_primary(queue_of(black_box(len)));
                sequence.calculate_event_driven().unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_continuous, bench_event_driven);
criterion_main!(benches);
