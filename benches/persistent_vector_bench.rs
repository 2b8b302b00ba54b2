//! Benchmark for PersistentVector vs standard Vec.
//!
//! Covers the operations the RRB tree exists for (concat, slice,
//! push_front) alongside the usual push/get/iterate comparisons.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use figura_collections::persistent::PersistentVector;
use std::hint::black_box;

// =============================================================================
// push_back Benchmark
// =============================================================================

fn benchmark_push_back(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("push_back");

    for size in [100, 1000, 10000] {
        group.bench_with_input(
            BenchmarkId::new("PersistentVector", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut vector = PersistentVector::new();
                    for index in 0..size {
                        vector = vector.push_back(black_box(index));
                    }
                    black_box(vector)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut vector = Vec::new();
                for index in 0..size {
                    vector.push(black_box(index));
                }
                black_box(vector)
            });
        });
    }

    group.finish();
}

// =============================================================================
// get Benchmark (Random Access)
// =============================================================================

fn benchmark_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("get");

    for size in [1000, 100_000] {
        let balanced: PersistentVector<usize> = (0..size).collect();
        let relaxed = (0..size / 100).fold(PersistentVector::new(), |vector, chunk| {
            vector.concat(&(chunk * 100..chunk * 100 + 100).collect())
        });

        for (name, vector) in [("balanced", &balanced), ("relaxed", &relaxed)] {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |bencher, &size| {
                bencher.iter(|| {
                    let mut sum = 0;
                    for index in (0..size).step_by(13) {
                        sum += vector.get(black_box(index)).copied().unwrap_or(0);
                    }
                    black_box(sum)
                });
            });
        }
    }

    group.finish();
}

// =============================================================================
// concat / slice / push_front Benchmarks
// =============================================================================

fn benchmark_concat(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("concat");

    for size in [1000, 100_000] {
        let left: PersistentVector<usize> = (0..size).collect();
        let right: PersistentVector<usize> = (0..size).collect();
        group.bench_with_input(BenchmarkId::new("PersistentVector", size), &size, |bencher, _| {
            bencher.iter(|| black_box(left.concat(black_box(&right))));
        });

        let left_vec: Vec<usize> = (0..size).collect();
        let right_vec: Vec<usize> = (0..size).collect();
        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, _| {
            bencher.iter(|| {
                let mut joined = left_vec.clone();
                joined.extend_from_slice(black_box(&right_vec));
                black_box(joined)
            });
        });
    }

    group.finish();
}

fn benchmark_slice(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("slice");

    for size in [1000, 100_000] {
        let vector: PersistentVector<usize> = (0..size).collect();
        group.bench_with_input(BenchmarkId::new("PersistentVector", size), &size, |bencher, &size| {
            bencher.iter(|| black_box(vector.slice(size / 3, 2 * size / 3)));
        });
    }

    group.finish();
}

fn benchmark_push_front(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("push_front");

    for size in [100, 1000] {
        group.bench_with_input(BenchmarkId::new("PersistentVector", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut vector = PersistentVector::new();
                for index in 0..size {
                    vector = vector.push_front(black_box(index));
                }
                black_box(vector)
            });
        });
    }

    group.finish();
}

// =============================================================================
// Iteration Benchmark
// =============================================================================

fn benchmark_iter(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("iter");

    for size in [1000, 100_000] {
        let vector: PersistentVector<usize> = (0..size).collect();
        group.bench_with_input(BenchmarkId::new("PersistentVector", size), &size, |bencher, _| {
            bencher.iter(|| black_box(vector.iter().sum::<usize>()));
        });

        let standard: Vec<usize> = (0..size).collect();
        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, _| {
            bencher.iter(|| black_box(standard.iter().sum::<usize>()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_push_back,
    benchmark_get,
    benchmark_concat,
    benchmark_slice,
    benchmark_push_front,
    benchmark_iter
);
criterion_main!(benches);
