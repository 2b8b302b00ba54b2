//! Benchmark for transient builders vs one-at-a-time persistent edits.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use figura_collections::persistent::{
    PersistentHashMap, PersistentVector, TransientHashMap, TransientVector,
};
use std::hint::black_box;

fn benchmark_vector_build(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("vector_build");

    for size in [1000, 100_000] {
        group.bench_with_input(BenchmarkId::new("transient", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut builder = TransientVector::new();
                for index in 0..size {
                    builder.push_back(black_box(index)).unwrap();
                }
                black_box(builder.build().unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("persistent", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut vector = PersistentVector::new();
                for index in 0..size {
                    vector = vector.push_back(black_box(index));
                }
                black_box(vector)
            });
        });
    }

    group.finish();
}

fn benchmark_vector_update(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("vector_update");

    for size in [1000, 100_000] {
        let source: PersistentVector<usize> = (0..size).collect();

        group.bench_with_input(BenchmarkId::new("transient", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut builder = source.clone().transient();
                for index in (0..size).step_by(5) {
                    builder.set(index, black_box(0)).unwrap();
                }
                black_box(builder.build().unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("persistent", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut vector = source.clone();
                for index in (0..size).step_by(5) {
                    vector = vector.update(index, black_box(0)).unwrap();
                }
                black_box(vector)
            });
        });
    }

    group.finish();
}

fn benchmark_hashmap_build(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("hashmap_build");

    for size in [1000, 10000] {
        group.bench_with_input(BenchmarkId::new("transient", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut builder = TransientHashMap::new();
                for key in 0..size {
                    builder.insert(black_box(key), key).unwrap();
                }
                black_box(builder.build().unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("persistent", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut map = PersistentHashMap::new();
                for key in 0..size {
                    map = map.insert(black_box(key), key);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_vector_build,
    benchmark_vector_update,
    benchmark_hashmap_build
);
criterion_main!(benches);
