//! Micro benchmarks for the hash and ordered indexes.
#![forbid(unsafe_code)]
#![allow(missing_docs)]

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tilldb::{Article, Category, HashIndex, NodeHandle, OrderedIndex};

const INSERT_COUNT: u32 = 8_192;
const LOOKUP_SAMPLES: usize = 1_024;

fn articles(count: u32) -> Vec<Article> {
    (0..count)
        .map(|i| Article::new(Category::ALL[(i % 4) as usize], 10_000 + i))
        .collect()
}

fn bench_hash_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("index/hash");
    group.sample_size(30);

    let keys = articles(INSERT_COUNT);

    group.throughput(Throughput::Elements(INSERT_COUNT as u64));
    group.bench_function("insert", |b| {
        b.iter_batched(
            || HashIndex::new(16).unwrap(),
            |mut index| {
                for (i, key) in keys.iter().enumerate() {
                    index.insert(*key, NodeHandle::synthetic(i as u32, 0));
                }
                black_box(index.capacity());
            },
            BatchSize::SmallInput,
        );
    });

    let mut full = HashIndex::new(16).unwrap();
    for (i, key) in keys.iter().enumerate() {
        full.insert(*key, NodeHandle::synthetic(i as u32, 0));
    }
    let mut probes = keys.clone();
    probes.shuffle(&mut ChaCha8Rng::seed_from_u64(0xF00D));
    probes.truncate(LOOKUP_SAMPLES);

    group.throughput(Throughput::Elements(LOOKUP_SAMPLES as u64));
    group.bench_function("find", |b| {
        b.iter(|| {
            for key in &probes {
                black_box(full.find(key));
            }
        });
    });
    group.finish();
}

fn bench_ordered_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("index/ordered");
    group.sample_size(30);

    let keys = articles(INSERT_COUNT);
    let mut shuffled = keys.clone();
    shuffled.shuffle(&mut ChaCha8Rng::seed_from_u64(0xBEEF));

    for (name, order) in [("sequential_insert", &keys), ("random_insert", &shuffled)] {
        group.throughput(Throughput::Elements(INSERT_COUNT as u64));
        group.bench_function(name, |b| {
            b.iter_batched(
                OrderedIndex::new,
                |mut index| {
                    for (i, key) in order.iter().enumerate() {
                        index.insert(*key, NodeHandle::synthetic(i as u32, 0));
                    }
                    black_box(index.len());
                },
                BatchSize::SmallInput,
            );
        });
    }

    let mut full = OrderedIndex::new();
    for (i, key) in keys.iter().enumerate() {
        full.insert(*key, NodeHandle::synthetic(i as u32, 0));
    }

    for samples in [64usize, LOOKUP_SAMPLES] {
        group.throughput(Throughput::Elements(samples as u64));
        group.bench_with_input(BenchmarkId::new("rank", samples), &samples, |b, &n| {
            b.iter(|| {
                for key in shuffled.iter().take(n) {
                    black_box(full.index_of(key));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hash_index, bench_ordered_index);
criterion_main!(benches);
