//! thicket benchmarks
//!
//! Usage:
//!   cargo bench -p thicket               # run all benchmarks
//!   cargo bench -p thicket -- combine    # interpolation only
//!   cargo bench -p thicket -- recover    # full recovery only

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use thicket::field::{combine, split, CoordSet, Field, Gf16};
use thicket::{generate, recover, trustees_first, Params, Scheme};

#[cfg(feature = "ristretto255")]
use thicket::Ristretto;

fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine");

    for words in [2usize, 16, 64] {
        let field = Gf16::new(words);
        let secret = field.random();
        let shares = split(&field, &secret, 8, 4, &mut CoordSet::new()).unwrap();
        group.bench_function(BenchmarkId::new("gf16", words), |b| {
            b.iter(|| black_box(combine(&field, black_box(&shares[..4])).unwrap()))
        });
    }

    #[cfg(feature = "ristretto255")]
    {
        let field = Ristretto;
        let secret = field.random();
        let shares = split(&field, &secret, 8, 4, &mut CoordSet::new()).unwrap();
        group.bench_function(BenchmarkId::new("ristretto", 4), |b| {
            b.iter(|| black_box(combine(&field, black_box(&shares[..4])).unwrap()))
        });
    }

    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let field = Gf16::new(16);
    let secret = field.random();

    for scheme in [Scheme::Additive, Scheme::Thresholded, Scheme::Hinted, Scheme::Layered] {
        let params = Params::default().with_scheme(scheme);
        group.bench_function(BenchmarkId::new("gf16", scheme), |b| {
            b.iter(|| black_box(generate(&field, &params, &secret).unwrap()))
        });
    }
    group.finish();
}

fn bench_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("recover");
    group.sample_size(10);
    let field = Gf16::new(16);
    let secret = field.random();

    for scheme in [Scheme::Additive, Scheme::Thresholded, Scheme::Hinted, Scheme::Layered] {
        let params = Params::default().with_scheme(scheme);
        let deal = generate(&field, &params, &secret).unwrap();
        let order = trustees_first(&deal.set);
        group.bench_function(BenchmarkId::new("gf16", scheme), |b| {
            b.iter(|| black_box(recover(&field, &params, &deal.set, &order).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_combine, bench_generate, bench_recover);
criterion_main!(benches);
