// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Scoring and Search Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for per-candidate scoring and full exhaustive
//! scans near the default size threshold.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use flutter_core::{
    CandidateGenerator, CodeSearch, EstimationVariance, Evaluator, ExternalRunner,
    InMemoryResults, SpectralMinimum,
};
use flutter_types::{Code, FlutterError, SearchConfig};

fn offline_search(config: SearchConfig) -> CodeSearch {
    let runner = ExternalRunner::new(|_| Err(FlutterError::Delegation("offline".into())));
    CodeSearch::with_backends(config, Arc::new(runner), Arc::new(InMemoryResults::new()))
        .expect("valid bench config")
}

// ── Objective evaluators ────────────────────────────────────────────

fn bench_spectral_minimum_n32(c: &mut Criterion) {
    let code = Code::parse("11010011000101110100101100011011").unwrap();
    let eval = SpectralMinimum::new(32, 512);
    c.bench_function("spectral_minimum_n32", |b| {
        b.iter(|| eval.score(black_box(&code)))
    });
}

fn bench_estimation_variance_n16(c: &mut Criterion) {
    let code = Code::parse("1101001100010111").unwrap();
    let eval = EstimationVariance::new(16, 128);
    c.bench_function("estimation_variance_n16", |b| {
        b.iter(|| eval.score(black_box(&code)))
    });
}

// ── Candidate generation ────────────────────────────────────────────

fn bench_enumerate_n20_k10(c: &mut Criterion) {
    let generator = CandidateGenerator::new(20, 10).unwrap();
    c.bench_function("enumerate_n20_k10", |b| {
        b.iter(|| black_box(generator.candidates().count()))
    });
}

// ── Exhaustive search ───────────────────────────────────────────────

fn bench_exhaustive_n16_k8(c: &mut Criterion) {
    let search = offline_search(SearchConfig::new(16, 8));
    c.bench_function("exhaustive_n16_k8", |b| b.iter(|| search.run()));
}

fn bench_exhaustive_parallel_n16_k8(c: &mut Criterion) {
    let search = offline_search(SearchConfig::new(16, 8).parallel(true));
    c.bench_function("exhaustive_parallel_n16_k8", |b| b.iter(|| search.run()));
}

fn bench_exhaustive_skip_reversals_n16_k8(c: &mut Criterion) {
    let search = offline_search(SearchConfig::new(16, 8).skip_reversals(true));
    c.bench_function("exhaustive_skip_reversals_n16_k8", |b| b.iter(|| search.run()));
}

criterion_group!(
    benches,
    bench_spectral_minimum_n32,
    bench_estimation_variance_n16,
    bench_enumerate_n20_k10,
    bench_exhaustive_n16_k8,
    bench_exhaustive_parallel_n16_k8,
    bench_exhaustive_skip_reversals_n16_k8,
);
criterion_main!(benches);
