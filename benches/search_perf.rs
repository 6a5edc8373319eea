//! Criterion benchmarks for similarity search.
//!
//! Targets on a 1k-question bank:
//! - Index build: < 50ms
//! - Cold search: < 5ms
//! - Cached search: < 50us

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use qsim::question::QuestionView;
use qsim::search::{HashVectorizer, SearchCache, SearchEngine, SimilarityScorer, Vectorizer};
use qsim::test_utils::fixtures::{scenario_query, synthetic_bank};

fn vectorize_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorize");
    let vectorizer = HashVectorizer::default();
    let query = scenario_query();

    group.bench_function("scenario_query", |b| {
        b.iter(|| vectorizer.vectorize(black_box(&query.view())));
    });

    let long_stem = "已知函数 f(x)=x^2-4x+3，求其在区间 [0,5] 上的最小值与最大值。".repeat(8);
    let view = QuestionView {
        stem: &long_stem,
        answer: "最小值 -1，最大值 8",
        question_type: query.question_type,
        difficulty: 4,
        subject: "math",
    };
    group.bench_function("long_stem", |b| {
        b.iter(|| vectorizer.vectorize(black_box(&view)));
    });

    group.finish();
}

fn build_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_index");
    for size in [100usize, 1_000] {
        let bank = synthetic_bank(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bank, |b, bank| {
            let engine = SearchEngine::default();
            b.iter(|| engine.build_index(black_box(bank)));
        });
    }
    group.finish();
}

fn search_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_similar");
    let bank = synthetic_bank(1_000);
    let query = scenario_query();

    let uncached = SearchEngine::new(
        Arc::new(HashVectorizer::default()),
        SimilarityScorer::default(),
        SearchCache::disabled(),
    );
    uncached.build_index(&bank);
    group.bench_function("cold_1k", |b| {
        b.iter(|| uncached.find_similar(black_box(&query), 10, 0.3));
    });

    let cached = SearchEngine::default();
    cached.build_index(&bank);
    let _ = cached.find_similar(&query, 10, 0.3);
    group.bench_function("cached_1k", |b| {
        b.iter(|| cached.find_similar(black_box(&query), 10, 0.3));
    });

    group.finish();
}

criterion_group!(benches, vectorize_benchmarks, build_benchmarks, search_benchmarks);
criterion_main!(benches);
