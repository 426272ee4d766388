//! Disease Prediction Benchmark Suite
//!
//! Corpus generation, forest training and single-query prediction.
//! Run with: cargo bench -p healthsense-core [--features parallel]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use healthsense_core::{
    CorpusConfig, CorpusGenerator, DiseaseCatalog, ForestParams, Seed, SymptomQuery, TrainedModel,
};

// ============================================================================
// Corpus Generation
// ============================================================================

fn bench_generation(c: &mut Criterion) {
    let catalog = DiseaseCatalog::reference();
    let mut group = c.benchmark_group("corpus_generation");

    for size in [500usize, 2500] {
        let config = CorpusConfig::default()
            .with_size(size)
            .with_seed(Seed::from_string("bench-corpus"));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &config, |b, config| {
            b.iter(|| CorpusGenerator::new(&catalog, config.clone()).generate())
        });
    }

    group.finish();
}

// ============================================================================
// Training
// ============================================================================

fn bench_training(c: &mut Criterion) {
    let catalog = DiseaseCatalog::reference();
    let corpus = CorpusGenerator::new(
        &catalog,
        CorpusConfig::default().with_seed(Seed::from_string("bench-train")),
    )
    .generate();

    let mut group = c.benchmark_group("forest_training");
    group.sample_size(10);

    for trees in [20usize, 200] {
        let params = ForestParams::default()
            .with_trees(trees)
            .with_seed(Seed::from_string("bench-forest"));
        group.bench_with_input(BenchmarkId::from_parameter(trees), &params, |b, params| {
            b.iter(|| TrainedModel::train(black_box(&corpus), params))
        });
    }

    group.finish();
}

// ============================================================================
// Prediction
// ============================================================================

fn bench_prediction(c: &mut Criterion) {
    let catalog = DiseaseCatalog::reference();
    let corpus = CorpusGenerator::new(
        &catalog,
        CorpusConfig::default().with_seed(Seed::from_string("bench-predict")),
    )
    .generate();
    let params = ForestParams::default().with_seed(Seed::from_string("bench-predict-forest"));
    let model = match TrainedModel::train(&corpus, &params) {
        Ok(model) => model,
        Err(e) => panic!("training failed: {}", e),
    };

    let cold = SymptomQuery::from_present(["runny_nose", "sore_throat", "cough", "headache"]);
    let empty = SymptomQuery::new();

    let mut group = c.benchmark_group("prediction");
    group.bench_function("common_cold", |b| b.iter(|| model.predict(black_box(&cold))));
    group.bench_function("empty_query", |b| b.iter(|| model.predict(black_box(&empty))));
    group.bench_function("symptom_importance", |b| {
        b.iter(|| model.symptom_importance(black_box(&cold)))
    });
    group.finish();
}

criterion_group!(benches, bench_generation, bench_training, bench_prediction);
criterion_main!(benches);
