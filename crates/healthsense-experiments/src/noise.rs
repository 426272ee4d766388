//! Experiment 2: Noise-only Queries
//!
//! Symptoms that belong to no disease's tiers appear in every class at the
//! same noise rate, so a query built only from them carries no signal. The
//! model should never report high confidence for such a query.

use crate::{color_verdict, progress, run_config, save_results, ExperimentResult, Summary};
use colored::*;
use healthsense_core::{
    ConfidenceLevel, DiseaseCatalog, DiseasePredictor, PredictionStats, SymptomQuery,
    DEFAULT_CORPUS_SIZE,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
pub struct NoiseResults {
    pub noise_symptoms: Vec<String>,
    pub runs: usize,
    pub queries_per_run: usize,
    pub trees: usize,
    pub max_confidence: Summary,
    pub high_confidence_predictions: usize,
    pub most_common: Vec<(String, usize)>,
    pub passed: bool,
}

/// Fixed probes plus random non-empty subsets of the noise-only symptoms
fn noise_queries(noise: &[&str], random_queries: usize, rng: &mut ChaCha8Rng) -> Vec<SymptomQuery> {
    let mut queries = vec![SymptomQuery::new(), SymptomQuery::from_present(noise.iter().copied())];
    queries.extend(noise.iter().map(|&s| SymptomQuery::from_present([s])));

    if !noise.is_empty() {
        for _ in 0..random_queries {
            let amount = rng.gen_range(1..=noise.len());
            let chosen = noise.choose_multiple(rng, amount).copied();
            queries.push(SymptomQuery::from_present(chosen));
        }
    }
    queries
}

pub fn run_noise_experiment(
    catalog: &DiseaseCatalog,
    runs: usize,
    random_queries: usize,
    trees: usize,
    output_dir: &Path,
) -> ExperimentResult<()> {
    let noise = catalog.noise_only_symptoms();

    println!("Configuration:");
    println!("  Noise-only symptoms: {}", noise.join(", "));
    println!("  Runs: {}", runs);
    println!("  Random queries per run: {}", random_queries);
    println!("  Trees: {}", trees);
    println!();

    if noise.is_empty() {
        println!("{}", "   Catalog has no noise-only symptoms; probing the empty query only".yellow());
    }

    println!("{}", "1. Probing one model per seed...".yellow());
    let bar = progress(runs);
    let per_run = (0..runs)
        .into_par_iter()
        .map(|run| -> healthsense_core::Result<Vec<_>> {
            let predictor = DiseasePredictor::new();
            predictor.initialize(
                catalog,
                &run_config("noise", run, DEFAULT_CORPUS_SIZE, trees),
            )?;

            let mut rng = ChaCha8Rng::seed_from_u64(42 + run as u64);
            let results = noise_queries(&noise, random_queries, &mut rng)
                .iter()
                .map(|q| predictor.predict(q))
                .collect::<healthsense_core::Result<Vec<_>>>()?;
            bar.inc(1);
            Ok(results)
        })
        .collect::<healthsense_core::Result<Vec<_>>>()?;
    bar.finish_and_clear();

    println!("{}", "2. Summarising...".yellow());
    let max_per_run: Vec<f64> = per_run
        .iter()
        .map(|results| {
            results
                .iter()
                .map(|r| r.confidence)
                .fold(0.0, f64::max)
        })
        .collect();
    let all: Vec<_> = per_run.into_iter().flatten().collect();
    let stats = PredictionStats::from_results(&all);
    let max_confidence = Summary::of(&max_per_run);
    let passed = stats.high_confidence_count == 0;

    println!("   Predictions: {}", stats.count);
    println!(
        "   Confidence: mean {:.3} ± {:.3}",
        stats.mean_confidence, stats.std_dev
    );
    println!("   Highest confidence in any run: {:.3}", max_confidence.max);
    println!(
        "   Tiers: {} high, {} moderate, {} low",
        stats.high_confidence_count, stats.moderate_confidence_count, stats.low_confidence_count
    );
    println!("   Most common predictions:");
    for (disease, count) in stats.most_common(5) {
        println!("     {:<28} {}", disease, count);
    }

    println!();
    println!(
        "{} no noise-only query reached {} confidence ({} violations)",
        color_verdict(passed),
        ConfidenceLevel::High,
        stats.high_confidence_count
    );

    let results = NoiseResults {
        noise_symptoms: noise.iter().map(|s| s.to_string()).collect(),
        runs,
        queries_per_run: all.len() / runs.max(1),
        trees,
        max_confidence,
        high_confidence_predictions: stats.high_confidence_count,
        most_common: stats
            .most_common(5)
            .into_iter()
            .map(|(d, c)| (d.to_string(), c))
            .collect(),
        passed,
    };
    save_results(output_dir, "noise-results.json", &results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_queries_cover_fixed_probes() {
        let noise = ["night_sweats", "confusion", "seizures"];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let queries = noise_queries(&noise, 10, &mut rng);

        // empty + full set + 3 singletons + 10 random
        assert_eq!(queries.len(), 15);
        assert!(queries[0].is_empty());
        assert_eq!(queries[1].present().count(), 3);
        for query in &queries[5..] {
            assert!(query.present().all(|s| noise.contains(&s)));
            assert!(query.present().count() >= 1);
        }
    }

    #[test]
    fn test_no_random_queries_without_noise_symptoms() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let queries = noise_queries(&[], 10, &mut rng);
        assert_eq!(queries.len(), 2);
    }
}
