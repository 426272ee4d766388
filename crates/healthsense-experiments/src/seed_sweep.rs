//! Experiment 1: Seed Sweep
//!
//! Trains one model per seed and asks each the same question: given only a
//! disease's high-tier symptoms, is that disease the primary prediction with
//! at least moderate confidence?

use crate::{color_verdict, progress, run_config, save_results, ExperimentResult, Summary};
use colored::*;
use healthsense_core::confidence::MODERATE_CONFIDENCE;
use healthsense_core::{DiseaseCatalog, DiseasePredictor, PredictionResult, SymptomQuery, Tier};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Share of runs that must recognise the disease
const REQUIRED_RECOGNITION_RATE: f64 = 0.8;

#[derive(Serialize)]
pub struct SeedSweepResults {
    pub disease: String,
    pub query: Vec<String>,
    pub runs: usize,
    pub trees: usize,
    pub corpus_size: usize,
    pub recognised: usize,
    pub recognition_rate: f64,
    pub confidence: Summary,
    pub outcomes: Vec<RunOutcome>,
    pub passed: bool,
}

#[derive(Serialize)]
pub struct RunOutcome {
    pub run: usize,
    pub primary_prediction: String,
    pub confidence: f64,
    pub recognised: bool,
}

/// Primary prediction is `disease` with confidence strictly above 0.6
fn is_recognised(result: &PredictionResult, disease: &str) -> bool {
    result.primary_prediction == disease && result.confidence > MODERATE_CONFIDENCE
}

pub fn run_seed_sweep(
    catalog: &DiseaseCatalog,
    disease: &str,
    runs: usize,
    trees: usize,
    corpus_size: usize,
    output_dir: &Path,
) -> ExperimentResult<()> {
    let pattern = catalog
        .disease(disease)
        .ok_or_else(|| format!("disease '{}' is not in the catalog", disease))?;
    let symptoms: Vec<String> = pattern.tier(Tier::High).to_vec();
    let query = SymptomQuery::from_present(symptoms.iter().map(String::as_str));

    println!("Configuration:");
    println!("  Disease: {}", disease);
    println!("  Query: {}", symptoms.join(", "));
    println!("  Runs: {}", runs);
    println!("  Trees: {}", trees);
    println!("  Corpus size: {}", corpus_size);
    println!();

    println!("{}", "1. Training one model per seed...".yellow());
    let start = Instant::now();
    let bar = progress(runs);
    let outcomes = (0..runs)
        .into_par_iter()
        .map(|run| -> healthsense_core::Result<RunOutcome> {
            let predictor = DiseasePredictor::new();
            predictor.initialize(catalog, &run_config("seed-sweep", run, corpus_size, trees))?;
            let result = predictor.predict(&query)?;
            bar.inc(1);

            let recognised = is_recognised(&result, disease);
            Ok(RunOutcome {
                run,
                primary_prediction: result.primary_prediction,
                confidence: result.confidence,
                recognised,
            })
        })
        .collect::<healthsense_core::Result<Vec<_>>>()?;
    bar.finish_and_clear();
    println!("   Completed {} runs in {:.1}s", runs, start.elapsed().as_secs_f64());

    println!("{}", "2. Summarising...".yellow());
    let recognised = outcomes.iter().filter(|o| o.recognised).count();
    let recognition_rate = recognised as f64 / runs.max(1) as f64;
    let confidences: Vec<f64> = outcomes.iter().map(|o| o.confidence).collect();
    let confidence = Summary::of(&confidences);
    let passed = runs > 0 && recognition_rate >= REQUIRED_RECOGNITION_RATE;

    println!("   Recognised: {}/{} ({:.1}%)", recognised, runs, recognition_rate * 100.0);
    println!(
        "   Confidence: mean {:.3} ± {:.3} (min {:.3}, max {:.3})",
        confidence.mean, confidence.std_dev, confidence.min, confidence.max
    );
    for miss in outcomes.iter().filter(|o| !o.recognised) {
        println!(
            "   {} run {}: {} ({:.1}%)",
            "miss".red(),
            miss.run,
            miss.primary_prediction,
            miss.confidence * 100.0
        );
    }

    println!();
    println!(
        "{} {} recognised with confidence > 0.6 in {:.0}% of runs (required {:.0}%)",
        color_verdict(passed),
        disease,
        recognition_rate * 100.0,
        REQUIRED_RECOGNITION_RATE * 100.0
    );

    let results = SeedSweepResults {
        disease: disease.to_string(),
        query: symptoms,
        runs,
        trees,
        corpus_size,
        recognised,
        recognition_rate,
        confidence,
        outcomes,
        passed,
    };
    save_results(output_dir, "seed-sweep-results.json", &results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(disease: &str, confidence: f64) -> PredictionResult {
        PredictionResult {
            primary_prediction: disease.to_string(),
            confidence,
            top_predictions: Vec::new(),
            total_symptoms: 3,
        }
    }

    #[test]
    fn test_recognition_needs_confidence_above_threshold() {
        assert!(is_recognised(&result("Common Cold", 0.95), "Common Cold"));
        assert!(is_recognised(&result("Common Cold", 0.61), "Common Cold"));
        assert!(!is_recognised(&result("Common Cold", 0.6), "Common Cold"));
        assert!(!is_recognised(&result("Influenza", 0.95), "Common Cold"));
    }
}
