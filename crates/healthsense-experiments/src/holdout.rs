//! Experiment 3: Hold-out Accuracy
//!
//! Generates a corpus per seed, holds out a fraction of the rows, trains on
//! the rest and scores the held-out rows.

use crate::{color_verdict, progress, run_config, save_results, ExperimentResult, Summary};
use colored::*;
use healthsense_core::{evaluate, CorpusGenerator, DiseaseCatalog, EvaluationReport, Seed, TrainedModel};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Serialize)]
pub struct HoldoutResults {
    pub runs: usize,
    pub test_fraction: f64,
    pub trees: usize,
    pub accuracy: Summary,
    pub top_k_accuracy: Summary,
    /// Mean recall per disease across runs
    pub recall: BTreeMap<String, f64>,
    pub chance_level: f64,
    pub passed: bool,
}

pub fn run_holdout_experiment(
    catalog: &DiseaseCatalog,
    runs: usize,
    test_fraction: f64,
    trees: usize,
    output_dir: &Path,
) -> ExperimentResult<()> {
    println!("Configuration:");
    println!("  Diseases: {}", catalog.diseases().len());
    println!("  Runs: {}", runs);
    println!("  Test fraction: {:.0}%", test_fraction * 100.0);
    println!("  Trees: {}", trees);
    println!();

    println!("{}", "1. Training and scoring one model per seed...".yellow());
    let bar = progress(runs);
    let reports = (0..runs)
        .into_par_iter()
        .map(|run| -> healthsense_core::Result<EvaluationReport> {
            let config = run_config("holdout", run, healthsense_core::DEFAULT_CORPUS_SIZE, trees);
            let corpus = CorpusGenerator::new(catalog, config.corpus.clone()).generate();
            let split_seed = Seed::from_string(&format!("holdout-split-{}", run));
            let (train, test) = corpus.split(test_fraction, split_seed)?;
            let model = TrainedModel::train(&train, &config.forest)?;
            let report = evaluate(&model, &test)?;
            bar.inc(1);
            Ok(report)
        })
        .collect::<healthsense_core::Result<Vec<_>>>()?;
    bar.finish_and_clear();

    println!("{}", "2. Summarising...".yellow());
    let accuracy = Summary::of(&reports.iter().map(|r| r.accuracy).collect::<Vec<_>>());
    let top_k_accuracy = Summary::of(&reports.iter().map(|r| r.top_k_accuracy).collect::<Vec<_>>());

    let mut recall: BTreeMap<String, f64> = BTreeMap::new();
    for report in &reports {
        for class in &report.classes {
            *recall.entry(class.disease.clone()).or_insert(0.0) += class.recall / runs as f64;
        }
    }

    let chance_level = 1.0 / catalog.diseases().len() as f64;
    let passed = runs > 0 && accuracy.min > chance_level;

    println!(
        "   Accuracy: mean {:.1}% ± {:.1}% (min {:.1}%, max {:.1}%)",
        accuracy.mean * 100.0,
        accuracy.std_dev * 100.0,
        accuracy.min * 100.0,
        accuracy.max * 100.0
    );
    println!("   Top-3 accuracy: mean {:.1}%", top_k_accuracy.mean * 100.0);
    println!("   Mean recall per disease:");
    for (disease, value) in &recall {
        println!("     {:<28} {:.3}", disease, value);
    }

    println!();
    println!(
        "{} every run beat chance ({:.1}%)",
        color_verdict(passed),
        chance_level * 100.0
    );

    let results = HoldoutResults {
        runs,
        test_fraction,
        trees,
        accuracy,
        top_k_accuracy,
        recall,
        chance_level,
        passed,
    };
    save_results(output_dir, "holdout-results.json", &results)
}
