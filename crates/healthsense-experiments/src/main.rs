//! HealthSense Experiments
//!
//! Statistical validation of the disease classifier: repeated seeded runs
//! that back the clinical claims made on the dashboard.

mod holdout;
mod noise;
mod seed_sweep;

use clap::{Parser, Subcommand};
use colored::*;
use healthsense_core::{DiseaseCatalog, PredictorConfig, Seed};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub type ExperimentResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "healthsense-experiments")]
#[command(about = "Statistical validation runs for the HealthSense disease classifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Disease catalog definition (JSON); defaults to the reference catalog
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Experiment 1: Common Cold recognition across seeds
    SeedSweep {
        /// Disease whose high-tier symptoms form the query
        #[arg(short, long, default_value = "Common Cold")]
        disease: String,

        /// Number of seeded runs
        #[arg(short, long, default_value = "50")]
        runs: usize,

        /// Trees per forest
        #[arg(short, long, default_value = "200")]
        trees: usize,

        /// Generated rows per run
        #[arg(short, long, default_value = "2500")]
        corpus: usize,

        /// Output directory
        #[arg(short, long, default_value = "./results")]
        output: PathBuf,
    },

    /// Experiment 2: Noise-only queries stay below high confidence
    Noise {
        /// Number of seeded runs
        #[arg(short, long, default_value = "20")]
        runs: usize,

        /// Random noise-only queries per run
        #[arg(short = 'q', long, default_value = "50")]
        queries: usize,

        /// Trees per forest
        #[arg(short, long, default_value = "200")]
        trees: usize,

        /// Output directory
        #[arg(short, long, default_value = "./results")]
        output: PathBuf,
    },

    /// Experiment 3: Hold-out accuracy across seeds
    Holdout {
        /// Number of seeded runs
        #[arg(short, long, default_value = "20")]
        runs: usize,

        /// Fraction of rows held out
        #[arg(short = 'f', long, default_value = "0.2")]
        test_fraction: f64,

        /// Trees per forest
        #[arg(short, long, default_value = "200")]
        trees: usize,

        /// Output directory
        #[arg(short, long, default_value = "./results")]
        output: PathBuf,
    },

    /// Run all experiments
    All {
        /// Output directory
        #[arg(short, long, default_value = "./results")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    println!("{}", "═".repeat(60).cyan());
    println!("{}", "  HEALTHSENSE EXPERIMENTS".cyan().bold());
    println!("{}", "  Symptom-driven disease prediction".cyan());
    println!("{}", "═".repeat(60).cyan());
    println!();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ExperimentResult<()> {
    let catalog = match &cli.catalog {
        Some(path) => DiseaseCatalog::load(path)?,
        None => DiseaseCatalog::reference(),
    };

    match cli.command {
        Commands::SeedSweep { disease, runs, trees, corpus, output } => {
            seed_sweep::run_seed_sweep(&catalog, &disease, runs, trees, corpus, &output)?;
        }
        Commands::Noise { runs, queries, trees, output } => {
            noise::run_noise_experiment(&catalog, runs, queries, trees, &output)?;
        }
        Commands::Holdout { runs, test_fraction, trees, output } => {
            holdout::run_holdout_experiment(&catalog, runs, test_fraction, trees, &output)?;
        }
        Commands::All { output } => {
            println!("{}", "Running all experiments...".yellow().bold());
            println!();

            section("EXPERIMENT 1: SEED SWEEP");
            seed_sweep::run_seed_sweep(
                &catalog,
                "Common Cold",
                50,
                200,
                2500,
                &output.join("seed-sweep"),
            )?;

            println!();
            section("EXPERIMENT 2: NOISE-ONLY QUERIES");
            noise::run_noise_experiment(&catalog, 20, 50, 200, &output.join("noise"))?;

            println!();
            section("EXPERIMENT 3: HOLD-OUT ACCURACY");
            holdout::run_holdout_experiment(&catalog, 20, 0.2, 200, &output.join("holdout"))?;

            println!();
            println!("{}", "═".repeat(60).green());
            println!("{}", "  ALL EXPERIMENTS COMPLETE".green().bold());
            println!("{}", "═".repeat(60).green());
        }
    }
    Ok(())
}

fn section(title: &str) {
    println!("{}", "─".repeat(60));
    println!("{}", title.green().bold());
    println!("{}", "─".repeat(60));
}

/// Predictor configuration for one seeded run
pub fn run_config(experiment: &str, run: usize, corpus: usize, trees: usize) -> PredictorConfig {
    PredictorConfig::default()
        .with_seed(Seed::from_string(&format!("{}-run-{}", experiment, run)))
        .with_corpus_size(corpus)
        .with_trees(trees)
}

/// Progress bar shared by the parallel runs of an experiment
pub fn progress(runs: usize) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(runs as u64);
    bar.set_style(
        indicatif::ProgressStyle::with_template("   {bar:40.cyan/blue} {pos}/{len} runs ({eta})")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
    );
    bar
}

/// Write pretty JSON results into `output_dir`
pub fn save_results<T: Serialize>(output_dir: &Path, file_name: &str, results: &T) -> ExperimentResult<()> {
    fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join(file_name);
    let file = File::create(&output_path)?;
    serde_json::to_writer_pretty(file, results)?;
    println!();
    println!("Results saved to: {}", output_path.display());
    tracing::info!(path = %output_path.display(), "experiment results written");
    Ok(())
}

/// Summary statistics of a sample
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Summary { mean: 0.0, std_dev: 0.0, min: 0.0, max: 0.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Summary {
            mean,
            std_dev: variance.sqrt(),
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

pub fn color_verdict(passed: bool) -> ColoredString {
    if passed {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    }
}
