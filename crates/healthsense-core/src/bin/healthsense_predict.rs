//! HealthSense Predict CLI Tool
//!
//! Train, persist and query the symptom-driven disease classifier.
//!
//! Usage:
//!   healthsense-predict symptoms [--model <file>]
//!   healthsense-predict predict <symptom...> [--query <file>] [--model <file>]
//!   healthsense-predict importance <symptom...> [--model <file>]
//!   healthsense-predict train --output <model.json> [--catalog <file>]
//!   healthsense-predict generate --output <corpus.json> [--catalog <file>]
//!   healthsense-predict evaluate [--test-fraction <f>] [--catalog <file>]
//!
//! Without `--model`, a model is trained on the fly from the catalog and
//! `--config` (a JSON `PredictorConfig`). Logging follows `RUST_LOG`.

use clap::{Parser, Subcommand};
use colored::Colorize;
use healthsense_core::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "healthsense-predict")]
#[command(author = "HealthSense")]
#[command(version = "0.1.0")]
#[command(about = "Predict likely diseases from reported symptoms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Previously trained model (JSON); trains a fresh model if omitted
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    /// Predictor configuration (JSON); defaults match the reference model
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disease catalog definition (JSON); defaults to the reference catalog
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Seed label for reproducible generation and training
    #[arg(long, global = true)]
    seed: Option<String>,

    /// Output format: json, compact, or table
    #[arg(short, long, global = true, default_value = "table")]
    format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List the symptoms the model accepts, in input order
    Symptoms,

    /// Rank candidate diseases for a set of present symptoms
    Predict {
        /// Present symptoms (e.g. "fever" "cough")
        symptoms: Vec<String>,

        /// JSON object of symptom -> bool, merged with positional symptoms
        #[arg(short, long)]
        query: Option<PathBuf>,
    },

    /// Show global importance of the given symptoms
    Importance {
        /// Present symptoms
        symptoms: Vec<String>,
    },

    /// Train a model and save it
    Train {
        /// Output model file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate a synthetic training corpus
    Generate {
        /// Output corpus file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of rows (overrides config)
        #[arg(short = 'n', long)]
        size: Option<usize>,
    },

    /// Hold-out evaluation on a freshly generated corpus
    Evaluate {
        /// Fraction of rows held out for testing
        #[arg(short, long, default_value = "0.2")]
        test_fraction: f64,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum Report {
    Symptoms(Vec<String>),
    Prediction {
        #[serde(flatten)]
        result: PredictionResult,
        confidence_level: ConfidenceLevel,
        recommendations: Vec<&'static str>,
    },
    Importance(BTreeMap<String, f64>),
    Saved {
        status: &'static str,
        path: String,
        rows: usize,
    },
    Evaluation(EvaluationReport),
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
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let report = match &cli.command {
        Commands::Symptoms => {
            let model = obtain_model(&cli)?;
            Report::Symptoms(model.available_symptoms().to_vec())
        }
        Commands::Predict { symptoms, query } => {
            let model = obtain_model(&cli)?;
            let query = build_query(symptoms, query.as_deref())?;
            let result = model.predict(&query)?;
            let level = result.confidence_level();
            Report::Prediction {
                result,
                confidence_level: level,
                recommendations: level.recommendations().to_vec(),
            }
        }
        Commands::Importance { symptoms } => {
            let model = obtain_model(&cli)?;
            let query = SymptomQuery::from_present(symptoms.iter().map(String::as_str));
            Report::Importance(model.symptom_importance(&query))
        }
        Commands::Train { output } => {
            let catalog = load_catalog(&cli)?;
            let config = load_config(&cli)?;
            let corpus = CorpusGenerator::new(&catalog, config.corpus.clone()).generate();
            let model = TrainedModel::train(&corpus, &config.forest)?;
            model.save(output)?;
            Report::Saved {
                status: "trained",
                path: output.display().to_string(),
                rows: corpus.len(),
            }
        }
        Commands::Generate { output, size } => {
            let catalog = load_catalog(&cli)?;
            let mut config = load_config(&cli)?;
            if let Some(size) = size {
                config.corpus.size = *size;
            }
            let corpus = CorpusGenerator::new(&catalog, config.corpus).generate();
            fs::write(output, serde_json::to_string_pretty(&corpus)?)?;
            Report::Saved {
                status: "generated",
                path: output.display().to_string(),
                rows: corpus.len(),
            }
        }
        Commands::Evaluate { test_fraction } => {
            let catalog = load_catalog(&cli)?;
            let config = load_config(&cli)?;
            let split_seed = match &cli.seed {
                Some(label) => Seed::from_string(label).derive("split"),
                None => Seed::from_string("healthsense-holdout"),
            };
            let corpus = CorpusGenerator::new(&catalog, config.corpus.clone()).generate();
            let (train, test) = corpus.split(*test_fraction, split_seed)?;
            let model = TrainedModel::train(&train, &config.forest)?;
            Report::Evaluation(evaluate(&model, &test)?)
        }
    };

    match cli.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "compact" => println!("{}", serde_json::to_string(&report)?),
        _ => print_table(&report),
    }
    Ok(())
}

fn load_catalog(cli: &Cli) -> CliResult<DiseaseCatalog> {
    match &cli.catalog {
        Some(path) => Ok(DiseaseCatalog::load(path)?),
        None => Ok(DiseaseCatalog::reference()),
    }
}

fn load_config(cli: &Cli) -> CliResult<PredictorConfig> {
    let config = match &cli.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => PredictorConfig::default(),
    };
    Ok(match &cli.seed {
        Some(label) => config.with_seed(Seed::from_string(label)),
        None => config,
    })
}

fn obtain_model(cli: &Cli) -> CliResult<TrainedModel> {
    if let Some(path) = &cli.model {
        return Ok(TrainedModel::load(path)?);
    }

    let catalog = load_catalog(cli)?;
    let config = load_config(cli)?;
    let predictor = DiseasePredictor::new();
    predictor.initialize(&catalog, &config)?;
    let model = predictor.model().ok_or(HealthSenseError::ModelNotInitialized)?;
    Ok((*model).clone())
}

fn build_query(symptoms: &[String], file: Option<&Path>) -> CliResult<SymptomQuery> {
    let mut query = match file {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => SymptomQuery::new(),
    };
    for symptom in symptoms {
        query.set(symptom.as_str(), true);
    }
    Ok(query)
}

fn print_table(report: &Report) {
    match report {
        Report::Symptoms(symptoms) => {
            println!("{}", format!("{} symptoms", symptoms.len()).cyan().bold());
            for (idx, name) in symptoms.iter().enumerate() {
                println!("  {:>3}  {}", idx, name);
            }
        }
        Report::Prediction {
            result,
            confidence_level,
            recommendations,
        } => {
            let headline = format!(
                "{} ({:.1}%)",
                result.primary_prediction,
                result.confidence * 100.0
            );
            let headline = match confidence_level {
                ConfidenceLevel::High => headline.green().bold(),
                ConfidenceLevel::Moderate => headline.yellow().bold(),
                ConfidenceLevel::Low => headline.red().bold(),
            };
            println!("{}", headline);
            println!("  {} from {} symptoms", confidence_level.description(), result.total_symptoms);
            println!();
            println!("{}", "Top predictions".cyan());
            for (rank, p) in result.top_predictions.iter().enumerate() {
                println!("  {}. {:<28} {:>6.1}%", rank + 1, p.disease, p.probability * 100.0);
            }
            println!();
            println!("{}", "Recommendations".cyan());
            for line in recommendations {
                println!("  - {}", line);
            }
        }
        Report::Importance(importance) => {
            if importance.is_empty() {
                println!("{}", "No known symptoms in query".yellow());
            }
            let mut ranked: Vec<_> = importance.iter().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(a.1));
            for (name, value) in ranked {
                println!("  {:<24} {:.4}", name, value);
            }
        }
        Report::Saved { status, path, rows } => {
            println!("{} {} rows -> {}", status.green().bold(), rows, path);
        }
        Report::Evaluation(report) => {
            println!("{}", "Hold-out evaluation".cyan().bold());
            println!("  rows:            {}", report.total);
            println!("  accuracy:        {:.1}%", report.accuracy * 100.0);
            println!("  top-3 accuracy:  {:.1}%", report.top_k_accuracy * 100.0);
            println!();
            println!("  {:<28} {:>7} {:>9} {:>7}", "disease", "support", "precision", "recall");
            for class in &report.classes {
                println!(
                    "  {:<28} {:>7} {:>9.3} {:>7.3}",
                    class.disease, class.support, class.precision, class.recall
                );
            }
        }
    }
}
