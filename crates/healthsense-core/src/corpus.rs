//! Synthetic Training Corpus
//!
//! Builds labelled symptom vectors from a [`DiseaseCatalog`]. Each row picks
//! a disease uniformly at random, then samples every vocabulary symptom with
//! the probability of its tier for that disease (noise probability for
//! symptoms outside the disease's tiers).
//!
//! # Example
//!
//! ```rust
//! use healthsense_core::{CorpusConfig, CorpusGenerator, DiseaseCatalog, Seed};
//!
//! let catalog = DiseaseCatalog::reference();
//! let config = CorpusConfig::default()
//!     .with_size(100)
//!     .with_seed(Seed::from_string("corpus-example"));
//!
//! let corpus = CorpusGenerator::new(&catalog, config).generate();
//! assert_eq!(corpus.len(), 100);
//! assert_eq!(corpus.columns().len(), catalog.vocabulary().len());
//! ```

use crate::catalog::DiseaseCatalog;
use crate::{ConfigError, Seed, DEFAULT_CORPUS_SIZE};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for corpus generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Number of rows to generate
    pub size: usize,
    /// Fixed seed for reproducible output; `None` draws from OS entropy
    pub seed: Option<Seed>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        CorpusConfig {
            size: DEFAULT_CORPUS_SIZE,
            seed: None,
        }
    }
}

impl CorpusConfig {
    /// Set number of rows
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Fix the random seed
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// One labelled row: a full-length symptom vector plus its disease
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub symptoms: Vec<bool>,
    pub disease: String,
}

impl TrainingExample {
    /// Number of symptoms present
    pub fn symptom_count(&self) -> usize {
        self.symptoms.iter().filter(|&&s| s).count()
    }
}

/// A table of training examples with named symptom columns
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CorpusData")]
pub struct Corpus {
    pub(crate) columns: Vec<String>,
    pub(crate) examples: Vec<TrainingExample>,
}

/// Unchecked wire form of [`Corpus`]
#[derive(Deserialize)]
struct CorpusData {
    columns: Vec<String>,
    examples: Vec<TrainingExample>,
}

impl TryFrom<CorpusData> for Corpus {
    type Error = crate::HealthSenseError;

    fn try_from(data: CorpusData) -> crate::Result<Self> {
        Corpus::new(data.columns, data.examples)
    }
}

impl Corpus {
    /// Build a corpus, checking column names are unique and every row has
    /// one value per column
    pub fn new(columns: Vec<String>, examples: Vec<TrainingExample>) -> crate::Result<Self> {
        check_columns(&columns)?;
        if let Some(bad) = examples.iter().find(|e| e.symptoms.len() != columns.len()) {
            return Err(crate::HealthSenseError::DimensionMismatch {
                expected: columns.len(),
                got: bad.symptoms.len(),
            });
        }
        Ok(Corpus { columns, examples })
    }

    /// Symptom column names, in feature order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Row count per disease label
    pub fn disease_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for example in &self.examples {
            *counts.entry(example.disease.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Fraction of rows in which a symptom is present
    pub fn symptom_frequency(&self, symptom: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == symptom)?;
        if self.examples.is_empty() {
            return Some(0.0);
        }
        let present = self.examples.iter().filter(|e| e.symptoms[idx]).count();
        Some(present as f64 / self.examples.len() as f64)
    }

    /// Shuffle and split into (train, test) partitions
    ///
    /// `test_fraction` must be in (0, 1) and leave both partitions non-empty.
    pub fn split(&self, test_fraction: f64, seed: Seed) -> Result<(Corpus, Corpus), ConfigError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(ConfigError::InvalidHyperparameter {
                name: "test_fraction",
                reason: format!("must be in (0, 1), got {}", test_fraction),
            });
        }

        let test_len = (self.examples.len() as f64 * test_fraction).round() as usize;
        if test_len == 0 || test_len >= self.examples.len() {
            return Err(ConfigError::InvalidHyperparameter {
                name: "test_fraction",
                reason: format!(
                    "{} of {} rows leaves an empty partition",
                    test_fraction,
                    self.examples.len()
                ),
            });
        }

        let mut order: Vec<usize> = (0..self.examples.len()).collect();
        order.shuffle(&mut seed.rng());

        let pick = |indices: &[usize]| Corpus {
            columns: self.columns.clone(),
            examples: indices.iter().map(|&i| self.examples[i].clone()).collect(),
        };

        let (test_idx, train_idx) = order.split_at(test_len);
        Ok((pick(train_idx), pick(test_idx)))
    }
}

/// Rejects repeated column names
pub(crate) fn check_columns(columns: &[String]) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::with_capacity(columns.len());
    match columns.iter().find(|c| !seen.insert(c.as_str())) {
        Some(repeated) => Err(ConfigError::DuplicateSymptom(repeated.clone())),
        None => Ok(()),
    }
}

/// Generates synthetic corpora from a catalog
pub struct CorpusGenerator<'a> {
    catalog: &'a DiseaseCatalog,
    config: CorpusConfig,
    /// Per-disease presence probability for each vocabulary symptom
    rows: Vec<Vec<f64>>,
}

impl<'a> CorpusGenerator<'a> {
    pub fn new(catalog: &'a DiseaseCatalog, config: CorpusConfig) -> Self {
        let rows = catalog
            .diseases()
            .iter()
            .map(|d| catalog.probability_row(d))
            .collect();

        CorpusGenerator {
            catalog,
            config,
            rows,
        }
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    /// Generate a corpus of `config.size` rows
    pub fn generate(&self) -> Corpus {
        let mut rng = match self.config.seed {
            Some(seed) => seed.rng(),
            None => ChaCha20Rng::from_entropy(),
        };

        let diseases = self.catalog.diseases();
        let examples = (0..self.config.size)
            .map(|_| {
                let choice = rng.gen_range(0..diseases.len());
                let symptoms = self.rows[choice]
                    .iter()
                    .map(|&p| rng.gen_bool(p))
                    .collect();
                TrainingExample {
                    symptoms,
                    disease: diseases[choice].name.clone(),
                }
            })
            .collect();

        tracing::debug!(
            rows = self.config.size,
            diseases = diseases.len(),
            symptoms = self.catalog.vocabulary().len(),
            seeded = self.config.seed.is_some(),
            "generated training corpus"
        );

        Corpus {
            columns: self.catalog.vocabulary().names().to_vec(),
            examples,
        }
    }
}
