//! HealthSense Core - Symptom-Driven Disease Prediction
//!
//! Pure Rust implementation of the disease classifier behind the
//! HealthSense clinic dashboard: a synthetic training corpus generator
//! driven by per-disease symptom tiers, and a random forest that ranks
//! candidate diseases for a set of reported symptoms.
//!
//! # Features
//!
//! - Immutable, validated disease catalogs (no process-wide tables)
//! - Seeded, bit-reproducible corpus generation
//! - Bagged CART ensemble behind a swappable classifier trait
//! - Top-3 ranking, confidence tiers and global symptom importance
//! - Hold-out evaluation and JSON model persistence
//!
//! # Example
//!
//! ```rust
//! use healthsense_core::{DiseaseCatalog, DiseasePredictor, PredictorConfig, Seed, SymptomQuery};
//!
//! let catalog = DiseaseCatalog::reference();
//! let config = PredictorConfig::default()
//!     .with_seed(Seed::from_string("doc-example"))
//!     .with_corpus_size(400)
//!     .with_trees(10);
//!
//! let predictor = DiseasePredictor::new();
//! predictor.initialize(&catalog, &config).unwrap();
//!
//! let query = SymptomQuery::from_present(["runny_nose", "sore_throat", "cough"]);
//! let result = predictor.predict(&query).unwrap();
//! println!("{} ({:.1}%)", result.primary_prediction, result.confidence * 100.0);
//! ```

pub mod catalog;
pub mod classifier;
pub mod confidence;
pub mod corpus;
pub mod evaluation;
pub mod labels;
pub mod model;
pub mod predictor;
pub mod vocabulary;

// Re-export commonly used types for convenience
pub use catalog::{CatalogDefinition, DiseaseCatalog, DiseasePattern, Tier, TierProbabilities};
pub use classifier::{DecisionTree, ForestParams, ProbabilisticClassifier, RandomForest};
pub use confidence::{ConfidenceLevel, PredictionStats};
pub use corpus::{Corpus, CorpusConfig, CorpusGenerator, TrainingExample};
pub use evaluation::{evaluate, ClassReport, EvaluationReport};
pub use labels::LabelEncoder;
pub use model::{PredictionResult, RankedPrediction, TrainedModel};
pub use predictor::{DiseasePredictor, PredictorConfig};
pub use vocabulary::{SymptomQuery, SymptomVocabulary};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reference number of generated training rows
pub const DEFAULT_CORPUS_SIZE: usize = 2500;

/// Number of ranked predictions reported per query
pub const TOP_K: usize = 3;

/// A 32-byte seed for reproducible corpus generation and training
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed(pub [u8; 32]);

impl Seed {
    /// Create a seed from a string (hashed to 32 bytes)
    pub fn from_string(s: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(s.as_bytes());
        let result = hasher.finalize();
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&result);
        Seed(seed)
    }

    /// Create a seed from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Seed(bytes)
    }

    /// Create a seed from an integer, e.g. a benchmark run number
    pub fn from_u64(value: u64) -> Self {
        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&value.to_le_bytes());
        Seed(seed)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive an independent child seed for a named stage
    ///
    /// Lets one user-facing seed drive the corpus, the forest and the
    /// hold-out split without the streams overlapping.
    pub fn derive(&self, stage: &str) -> Seed {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(stage.as_bytes());
        let result = hasher.finalize();
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&result);
        Seed(seed)
    }

    /// Build the RNG used throughout the crate
    pub fn rng(&self) -> ChaCha20Rng {
        ChaCha20Rng::from_seed(self.0)
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed([0u8; 32])
    }
}

/// Errors raised while validating catalogs, corpora or hyperparameters
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Catalog declares no diseases
    #[error("disease catalog is empty")]
    EmptyDiseaseSet,
    /// Two patterns share a name
    #[error("disease '{0}' is declared more than once")]
    DuplicateDisease(String),
    /// A pattern lists no symptoms in any tier
    #[error("disease '{0}' has no tiered symptoms")]
    EmptyPattern(String),
    /// One symptom appears in two tiers of the same disease
    #[error("symptom '{symptom}' appears in more than one tier of '{disease}'")]
    OverlappingTiers { disease: String, symptom: String },
    /// Base vocabulary repeats a symptom
    #[error("symptom '{0}' appears more than once in the vocabulary")]
    DuplicateSymptom(String),
    /// A sampling probability is outside [0, 1]
    #[error("probability for {name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    /// Training data has no rows
    #[error("training corpus is empty")]
    EmptyCorpus,
    /// Training data contains fewer than two diseases
    #[error("training corpus contains a single class ('{0}')")]
    SingleClass(String),
    /// Forest or split parameter out of range
    #[error("invalid hyperparameter {name}: {reason}")]
    InvalidHyperparameter { name: &'static str, reason: String },
}

/// Errors that can occur in HealthSense operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HealthSenseError {
    /// Malformed configuration, detected before training
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// Prediction or importance requested before training completed
    #[error("model not initialized: train or load a model first")]
    ModelNotInitialized,
    /// Feature vector length does not match the fitted model
    #[error("feature dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// Persisted model state is structurally inconsistent
    #[error("invalid model: {0}")]
    InvalidModel(String),
    /// Reading or writing persisted state failed
    #[error("{operation} failed: {message}")]
    Io {
        operation: &'static str,
        message: String,
    },
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, HealthSenseError>;
