//! Shared Disease Predictor
//!
//! [`DiseasePredictor`] is the handle a host service keeps for its whole
//! lifetime. It starts untrained; `initialize` generates a corpus, fits a
//! forest and swaps the finished model in. Training happens outside the
//! lock, so concurrent `predict` calls see either the previous model or
//! the new one, never a partially built one.
//!
//! # Example
//!
//! ```rust
//! use healthsense_core::{DiseasePredictor, HealthSenseError, SymptomQuery};
//!
//! let predictor = DiseasePredictor::new();
//! assert!(!predictor.is_initialized());
//! assert!(predictor.get_available_symptoms().is_empty());
//! assert_eq!(
//!     predictor.predict(&SymptomQuery::new()).unwrap_err(),
//!     HealthSenseError::ModelNotInitialized
//! );
//! ```

use crate::catalog::DiseaseCatalog;
use crate::classifier::ForestParams;
use crate::corpus::{Corpus, CorpusConfig, CorpusGenerator};
use crate::model::{PredictionResult, TrainedModel};
use crate::vocabulary::SymptomQuery;
use crate::{HealthSenseError, Result, Seed};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration for [`DiseasePredictor::initialize`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Synthetic corpus settings
    pub corpus: CorpusConfig,
    /// Forest hyperparameters
    pub forest: ForestParams,
}

impl PredictorConfig {
    /// Seed both corpus generation and training from one value
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.corpus.seed = Some(seed.derive("corpus"));
        self.forest.seed = Some(seed.derive("forest"));
        self
    }

    /// Set number of generated rows
    pub fn with_corpus_size(mut self, size: usize) -> Self {
        self.corpus.size = size;
        self
    }

    /// Set number of trees
    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.forest.n_trees = n_trees;
        self
    }

    /// Replace the forest hyperparameters
    pub fn with_forest(mut self, forest: ForestParams) -> Self {
        self.forest = forest;
        self
    }
}

/// Thread-safe predictor handle
#[derive(Debug, Default)]
pub struct DiseasePredictor {
    model: RwLock<Option<Arc<TrainedModel>>>,
}

impl DiseasePredictor {
    /// Create an untrained predictor
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a predictor serving an existing model
    pub fn with_model(model: TrainedModel) -> Self {
        DiseasePredictor {
            model: RwLock::new(Some(Arc::new(model))),
        }
    }

    /// Generate a corpus from `catalog` and train on it
    ///
    /// Hyperparameters are validated before any rows are generated. On
    /// failure the previously installed model, if any, keeps serving.
    pub fn initialize(&self, catalog: &DiseaseCatalog, config: &PredictorConfig) -> Result<()> {
        config.forest.validate()?;
        let corpus = CorpusGenerator::new(catalog, config.corpus.clone()).generate();
        self.initialize_from_corpus(&corpus, &config.forest)
    }

    /// Train on a caller-supplied corpus
    pub fn initialize_from_corpus(&self, corpus: &Corpus, params: &ForestParams) -> Result<()> {
        let model = TrainedModel::train(corpus, params)?;
        self.install(model);
        Ok(())
    }

    /// Atomically replace the serving model
    pub fn install(&self, model: TrainedModel) {
        let classes = model.diseases().len();
        let symptoms = model.available_symptoms().len();
        let model = Arc::new(model);
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Some(model);
        tracing::info!(classes, symptoms, "installed disease model");
    }

    /// Current model, if one has been installed
    pub fn model(&self) -> Option<Arc<TrainedModel>> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.model().is_some()
    }

    /// Rank candidate diseases for a symptom query
    pub fn predict(&self, query: &SymptomQuery) -> Result<PredictionResult> {
        let model = self.model().ok_or(HealthSenseError::ModelNotInitialized)?;
        model.predict(query)
    }

    /// Symptom names in model input order; empty before training
    pub fn get_available_symptoms(&self) -> Vec<String> {
        self.model()
            .map(|m| m.available_symptoms().to_vec())
            .unwrap_or_default()
    }

    /// Global importance of the query's present symptoms; empty before training
    pub fn get_symptom_importance(&self, query: &SymptomQuery) -> BTreeMap<String, f64> {
        self.model()
            .map(|m| m.symptom_importance(query))
            .unwrap_or_default()
    }
}
