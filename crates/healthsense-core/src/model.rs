//! Trained Disease Model
//!
//! A [`TrainedModel`] is everything a serving replica needs: the ordered
//! symptom vocabulary, the label encoding and the fitted classifier. It
//! keeps no reference to the corpus it was trained on and is never mutated
//! after construction, so one instance can serve concurrent predictions.

use crate::classifier::{ForestParams, ProbabilisticClassifier, RandomForest};
use crate::confidence::ConfidenceLevel;
use crate::corpus::Corpus;
use crate::labels::LabelEncoder;
use crate::vocabulary::{SymptomQuery, SymptomVocabulary};
use crate::{ConfigError, Result, TOP_K};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// One ranked candidate disease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub disease: String,
    pub probability: f64,
}

/// Outcome of a prediction
///
/// Hosts that keep an audit trail store these fields verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Most probable disease
    pub primary_prediction: String,
    /// Probability of the primary prediction
    pub confidence: f64,
    /// Up to three most probable diseases, most probable first
    pub top_predictions: Vec<RankedPrediction>,
    /// Number of symptoms present in the feature vector
    pub total_symptoms: usize,
}

impl PredictionResult {
    /// Clinical confidence tier of this prediction
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }
}

/// Immutable, fitted model state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel<C = RandomForest> {
    vocabulary: SymptomVocabulary,
    labels: LabelEncoder,
    classifier: C,
}

impl TrainedModel<RandomForest> {
    /// Fit a random forest on the corpus
    pub fn train(corpus: &Corpus, params: &ForestParams) -> Result<Self> {
        Self::fit_with(corpus, RandomForest::new(*params))
    }
}

impl<C: ProbabilisticClassifier> TrainedModel<C> {
    /// Fit any classifier on the corpus
    ///
    /// Captures the corpus column order as the canonical input ordering and
    /// builds a sorted label encoding. Fails on an empty or single-class
    /// corpus, repeated column names, or rows whose width differs from the
    /// column count.
    pub fn fit_with(corpus: &Corpus, mut classifier: C) -> Result<Self> {
        if corpus.is_empty() {
            return Err(ConfigError::EmptyCorpus.into());
        }
        crate::corpus::check_columns(corpus.columns())?;
        let width = corpus.columns().len();
        if let Some(row) = corpus.examples().iter().find(|e| e.symptoms.len() != width) {
            return Err(crate::HealthSenseError::DimensionMismatch {
                expected: width,
                got: row.symptoms.len(),
            });
        }

        let labels = LabelEncoder::fit(corpus.examples().iter().map(|e| e.disease.as_str()))?;
        let targets: Vec<usize> = corpus
            .examples()
            .iter()
            .filter_map(|e| labels.encode(&e.disease))
            .collect();
        let features: Vec<Vec<bool>> = corpus
            .examples()
            .iter()
            .map(|e| e.symptoms.clone())
            .collect();

        tracing::info!(
            rows = corpus.len(),
            symptoms = corpus.columns().len(),
            classes = labels.len(),
            "training disease classifier"
        );
        let start = Instant::now();
        classifier.fit(&features, &targets, labels.len())?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "disease classifier trained"
        );

        Ok(TrainedModel {
            vocabulary: SymptomVocabulary::new(corpus.columns().iter().cloned()),
            labels,
            classifier,
        })
    }

    /// Symptom names in the order features are built
    pub fn available_symptoms(&self) -> &[String] {
        self.vocabulary.names()
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    /// Disease names in class-index order
    pub fn diseases(&self) -> &[String] {
        self.labels.classes()
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Canonical feature vector for a query; unknown symptoms are ignored
    pub fn feature_vector(&self, query: &SymptomQuery) -> Vec<bool> {
        let (features, unknown) = self.vocabulary.encode(query);
        if !unknown.is_empty() {
            tracing::debug!(?unknown, "ignoring symptoms unknown to the model");
        }
        features
    }

    /// Full class distribution for a query, in class-index order
    pub fn predict_proba(&self, query: &SymptomQuery) -> Result<Vec<f64>> {
        self.classifier.predict_proba(&self.feature_vector(query))
    }

    /// Full class distribution keyed by disease name
    pub fn disease_probabilities(&self, query: &SymptomQuery) -> Result<BTreeMap<String, f64>> {
        let proba = self.predict_proba(query)?;
        Ok(self
            .labels
            .classes()
            .iter()
            .cloned()
            .zip(proba)
            .collect())
    }

    /// Rank candidate diseases for a query
    pub fn predict(&self, query: &SymptomQuery) -> Result<PredictionResult> {
        let features = self.feature_vector(query);
        let proba = self.classifier.predict_proba(&features)?;

        let ranked = rank_classes(&proba);
        let top_predictions: Vec<RankedPrediction> = ranked
            .iter()
            .take(TOP_K)
            .map(|&class| RankedPrediction {
                disease: self.labels.decode(class).unwrap_or_default().to_string(),
                probability: proba[class],
            })
            .collect();

        let primary = &top_predictions[0];
        Ok(PredictionResult {
            primary_prediction: primary.disease.clone(),
            confidence: primary.probability,
            total_symptoms: features.iter().filter(|&&f| f).count(),
            top_predictions,
        })
    }

    /// Global importance of every vocabulary symptom
    pub fn feature_importances(&self) -> BTreeMap<String, f64> {
        self.vocabulary
            .names()
            .iter()
            .cloned()
            .zip(self.classifier.feature_importances().iter().copied())
            .collect()
    }

    /// Global importance of the symptoms present in the query
    ///
    /// This is the model's trained importance filtered to the flagged
    /// symptoms, not a per-query attribution.
    pub fn symptom_importance(&self, query: &SymptomQuery) -> BTreeMap<String, f64> {
        let importances = self.classifier.feature_importances();
        query
            .present()
            .filter_map(|symptom| {
                let idx = self.vocabulary.index_of(symptom)?;
                let value = importances.get(idx)?;
                Some((symptom.to_string(), *value))
            })
            .collect()
    }
}

/// Class indices sorted by descending probability, ties by lowest index
pub(crate) fn rank_classes(proba: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..proba.len()).collect();
    // Stable sort keeps lower indices first among equal probabilities
    order.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]));
    order
}

#[cfg(feature = "json")]
impl<C> TrainedModel<C>
where
    C: ProbabilisticClassifier + Serialize + serde::de::DeserializeOwned,
{
    /// Save the model as JSON
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref()).map_err(|e| crate::HealthSenseError::Io {
            operation: "create model file",
            message: format!("Failed to create model file: {}", e),
        })?;

        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer(writer, self).map_err(|e| crate::HealthSenseError::Io {
            operation: "write model",
            message: format!("Failed to write model JSON: {}", e),
        })?;

        Ok(())
    }

    /// Load a model saved with [`TrainedModel::save`]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| crate::HealthSenseError::Io {
            operation: "open model file",
            message: format!("Failed to open model file: {}", e),
        })?;

        let reader = std::io::BufReader::new(file);
        let model: Self = serde_json::from_reader(reader).map_err(|e| crate::HealthSenseError::Io {
            operation: "parse model",
            message: format!("Failed to parse model JSON: {}", e),
        })?;

        if !model.classifier.is_fitted() {
            return Err(crate::HealthSenseError::ModelNotInitialized);
        }
        if model.classifier.n_features() != model.vocabulary.len() {
            return Err(crate::HealthSenseError::DimensionMismatch {
                expected: model.vocabulary.len(),
                got: model.classifier.n_features(),
            });
        }
        let classes = model.labels.classes();
        if classes.len() != model.classifier.n_classes() {
            return Err(crate::HealthSenseError::InvalidModel(format!(
                "{} disease labels for {} classifier classes",
                classes.len(),
                model.classifier.n_classes()
            )));
        }
        if classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(crate::HealthSenseError::InvalidModel(
                "disease labels are not sorted and unique".to_string(),
            ));
        }
        model.classifier.validate()?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::TrainingExample;
    use crate::{HealthSenseError, Seed};

    fn example(symptoms: &[bool], disease: &str) -> TrainingExample {
        TrainingExample {
            symptoms: symptoms.to_vec(),
            disease: disease.to_string(),
        }
    }

    /// "Flu" iff fever, "Cold" iff cough, "Rash" iff itching
    fn toy_corpus() -> Corpus {
        let columns = vec!["fever".to_string(), "cough".to_string(), "itching".to_string()];
        let mut rows = Vec::new();
        for _ in 0..20 {
            rows.push(example(&[true, false, false], "Flu"));
            rows.push(example(&[false, true, false], "Cold"));
            rows.push(example(&[false, false, true], "Rash"));
        }
        Corpus::new(columns, rows).unwrap()
    }

    fn toy_model() -> TrainedModel {
        let params = ForestParams::default()
            .with_trees(15)
            .with_seed(Seed::from_string("model-test"));
        TrainedModel::train(&toy_corpus(), &params).unwrap()
    }

    #[test]
    fn test_rank_classes_ties_prefer_lower_index() {
        assert_eq!(rank_classes(&[0.2, 0.4, 0.4]), vec![1, 2, 0]);
        assert_eq!(rank_classes(&[0.5, 0.5]), vec![0, 1]);
    }

    #[test]
    fn test_labels_are_sorted() {
        let model = toy_model();
        assert_eq!(model.diseases(), &["Cold", "Flu", "Rash"]);
        assert_eq!(model.available_symptoms(), &["fever", "cough", "itching"]);
    }

    #[test]
    fn test_predict_picks_signalled_disease() {
        let model = toy_model();
        let result = model.predict(&SymptomQuery::from_present(["cough"])).unwrap();

        assert_eq!(result.primary_prediction, "Cold");
        assert_eq!(result.total_symptoms, 1);
        assert_eq!(result.top_predictions.len(), 3);
        assert_eq!(result.top_predictions[0].disease, "Cold");
        assert_eq!(result.confidence, result.top_predictions[0].probability);
        assert!(result.confidence > 0.9);
    }

    #[test]
    fn test_unknown_symptoms_are_ignored() {
        let model = toy_model();
        let empty = model.predict(&SymptomQuery::new()).unwrap();
        let unknown = model
            .predict(&SymptomQuery::from_present(["nonexistent_symptom"]))
            .unwrap();
        assert_eq!(empty, unknown);
        assert_eq!(unknown.total_symptoms, 0);
    }

    #[test]
    fn test_symptom_importance_filters_to_present() {
        let model = toy_model();
        let query = SymptomQuery::from_present(["fever", "nonexistent_symptom"]).with("cough", false);
        let importance = model.symptom_importance(&query);

        assert_eq!(importance.len(), 1);
        assert_eq!(importance["fever"], model.feature_importances()["fever"]);
    }

    #[test]
    fn test_rejects_single_class_corpus() {
        let corpus = Corpus::new(
            vec!["fever".to_string()],
            vec![example(&[true], "Flu"), example(&[false], "Flu")],
        )
        .unwrap();
        let err = TrainedModel::train(&corpus, &ForestParams::default()).unwrap_err();
        assert_eq!(err, HealthSenseError::Configuration(ConfigError::SingleClass("Flu".to_string())));
    }

    #[test]
    fn test_rejects_empty_corpus() {
        let corpus = Corpus::new(vec!["fever".to_string()], vec![]).unwrap();
        let err = TrainedModel::train(&corpus, &ForestParams::default()).unwrap_err();
        assert_eq!(err, HealthSenseError::Configuration(ConfigError::EmptyCorpus));
    }

    #[test]
    fn test_rejects_repeated_columns() {
        let mut corpus = toy_corpus();
        corpus.columns[1] = "fever".to_string();

        let err = TrainedModel::train(&corpus, &ForestParams::default()).unwrap_err();
        assert_eq!(
            err,
            HealthSenseError::Configuration(ConfigError::DuplicateSymptom("fever".to_string()))
        );
    }

    #[test]
    fn test_rejects_rows_wider_than_columns() {
        let mut corpus = toy_corpus();
        corpus.columns.pop();

        let err = TrainedModel::train(&corpus, &ForestParams::default()).unwrap_err();
        assert_eq!(err, HealthSenseError::DimensionMismatch { expected: 2, got: 3 });
    }

    #[test]
    fn test_disease_probabilities_sum_to_one() {
        let model = toy_model();
        let dist = model
            .disease_probabilities(&SymptomQuery::from_present(["fever", "itching"]))
            .unwrap();
        assert_eq!(dist.len(), 3);
        assert!((dist.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
