//! Hold-out Evaluation
//!
//! Scores a trained model against a labelled corpus, typically the test
//! half of [`Corpus::split`](crate::Corpus::split).

use crate::classifier::ProbabilisticClassifier;
use crate::corpus::Corpus;
use crate::model::{rank_classes, TrainedModel};
use crate::vocabulary::SymptomQuery;
use crate::{Result, TOP_K};
use serde::{Deserialize, Serialize};

/// Per-disease precision and recall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub disease: String,
    /// Rows whose true label is this disease
    pub support: usize,
    pub precision: f64,
    pub recall: f64,
}

/// Accuracy summary of a model on labelled rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Rows scored
    pub total: usize,
    /// Rows whose primary prediction matched the label
    pub correct: usize,
    pub accuracy: f64,
    /// Fraction of rows whose label was among the top predictions
    pub top_k_accuracy: f64,
    /// Rows whose label the model has never seen
    pub unknown_labels: usize,
    /// `confusion[truth][predicted]` in label-encoding order
    pub confusion: Vec<Vec<usize>>,
    pub classes: Vec<ClassReport>,
}

impl EvaluationReport {
    /// Per-class report for one disease
    pub fn class(&self, disease: &str) -> Option<&ClassReport> {
        self.classes.iter().find(|c| c.disease == disease)
    }
}

/// Score `model` on every row of `corpus`
///
/// Columns are matched by name, so a corpus generated from a catalog with a
/// different symptom order still evaluates correctly.
pub fn evaluate<C: ProbabilisticClassifier>(
    model: &TrainedModel<C>,
    corpus: &Corpus,
) -> Result<EvaluationReport> {
    let n_classes = model.labels().len();
    let mut confusion = vec![vec![0usize; n_classes]; n_classes];
    let mut correct = 0;
    let mut in_top_k = 0;
    let mut unknown_labels = 0;

    for example in corpus.examples() {
        let query: SymptomQuery = corpus
            .columns()
            .iter()
            .zip(&example.symptoms)
            .map(|(name, &present)| (name.as_str(), present))
            .collect();

        let proba = model.predict_proba(&query)?;
        let ranked = rank_classes(&proba);
        let predicted = ranked[0];

        let Some(truth) = model.labels().encode(&example.disease) else {
            unknown_labels += 1;
            continue;
        };

        confusion[truth][predicted] += 1;
        if truth == predicted {
            correct += 1;
        }
        if ranked.iter().take(TOP_K).any(|&c| c == truth) {
            in_top_k += 1;
        }
    }

    let total = corpus.len();
    let ratio = |hits: usize| if total == 0 { 0.0 } else { hits as f64 / total as f64 };

    let classes = model
        .diseases()
        .iter()
        .enumerate()
        .map(|(idx, disease)| {
            let support: usize = confusion[idx].iter().sum();
            let predicted: usize = confusion.iter().map(|row| row[idx]).sum();
            let hits = confusion[idx][idx];
            ClassReport {
                disease: disease.clone(),
                support,
                precision: if predicted == 0 { 0.0 } else { hits as f64 / predicted as f64 },
                recall: if support == 0 { 0.0 } else { hits as f64 / support as f64 },
            }
        })
        .collect();

    tracing::debug!(total, correct, unknown_labels, "evaluation finished");

    Ok(EvaluationReport {
        total,
        correct,
        accuracy: ratio(correct),
        top_k_accuracy: ratio(in_top_k),
        unknown_labels,
        confusion,
        classes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ForestParams;
    use crate::corpus::TrainingExample;
    use crate::Seed;

    fn example(symptoms: &[bool], disease: &str) -> TrainingExample {
        TrainingExample {
            symptoms: symptoms.to_vec(),
            disease: disease.to_string(),
        }
    }

    fn columns() -> Vec<String> {
        vec!["fever".to_string(), "cough".to_string()]
    }

    fn model() -> TrainedModel {
        let mut rows = Vec::new();
        for _ in 0..25 {
            rows.push(example(&[true, false], "Flu"));
            rows.push(example(&[false, true], "Cold"));
        }
        let corpus = Corpus::new(columns(), rows).unwrap();
        let params = ForestParams::default()
            .with_trees(10)
            .with_seed(Seed::from_string("evaluation"));
        TrainedModel::train(&corpus, &params).unwrap()
    }

    #[test]
    fn test_perfect_separation() {
        let model = model();
        let test = Corpus::new(
            columns(),
            vec![
                example(&[true, false], "Flu"),
                example(&[false, true], "Cold"),
                example(&[false, true], "Cold"),
            ],
        )
        .unwrap();

        let report = evaluate(&model, &test).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.correct, 3);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.top_k_accuracy, 1.0);
        // Cold sorts before Flu
        assert_eq!(report.confusion, vec![vec![2, 0], vec![0, 1]]);
        assert_eq!(report.class("Cold").unwrap().support, 2);
        assert_eq!(report.class("Flu").unwrap().precision, 1.0);
    }

    #[test]
    fn test_unknown_labels_count_as_misses() {
        let model = model();
        let test = Corpus::new(
            columns(),
            vec![
                example(&[true, false], "Flu"),
                example(&[true, false], "Measles"),
            ],
        )
        .unwrap();

        let report = evaluate(&model, &test).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.correct, 1);
        assert_eq!(report.unknown_labels, 1);
        assert_eq!(report.accuracy, 0.5);
    }

    #[test]
    fn test_columns_matched_by_name() {
        let model = model();
        let swapped = Corpus::new(
            vec!["cough".to_string(), "fever".to_string()],
            vec![example(&[true, false], "Cold")],
        )
        .unwrap();

        let report = evaluate(&model, &swapped).unwrap();
        assert_eq!(report.correct, 1);
    }
}
