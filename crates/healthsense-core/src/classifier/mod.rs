//! Multi-class probabilistic classifiers
//!
//! The predictor only talks to the [`ProbabilisticClassifier`] trait, so the
//! bagged-tree ensemble can be replaced without touching corpus generation
//! or the prediction contract.

mod forest;
mod tree;

pub use forest::{ForestParams, RandomForest};
pub use tree::{DecisionTree, TreeParams};

use crate::{HealthSenseError, Result};

/// A classifier over boolean feature vectors that reports class probabilities
pub trait ProbabilisticClassifier: Send + Sync {
    /// Fit on `features` (one row per sample) and class indices in `0..n_classes`
    fn fit(&mut self, features: &[Vec<bool>], labels: &[usize], n_classes: usize) -> Result<()>;

    /// Probability of every class for one feature vector; sums to 1
    fn predict_proba(&self, features: &[bool]) -> Result<Vec<f64>>;

    /// Global importance per feature position, summing to 1 (empty before fitting)
    fn feature_importances(&self) -> &[f64];

    fn n_classes(&self) -> usize;

    fn n_features(&self) -> usize;

    fn is_fitted(&self) -> bool;

    /// Check fitted state that did not come from `fit`, such as a model file
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Shape checks shared by every classifier's `fit`
pub(crate) fn check_training_data(
    features: &[Vec<bool>],
    labels: &[usize],
    n_classes: usize,
) -> Result<usize> {
    if features.is_empty() {
        return Err(crate::ConfigError::EmptyCorpus.into());
    }
    if labels.len() != features.len() {
        return Err(HealthSenseError::DimensionMismatch {
            expected: features.len(),
            got: labels.len(),
        });
    }
    if n_classes < 2 {
        return Err(crate::ConfigError::InvalidHyperparameter {
            name: "n_classes",
            reason: format!("need at least 2 classes, got {}", n_classes),
        }
        .into());
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
        return Err(crate::ConfigError::InvalidHyperparameter {
            name: "labels",
            reason: format!("class index {} out of range for {} classes", bad, n_classes),
        }
        .into());
    }

    let n_features = features[0].len();
    if let Some(row) = features.iter().find(|r| r.len() != n_features) {
        return Err(HealthSenseError::DimensionMismatch {
            expected: n_features,
            got: row.len(),
        });
    }
    Ok(n_features)
}

/// Gini impurity of a class histogram
pub(crate) fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert!((gini(&[1, 1, 1], 3) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn test_check_training_data() {
        let rows = vec![vec![true, false], vec![false, true]];
        assert_eq!(check_training_data(&rows, &[0, 1], 2), Ok(2));
        assert!(check_training_data(&[], &[], 2).is_err());
        assert!(check_training_data(&rows, &[0], 2).is_err());
        assert!(check_training_data(&rows, &[0, 2], 2).is_err());
        assert!(check_training_data(&rows, &[0, 0], 1).is_err());

        let ragged = vec![vec![true, false], vec![false]];
        assert_eq!(
            check_training_data(&ragged, &[0, 1], 2),
            Err(HealthSenseError::DimensionMismatch { expected: 2, got: 1 })
        );
    }
}
