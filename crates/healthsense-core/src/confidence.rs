//! Confidence Tiers for Disease Predictions
//!
//! Maps a prediction's probability onto the three tiers the clinic
//! dashboard shows, with the guidance text attached to each tier, and
//! summarises batches of predictions for the history and analytics views.

use crate::model::PredictionResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lower bound of the high-confidence tier
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Lower bound of the moderate-confidence tier
pub const MODERATE_CONFIDENCE: f64 = 0.6;

/// Prediction confidence tier for clinical display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    /// Confidence of at least 80%
    High,
    /// Confidence between 60% and 80%
    Moderate,
    /// Confidence below 60%
    Low,
}

impl ConfidenceLevel {
    /// Tier for a probability in [0, 1]
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if confidence >= MODERATE_CONFIDENCE {
            ConfidenceLevel::Moderate
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High confidence prediction",
            ConfidenceLevel::Moderate => "Moderate confidence prediction",
            ConfidenceLevel::Low => "Low confidence prediction",
        }
    }

    /// Guidance shown alongside a prediction in this tier
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            ConfidenceLevel::High => &[
                "Consider consulting a healthcare professional",
                "Monitor symptoms closely",
                "Follow standard care protocols",
            ],
            ConfidenceLevel::Moderate => &[
                "Multiple conditions possible",
                "Seek professional medical advice",
                "Additional tests may be needed",
            ],
            ConfidenceLevel::Low => &[
                "Symptoms are not clearly indicative",
                "Consult a healthcare professional immediately",
                "Consider comprehensive examination",
            ],
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Moderate => "Moderate",
            ConfidenceLevel::Low => "Low",
        };
        f.write_str(label)
    }
}

/// Summary statistics over a batch of predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionStats {
    /// Number of predictions
    pub count: usize,
    /// Mean confidence
    pub mean_confidence: f64,
    /// Population standard deviation of confidence
    pub std_dev: f64,
    /// Predictions in the high tier
    pub high_confidence_count: usize,
    /// Predictions in the moderate tier
    pub moderate_confidence_count: usize,
    /// Predictions in the low tier
    pub low_confidence_count: usize,
    /// How often each disease was the primary prediction
    pub disease_counts: BTreeMap<String, usize>,
}

impl PredictionStats {
    /// Calculate statistics for a batch of predictions
    pub fn from_results(results: &[PredictionResult]) -> Self {
        let count = results.len();
        let mut stats = PredictionStats {
            count,
            mean_confidence: 0.0,
            std_dev: 0.0,
            high_confidence_count: 0,
            moderate_confidence_count: 0,
            low_confidence_count: 0,
            disease_counts: BTreeMap::new(),
        };
        if count == 0 {
            return stats;
        }

        let n = count as f64;
        stats.mean_confidence = results.iter().map(|r| r.confidence).sum::<f64>() / n;
        let variance = results
            .iter()
            .map(|r| (r.confidence - stats.mean_confidence).powi(2))
            .sum::<f64>()
            / n;
        stats.std_dev = variance.sqrt();

        for result in results {
            match result.confidence_level() {
                ConfidenceLevel::High => stats.high_confidence_count += 1,
                ConfidenceLevel::Moderate => stats.moderate_confidence_count += 1,
                ConfidenceLevel::Low => stats.low_confidence_count += 1,
            }
            *stats
                .disease_counts
                .entry(result.primary_prediction.clone())
                .or_insert(0) += 1;
        }

        stats
    }

    /// Top N predicted diseases by frequency, ties by name
    pub fn most_common(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .disease_counts
            .iter()
            .map(|(name, &count)| (name.as_str(), count))
            .collect();
        // BTreeMap order is by name, so a stable sort on count keeps name order for ties
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RankedPrediction;

    fn result(disease: &str, confidence: f64) -> PredictionResult {
        PredictionResult {
            primary_prediction: disease.to_string(),
            confidence,
            top_predictions: vec![RankedPrediction {
                disease: disease.to_string(),
                probability: confidence,
            }],
            total_symptoms: 1,
        }
    }

    #[test]
    fn test_confidence_from_probability() {
        assert_eq!(ConfidenceLevel::from_confidence(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.8), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.79), ConfidenceLevel::Moderate);
        assert_eq!(ConfidenceLevel::from_confidence(0.6), ConfidenceLevel::Moderate);
        assert_eq!(ConfidenceLevel::from_confidence(0.59), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_confidence(0.0), ConfidenceLevel::Low);
    }

    #[test]
    fn test_recommendations() {
        assert_eq!(ConfidenceLevel::High.recommendations().len(), 3);
        assert_eq!(
            ConfidenceLevel::Low.recommendations()[1],
            "Consult a healthcare professional immediately"
        );
        assert_eq!(ConfidenceLevel::Moderate.to_string(), "Moderate");
    }

    #[test]
    fn test_batch_stats() {
        let results = vec![
            result("Flu", 0.9),
            result("Flu", 0.7),
            result("Asthma", 0.5),
            result("Migraine", 0.85),
            result("Asthma", 0.65),
        ];
        let stats = PredictionStats::from_results(&results);

        assert_eq!(stats.count, 5);
        assert!((stats.mean_confidence - 0.72).abs() < 1e-9);
        assert!(stats.std_dev > 0.0);
        assert_eq!(stats.high_confidence_count, 2);
        assert_eq!(stats.moderate_confidence_count, 2);
        assert_eq!(stats.low_confidence_count, 1);
        assert_eq!(stats.disease_counts["Flu"], 2);

        assert_eq!(
            stats.most_common(2),
            vec![("Asthma", 2), ("Flu", 2)]
        );
        assert_eq!(stats.most_common(10).len(), 3);
    }

    #[test]
    fn test_empty_batch() {
        let stats = PredictionStats::from_results(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean_confidence, 0.0);
        assert!(stats.most_common(3).is_empty());
    }
}
