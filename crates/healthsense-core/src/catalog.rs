//! Disease Catalog
//!
//! Static domain knowledge for corpus generation: which symptoms are high,
//! medium or low probability indicators of each disease. A catalog is
//! validated once at construction and is immutable afterwards, so several
//! catalogs (and models trained from them) can coexist in one process.
//!
//! # Tiers
//!
//! | Tier   | P(symptom present) |
//! |--------|--------------------|
//! | High   | 0.80               |
//! | Medium | 0.50               |
//! | Low    | 0.20               |
//! | (none) | 0.05 noise         |

use crate::vocabulary::SymptomVocabulary;
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Probability bucket linking a symptom to a disease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    /// Sampling probability for this tier under the given table
    pub fn probability(&self, table: &TierProbabilities) -> f64 {
        match self {
            Tier::High => table.high,
            Tier::Medium => table.medium,
            Tier::Low => table.low,
        }
    }
}

/// Presence probabilities used while sampling training rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierProbabilities {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    /// Chance of a spurious symptom outside every tier of the disease
    pub noise: f64,
}

impl Default for TierProbabilities {
    fn default() -> Self {
        TierProbabilities {
            high: 0.8,
            medium: 0.5,
            low: 0.2,
            noise: 0.05,
        }
    }
}

impl TierProbabilities {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("high tier", self.high),
            ("medium tier", self.medium),
            ("low tier", self.low),
            ("noise", self.noise),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        Ok(())
    }
}

/// A named condition and its tiered symptoms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseasePattern {
    pub name: String,
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub low: Vec<String>,
}

impl DiseasePattern {
    pub fn new(name: impl Into<String>) -> Self {
        DiseasePattern {
            name: name.into(),
            high: Vec::new(),
            medium: Vec::new(),
            low: Vec::new(),
        }
    }

    pub fn with_high(mut self, symptoms: &[&str]) -> Self {
        self.high = symptoms.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_medium(mut self, symptoms: &[&str]) -> Self {
        self.medium = symptoms.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_low(mut self, symptoms: &[&str]) -> Self {
        self.low = symptoms.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Symptoms in one tier
    pub fn tier(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::High => &self.high,
            Tier::Medium => &self.medium,
            Tier::Low => &self.low,
        }
    }

    /// Tier a symptom belongs to for this disease, if any
    pub fn tier_of(&self, symptom: &str) -> Option<Tier> {
        Tier::ALL
            .into_iter()
            .find(|&tier| self.tier(tier).iter().any(|s| s == symptom))
    }

    /// All tiered symptoms, high tier first
    pub fn symptoms(&self) -> impl Iterator<Item = &str> {
        self.high
            .iter()
            .chain(self.medium.iter())
            .chain(self.low.iter())
            .map(String::as_str)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for symptom in self.symptoms() {
            if !seen.insert(symptom) {
                return Err(ConfigError::OverlappingTiers {
                    disease: self.name.clone(),
                    symptom: symptom.to_string(),
                });
            }
        }
        if seen.is_empty() {
            return Err(ConfigError::EmptyPattern(self.name.clone()));
        }
        Ok(())
    }
}

/// On-disk / user-supplied catalog definition, validated into a [`DiseaseCatalog`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDefinition {
    /// Base symptom vocabulary; tier symptoms not listed here are appended
    pub symptoms: Vec<String>,
    pub diseases: Vec<DiseasePattern>,
    #[serde(default)]
    pub probabilities: TierProbabilities,
}

/// Validated, immutable disease catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseCatalog {
    vocabulary: SymptomVocabulary,
    diseases: Vec<DiseasePattern>,
    probabilities: TierProbabilities,
}

impl DiseaseCatalog {
    /// Validate a catalog and finalize its vocabulary
    ///
    /// Tier symptoms missing from `symptoms` are appended in disease order,
    /// so the vocabulary is complete before any row is generated.
    pub fn new(
        symptoms: Vec<String>,
        diseases: Vec<DiseasePattern>,
        probabilities: TierProbabilities,
    ) -> Result<Self, ConfigError> {
        if diseases.is_empty() {
            return Err(ConfigError::EmptyDiseaseSet);
        }
        probabilities.validate()?;

        let mut names = HashSet::new();
        for disease in &diseases {
            if !names.insert(disease.name.as_str()) {
                return Err(ConfigError::DuplicateDisease(disease.name.clone()));
            }
            disease.validate()?;
        }

        let mut vocabulary = SymptomVocabulary::new(Vec::<String>::new());
        for symptom in symptoms {
            if vocabulary.contains(&symptom) {
                return Err(ConfigError::DuplicateSymptom(symptom));
            }
            vocabulary.push(symptom);
        }
        for disease in &diseases {
            for symptom in disease.symptoms() {
                if !vocabulary.contains(symptom) {
                    tracing::debug!(disease = %disease.name, symptom, "appending tier symptom to vocabulary");
                    vocabulary.push(symptom.to_string());
                }
            }
        }

        Ok(DiseaseCatalog {
            vocabulary,
            diseases,
            probabilities,
        })
    }

    /// Validate a catalog definition
    pub fn from_definition(definition: CatalogDefinition) -> Result<Self, ConfigError> {
        Self::new(definition.symptoms, definition.diseases, definition.probabilities)
    }

    /// Load and validate a catalog definition from a JSON file
    #[cfg(feature = "json")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| crate::HealthSenseError::Io {
            operation: "open catalog",
            message: format!("Failed to open catalog file: {}", e),
        })?;

        let reader = std::io::BufReader::new(file);
        let definition: CatalogDefinition = serde_json::from_reader(reader).map_err(|e| {
            crate::HealthSenseError::Io {
                operation: "parse catalog",
                message: format!("Failed to parse catalog JSON: {}", e),
            }
        })?;

        Ok(Self::from_definition(definition)?)
    }

    /// The reference clinic catalog: 35 base symptoms, 15 diseases
    pub fn reference() -> Self {
        let symptoms = REFERENCE_SYMPTOMS.iter().map(|s| s.to_string()).collect();
        let diseases = vec![
            DiseasePattern::new("Common Cold")
                .with_high(&["runny_nose", "sore_throat", "cough"])
                .with_medium(&["headache", "fatigue"])
                .with_low(&["fever"]),
            DiseasePattern::new("Influenza")
                .with_high(&["fever", "body_ache", "fatigue", "headache"])
                .with_medium(&["cough", "sore_throat"])
                .with_low(&["runny_nose"]),
            DiseasePattern::new("COVID-19")
                .with_high(&["fever", "cough", "fatigue", "shortness_of_breath"])
                .with_medium(&["headache", "body_ache", "sore_throat"])
                .with_low(&["runny_nose", "nausea", "loss_of_appetite"]),
            DiseasePattern::new("Pneumonia")
                .with_high(&["fever", "cough", "shortness_of_breath", "chest_pain"])
                .with_medium(&["fatigue", "body_ache"])
                .with_low(&["headache"]),
            DiseasePattern::new("Gastroenteritis")
                .with_high(&["nausea", "vomiting", "diarrhea", "abdominal_pain"])
                .with_medium(&["fever", "fatigue"])
                .with_low(&["headache", "loss_of_appetite"]),
            DiseasePattern::new("Migraine")
                .with_high(&["headache", "nausea"])
                .with_medium(&["fatigue", "dizziness", "vision_problems"])
                .with_low(&["vomiting"]),
            DiseasePattern::new("Diabetes Type 2")
                .with_high(&["frequent_urination", "fatigue", "weight_loss"])
                .with_medium(&["dizziness", "vision_problems"])
                .with_low(&["numbness", "tingling"]),
            DiseasePattern::new("Hypertension")
                .with_high(&["headache", "dizziness", "vision_problems"])
                .with_medium(&["chest_pain", "fatigue"])
                .with_low(&["nausea"]),
            DiseasePattern::new("Asthma")
                .with_high(&["shortness_of_breath", "cough", "chest_pain"])
                .with_medium(&["fatigue"])
                .with_low(&["dizziness"]),
            DiseasePattern::new("Urinary Tract Infection")
                .with_high(&["frequent_urination", "blood_in_urine", "abdominal_pain"])
                .with_medium(&["fever", "back_pain"])
                .with_low(&["fatigue"]),
            DiseasePattern::new("Arthritis")
                .with_high(&["joint_pain", "swelling", "muscle_weakness"])
                .with_medium(&["fatigue", "body_ache"])
                .with_low(&["fever"]),
            DiseasePattern::new("Allergic Reaction")
                .with_high(&["rash", "itching", "swelling"])
                .with_medium(&["shortness_of_breath", "nausea"])
                .with_low(&["dizziness"]),
            DiseasePattern::new("Bronchitis")
                .with_high(&["cough", "chest_pain", "fatigue"])
                .with_medium(&["sore_throat", "fever"])
                .with_low(&["headache", "body_ache"]),
            DiseasePattern::new("Strep Throat")
                .with_high(&["sore_throat", "fever", "difficulty_swallowing"])
                .with_medium(&["headache", "body_ache"])
                .with_low(&["nausea"]),
            DiseasePattern::new("Sinusitis")
                .with_high(&["headache", "runny_nose", "facial_pain"])
                .with_medium(&["cough", "fever"])
                .with_low(&["fatigue"]),
        ];

        // The reference table is covered by test_reference_catalog_is_valid
        Self::new(symptoms, diseases, TierProbabilities::default())
            .expect("reference catalog should be valid")
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn diseases(&self) -> &[DiseasePattern] {
        &self.diseases
    }

    pub fn probabilities(&self) -> &TierProbabilities {
        &self.probabilities
    }

    pub fn disease(&self, name: &str) -> Option<&DiseasePattern> {
        self.diseases.iter().find(|d| d.name == name)
    }

    /// Presence probability of every vocabulary symptom for one disease
    pub fn probability_row(&self, disease: &DiseasePattern) -> Vec<f64> {
        self.vocabulary
            .names()
            .iter()
            .map(|symptom| match disease.tier_of(symptom) {
                Some(tier) => tier.probability(&self.probabilities),
                None => self.probabilities.noise,
            })
            .collect()
    }

    /// Vocabulary symptoms that belong to no disease's tiers
    pub fn noise_only_symptoms(&self) -> Vec<&str> {
        let tiered: HashSet<&str> = self.diseases.iter().flat_map(|d| d.symptoms()).collect();
        self.vocabulary
            .names()
            .iter()
            .map(String::as_str)
            .filter(|s| !tiered.contains(s))
            .collect()
    }

    /// Export as a definition, e.g. to write a starting point for a custom catalog
    pub fn to_definition(&self) -> CatalogDefinition {
        CatalogDefinition {
            symptoms: self.vocabulary.names().to_vec(),
            diseases: self.diseases.clone(),
            probabilities: self.probabilities,
        }
    }
}

const REFERENCE_SYMPTOMS: [&str; 35] = [
    "fever", "cough", "fatigue", "body_ache", "headache", "sore_throat",
    "runny_nose", "shortness_of_breath", "chest_pain", "nausea",
    "vomiting", "diarrhea", "abdominal_pain", "loss_of_appetite",
    "weight_loss", "night_sweats", "joint_pain", "muscle_weakness",
    "dizziness", "confusion", "rash", "itching", "swelling",
    "back_pain", "neck_pain", "vision_problems", "hearing_loss",
    "difficulty_swallowing", "seizures", "numbness", "tingling",
    "frequent_urination", "blood_in_urine", "constipation", "bloating",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn symptoms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reference_catalog_is_valid() {
        let catalog = DiseaseCatalog::reference();
        assert_eq!(catalog.diseases().len(), 15);
        // facial_pain is only referenced by Sinusitis and gets appended last
        assert_eq!(catalog.vocabulary().len(), 36);
        assert_eq!(catalog.vocabulary().index_of("facial_pain"), Some(35));
        assert_eq!(catalog.vocabulary().index_of("fever"), Some(0));
    }

    #[test]
    fn test_tier_lookup() {
        let catalog = DiseaseCatalog::reference();
        let cold = catalog.disease("Common Cold").unwrap();
        assert_eq!(cold.tier_of("cough"), Some(Tier::High));
        assert_eq!(cold.tier_of("fatigue"), Some(Tier::Medium));
        assert_eq!(cold.tier_of("fever"), Some(Tier::Low));
        assert_eq!(cold.tier_of("rash"), None);
    }

    #[test]
    fn test_probability_row() {
        let catalog = DiseaseCatalog::reference();
        let cold = catalog.disease("Common Cold").unwrap();
        let row = catalog.probability_row(cold);
        let vocab = catalog.vocabulary();

        assert_eq!(row.len(), vocab.len());
        assert_eq!(row[vocab.index_of("runny_nose").unwrap()], 0.8);
        assert_eq!(row[vocab.index_of("headache").unwrap()], 0.5);
        assert_eq!(row[vocab.index_of("fever").unwrap()], 0.2);
        assert_eq!(row[vocab.index_of("rash").unwrap()], 0.05);
    }

    #[test]
    fn test_noise_only_symptoms() {
        let catalog = DiseaseCatalog::reference();
        let noise = catalog.noise_only_symptoms();
        assert!(noise.contains(&"seizures"));
        assert!(noise.contains(&"bloating"));
        assert!(!noise.contains(&"cough"));
        assert!(!noise.contains(&"facial_pain"));
    }

    #[test]
    fn test_rejects_empty_disease_set() {
        let err = DiseaseCatalog::new(symptoms(&["fever"]), vec![], TierProbabilities::default());
        assert_eq!(err, Err(ConfigError::EmptyDiseaseSet));
    }

    #[test]
    fn test_rejects_overlapping_tiers() {
        let diseases = vec![DiseasePattern::new("Flu")
            .with_high(&["fever"])
            .with_low(&["fever"])];
        let err = DiseaseCatalog::new(symptoms(&["fever"]), diseases, TierProbabilities::default());
        assert_eq!(
            err,
            Err(ConfigError::OverlappingTiers {
                disease: "Flu".to_string(),
                symptom: "fever".to_string(),
            })
        );
    }

    #[test]
    fn test_same_symptom_across_diseases_is_allowed() {
        let diseases = vec![
            DiseasePattern::new("Flu").with_high(&["fever"]),
            DiseasePattern::new("Cold").with_low(&["fever"]),
        ];
        assert!(DiseaseCatalog::new(symptoms(&["fever"]), diseases, TierProbabilities::default()).is_ok());
    }

    #[test]
    fn test_rejects_duplicates_and_bad_probabilities() {
        let flu = DiseasePattern::new("Flu").with_high(&["fever"]);
        assert_eq!(
            DiseaseCatalog::new(symptoms(&["fever"]), vec![flu.clone(), flu.clone()], TierProbabilities::default()),
            Err(ConfigError::DuplicateDisease("Flu".to_string()))
        );
        assert_eq!(
            DiseaseCatalog::new(symptoms(&["fever", "fever"]), vec![flu.clone()], TierProbabilities::default()),
            Err(ConfigError::DuplicateSymptom("fever".to_string()))
        );
        assert_eq!(
            DiseaseCatalog::new(symptoms(&["fever"]), vec![DiseasePattern::new("Empty")], TierProbabilities::default()),
            Err(ConfigError::EmptyPattern("Empty".to_string()))
        );

        let bad = TierProbabilities { noise: 1.5, ..TierProbabilities::default() };
        assert!(matches!(
            DiseaseCatalog::new(symptoms(&["fever"]), vec![flu], bad),
            Err(ConfigError::InvalidProbability { name: "noise", .. })
        ));
    }

    #[test]
    fn test_definition_roundtrip() {
        let catalog = DiseaseCatalog::reference();
        let rebuilt = DiseaseCatalog::from_definition(catalog.to_definition()).unwrap();
        assert_eq!(catalog, rebuilt);
    }
}
