//! Symptom Vocabulary and Queries
//!
//! The vocabulary fixes the position of every symptom in a feature vector.
//! That ordering is part of a trained model's contract, so it is built once
//! and never reordered.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Ordered, duplicate-free list of symptom names
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SymptomVocabulary {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl SymptomVocabulary {
    /// Build a vocabulary, keeping the first occurrence of repeated names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = SymptomVocabulary {
            names: Vec::new(),
            index: HashMap::new(),
        };
        for name in names {
            vocabulary.push(name.into());
        }
        vocabulary
    }

    /// Append a symptom if it is not already present; returns its position
    pub(crate) fn push(&mut self, name: String) -> usize {
        if let Some(&idx) = self.index.get(&name) {
            return idx;
        }
        let idx = self.names.len();
        self.index.insert(name.clone(), idx);
        self.names.push(name);
        idx
    }

    /// Position of a symptom in feature vectors
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether the vocabulary knows this symptom
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Symptom at a feature position
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    /// Symptom names in canonical order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Build a feature vector in canonical order
    ///
    /// Absent symptoms are false. Query keys the vocabulary does not know
    /// are dropped and returned so callers can log them.
    pub fn encode<'q>(&self, query: &'q SymptomQuery) -> (Vec<bool>, Vec<&'q str>) {
        let mut features = vec![false; self.names.len()];
        let mut unknown = Vec::new();

        for (name, &present) in query.iter() {
            match self.index.get(name) {
                Some(&idx) => features[idx] = present,
                None => unknown.push(name.as_str()),
            }
        }

        (features, unknown)
    }
}

impl From<Vec<String>> for SymptomVocabulary {
    fn from(names: Vec<String>) -> Self {
        SymptomVocabulary::new(names)
    }
}

impl From<SymptomVocabulary> for Vec<String> {
    fn from(vocabulary: SymptomVocabulary) -> Self {
        vocabulary.names
    }
}

/// A symptom query: symptom name to presence
///
/// Keys are kept sorted so iteration (and therefore logging and
/// serialization) is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomQuery {
    symptoms: BTreeMap<String, bool>,
}

impl SymptomQuery {
    /// Empty query (every symptom absent)
    pub fn new() -> Self {
        SymptomQuery::default()
    }

    /// Query with the given symptoms marked present
    pub fn from_present<I, S>(symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        symptoms.into_iter().map(|s| (s.into(), true)).collect()
    }

    /// Set a symptom's presence
    pub fn set(&mut self, symptom: impl Into<String>, present: bool) -> &mut Self {
        self.symptoms.insert(symptom.into(), present);
        self
    }

    /// Builder form of [`SymptomQuery::set`]
    pub fn with(mut self, symptom: impl Into<String>, present: bool) -> Self {
        self.set(symptom, present);
        self
    }

    /// Presence of a symptom; absent keys are false
    pub fn is_present(&self, symptom: &str) -> bool {
        self.symptoms.get(symptom).copied().unwrap_or(false)
    }

    /// Names of symptoms marked present
    pub fn present(&self) -> impl Iterator<Item = &str> {
        self.symptoms
            .iter()
            .filter(|(_, present)| **present)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &bool)> {
        self.symptoms.iter()
    }

    pub fn len(&self) -> usize {
        self.symptoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for SymptomQuery {
    fn from_iter<T: IntoIterator<Item = (S, bool)>>(iter: T) -> Self {
        SymptomQuery {
            symptoms: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<HashMap<String, bool>> for SymptomQuery {
    fn from(map: HashMap<String, bool>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, bool>> for SymptomQuery {
    fn from(symptoms: BTreeMap<String, bool>) -> Self {
        SymptomQuery { symptoms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> SymptomVocabulary {
        SymptomVocabulary::new(["fever", "cough", "fatigue"])
    }

    #[test]
    fn test_order_is_insertion_order() {
        let v = vocab();
        assert_eq!(v.names(), &["fever", "cough", "fatigue"]);
        assert_eq!(v.index_of("cough"), Some(1));
        assert_eq!(v.name(2), Some("fatigue"));
        assert_eq!(v.index_of("rash"), None);
    }

    #[test]
    fn test_push_keeps_first_position() {
        let mut v = vocab();
        assert_eq!(v.push("cough".to_string()), 1);
        assert_eq!(v.push("rash".to_string()), 3);
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn test_encode_ignores_unknown() {
        let v = vocab();
        let query = SymptomQuery::new()
            .with("fatigue", true)
            .with("fever", false)
            .with("levitation", true);

        let (features, unknown) = v.encode(&query);
        assert_eq!(features, vec![false, false, true]);
        assert_eq!(unknown, vec!["levitation"]);
    }

    #[test]
    fn test_query_present() {
        let query = SymptomQuery::from_present(["cough", "fever"]).with("rash", false);
        let present: Vec<_> = query.present().collect();
        assert_eq!(present, vec!["cough", "fever"]);
        assert!(!query.is_present("rash"));
        assert!(!query.is_present("missing"));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_vocabulary_serde_roundtrip_rebuilds_index() {
        let v = vocab();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"["fever","cough","fatigue"]"#);
        let back: SymptomVocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index_of("fatigue"), Some(2));
    }
}
