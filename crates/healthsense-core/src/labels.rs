//! Disease label encoding
//!
//! Labels are sorted before indices are assigned, so the meaning of a class
//! index depends only on the set of diseases in the corpus and never on the
//! order rows happened to be generated in.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bidirectional map between disease names and class indices
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on observed labels
    ///
    /// Requires at least two distinct labels.
    pub fn fit<'a, I>(labels: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = labels.into_iter().collect();
        match distinct.len() {
            0 => Err(ConfigError::EmptyCorpus),
            1 => Err(ConfigError::SingleClass(
                distinct.into_iter().next().unwrap_or_default().to_string(),
            )),
            _ => Ok(LabelEncoder {
                classes: distinct.into_iter().map(str::to_string).collect(),
            }),
        }
    }

    /// Class index for a label
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    /// Label for a class index
    pub fn decode(&self, class: usize) -> Option<&str> {
        self.classes.get(class).map(String::as_str)
    }

    /// Labels in class-index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
