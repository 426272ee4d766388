//! CART decision tree over boolean features
//!
//! Each internal node tests one symptom: absent goes left, present goes
//! right. Splits minimise weighted Gini impurity over a random subset of
//! candidate features, and leaves store the class distribution of their
//! training samples.

use super::{check_training_data, gini, ProbabilisticClassifier};
use crate::{HealthSenseError, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    /// Nodes with fewer samples become leaves
    pub min_samples_split: usize,
    /// Splits leaving fewer samples on either side are rejected
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` examines all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: 15,
            min_samples_split: 4,
            min_samples_leaf: 2,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        absent: usize,
        present: usize,
    },
}

/// Candidate split found while scanning features
struct BestSplit {
    feature: usize,
    decrease: f64,
}

/// A fitted (or empty) classification tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    params: TreeParams,
    seed: u64,
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Create an unfitted tree; `seed` drives feature subsampling
    pub fn new(params: TreeParams, seed: u64) -> Self {
        DecisionTree {
            params,
            seed,
            nodes: Vec::new(),
            n_features: 0,
            n_classes: 0,
            importances: Vec::new(),
        }
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Number of nodes (internal and leaf)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { absent, present, .. } => {
                    1 + walk(nodes, *absent).max(walk(nodes, *present))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Whether the root was split at all
    pub(crate) fn has_splits(&self) -> bool {
        self.nodes.len() > 1
    }

    /// Grow the tree on a multiset of sample indices (bootstrap draws repeat rows)
    pub(crate) fn fit_samples(
        &mut self,
        features: &[Vec<bool>],
        labels: &[usize],
        n_features: usize,
        n_classes: usize,
        samples: &mut [usize],
        rng: &mut ChaCha8Rng,
    ) {
        self.n_features = n_features;
        self.n_classes = n_classes;

        let mut builder = Builder {
            features,
            labels,
            params: &self.params,
            n_features,
            n_classes,
            candidates: (0..n_features).collect(),
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        builder.grow(samples, 0, rng);

        let total: f64 = builder.importances.iter().sum();
        if total > 0.0 {
            for value in builder.importances.iter_mut() {
                *value /= total;
            }
        }

        self.nodes = builder.nodes;
        self.importances = builder.importances;
    }

    fn leaf(&self, features: &[bool]) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    absent,
                    present,
                } => {
                    id = if features[*feature] { *present } else { *absent };
                }
            }
        }
    }

    /// Check node links, split features and leaf widths
    ///
    /// Children always sit after their parent, so a valid tree cannot cycle.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(HealthSenseError::InvalidModel(reason));

        if self.nodes.is_empty() {
            return invalid("tree has no nodes".to_string());
        }
        if self.importances.len() != self.n_features {
            return invalid(format!(
                "tree has {} importances for {} features",
                self.importances.len(),
                self.n_features
            ));
        }

        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } => {
                    if distribution.len() != self.n_classes {
                        return invalid(format!(
                            "leaf {} has {} classes, expected {}",
                            id,
                            distribution.len(),
                            self.n_classes
                        ));
                    }
                    if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return invalid(format!("leaf {} has a non-probability entry", id));
                    }
                }
                Node::Split {
                    feature,
                    absent,
                    present,
                } => {
                    if *feature >= self.n_features {
                        return invalid(format!(
                            "node {} splits on feature {} of {}",
                            id, feature, self.n_features
                        ));
                    }
                    for &child in [absent, present] {
                        if child <= id || child >= self.nodes.len() {
                            return invalid(format!("node {} links to node {}", id, child));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf distribution for a feature vector whose shape was already checked
    pub(crate) fn leaf_distribution(&self, features: &[bool]) -> &[f64] {
        self.leaf(features)
    }
}

impl ProbabilisticClassifier for DecisionTree {
    fn fit(&mut self, features: &[Vec<bool>], labels: &[usize], n_classes: usize) -> Result<()> {
        let n_features = check_training_data(features, labels, n_classes)?;
        let mut samples: Vec<usize> = (0..features.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.fit_samples(features, labels, n_features, n_classes, &mut samples, &mut rng);
        Ok(())
    }

    fn predict_proba(&self, features: &[bool]) -> Result<Vec<f64>> {
        if self.nodes.is_empty() {
            return Err(HealthSenseError::ModelNotInitialized);
        }
        if features.len() != self.n_features {
            return Err(HealthSenseError::DimensionMismatch {
                expected: self.n_features,
                got: features.len(),
            });
        }
        Ok(self.leaf(features).to_vec())
    }

    fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    fn validate(&self) -> Result<()> {
        DecisionTree::validate(self)
    }
}

/// Recursive tree construction state
struct Builder<'a> {
    features: &'a [Vec<bool>],
    labels: &'a [usize],
    params: &'a TreeParams,
    n_features: usize,
    n_classes: usize,
    candidates: Vec<usize>,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl Builder<'_> {
    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &s in samples {
            counts[self.labels[s]] += 1;
        }
        counts
    }

    fn grow(&mut self, samples: &mut [usize], depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let n = samples.len();
        let counts = self.class_counts(samples);
        let impurity = gini(&counts, n);

        let id = self.nodes.len();
        let is_leaf = depth >= self.params.max_depth
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || impurity <= f64::EPSILON;

        let split = if is_leaf {
            None
        } else {
            self.best_split(samples, &counts, impurity, rng)
        };

        let Some(split) = split else {
            let distribution = counts.iter().map(|&c| c as f64 / n as f64).collect();
            self.nodes.push(Node::Leaf { distribution });
            return id;
        };

        // Reserve the slot; children are pushed after it
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        self.importances[split.feature] += split.decrease * n as f64;

        let boundary = partition(samples, |s| !self.features[s][split.feature]);
        let (absent_samples, present_samples) = samples.split_at_mut(boundary);
        let absent = self.grow(absent_samples, depth + 1, rng);
        let present = self.grow(present_samples, depth + 1, rng);

        self.nodes[id] = Node::Split {
            feature: split.feature,
            absent,
            present,
        };
        id
    }

    /// Scan a random ordering of features until `max_features` non-constant
    /// ones have been evaluated, keeping the largest impurity decrease
    fn best_split(
        &mut self,
        samples: &[usize],
        counts: &[usize],
        impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n = samples.len();
        let max_features = self
            .params
            .max_features
            .unwrap_or(self.n_features)
            .clamp(1, self.n_features.max(1));
        let min_leaf = self.params.min_samples_leaf;

        self.candidates.shuffle(rng);

        let mut best: Option<BestSplit> = None;
        let mut visited = 0;
        let mut present_counts = vec![0usize; self.n_classes];

        for &feature in &self.candidates {
            if visited >= max_features {
                break;
            }

            present_counts.iter_mut().for_each(|c| *c = 0);
            let mut n_present = 0;
            for &s in samples {
                if self.features[s][feature] {
                    present_counts[self.labels[s]] += 1;
                    n_present += 1;
                }
            }

            // Constant features do not use up the candidate budget
            if n_present == 0 || n_present == n {
                continue;
            }
            visited += 1;

            let n_absent = n - n_present;
            if n_present < min_leaf || n_absent < min_leaf {
                continue;
            }

            let absent_counts: Vec<usize> = counts
                .iter()
                .zip(&present_counts)
                .map(|(total, present)| total - present)
                .collect();

            let weighted = (n_present as f64 * gini(&present_counts, n_present)
                + n_absent as f64 * gini(&absent_counts, n_absent))
                / n as f64;
            let decrease = impurity - weighted;

            if decrease > f64::EPSILON && best.as_ref().map_or(true, |b| decrease > b.decrease) {
                best = Some(BestSplit { feature, decrease });
            }
        }

        best
    }
}

/// Move items matching `pred` to the front; returns how many matched
fn partition<F: Fn(usize) -> bool>(items: &mut [usize], pred: F) -> usize {
    let mut boundary = 0;
    for i in 0..items.len() {
        if pred(items[i]) {
            items.swap(boundary, i);
            boundary += 1;
        }
    }
    boundary
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Class 1 iff feature 0 is set; feature 1 is noise
    fn separable() -> (Vec<Vec<bool>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let signal = i % 2 == 0;
            features.push(vec![signal, i % 3 == 0]);
            labels.push(usize::from(signal));
        }
        (features, labels)
    }

    #[test]
    fn test_learns_single_feature_rule() {
        let (features, labels) = separable();
        let mut tree = DecisionTree::new(TreeParams::default(), 7);
        tree.fit(&features, &labels, 2).unwrap();

        assert_eq!(tree.predict_proba(&[true, false]).unwrap(), vec![0.0, 1.0]);
        assert_eq!(tree.predict_proba(&[false, true]).unwrap(), vec![1.0, 0.0]);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.feature_importances(), &[1.0, 0.0]);
    }

    #[test]
    fn test_depth_limit() {
        let (features, labels) = separable();
        let params = TreeParams {
            max_depth: 0,
            ..TreeParams::default()
        };
        let mut tree = DecisionTree::new(params, 7);
        tree.fit(&features, &labels, 2).unwrap();

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&[true, true]).unwrap(), vec![0.5, 0.5]);
        assert!(tree.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_min_samples_leaf_blocks_tiny_splits() {
        // Only one sample has the feature set, so no split is allowed
        let features = vec![vec![true], vec![false], vec![false], vec![false]];
        let labels = vec![1, 0, 0, 0];
        let mut tree = DecisionTree::new(TreeParams::default(), 1);
        tree.fit(&features, &labels, 2).unwrap();

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&[true]).unwrap(), vec![0.75, 0.25]);
    }

    #[test]
    fn test_unfitted_and_mismatched() {
        let tree = DecisionTree::new(TreeParams::default(), 0);
        assert_eq!(tree.predict_proba(&[true]), Err(HealthSenseError::ModelNotInitialized));
        assert!(!tree.is_fitted());

        let (features, labels) = separable();
        let mut tree = tree;
        tree.fit(&features, &labels, 2).unwrap();
        assert_eq!(
            tree.predict_proba(&[true]),
            Err(HealthSenseError::DimensionMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn test_validate_accepts_fitted_tree() {
        let (features, labels) = separable();
        let mut tree = DecisionTree::new(TreeParams::default(), 7);
        tree.fit(&features, &labels, 2).unwrap();
        assert!(tree.validate().is_ok());

        assert!(DecisionTree::new(TreeParams::default(), 7).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_broken_structure() {
        let (features, labels) = separable();
        let mut fitted = DecisionTree::new(TreeParams::default(), 7);
        fitted.fit(&features, &labels, 2).unwrap();

        let mut dangling = fitted.clone();
        dangling.nodes[0] = Node::Split {
            feature: 0,
            absent: 1,
            present: 99,
        };
        assert!(matches!(dangling.validate(), Err(HealthSenseError::InvalidModel(_))));

        let mut cyclic = fitted.clone();
        cyclic.nodes[0] = Node::Split {
            feature: 0,
            absent: 0,
            present: 1,
        };
        assert!(cyclic.validate().is_err());

        let mut wide_feature = fitted.clone();
        wide_feature.nodes[0] = Node::Split {
            feature: 5,
            absent: 1,
            present: 2,
        };
        assert!(wide_feature.validate().is_err());

        let mut short_leaf = fitted;
        short_leaf.nodes[1] = Node::Leaf {
            distribution: vec![1.0],
        };
        assert!(short_leaf.validate().is_err());
    }

    #[test]
    fn test_partition() {
        let mut items = vec![5, 2, 8, 1, 4];
        let boundary = partition(&mut items, |x| x % 2 == 0);
        assert_eq!(boundary, 3);
        assert!(items[..3].iter().all(|x| x % 2 == 0));
        assert!(items[3..].iter().all(|x| x % 2 == 1));
    }
}
