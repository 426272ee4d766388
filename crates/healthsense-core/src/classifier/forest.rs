//! Random Forest
//!
//! Bagged ensemble of [`DecisionTree`]s. Every tree is grown on a bootstrap
//! resample of the corpus and examines a random subset of features at each
//! split. Class probabilities are the mean of the trees' leaf
//! distributions; feature importance is the mean (normalised) impurity
//! decrease across trees.
//!
//! Each tree receives its own RNG seed drawn up front from the forest seed,
//! so sequential and `parallel` fits produce identical forests.

use super::tree::{DecisionTree, TreeParams};
use super::{check_training_data, ProbabilisticClassifier};
use crate::{ConfigError, HealthSenseError, Result, Seed};
use rand::prelude::*;
use rand_chacha::{ChaCha20Rng, ChaCha8Rng};
use serde::{Deserialize, Serialize};

/// Hyperparameters for [`RandomForest`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` uses ⌊√n_features⌋
    pub max_features: Option<usize>,
    /// Resample rows with replacement for each tree
    pub bootstrap: bool,
    /// Fixed seed for reproducible forests; `None` draws from OS entropy
    pub seed: Option<Seed>,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 200,
            max_depth: 15,
            min_samples_split: 4,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
            seed: None,
        }
    }
}

impl ForestParams {
    /// Set number of trees
    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set maximum tree depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples required to split a node
    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    /// Set minimum samples per leaf
    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    /// Override the per-split feature budget
    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n);
        self
    }

    /// Enable/disable bootstrap resampling
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.bootstrap = enabled;
        self
    }

    /// Fix the random seed
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject parameter combinations that cannot grow a useful forest
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |name, reason: &str| {
            Err(ConfigError::InvalidHyperparameter {
                name,
                reason: reason.to_string(),
            })
        };
        if self.n_trees == 0 {
            return invalid("n_trees", "must be at least 1");
        }
        if self.max_depth == 0 {
            return invalid("max_depth", "must be at least 1");
        }
        if self.min_samples_split < 2 {
            return invalid("min_samples_split", "must be at least 2");
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf", "must be at least 1");
        }
        if self.max_features == Some(0) {
            return invalid("max_features", "must be at least 1");
        }
        Ok(())
    }

    /// Per-tree growth limits for a dataset with `n_features` columns
    pub fn tree_params(&self, n_features: usize) -> TreeParams {
        let default_budget = ((n_features as f64).sqrt() as usize).max(1);
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: Some(self.max_features.unwrap_or(default_budget)),
        }
    }
}

/// Bagged decision-tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Create an unfitted forest
    pub fn new(params: ForestParams) -> Self {
        RandomForest {
            params,
            trees: Vec::new(),
            n_features: 0,
            n_classes: 0,
            importances: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Grow one tree from its seed
    fn grow_tree(
        &self,
        features: &[Vec<bool>],
        labels: &[usize],
        n_features: usize,
        n_classes: usize,
        tree_params: TreeParams,
        seed: u64,
    ) -> DecisionTree {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = features.len();

        let mut samples: Vec<usize> = if self.params.bootstrap {
            (0..n).map(|_| rng.gen_range(0..n)).collect()
        } else {
            (0..n).collect()
        };

        let mut tree = DecisionTree::new(tree_params, seed);
        tree.fit_samples(features, labels, n_features, n_classes, &mut samples, &mut rng);
        tree
    }

    #[cfg(feature = "parallel")]
    fn grow_trees(
        &self,
        features: &[Vec<bool>],
        labels: &[usize],
        n_features: usize,
        n_classes: usize,
        seeds: &[u64],
    ) -> Vec<DecisionTree> {
        use rayon::prelude::*;

        let tree_params = self.params.tree_params(n_features);
        seeds
            .par_iter()
            .map(|&seed| self.grow_tree(features, labels, n_features, n_classes, tree_params, seed))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn grow_trees(
        &self,
        features: &[Vec<bool>],
        labels: &[usize],
        n_features: usize,
        n_classes: usize,
        seeds: &[u64],
    ) -> Vec<DecisionTree> {
        let tree_params = self.params.tree_params(n_features);
        seeds
            .iter()
            .map(|&seed| self.grow_tree(features, labels, n_features, n_classes, tree_params, seed))
            .collect()
    }

    /// Mean of per-tree importances over trees that split at least once,
    /// renormalised to sum to 1
    fn aggregate_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        let split_trees: Vec<&DecisionTree> = self.trees.iter().filter(|t| t.has_splits()).collect();
        if split_trees.is_empty() {
            return importances;
        }

        for tree in &split_trees {
            for (total, value) in importances.iter_mut().zip(tree.feature_importances()) {
                *total += value;
            }
        }

        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for value in importances.iter_mut() {
                *value /= sum;
            }
        }
        importances
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        RandomForest::new(ForestParams::default())
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn fit(&mut self, features: &[Vec<bool>], labels: &[usize], n_classes: usize) -> Result<()> {
        self.params.validate()?;
        let n_features = check_training_data(features, labels, n_classes)?;

        let mut master = match self.params.seed {
            Some(seed) => seed.rng(),
            None => ChaCha20Rng::from_entropy(),
        };
        let seeds: Vec<u64> = (0..self.params.n_trees).map(|_| master.gen()).collect();

        self.trees = self.grow_trees(features, labels, n_features, n_classes, &seeds);
        self.n_features = n_features;
        self.n_classes = n_classes;
        self.importances = self.aggregate_importances();
        Ok(())
    }

    fn predict_proba(&self, features: &[bool]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(HealthSenseError::ModelNotInitialized);
        }
        if features.len() != self.n_features {
            return Err(HealthSenseError::DimensionMismatch {
                expected: self.n_features,
                got: features.len(),
            });
        }

        let mut probabilities = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (total, p) in probabilities.iter_mut().zip(tree.leaf_distribution(features)) {
                *total += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        for p in probabilities.iter_mut() {
            *p /= n_trees;
        }
        Ok(probabilities)
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
        !self.trees.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.importances.len() != self.n_features {
            return Err(HealthSenseError::InvalidModel(format!(
                "forest has {} importances for {} features",
                self.importances.len(),
                self.n_features
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features() != self.n_features || tree.n_classes() != self.n_classes {
                return Err(HealthSenseError::InvalidModel(format!(
                    "tree {} is shaped {}x{}, forest is {}x{}",
                    i,
                    tree.n_features(),
                    tree.n_classes(),
                    self.n_features,
                    self.n_classes
                )));
            }
            tree.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three classes, each signalled by its own feature, plus two noise columns
    fn dataset(rows: usize, seed: u64) -> (Vec<Vec<bool>>, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..rows {
            let class = rng.gen_range(0..3);
            let row = (0..5)
                .map(|f| if f == class { rng.gen_bool(0.9) } else { rng.gen_bool(0.1) })
                .collect();
            features.push(row);
            labels.push(class);
        }
        (features, labels)
    }

    fn params() -> ForestParams {
        ForestParams::default()
            .with_trees(25)
            .with_seed(Seed::from_string("forest-test"))
    }

    #[test]
    fn test_reference_defaults() {
        let p = ForestParams::default();
        assert_eq!(p.n_trees, 200);
        assert_eq!(p.max_depth, 15);
        assert_eq!(p.min_samples_split, 4);
        assert_eq!(p.min_samples_leaf, 2);
        assert!(p.bootstrap);
        assert_eq!(p.tree_params(36).max_features, Some(6));
        assert_eq!(p.tree_params(1).max_features, Some(1));
    }

    #[test]
    fn test_validate() {
        assert!(ForestParams::default().validate().is_ok());
        assert!(ForestParams::default().with_trees(0).validate().is_err());
        assert!(ForestParams::default().with_max_depth(0).validate().is_err());
        assert!(ForestParams::default().with_min_samples_split(1).validate().is_err());
        assert!(ForestParams::default().with_min_samples_leaf(0).validate().is_err());
        assert!(ForestParams::default().with_max_features(0).validate().is_err());
    }

    #[test]
    fn test_fit_and_predict() {
        let (features, labels) = dataset(600, 1);
        let mut forest = RandomForest::new(params());
        forest.fit(&features, &labels, 3).unwrap();

        assert_eq!(forest.trees().len(), 25);
        assert_eq!(forest.n_classes(), 3);

        for class in 0..3 {
            let mut query = vec![false; 5];
            query[class] = true;
            let proba = forest.predict_proba(&query).unwrap();
            let sum: f64 = proba.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            let argmax = (0..3).max_by(|&a, &b| proba[a].total_cmp(&proba[b])).unwrap();
            assert_eq!(argmax, class, "{:?}", proba);
        }
    }

    #[test]
    fn test_importances_favour_signal_features() {
        let (features, labels) = dataset(600, 2);
        let mut forest = RandomForest::new(params());
        forest.fit(&features, &labels, 3).unwrap();

        let importances = forest.feature_importances();
        assert_eq!(importances.len(), 5);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        for signal in 0..3 {
            for noise in 3..5 {
                assert!(importances[signal] > importances[noise]);
            }
        }
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (features, labels) = dataset(300, 3);
        let mut a = RandomForest::new(params());
        let mut b = RandomForest::new(params());
        a.fit(&features, &labels, 3).unwrap();
        b.fit(&features, &labels, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unfitted_forest() {
        let forest = RandomForest::default();
        assert!(!forest.is_fitted());
        assert!(forest.feature_importances().is_empty());
        assert_eq!(
            forest.predict_proba(&[true]),
            Err(HealthSenseError::ModelNotInitialized)
        );
    }

    #[test]
    fn test_validate_checks_tree_shapes() {
        let (features, labels) = dataset(200, 5);
        let mut forest = RandomForest::new(params());
        forest.fit(&features, &labels, 3).unwrap();
        assert!(forest.validate().is_ok());

        let mut extra_class = forest.clone();
        extra_class.n_classes = 4;
        assert!(matches!(extra_class.validate(), Err(HealthSenseError::InvalidModel(_))));

        let mut short_importances = forest;
        short_importances.importances.pop();
        assert!(short_importances.validate().is_err());
    }

    #[test]
    fn test_fit_rejects_invalid_params() {
        let (features, labels) = dataset(50, 4);
        let mut forest = RandomForest::new(ForestParams::default().with_trees(0));
        assert!(matches!(
            forest.fit(&features, &labels, 3),
            Err(HealthSenseError::Configuration(ConfigError::InvalidHyperparameter { name: "n_trees", .. }))
        ));
    }
}
