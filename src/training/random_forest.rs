//! Random Forest classifier
//!
//! Bounded-depth trees grown on bootstrap samples; predictions are a
//! majority vote over trees.

use super::decision_tree::{Criterion, DecisionTree};
use super::Model;
use crate::data::check_alignment;
use crate::ensemble::voting::vote;
use crate::error::{FusionError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features sampled per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Base seed; tree i uses `random_state + i`
    pub random_state: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 10,
            max_depth: Some(2),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: 0,
        }
    }
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    /// Individual trees
    trees: Vec<DecisionTree>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Deepest tree in the fitted forest
    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(|t| t.get_depth()).max().unwrap_or(0)
    }

    fn grow_tree(&self, tree_idx: usize, x: &Array2<f64>, y: &Array1<f64>, max_features: usize) -> Result<DecisionTree> {
        let n_samples = x.nrows();
        let seed = self.config.random_state.wrapping_add(tree_idx as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let sample_indices: Vec<usize> = if self.config.bootstrap {
            (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
        } else {
            (0..n_samples).collect()
        };

        let x_boot = x.select(Axis(0), &sample_indices);
        let y_boot: Array1<f64> = sample_indices.iter().map(|&i| y[i]).collect();

        let mut tree = DecisionTree::new()
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_max_features(max_features)
            .with_criterion(self.config.criterion)
            .with_random_state(seed);
        if let Some(d) = self.config.max_depth {
            tree = tree.with_max_depth(d);
        }

        tree.fit(&x_boot, &y_boot)?;
        Ok(tree)
    }
}

impl Model for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_alignment(x.nrows(), y)?;
        if self.config.n_estimators == 0 {
            return Err(FusionError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "at least one tree is required".to_string(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FusionError::InvalidInput(
                "forest input contains missing or non-finite values; impute first".to_string(),
            ));
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup();
        if classes.len() < 2 {
            return Err(FusionError::DegenerateClass {
                label: classes.first().copied().unwrap_or(f64::NAN),
                n_samples: y.len(),
            });
        }

        let max_features = self.config.max_features.resolve(x.ncols());

        // Build trees in parallel; order is preserved so voting is reproducible
        let trees = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| self.grow_tree(tree_idx, x, y, max_features))
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(FusionError::ModelNotFitted);
        }

        let all_predictions = self
            .trees
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        (0..x.nrows())
            .map(|i| {
                vote(all_predictions.iter().map(|p| p[i])).ok_or_else(|| {
                    FusionError::ComputationError("no tree votes for sample".to_string())
                })
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from_vec)
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_classifier() {
        let (x, y) = separable();
        let mut rf = RandomForest::default();
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| p == a)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_depth_is_bounded() {
        let (x, y) = separable();
        let mut rf = RandomForest::default();
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.n_trees(), 10);
        assert!(rf.max_tree_depth() <= 2);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let (x, y) = separable();
        let mut a = RandomForest::default();
        let mut b = RandomForest::default();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        let probe = array![[0.5, 0.5], [0.05, 1.1], [0.9, 0.0]];
        assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[0.0], [1.0]];
        let y = array![1.0, 1.0];
        let mut rf = RandomForest::default();
        assert!(matches!(
            rf.fit(&x, &y),
            Err(FusionError::DegenerateClass { .. })
        ));
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10), 4);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
        assert_eq!(MaxFeatures::Fixed(20).resolve(5), 5);
        assert_eq!(MaxFeatures::All.resolve(7), 7);
    }
}
