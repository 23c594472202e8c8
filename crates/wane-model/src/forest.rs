//! Random Forest backend: bootstrap ensemble of class-weighted CART trees.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::adapter::{Classifier, FeatureScore, FittedModel, rank_by_magnitude, validate_training};
use crate::error::ModelError;
use crate::tree::{Tree, TreeParams};

/// Random Forest configuration.
///
/// Construct via [`RandomForestClassifier::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default                  |
/// |---------------------|--------------------------|
/// | `max_depth`         | `None` (unlimited)       |
/// | `min_samples_split` | 2                        |
/// | `min_samples_leaf`  | 1                        |
/// | `majority_weight`   | 1.0 (unweighted)         |
///
/// Each split considers `ceil(sqrt(n_features))` candidate features.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    majority_weight: f64,
}

impl RandomForestClassifier {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ModelError> {
        if n_trees == 0 {
            return Err(ModelError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            majority_weight: 1.0,
        })
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split.max(2);
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf.max(1);
        self
    }

    /// Weight group-B samples relative to group-A samples.
    ///
    /// Validated at fit time; the weight must be positive and finite.
    #[must_use]
    pub fn with_majority_weight(mut self, majority_weight: f64) -> Self {
        self.majority_weight = majority_weight;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the majority-class weight.
    #[must_use]
    pub fn majority_weight(&self) -> f64 {
        self.majority_weight
    }
}

impl Classifier for RandomForestClassifier {
    type Fitted = FittedForest;

    #[instrument(skip_all, fields(n_trees = self.n_trees, n_samples = features.len()))]
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        seed: u64,
    ) -> Result<FittedForest, ModelError> {
        let n_features = validate_training(features, labels, feature_names)?;
        if !(self.majority_weight.is_finite() && self.majority_weight > 0.0) {
            return Err(ModelError::InvalidClassWeight {
                weight: self.majority_weight,
            });
        }

        let n_samples = features.len();
        let cols: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let params = TreeParams {
            max_features: (n_features as f64).sqrt().ceil() as usize,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            class_weights: [1.0, self.majority_weight],
        };

        // Per-tree seeds from a master RNG; trees then train independently.
        let mut master_rng = ChaCha8Rng::seed_from_u64(seed);
        let tree_seeds: Vec<u64> = (0..self.n_trees).map(|_| master_rng.r#gen()).collect();

        let trained: Vec<(Tree, Vec<f64>)> = tree_seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);
                let bootstrap: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                let mut importances = vec![0.0f64; n_features];
                let tree = Tree::grow(&cols, labels, &bootstrap, &params, &mut rng, &mut importances);
                (tree, importances)
            })
            .collect();

        let mut trees = Vec::with_capacity(self.n_trees);
        let mut importance = vec![0.0f64; n_features];
        for (tree, tree_importances) in trained {
            trees.push(tree);
            for (total, val) in importance.iter_mut().zip(tree_importances) {
                *total += val;
            }
        }
        let sum: f64 = importance.iter().sum();
        if sum > 0.0 {
            importance.iter_mut().for_each(|v| *v /= sum);
        }

        debug!(n_trees = trees.len(), n_features, "random forest trained");

        Ok(FittedForest {
            trees,
            n_features,
            feature_names: feature_names.to_vec(),
            importance,
        })
    }
}

/// A fitted Random Forest ensemble.
#[derive(Debug)]
pub struct FittedForest {
    trees: Vec<Tree>,
    n_features: usize,
    feature_names: Vec<String>,
    /// Mean decrease-in-impurity scores, normalized to sum to 1.
    importance: Vec<f64>,
}

impl FittedModel for FittedForest {
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(ModelError::PredictionFeatureMismatch {
                        expected: self.n_features,
                        got: row.len(),
                    });
                }
                let total: f64 = self.trees.iter().map(|t| t.predict_p_b(row)).sum();
                Ok(total / self.trees.len() as f64)
            })
            .collect()
    }

    fn feature_importance(&self) -> Vec<FeatureScore> {
        rank_by_magnitude(&self.feature_names, &self.importance)
    }
}
