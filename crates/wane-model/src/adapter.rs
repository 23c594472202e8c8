//! The classifier seam: traits the experiment harness trains and queries through.

use crate::error::ModelError;

/// A per-feature importance score with a magnitude rank.
///
/// Tree ensembles report unsigned impurity-decrease scores; linear models
/// report signed coefficients, where the sign carries directionality.
#[derive(Debug, Clone)]
pub struct FeatureScore {
    /// Feature name.
    pub name: String,
    /// Importance score. May be negative for linear models.
    pub score: f64,
    /// 1-based rank by |score| (1 = largest magnitude).
    pub rank: usize,
}

/// A trainable binary classifier.
///
/// Labels are encoded 0 (group A) and 1 (group B). The `seed` argument makes
/// every fit reproducible; deterministic backends may ignore it.
pub trait Classifier {
    /// The fitted model type produced by [`Classifier::fit`].
    type Fitted: FittedModel;

    /// Train on row-major `features` with parallel `labels`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | Zero samples |
    /// | [`ModelError::ZeroFeatures`] | Rows have zero feature columns |
    /// | [`ModelError::FeatureCountMismatch`] | Rows have inconsistent widths |
    /// | [`ModelError::NonFiniteValue`] | Any value is NaN or infinite |
    /// | [`ModelError::NonBinaryLabel`] | A label is outside {0, 1} |
    /// | [`ModelError::FeatureNameCountMismatch`] | Name count differs from column count |
    /// | Backend-specific variants | Invalid backend configuration |
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        seed: u64,
    ) -> Result<Self::Fitted, ModelError>;
}

/// A fitted binary classifier.
pub trait FittedModel {
    /// Return P(label = 1), i.e. the group-B probability, for each row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] when a row's width
    /// differs from the training data.
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

    /// Return per-feature importance scores, ranked by magnitude.
    fn feature_importance(&self) -> Vec<FeatureScore>;
}

/// Validate a row-major training set and return its feature count.
pub(crate) fn validate_training(
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<usize, ModelError> {
    if features.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ModelError::ZeroFeatures);
    }
    if feature_names.len() != n_features {
        return Err(ModelError::FeatureNameCountMismatch {
            expected: n_features,
            got: feature_names.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(ModelError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }
    for (sample_index, &label) in labels.iter().enumerate() {
        if label > 1 {
            return Err(ModelError::NonBinaryLabel {
                label,
                sample_index,
            });
        }
    }
    Ok(n_features)
}

/// Pair names with scores and assign 1-based ranks by descending |score|.
pub(crate) fn rank_by_magnitude(names: &[String], scores: &[f64]) -> Vec<FeatureScore> {
    let mut ranked: Vec<FeatureScore> = names
        .iter()
        .zip(scores.iter())
        .map(|(name, &score)| FeatureScore {
            name: name.clone(),
            score,
            rank: 0,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
    for (i, feat) in ranked.iter_mut().enumerate() {
        feat.rank = i + 1;
    }
    ranked
}
