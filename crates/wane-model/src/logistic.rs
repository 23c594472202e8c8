//! Logistic regression backend: full-batch gradient descent on z-scored features.

use tracing::{debug, instrument};

use crate::adapter::{Classifier, FeatureScore, FittedModel, rank_by_magnitude, validate_training};
use crate::error::ModelError;

/// Logistic regression configuration.
///
/// Features are z-scored internally before optimization; the fitted model
/// standardizes prediction rows with the training statistics. Training is
/// deterministic (zero initialization, fixed epoch count), so the fit seed
/// is ignored.
///
/// # Defaults
///
/// | Parameter       | Default |
/// |-----------------|---------|
/// | `learning_rate` | 0.1     |
/// | `n_epochs`      | 500     |
/// | `l2`            | 0.0     |
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    n_epochs: usize,
    l2: f64,
}

impl LogisticRegression {
    /// Create a config with default hyperparameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            learning_rate: 0.1,
            n_epochs: 500,
            l2: 0.0,
        }
    }

    /// Set the gradient-descent step size.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the number of full-batch epochs.
    #[must_use]
    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    /// Set the L2 penalty strength.
    #[must_use]
    pub fn with_l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticRegression {
    type Fitted = FittedLogistic;

    #[instrument(skip_all, fields(n_samples = features.len(), n_epochs = self.n_epochs))]
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        _seed: u64,
    ) -> Result<FittedLogistic, ModelError> {
        let n_features = validate_training(features, labels, feature_names)?;
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ModelError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }
        if self.n_epochs == 0 {
            return Err(ModelError::InvalidEpochCount { n_epochs: 0 });
        }

        let n_samples = features.len();
        let n = n_samples as f64;

        // Per-feature standardization statistics. Constant columns keep
        // scale 1.0 so they contribute a zero coefficient, not NaN.
        let mut means = vec![0.0f64; n_features];
        for row in features {
            for (m, &v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0f64; n_features];
        for row in features {
            for ((s, &v), &m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut scales {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        let standardized: Vec<Vec<f64>> = features
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&means)
                    .zip(&scales)
                    .map(|((&v, &m), &s)| (v - m) / s)
                    .collect()
            })
            .collect();

        let mut weights = vec![0.0f64; n_features];
        let mut bias = 0.0f64;
        let mut grad = vec![0.0f64; n_features];

        for _ in 0..self.n_epochs {
            grad.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_bias = 0.0f64;
            for (row, &label) in standardized.iter().zip(labels) {
                let z = bias
                    + row
                        .iter()
                        .zip(&weights)
                        .map(|(&x, &w)| x * w)
                        .sum::<f64>();
                let residual = sigmoid(z) - label as f64;
                for (g, &x) in grad.iter_mut().zip(row) {
                    *g += residual * x;
                }
                grad_bias += residual;
            }
            for (w, g) in weights.iter_mut().zip(&grad) {
                *w -= self.learning_rate * (g / n + self.l2 * *w);
            }
            bias -= self.learning_rate * grad_bias / n;
        }

        debug!(n_features, "logistic regression fitted");

        Ok(FittedLogistic {
            weights,
            bias,
            means,
            scales,
            feature_names: feature_names.to_vec(),
        })
    }
}

/// A fitted logistic regression model.
///
/// Coefficients are on the standardized feature scale; their signs carry the
/// direction of association with group B.
#[derive(Debug)]
pub struct FittedLogistic {
    weights: Vec<f64>,
    bias: f64,
    means: Vec<f64>,
    scales: Vec<f64>,
    feature_names: Vec<String>,
}

impl FittedModel for FittedLogistic {
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.weights.len() {
                    return Err(ModelError::PredictionFeatureMismatch {
                        expected: self.weights.len(),
                        got: row.len(),
                    });
                }
                let z = self.bias
                    + row
                        .iter()
                        .zip(&self.means)
                        .zip(&self.scales)
                        .zip(&self.weights)
                        .map(|(((&v, &m), &s), &w)| (v - m) / s * w)
                        .sum::<f64>();
                Ok(sigmoid(z))
            })
            .collect()
    }

    fn feature_importance(&self) -> Vec<FeatureScore> {
        rank_by_magnitude(&self.feature_names, &self.weights)
    }
}
