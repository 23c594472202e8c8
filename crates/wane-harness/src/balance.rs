//! Smoothed-bootstrap synthetic rebalancing of a training set.
//!
//! Each synthetic row is a uniformly drawn base row of its class with
//! per-feature Gaussian noise at the Silverman bandwidth, so the synthetic
//! pool follows the class's empirical feature distribution rather than
//! duplicating rows.

use rand::Rng;
use std::f64::consts::TAU;
use tracing::warn;

use crate::error::HarnessError;
use crate::pool::{Group, SampleSet};

/// Synthetic balancing parameters.
///
/// The generation pool holds `synthetic_multiplier · 2 · per_class_target`
/// rows, of which a `target_minority_fraction` share is group A. Balancing
/// is skipped for iterations below `enabled_from_iteration` (default 2, so
/// the first iteration always trains on raw rows).
#[derive(Debug, Clone, Copy)]
pub struct BalancerConfig {
    enabled_from_iteration: usize,
    synthetic_multiplier: usize,
    target_minority_fraction: f64,
}

impl BalancerConfig {
    /// Create a config with the given generation multiplier and minority share.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`HarnessError::InvalidMultiplier`] | `synthetic_multiplier` is zero |
    /// | [`HarnessError::InvalidMinorityFraction`] | `target_minority_fraction` outside (0, 1) |
    pub fn new(
        synthetic_multiplier: usize,
        target_minority_fraction: f64,
    ) -> Result<Self, HarnessError> {
        if synthetic_multiplier == 0 {
            return Err(HarnessError::InvalidMultiplier {
                multiplier: synthetic_multiplier,
            });
        }
        if !(target_minority_fraction > 0.0 && target_minority_fraction < 1.0) {
            return Err(HarnessError::InvalidMinorityFraction {
                fraction: target_minority_fraction,
            });
        }
        Ok(Self {
            enabled_from_iteration: 2,
            synthetic_multiplier,
            target_minority_fraction,
        })
    }

    /// Set the first iteration index the balancer applies to.
    #[must_use]
    pub fn with_enabled_from_iteration(mut self, enabled_from_iteration: usize) -> Self {
        self.enabled_from_iteration = enabled_from_iteration;
        self
    }

    /// Return the first iteration index the balancer applies to.
    #[must_use]
    pub fn enabled_from_iteration(&self) -> usize {
        self.enabled_from_iteration
    }

    /// Return the generation-pool multiplier.
    #[must_use]
    pub fn synthetic_multiplier(&self) -> usize {
        self.synthetic_multiplier
    }

    /// Return the group-A share of the generation pool.
    #[must_use]
    pub fn target_minority_fraction(&self) -> f64 {
        self.target_minority_fraction
    }
}

/// A rebalanced training set plus the per-class shortfall against the
/// requested per-class target (zero when the target was met).
#[derive(Debug, Clone)]
pub struct RebalanceOutcome {
    set: SampleSet,
    shortfall_a: usize,
    shortfall_b: usize,
}

impl RebalanceOutcome {
    /// Return the synthetic training set.
    #[must_use]
    pub fn set(&self) -> &SampleSet {
        &self.set
    }

    /// Consume the outcome and return the synthetic training set.
    #[must_use]
    pub fn into_set(self) -> SampleSet {
        self.set
    }

    /// Rows short of the group-A target.
    #[must_use]
    pub fn shortfall_a(&self) -> usize {
        self.shortfall_a
    }

    /// Rows short of the group-B target.
    #[must_use]
    pub fn shortfall_b(&self) -> usize {
        self.shortfall_b
    }
}

/// Generates synthetic, class-balanced replacement training sets.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticBalancer {
    config: BalancerConfig,
}

impl SyntheticBalancer {
    /// Create a balancer from a validated config.
    #[must_use]
    pub fn new(config: BalancerConfig) -> Self {
        Self { config }
    }

    /// Return the balancer's configuration.
    #[must_use]
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Replace `train` with a synthetic set targeting `per_class_target` rows
    /// of each class.
    ///
    /// Generates `multiplier · 2 · per_class_target` smoothed-bootstrap rows
    /// with `round(N · target_minority_fraction)` of group A, then samples
    /// exactly `per_class_target` rows per class without replacement. A class
    /// pool smaller than the target yields all its rows and a recorded
    /// shortfall instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::MissingClass`] when `train` lacks either class.
    pub fn rebalance(
        &self,
        train: &SampleSet,
        per_class_target: usize,
        rng: &mut impl Rng,
    ) -> Result<RebalanceOutcome, HarnessError> {
        let rows_a = class_rows(train, Group::A);
        let rows_b = class_rows(train, Group::B);
        if rows_a.is_empty() {
            return Err(HarnessError::MissingClass { group: Group::A });
        }
        if rows_b.is_empty() {
            return Err(HarnessError::MissingClass { group: Group::B });
        }

        let total = self.config.synthetic_multiplier * 2 * per_class_target;
        let n_a = (total as f64 * self.config.target_minority_fraction).round() as usize;
        let n_b = total - n_a;

        let pool_a = smoothed_bootstrap(&rows_a, n_a, rng);
        let pool_b = smoothed_bootstrap(&rows_b, n_b, rng);

        let (picked_a, shortfall_a) = select(pool_a, per_class_target, rng);
        let (picked_b, shortfall_b) = select(pool_b, per_class_target, rng);
        if shortfall_a > 0 || shortfall_b > 0 {
            warn!(
                shortfall_a,
                shortfall_b, per_class_target, "synthetic pool short of per-class target"
            );
        }

        let mut features = Vec::with_capacity(picked_a.len() + picked_b.len());
        let mut labels = Vec::with_capacity(picked_a.len() + picked_b.len());
        for row in picked_a {
            features.push(row);
            labels.push(Group::A.index());
        }
        for row in picked_b {
            features.push(row);
            labels.push(Group::B.index());
        }

        Ok(RebalanceOutcome {
            set: SampleSet::new(features, labels),
            shortfall_a,
            shortfall_b,
        })
    }
}

fn class_rows(set: &SampleSet, group: Group) -> Vec<&[f64]> {
    set.labels()
        .iter()
        .zip(set.features())
        .filter(|&(&l, _)| l == group.index())
        .map(|(_, row)| row.as_slice())
        .collect()
}

/// Draw `count` smoothed-bootstrap rows from one class's rows.
fn smoothed_bootstrap(rows: &[&[f64]], count: usize, rng: &mut impl Rng) -> Vec<Vec<f64>> {
    let bandwidths = silverman_bandwidths(rows);
    (0..count)
        .map(|_| {
            let base = rows[rng.gen_range(0..rows.len())];
            base.iter()
                .zip(&bandwidths)
                .map(|(&v, &h)| v + h * standard_normal(rng))
                .collect()
        })
        .collect()
}

/// Per-feature Silverman bandwidth: `1.06 · sd · n^(-1/5)`.
///
/// A constant column (or a single row) gets bandwidth 0, reproducing the
/// base value exactly.
fn silverman_bandwidths(rows: &[&[f64]]) -> Vec<f64> {
    let n = rows.len();
    let n_features = rows[0].len();
    let factor = 1.06 * (n as f64).powf(-0.2);
    (0..n_features)
        .map(|j| {
            if n < 2 {
                return 0.0;
            }
            let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n as f64;
            let var = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
            factor * var.sqrt()
        })
        .collect()
}

/// One standard-normal draw via Box-Muller.
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.r#gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Take `target` rows from `pool` without replacement, or all of a short pool.
fn select(
    mut pool: Vec<Vec<f64>>,
    target: usize,
    rng: &mut impl Rng,
) -> (Vec<Vec<f64>>, usize) {
    if pool.len() <= target {
        let shortfall = target - pool.len();
        return (pool, shortfall);
    }
    let picked = rand::seq::index::sample(rng, pool.len(), target);
    let mut indices: Vec<usize> = picked.into_vec();
    indices.sort_unstable();
    // Drain back-to-front so earlier indices stay valid.
    let mut out = Vec::with_capacity(target);
    for &i in indices.iter().rev() {
        out.push(pool.swap_remove(i));
    }
    out.reverse();
    (out, 0)
}
