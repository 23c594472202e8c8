//! Disjoint train/test index partitions for one iteration.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::HarnessError;
use crate::pool::{BalancedPool, Group};
use crate::schedule::IterationConfig;

/// What to do when the group-B test candidate pool is smaller than requested.
///
/// The historical behavior is to silently truncate; `Strict` turns the
/// shortfall into an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Take whatever rows are available and log the shortfall.
    #[default]
    Truncate,
    /// Fail the iteration with [`HarnessError::InsufficientData`].
    Strict,
}

/// A disjoint train/test index partition, split by group.
///
/// All indices point into the [`BalancedPool`]'s row storage. Within each
/// group, train and test are disjoint.
#[derive(Debug, Clone)]
pub struct Partition {
    train_a: Vec<usize>,
    train_b: Vec<usize>,
    test_a: Vec<usize>,
    test_b: Vec<usize>,
}

impl Partition {
    /// Return the group-A training indices.
    #[must_use]
    pub fn train_a(&self) -> &[usize] {
        &self.train_a
    }

    /// Return the group-B training indices.
    #[must_use]
    pub fn train_b(&self) -> &[usize] {
        &self.train_b
    }

    /// Return the group-A test indices.
    #[must_use]
    pub fn test_a(&self) -> &[usize] {
        &self.test_a
    }

    /// Return the group-B test indices.
    #[must_use]
    pub fn test_b(&self) -> &[usize] {
        &self.test_b
    }

    /// Total training rows across both groups.
    #[must_use]
    pub fn train_len(&self) -> usize {
        self.train_a.len() + self.train_b.len()
    }

    /// Total test rows across both groups.
    #[must_use]
    pub fn test_len(&self) -> usize {
        self.test_a.len() + self.test_b.len()
    }
}

/// Builds one [`Partition`] per iteration from the pool's index lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionGenerator {
    policy: TruncationPolicy,
}

impl PartitionGenerator {
    /// Create a generator with the given truncation policy.
    #[must_use]
    pub fn new(policy: TruncationPolicy) -> Self {
        Self { policy }
    }

    /// Generate the partition for one iteration.
    ///
    /// Group A: draws `group_a_train_size` rows without replacement using the
    /// group-A stream, then takes the first `group_a_test_size` remaining rows
    /// in pool order as the test set (the whole remainder when it is smaller —
    /// the degenerate shrink near the end of a sweep). Rows past the test
    /// prefix are deliberately left out of the iteration.
    ///
    /// Group B: restricts to the first `group_b_pool_size` pool rows, draws
    /// `group_b_train_size` of them as train with the group-B stream, and
    /// takes the first `group_b_test_size` leftover rows as test, subject to
    /// the [`TruncationPolicy`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`HarnessError::InsufficientData`] | Group-A train request exceeds its pool; group-B subset or train request exceeds its pool; group-B test candidates fall short under `Strict` |
    pub fn generate(
        &self,
        pool: &BalancedPool,
        cfg: &IterationConfig,
        rng_a: &mut ChaCha8Rng,
        rng_b: &mut ChaCha8Rng,
    ) -> Result<Partition, HarnessError> {
        // --- Group A ---
        let a_pool = pool.group_a_indices();
        if cfg.group_a_train_size > a_pool.len() {
            return Err(HarnessError::InsufficientData {
                group: Group::A,
                requested: cfg.group_a_train_size,
                available: a_pool.len(),
            });
        }
        let train_a: Vec<usize> = a_pool
            .choose_multiple(rng_a, cfg.group_a_train_size)
            .copied()
            .collect();

        let taken: HashSet<usize> = train_a.iter().copied().collect();
        let remaining_a: Vec<usize> = a_pool
            .iter()
            .copied()
            .filter(|i| !taken.contains(i))
            .collect();
        if remaining_a.len() < cfg.group_a_test_size {
            debug!(
                iteration = cfg.index,
                requested = cfg.group_a_test_size,
                available = remaining_a.len(),
                "group A test shrunk to the whole remainder"
            );
        }
        let test_a: Vec<usize> = remaining_a
            .into_iter()
            .take(cfg.group_a_test_size)
            .collect();

        // --- Group B ---
        let b_pool = pool.group_b_indices();
        if cfg.group_b_pool_size > b_pool.len() {
            return Err(HarnessError::InsufficientData {
                group: Group::B,
                requested: cfg.group_b_pool_size,
                available: b_pool.len(),
            });
        }
        let subset = &b_pool[..cfg.group_b_pool_size];
        if cfg.group_b_train_size > subset.len() {
            return Err(HarnessError::InsufficientData {
                group: Group::B,
                requested: cfg.group_b_train_size,
                available: subset.len(),
            });
        }
        let train_b: Vec<usize> = subset
            .choose_multiple(rng_b, cfg.group_b_train_size)
            .copied()
            .collect();

        let taken_b: HashSet<usize> = train_b.iter().copied().collect();
        let candidates: Vec<usize> = subset
            .iter()
            .copied()
            .filter(|i| !taken_b.contains(i))
            .collect();
        if candidates.len() < cfg.group_b_test_size {
            match self.policy {
                TruncationPolicy::Strict => {
                    return Err(HarnessError::InsufficientData {
                        group: Group::B,
                        requested: cfg.group_b_test_size,
                        available: candidates.len(),
                    });
                }
                TruncationPolicy::Truncate => {
                    warn!(
                        iteration = cfg.index,
                        requested = cfg.group_b_test_size,
                        available = candidates.len(),
                        "group B test truncated to available candidates"
                    );
                }
            }
        }
        let test_b: Vec<usize> = candidates.into_iter().take(cfg.group_b_test_size).collect();

        Ok(Partition {
            train_a,
            train_b,
            test_a,
            test_b,
        })
    }
}
