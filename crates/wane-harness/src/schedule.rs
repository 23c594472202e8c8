//! The sliding-window iteration schedule.
//!
//! Group A's train and test allocations shrink linearly with the iteration
//! index while group B's stay constant, sweeping class-imbalance severity
//! across the run.

use crate::error::HarnessError;

/// Sweep schedule configuration.
///
/// Construct via [`ScheduleConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter              | Default |
/// |------------------------|---------|
/// | `initial_group_a_size` | 600     |
/// | `step_size`            | 3       |
/// | `initial_test_a_size`  | 200     |
/// | `initial_test_b_size`  | 200     |
/// | `fixed_group_b_size`   | 600     |
/// | `base_seed`            | 42      |
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    num_iterations: usize,
    initial_group_a_size: usize,
    step_size: usize,
    initial_test_a_size: usize,
    initial_test_b_size: usize,
    fixed_group_b_size: usize,
    base_seed: u64,
}

/// The realized allocation sizes for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationConfig {
    /// 1-based iteration index.
    pub index: usize,
    /// Requested group-A training rows: `floor(2/3 · (initial_a − (i−1)·step))`.
    pub group_a_train_size: usize,
    /// Requested group-A test rows: `initial_test_a − (i−1)`.
    pub group_a_test_size: usize,
    /// Group-B training rows: `floor(2/3 · fixed_group_b_size)`, constant.
    pub group_b_train_size: usize,
    /// Group-B test rows: `initial_test_b_size`, constant.
    pub group_b_test_size: usize,
    /// Group-B pool subset size the split draws from, constant.
    pub group_b_pool_size: usize,
}

impl ScheduleConfig {
    /// Create a schedule with the given number of iterations.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidIterationCount`] if `num_iterations` is zero.
    pub fn new(num_iterations: usize) -> Result<Self, HarnessError> {
        if num_iterations == 0 {
            return Err(HarnessError::InvalidIterationCount { num_iterations });
        }
        Ok(Self {
            num_iterations,
            initial_group_a_size: 600,
            step_size: 3,
            initial_test_a_size: 200,
            initial_test_b_size: 200,
            fixed_group_b_size: 600,
            base_seed: 42,
        })
    }

    /// Set the iteration-1 group-A pool allocation.
    #[must_use]
    pub fn with_initial_group_a_size(mut self, initial_group_a_size: usize) -> Self {
        self.initial_group_a_size = initial_group_a_size;
        self
    }

    /// Set the per-iteration group-A shrink step.
    #[must_use]
    pub fn with_step_size(mut self, step_size: usize) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the iteration-1 group-A test size (shrinks by 1 per iteration).
    #[must_use]
    pub fn with_initial_test_a_size(mut self, initial_test_a_size: usize) -> Self {
        self.initial_test_a_size = initial_test_a_size;
        self
    }

    /// Set the constant group-B test size.
    #[must_use]
    pub fn with_initial_test_b_size(mut self, initial_test_b_size: usize) -> Self {
        self.initial_test_b_size = initial_test_b_size;
        self
    }

    /// Set the constant group-B pool subset size.
    #[must_use]
    pub fn with_fixed_group_b_size(mut self, fixed_group_b_size: usize) -> Self {
        self.fixed_group_b_size = fixed_group_b_size;
        self
    }

    /// Set the base seed every per-iteration stream derives from.
    #[must_use]
    pub fn with_base_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    /// Return the number of iterations.
    #[must_use]
    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    /// Return the iteration-1 group-A pool allocation.
    #[must_use]
    pub fn initial_group_a_size(&self) -> usize {
        self.initial_group_a_size
    }

    /// Return the per-iteration shrink step.
    #[must_use]
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Return the constant group-B pool subset size.
    #[must_use]
    pub fn fixed_group_b_size(&self) -> usize {
        self.fixed_group_b_size
    }

    /// Return the base seed.
    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Group-A (train, test) sizes at 1-based `index`, signed for underflow checks.
    fn group_a_sizes(&self, index: usize) -> (i64, i64) {
        let shrink = (index as i64 - 1) * self.step_size as i64;
        let pool = self.initial_group_a_size as i64 - shrink;
        let train = if pool > 0 { 2 * pool / 3 } else { pool };
        let test = self.initial_test_a_size as i64 - (index as i64 - 1);
        (train, test)
    }

    /// Check that every iteration keeps positive group-A sizes.
    ///
    /// Sizes are non-increasing in the index, so only the last iteration can
    /// be the first to underflow — but the first offender is reported for a
    /// actionable message.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ScheduleUnderflow`] naming the first iteration
    /// whose group-A train or test size is not positive.
    pub fn validate(&self) -> Result<(), HarnessError> {
        for index in 1..=self.num_iterations {
            let (train_size, test_size) = self.group_a_sizes(index);
            if train_size < 1 || test_size < 1 {
                return Err(HarnessError::ScheduleUnderflow {
                    iteration: index,
                    train_size,
                    test_size,
                });
            }
        }
        Ok(())
    }

    /// Compute the allocation sizes for 1-based iteration `index`.
    ///
    /// Call [`ScheduleConfig::validate`] first; on an invalid schedule the
    /// sizes saturate at zero.
    #[must_use]
    pub fn iteration(&self, index: usize) -> IterationConfig {
        let (train, test) = self.group_a_sizes(index);
        IterationConfig {
            index,
            group_a_train_size: train.max(0) as usize,
            group_a_test_size: test.max(0) as usize,
            group_b_train_size: 2 * self.fixed_group_b_size / 3,
            group_b_test_size: self.initial_test_b_size,
            group_b_pool_size: self.fixed_group_b_size,
        }
    }
}
