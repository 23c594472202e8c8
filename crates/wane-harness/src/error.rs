use crate::pool::Group;

/// Errors from harness configuration, partitioning, balancing, and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Returned when num_iterations is zero.
    #[error("num_iterations must be at least 1, got {num_iterations}")]
    InvalidIterationCount {
        /// The invalid iteration count provided.
        num_iterations: usize,
    },

    /// Returned when the schedule would shrink a group-A size to zero or below.
    #[error("schedule exhausts group A at iteration {iteration} (train {train_size}, test {test_size})")]
    ScheduleUnderflow {
        /// The first iteration whose sizes are no longer positive.
        iteration: usize,
        /// The computed group-A train size at that iteration.
        train_size: i64,
        /// The computed group-A test size at that iteration.
        test_size: i64,
    },

    /// Returned when per_class is zero.
    #[error("per-class pool size must be at least 1")]
    InvalidPoolSize,

    /// Returned when a requested slice exceeds the available pool rows.
    #[error("group {group} has {available} rows available, {requested} requested")]
    InsufficientData {
        /// The group whose pool is too small.
        group: Group,
        /// The number of rows requested.
        requested: usize,
        /// The number of rows available.
        available: usize,
    },

    /// Returned when the number of group labels differs from the number of rows.
    #[error("{n_labels} group labels provided for {n_rows} rows")]
    LabelCountMismatch {
        /// The number of feature rows.
        n_rows: usize,
        /// The number of labels.
        n_labels: usize,
    },

    /// Returned when a pool row has a different number of features than expected.
    #[error("pool row {row} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the row.
        got: usize,
        /// The zero-based index of the offending row.
        row: usize,
    },

    /// Returned when a pool value is NaN or infinite.
    #[error("non-finite value in pool row {row}, column {column}")]
    NonFiniteValue {
        /// The zero-based row index.
        row: usize,
        /// The zero-based feature column index.
        column: usize,
    },

    /// Returned when the pool is empty.
    #[error("pool has zero rows")]
    EmptyPool,

    /// Returned when the synthetic multiplier is zero.
    #[error("synthetic multiplier must be at least 1, got {multiplier}")]
    InvalidMultiplier {
        /// The invalid multiplier provided.
        multiplier: usize,
    },

    /// Returned when the target minority fraction is outside (0, 1).
    #[error("target minority fraction must be in (0, 1), got {fraction}")]
    InvalidMinorityFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when a training set passed to the balancer lacks one class.
    #[error("training set has no group {group} rows; cannot rebalance")]
    MissingClass {
        /// The absent group.
        group: Group,
    },

    /// Returned when AUC is requested for a single-class test set.
    #[error("test set contains only group {group} ({n_samples} samples); AUC undefined")]
    DegenerateLabels {
        /// The only group present.
        group: Group,
        /// The number of test samples.
        n_samples: usize,
    },

    /// Returned when the classifier backend fails during fit or predict.
    #[error("classifier error: {source}")]
    Model {
        /// The underlying model error.
        #[from]
        source: wane_model::ModelError,
    },
}
