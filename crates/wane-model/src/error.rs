/// Errors from classifier training and prediction.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when a class weight is not strictly positive.
    #[error("class weight must be positive, got {weight}")]
    InvalidClassWeight {
        /// The invalid weight provided.
        weight: f64,
    },

    /// Returned when the learning rate is not strictly positive and finite.
    #[error("learning rate must be positive and finite, got {learning_rate}")]
    InvalidLearningRate {
        /// The invalid learning rate provided.
        learning_rate: f64,
    },

    /// Returned when the epoch count is zero.
    #[error("n_epochs must be at least 1, got {n_epochs}")]
    InvalidEpochCount {
        /// The invalid epoch count provided.
        n_epochs: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a label is outside the binary {0, 1} encoding.
    #[error("label {label} at sample {sample_index} is not binary (expected 0 or 1)")]
    NonBinaryLabel {
        /// The offending label value.
        label: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the number of feature names does not match the feature columns.
    #[error("{got} feature names provided for {expected} feature columns")]
    FeatureNameCountMismatch {
        /// The number of feature columns.
        expected: usize,
        /// The number of names provided.
        got: usize,
    },

    /// Returned when a prediction row has a different width than the training data.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },
}
