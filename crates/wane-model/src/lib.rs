//! Binary classifier backends for the wane sweep harness.
//!
//! Exposes the [`Classifier`]/[`FittedModel`] seam the harness trains through,
//! with two concrete backends: a class-weighted Gini Random Forest
//! (impurity-decrease importance) and a logistic regression (signed
//! coefficients as importance).

mod adapter;
mod error;
mod forest;
mod logistic;
mod tree;

pub use adapter::{Classifier, FeatureScore, FittedModel};
pub use error::ModelError;
pub use forest::{FittedForest, RandomForestClassifier};
pub use logistic::{FittedLogistic, LogisticRegression};
