//! Sliding-window class-imbalance sweep harness.
//!
//! Runs a classifier over a schedule of progressively shrinking minority-class
//! (group A) train/test allocations against a fixed majority class (group B),
//! optionally rebalancing each training set with smoothed-bootstrap synthetic
//! rows, and evaluates every iteration with confusion metrics and rank-based
//! ROC-AUC. All randomness derives from named per-iteration streams, so a
//! sweep is reproducible for a given base seed regardless of thread count.

mod balance;
mod error;
mod eval;
mod partition;
mod pool;
mod rng;
mod runner;
mod schedule;

pub use balance::{BalancerConfig, RebalanceOutcome, SyntheticBalancer};
pub use error::HarnessError;
pub use eval::{ConfusionCounts, roc_auc};
pub use partition::{Partition, PartitionGenerator, TruncationPolicy};
pub use pool::{BalancedPool, Group, SampleSet};
pub use rng::{Stream, stream_rng, stream_seed};
pub use runner::{EvaluationRecord, ExperimentRunner, ImportanceRecord, ResultSet};
pub use schedule::{IterationConfig, ScheduleConfig};
