//! The sweep orchestrator.
//!
//! Runs every iteration of the schedule, each on its own RNG streams, and
//! collects one evaluation record (plus per-feature importance rows) per
//! iteration. Iterations share nothing mutable, so they run on the rayon
//! pool; records are sorted by index afterwards, which makes the result
//! independent of thread count and completion order.

use rayon::prelude::*;
use tracing::{debug, info, warn};
use wane_model::{Classifier, FittedModel};

use crate::balance::{BalancerConfig, SyntheticBalancer};
use crate::error::HarnessError;
use crate::eval::{ConfusionCounts, roc_auc};
use crate::partition::{Partition, PartitionGenerator, TruncationPolicy};
use crate::pool::{BalancedPool, SampleSet};
use crate::rng::{Stream, stream_rng, stream_seed};
use crate::schedule::{IterationConfig, ScheduleConfig};

/// One iteration's evaluation outcome.
///
/// A failed iteration keeps its identity fields and carries NaN metrics,
/// zero confusion cells, and the failure message.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EvaluationRecord {
    /// 1-based iteration index.
    pub iteration: usize,
    /// Realized group-A training rows (before any synthetic replacement).
    pub group_a_train_size: usize,
    /// Realized group-A test rows.
    pub group_a_test_size: usize,
    /// Realized group-B training rows.
    pub group_b_train_size: usize,
    /// Realized group-B test rows.
    pub group_b_test_size: usize,
    /// Confusion counts over the test set.
    pub confusion: ConfusionCounts,
    /// Rank-based ROC-AUC, B positive.
    pub auc: f64,
    /// Fraction of test rows classified correctly.
    pub accuracy: f64,
    /// Group-A precision.
    pub precision: f64,
    /// Group-A recall.
    pub recall: f64,
    /// Group-A F1.
    pub f1: f64,
    /// Group-A share of the combined train+test rows, in percent.
    pub percent_a_of_total: f64,
    /// Percentage of actual-A test rows classified correctly.
    pub percent_true_a: f64,
    /// Percentage of actual-B test rows classified correctly.
    pub percent_true_b: f64,
    /// Synthetic rows short of the group-A target (0 without balancing).
    pub synthetic_shortfall_a: usize,
    /// Synthetic rows short of the group-B target (0 without balancing).
    pub synthetic_shortfall_b: usize,
    /// The error message when the iteration failed.
    pub failure: Option<String>,
}

impl EvaluationRecord {
    fn failed(cfg: &IterationConfig, message: String) -> Self {
        Self {
            iteration: cfg.index,
            group_a_train_size: cfg.group_a_train_size,
            group_a_test_size: cfg.group_a_test_size,
            group_b_train_size: cfg.group_b_train_size,
            group_b_test_size: cfg.group_b_test_size,
            confusion: ConfusionCounts::default(),
            auc: f64::NAN,
            accuracy: f64::NAN,
            precision: f64::NAN,
            recall: f64::NAN,
            f1: f64::NAN,
            percent_a_of_total: f64::NAN,
            percent_true_a: f64::NAN,
            percent_true_b: f64::NAN,
            synthetic_shortfall_a: 0,
            synthetic_shortfall_b: 0,
            failure: Some(message),
        }
    }

    /// Return true when the iteration completed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// One (iteration, feature) importance row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportanceRecord {
    /// 1-based iteration index.
    pub iteration: usize,
    /// Feature column name.
    pub feature: String,
    /// Importance score; signed for coefficient-based models.
    pub score: f64,
    /// 1-based magnitude rank within the iteration.
    pub rank: usize,
}

/// The ordered outcome of a whole sweep.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultSet {
    records: Vec<EvaluationRecord>,
    importances: Vec<ImportanceRecord>,
}

impl ResultSet {
    /// Return the evaluation records, ordered by iteration index.
    #[must_use]
    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    /// Return every importance row, ordered by iteration then rank.
    #[must_use]
    pub fn importances(&self) -> &[ImportanceRecord] {
        &self.importances
    }

    /// Return the importance rows ranked in each iteration's top `k`.
    #[must_use]
    pub fn top_importances(&self, k: usize) -> Vec<&ImportanceRecord> {
        self.importances.iter().filter(|r| r.rank <= k).collect()
    }

    /// Count iterations that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_ok()).count()
    }
}

/// Drives a full sweep over one classifier.
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    schedule: ScheduleConfig,
    balancer: Option<SyntheticBalancer>,
    policy: TruncationPolicy,
}

impl ExperimentRunner {
    /// Create a runner for the given schedule, without synthetic balancing.
    #[must_use]
    pub fn new(schedule: ScheduleConfig) -> Self {
        Self {
            schedule,
            balancer: None,
            policy: TruncationPolicy::default(),
        }
    }

    /// Enable synthetic balancing with the given config.
    #[must_use]
    pub fn with_balancer(mut self, config: BalancerConfig) -> Self {
        self.balancer = Some(SyntheticBalancer::new(config));
        self
    }

    /// Set the partition truncation policy.
    #[must_use]
    pub fn with_truncation_policy(mut self, policy: TruncationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run the sweep.
    ///
    /// Iteration failures are recorded, not propagated: a bad iteration
    /// yields a failure record and the sweep continues.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ScheduleUnderflow`] when the schedule exhausts
    /// group A before `num_iterations`. Per-iteration errors never surface
    /// here.
    pub fn run<C>(&self, pool: &BalancedPool, classifier: &C) -> Result<ResultSet, HarnessError>
    where
        C: Classifier + Sync,
    {
        self.schedule.validate()?;
        info!(
            iterations = self.schedule.num_iterations(),
            balanced = self.balancer.is_some(),
            base_seed = self.schedule.base_seed(),
            "starting sweep"
        );

        let outputs: Vec<(EvaluationRecord, Vec<ImportanceRecord>)> = (1..=self
            .schedule
            .num_iterations())
            .into_par_iter()
            .map(|index| {
                let cfg = self.schedule.iteration(index);
                match self.run_iteration(pool, classifier, &cfg) {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(iteration = index, error = %err, "iteration failed");
                        (EvaluationRecord::failed(&cfg, err.to_string()), Vec::new())
                    }
                }
            })
            .collect();

        let mut records = Vec::with_capacity(outputs.len());
        let mut importances = Vec::new();
        for (record, rows) in outputs {
            records.push(record);
            importances.extend(rows);
        }
        records.sort_by_key(|r| r.iteration);
        importances.sort_by(|a, b| (a.iteration, a.rank).cmp(&(b.iteration, b.rank)));

        let result = ResultSet {
            records,
            importances,
        };
        info!(failures = result.failure_count(), "sweep finished");
        Ok(result)
    }

    fn run_iteration<C>(
        &self,
        pool: &BalancedPool,
        classifier: &C,
        cfg: &IterationConfig,
    ) -> Result<(EvaluationRecord, Vec<ImportanceRecord>), HarnessError>
    where
        C: Classifier,
    {
        let base_seed = self.schedule.base_seed();
        let mut rng_a = stream_rng(base_seed, cfg.index, Stream::GroupA);
        let mut rng_b = stream_rng(base_seed, cfg.index, Stream::GroupB);

        let partition =
            PartitionGenerator::new(self.policy).generate(pool, cfg, &mut rng_a, &mut rng_b)?;
        let mut train = SampleSet::from_indices(pool, partition.train_a(), partition.train_b());

        let mut shortfall_a = 0;
        let mut shortfall_b = 0;
        if let Some(balancer) = &self.balancer
            && cfg.index >= balancer.config().enabled_from_iteration()
        {
            let mut rng_synth = stream_rng(base_seed, cfg.index, Stream::Synthetic);
            let outcome = balancer.rebalance(&train, cfg.group_b_train_size, &mut rng_synth)?;
            shortfall_a = outcome.shortfall_a();
            shortfall_b = outcome.shortfall_b();
            train = outcome.into_set();
        }

        let fitted = classifier.fit(
            train.features(),
            train.labels(),
            pool.feature_names(),
            stream_seed(base_seed, cfg.index, Stream::Model),
        )?;

        let test = SampleSet::from_indices(pool, partition.test_a(), partition.test_b());
        let proba = fitted.predict_proba(test.features())?;
        let confusion = ConfusionCounts::from_probabilities(test.labels(), &proba);
        let auc = roc_auc(test.labels(), &proba)?;
        debug!(
            iteration = cfg.index,
            train_rows = train.len(),
            test_rows = test.len(),
            auc,
            "iteration evaluated"
        );

        let record = EvaluationRecord {
            iteration: cfg.index,
            group_a_train_size: partition.train_a().len(),
            group_a_test_size: partition.test_a().len(),
            group_b_train_size: partition.train_b().len(),
            group_b_test_size: partition.test_b().len(),
            confusion,
            auc,
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            percent_a_of_total: percent_a_of_total(&partition),
            percent_true_a: confusion.percent_true_a(),
            percent_true_b: confusion.percent_true_b(),
            synthetic_shortfall_a: shortfall_a,
            synthetic_shortfall_b: shortfall_b,
            failure: None,
        };

        let importances = fitted
            .feature_importance()
            .into_iter()
            .map(|f| ImportanceRecord {
                iteration: cfg.index,
                feature: f.name,
                score: f.score,
                rank: f.rank,
            })
            .collect();

        Ok((record, importances))
    }
}

/// Group-A share of an iteration's combined train+test rows, in percent.
fn percent_a_of_total(partition: &Partition) -> f64 {
    let a = (partition.train_a().len() + partition.test_a().len()) as f64;
    let total = (partition.train_len() + partition.test_len()) as f64;
    100.0 * a / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Group;
    use wane_model::{FeatureScore, FittedModel, ModelError};

    /// Predicts P(B) from the sign of the first feature; importance is fixed.
    struct ThresholdStub;

    struct FittedStub {
        names: Vec<String>,
    }

    impl Classifier for ThresholdStub {
        type Fitted = FittedStub;

        fn fit(
            &self,
            features: &[Vec<f64>],
            labels: &[usize],
            feature_names: &[String],
            _seed: u64,
        ) -> Result<Self::Fitted, ModelError> {
            if features.is_empty() || labels.is_empty() {
                return Err(ModelError::EmptyDataset);
            }
            Ok(FittedStub {
                names: feature_names.to_vec(),
            })
        }
    }

    impl FittedModel for FittedStub {
        fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            Ok(rows
                .iter()
                .map(|r| if r[0] > 50.0 { 0.9 } else { 0.1 })
                .collect())
        }

        fn feature_importance(&self) -> Vec<FeatureScore> {
            self.names
                .iter()
                .enumerate()
                .map(|(i, name)| FeatureScore {
                    name: name.clone(),
                    score: 1.0 / (i + 1) as f64,
                    rank: i + 1,
                })
                .collect()
        }
    }

    fn make_pool(per_class: usize) -> BalancedPool {
        let mut features = Vec::new();
        let mut groups = Vec::new();
        for i in 0..per_class {
            features.push(vec![i as f64 % 10.0, 1.0]);
            groups.push(Group::A);
        }
        for i in 0..per_class {
            features.push(vec![100.0 + i as f64 % 10.0, 2.0]);
            groups.push(Group::B);
        }
        BalancedPool::new(
            features,
            groups,
            vec!["x".to_string(), "y".to_string()],
            per_class,
        )
        .unwrap()
    }

    fn small_schedule(iterations: usize) -> ScheduleConfig {
        ScheduleConfig::new(iterations)
            .unwrap()
            .with_initial_group_a_size(60)
            .with_step_size(3)
            .with_initial_test_a_size(20)
            .with_initial_test_b_size(20)
            .with_fixed_group_b_size(60)
    }

    #[test]
    fn records_ordered_and_complete() {
        let pool = make_pool(60);
        let runner = ExperimentRunner::new(small_schedule(10));
        let result = runner.run(&pool, &ThresholdStub).unwrap();
        assert_eq!(result.records().len(), 10);
        for (i, record) in result.records().iter().enumerate() {
            assert_eq!(record.iteration, i + 1);
            assert!(record.is_ok());
        }
        assert_eq!(result.failure_count(), 0);
    }

    #[test]
    fn separable_stub_scores_perfectly() {
        let pool = make_pool(60);
        let runner = ExperimentRunner::new(small_schedule(5));
        let result = runner.run(&pool, &ThresholdStub).unwrap();
        for record in result.records() {
            assert!((record.accuracy - 1.0).abs() < f64::EPSILON);
            assert!((record.auc - 1.0).abs() < 1e-12);
            assert_eq!(record.confusion.ab, 0);
            assert_eq!(record.confusion.ba, 0);
        }
    }

    #[test]
    fn group_sizes_follow_schedule() {
        let pool = make_pool(60);
        let runner = ExperimentRunner::new(small_schedule(5));
        let result = runner.run(&pool, &ThresholdStub).unwrap();
        let first = &result.records()[0];
        assert_eq!(first.group_a_train_size, 40);
        assert_eq!(first.group_a_test_size, 20);
        assert_eq!(first.group_b_train_size, 40);
        let last = &result.records()[4];
        assert_eq!(last.group_a_train_size, 32);
        assert_eq!(last.group_b_train_size, 40);
        // Equal A and B rows at iteration 1.
        assert!((first.percent_a_of_total - 50.0).abs() < f64::EPSILON);
        assert!(last.percent_a_of_total < 50.0);
    }

    #[test]
    fn importance_rows_cover_every_iteration_and_feature() {
        let pool = make_pool(60);
        let runner = ExperimentRunner::new(small_schedule(4));
        let result = runner.run(&pool, &ThresholdStub).unwrap();
        assert_eq!(result.importances().len(), 4 * 2);
        let top = result.top_importances(1);
        assert_eq!(top.len(), 4);
        assert!(top.iter().all(|r| r.feature == "x" && r.rank == 1));
    }

    #[test]
    fn identical_seeds_reproduce_results() {
        let pool = make_pool(60);
        let runner = ExperimentRunner::new(small_schedule(6).with_base_seed(123))
            .with_balancer(BalancerConfig::new(2, 0.5).unwrap());
        let r1 = runner.run(&pool, &ThresholdStub).unwrap();
        let r2 = runner.run(&pool, &ThresholdStub).unwrap();
        let j1 = serde_json::to_string(&r1).unwrap();
        let j2 = serde_json::to_string(&r2).unwrap();
        assert_eq!(j1, j2);
    }

    #[test]
    fn failed_iteration_does_not_abort_the_sweep() {
        struct FailingOnLargeTrain;
        impl Classifier for FailingOnLargeTrain {
            type Fitted = FittedStub;
            fn fit(
                &self,
                features: &[Vec<f64>],
                _labels: &[usize],
                feature_names: &[String],
                _seed: u64,
            ) -> Result<Self::Fitted, ModelError> {
                if features.len() > 78 {
                    return Err(ModelError::EmptyDataset);
                }
                Ok(FittedStub {
                    names: feature_names.to_vec(),
                })
            }
        }

        let pool = make_pool(60);
        let runner = ExperimentRunner::new(small_schedule(5));
        let result = runner.run(&pool, &FailingOnLargeTrain).unwrap();
        assert_eq!(result.records().len(), 5);
        // Iteration 1 trains on 40 + 40 = 80 rows and fails; later ones shrink.
        let first = &result.records()[0];
        assert!(!first.is_ok());
        assert!(first.auc.is_nan());
        assert_eq!(first.confusion.total(), 0);
        assert!(result.records()[1..].iter().all(EvaluationRecord::is_ok));
        assert_eq!(result.failure_count(), 1);
    }

    #[test]
    fn balancer_engages_from_second_iteration() {
        let pool = make_pool(60);
        // Tiny generation pool forces a visible shortfall on balanced iterations.
        let runner = ExperimentRunner::new(small_schedule(3))
            .with_balancer(BalancerConfig::new(1, 0.2).unwrap());
        let result = runner.run(&pool, &ThresholdStub).unwrap();
        // N = 1*2*40 = 80, round(80*0.2) = 16 group-A rows for a target of 40.
        assert_eq!(result.records()[0].synthetic_shortfall_a, 0);
        assert_eq!(result.records()[1].synthetic_shortfall_a, 24);
        assert_eq!(result.records()[2].synthetic_shortfall_a, 24);
    }

    #[test]
    fn invalid_schedule_is_fatal() {
        let pool = make_pool(60);
        let schedule = small_schedule(30); // pool 60 step 3 exhausts at iteration 21
        let runner = ExperimentRunner::new(schedule);
        assert!(matches!(
            runner.run(&pool, &ThresholdStub),
            Err(HarnessError::ScheduleUnderflow { .. })
        ));
    }
}
