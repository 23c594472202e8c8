use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use wane_harness::{
    BalancedPool, BalancerConfig, ExperimentRunner, Group, ResultSet, ScheduleConfig,
    TruncationPolicy,
};
use wane_io::{ExperimentName, PoolReader, ResultWriter};
use wane_model::{Classifier, LogisticRegression, RandomForestClassifier};

#[derive(Parser)]
#[command(name = "wane")]
#[command(about = "Minority-class attrition sweep for binary classifiers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base RNG seed every per-iteration stream derives from
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Sweep schedule parameters.
#[derive(Args, Debug, Clone)]
struct ScheduleArgs {
    /// Number of sweep iterations
    #[arg(long, default_value_t = 185)]
    iterations: usize,

    /// Per-class pool size (also the iteration-1 group-A allocation)
    #[arg(long, default_value_t = 600)]
    pool_size: usize,

    /// Group-A pool shrink per iteration
    #[arg(long, default_value_t = 3)]
    step_size: usize,

    /// Iteration-1 group-A test size (shrinks by 1 per iteration)
    #[arg(long, default_value_t = 200)]
    initial_test_a: usize,

    /// Constant group-B test size
    #[arg(long, default_value_t = 200)]
    test_b: usize,
}

impl ScheduleArgs {
    fn build(&self, seed: u64) -> Result<ScheduleConfig> {
        let schedule = ScheduleConfig::new(self.iterations)?
            .with_initial_group_a_size(self.pool_size)
            .with_step_size(self.step_size)
            .with_initial_test_a_size(self.initial_test_a)
            .with_initial_test_b_size(self.test_b)
            .with_fixed_group_b_size(self.pool_size)
            .with_base_seed(seed);
        schedule.validate()?;
        Ok(schedule)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run a full imbalance sweep and write JSON artifacts
    Sweep {
        /// Path to the input CSV file (group,f1,...,fn)
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Classifier backend: "rf" or "logistic"
        #[arg(long, default_value = "rf")]
        classifier: String,

        /// Number of trees for the rf backend
        #[arg(long, default_value_t = 500)]
        n_trees: usize,

        /// Weight majority-class rows 3x in tree splits (rf backend only)
        #[arg(long, default_value_t = false)]
        weighted: bool,

        /// Train on raw partitions, no synthetic rebalancing
        #[arg(long, default_value_t = false)]
        no_balance: bool,

        /// Synthetic generation multiplier (default: 3 for rf, 2 for logistic)
        #[arg(long)]
        multiplier: Option<usize>,

        /// Group-A share of the synthetic pool (default: 0.7 for rf, 0.5 for logistic)
        #[arg(long)]
        minority_fraction: Option<f64>,

        /// Fail an iteration when group B's test pool falls short instead of truncating
        #[arg(long, default_value_t = false)]
        strict_partition: bool,

        /// Keep only each iteration's top-K features in the importance artifact
        #[arg(long)]
        top_k: Option<usize>,

        #[command(flatten)]
        schedule: ScheduleArgs,
    },

    /// Print the iteration schedule without running anything
    Schedule {
        #[command(flatten)]
        schedule: ScheduleArgs,
    },
}

#[derive(Serialize)]
struct SweepOutput {
    experiment: String,
    classifier: String,
    num_iterations: usize,
    failures: usize,
    balanced: bool,
    mean_auc: Option<f64>,
    mean_accuracy: Option<f64>,
    first_auc: Option<f64>,
    last_auc: Option<f64>,
}

#[derive(Serialize)]
struct ScheduleRow {
    iteration: usize,
    group_a_train: usize,
    group_a_test: usize,
    group_b_train: usize,
    group_b_test: usize,
}

/// Mean over the finite entries, None when there are none.
fn finite_mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let finite: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn run_sweep<C>(runner: &ExperimentRunner, pool: &BalancedPool, classifier: &C) -> Result<ResultSet>
where
    C: Classifier + Sync,
{
    runner.run(pool, classifier).context("sweep failed")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Sweep {
            data,
            experiment,
            output_dir,
            classifier,
            n_trees,
            weighted,
            no_balance,
            multiplier,
            minority_fraction,
            strict_partition,
            top_k,
            schedule,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let schedule_config = schedule.build(cli.seed)?;

            // Read and pool the dataset
            let table = PoolReader::new(&data)
                .read()
                .context("failed to read input CSV")?;
            info!(
                n_rows = table.n_rows(),
                n_group_a = table.count(Group::A),
                n_group_b = table.count(Group::B),
                "dataset loaded"
            );
            let pool = BalancedPool::new(
                table.features,
                table.groups,
                table.feature_names,
                schedule.pool_size,
            )
            .context("failed to build balanced pool")?;

            // Balancer defaults follow the backend
            let (default_multiplier, default_fraction) = match classifier.as_str() {
                "logistic" => (2, 0.5),
                _ => (3, 0.7),
            };
            let mut runner = ExperimentRunner::new(schedule_config);
            if !no_balance {
                let config = BalancerConfig::new(
                    multiplier.unwrap_or(default_multiplier),
                    minority_fraction.unwrap_or(default_fraction),
                )?;
                runner = runner.with_balancer(config);
            }
            if strict_partition {
                runner = runner.with_truncation_policy(TruncationPolicy::Strict);
            }

            let result = match classifier.as_str() {
                "rf" => {
                    let mut rf = RandomForestClassifier::new(n_trees)?;
                    if weighted {
                        rf = rf.with_majority_weight(3.0);
                    }
                    run_sweep(&runner, &pool, &rf)?
                }
                "logistic" => run_sweep(&runner, &pool, &LogisticRegression::new())?,
                other => anyhow::bail!("unknown classifier: {other} (expected rf or logistic)"),
            };

            // Write JSON artifacts
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_sweep(&result)?;
            writer.write_importance(&result, top_k)?;

            // Build and print stdout summary
            let records = result.records();
            let output = SweepOutput {
                experiment,
                classifier,
                num_iterations: records.len(),
                failures: result.failure_count(),
                balanced: !no_balance,
                mean_auc: finite_mean(records.iter().map(|r| r.auc)),
                mean_accuracy: finite_mean(records.iter().map(|r| r.accuracy)),
                first_auc: records.first().and_then(|r| finite(r.auc)),
                last_auc: records.last().and_then(|r| finite(r.auc)),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Schedule { schedule } => {
            let schedule_config = schedule.build(cli.seed)?;
            let rows: Vec<ScheduleRow> = (1..=schedule_config.num_iterations())
                .map(|index| {
                    let cfg = schedule_config.iteration(index);
                    ScheduleRow {
                        iteration: cfg.index,
                        group_a_train: cfg.group_a_train_size,
                        group_a_test: cfg.group_a_test_size,
                        group_b_train: cfg.group_b_train_size,
                        group_b_test: cfg.group_b_test_size,
                    }
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}
