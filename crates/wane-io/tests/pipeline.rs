//! End-to-end integration tests: CSV -> sweep -> JSON -> deserialize.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use wane_harness::{
    BalancedPool, BalancerConfig, ExperimentRunner, Group, ScheduleConfig, TruncationPolicy,
};
use wane_io::{ExperimentName, PoolReader, ResultWriter};
use wane_model::RandomForestClassifier;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn small_schedule(iterations: usize) -> ScheduleConfig {
    ScheduleConfig::new(iterations)
        .unwrap()
        .with_initial_group_a_size(12)
        .with_step_size(1)
        .with_initial_test_a_size(4)
        .with_initial_test_b_size(4)
        .with_fixed_group_b_size(12)
        .with_base_seed(42)
}

#[test]
fn sweep_round_trip() {
    // 1. Read CSV
    let table = PoolReader::new(&fixture_path("valid_pool_24x3.csv"))
        .read()
        .expect("fixture should parse");
    assert_eq!(table.n_rows(), 24);
    assert_eq!(table.count(Group::A), 12);
    assert_eq!(table.feature_names, vec!["f1", "f2", "f3"]);

    // 2. Run a short sweep (data has well-separated groups on f1/f2)
    let pool = BalancedPool::new(table.features, table.groups, table.feature_names, 12).unwrap();
    let runner = ExperimentRunner::new(small_schedule(3));
    let classifier = RandomForestClassifier::new(20).unwrap();
    let result = runner.run(&pool, &classifier).unwrap();
    assert_eq!(result.records().len(), 3);
    assert_eq!(result.failure_count(), 0);

    // 3. Write JSON artifacts
    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("sweep_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    writer.write_sweep(&result).unwrap();
    writer.write_importance(&result, Some(2)).unwrap();

    // 4. Deserialize back and verify
    let sweep: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("sweep_rt_sweep.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(sweep["experiment"], "sweep_rt");
    assert_eq!(sweep["num_iterations"], 3);
    assert_eq!(sweep["failures"], 0);

    let records = sweep["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record["iteration"].as_u64().unwrap() as usize, i + 1);
        // Separable clusters: everything classified correctly.
        assert_eq!(record["accuracy"].as_f64().unwrap(), 1.0);
        assert_eq!(record["auc"].as_f64().unwrap(), 1.0);
        assert!(record["failure"].is_null());
        let confusion = &record["confusion"];
        assert_eq!(confusion["ab"], 0);
        assert_eq!(confusion["ba"], 0);
    }
    // Group A shrinks, group B holds.
    assert_eq!(records[0]["group_a_train_size"], 8);
    assert_eq!(records[2]["group_a_train_size"], 6);
    assert_eq!(records[0]["group_b_train_size"], 8);
    assert_eq!(records[2]["group_b_train_size"], 8);

    let importance: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("sweep_rt_importance.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(importance["experiment"], "sweep_rt");
    assert_eq!(importance["top_k"], 2);
    let rows = importance["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3 * 2);
    for row in rows {
        let rank = row["rank"].as_u64().unwrap();
        assert!(rank == 1 || rank == 2);
        // The noise column never outranks the informative ones.
        assert_ne!(row["feature"], "f3");
    }
}

#[test]
fn failed_iterations_serialize_as_null_metrics() {
    let table = PoolReader::new(&fixture_path("valid_pool_24x3.csv"))
        .read()
        .unwrap();
    let pool = BalancedPool::new(table.features, table.groups, table.feature_names, 12).unwrap();

    // Group B leaves 4 test candidates; asking for 5 under Strict fails every
    // iteration without aborting the sweep.
    let runner = ExperimentRunner::new(small_schedule(2).with_initial_test_b_size(5))
        .with_truncation_policy(TruncationPolicy::Strict);
    let classifier = RandomForestClassifier::new(5).unwrap();
    let result = runner.run(&pool, &classifier).unwrap();
    assert_eq!(result.failure_count(), 2);

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("strict".into()).unwrap())
        .unwrap();
    writer.write_sweep(&result).unwrap();

    let sweep: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("strict_sweep.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(sweep["failures"], 2);
    let records = sweep["records"].as_array().unwrap();
    for record in records {
        assert!(!record["failure"].is_null());
        assert!(record["auc"].is_null());
        assert!(record["accuracy"].is_null());
        assert_eq!(record["confusion"]["aa"], 0);
    }
}

#[test]
fn balancer_shortfalls_appear_in_the_artifact() {
    let table = PoolReader::new(&fixture_path("valid_pool_24x3.csv"))
        .read()
        .unwrap();
    let pool = BalancedPool::new(table.features, table.groups, table.feature_names, 12).unwrap();

    // N = 1 * 2 * 8 = 16, round(16 * 0.1) = 2 group-A rows for a target of 8.
    let runner = ExperimentRunner::new(small_schedule(2))
        .with_balancer(BalancerConfig::new(1, 0.1).unwrap());
    let classifier = RandomForestClassifier::new(10).unwrap();
    let result = runner.run(&pool, &classifier).unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(
        dir.path(),
        ExperimentName::new("shortfall".into()).unwrap(),
    )
    .unwrap();
    writer.write_sweep(&result).unwrap();

    let sweep: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("shortfall_sweep.json")).unwrap(),
    )
    .unwrap();
    let records = sweep["records"].as_array().unwrap();
    // Iteration 1 runs unbalanced; iteration 2 records the minority shortfall.
    assert_eq!(records[0]["synthetic_shortfall_a"], 0);
    assert_eq!(records[1]["synthetic_shortfall_a"], 6);
    assert_eq!(records[1]["synthetic_shortfall_b"], 0);
    assert!(records[1]["failure"].is_null());
}
