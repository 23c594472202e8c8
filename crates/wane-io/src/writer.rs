//! JSON result writer for sweep outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};
use wane_harness::{EvaluationRecord, ResultSet};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes sweep and importance results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_sweep.json` and
/// `{experiment}_importance.json`. Non-finite metric values (failed or
/// degenerate iterations) serialize as JSON `null`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write the per-iteration evaluation records to `{experiment}_sweep.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_sweep(&self, result: &ResultSet) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_sweep.json", self.experiment.as_str()));

        let artifact = SweepArtifact {
            experiment: self.experiment.as_str(),
            num_iterations: result.records().len(),
            failures: result.failure_count(),
            records: result.records(),
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "sweep result written");
        Ok(())
    }

    /// Write importance rows to `{experiment}_importance.json`.
    ///
    /// With `top_k = Some(k)` only each iteration's `k` highest-magnitude
    /// features are kept; `None` writes every row.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_importance(
        &self,
        result: &ResultSet,
        top_k: Option<usize>,
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_importance.json", self.experiment.as_str()));

        let rows: Vec<ImportanceEntry<'_>> = match top_k {
            Some(k) => result
                .top_importances(k)
                .into_iter()
                .map(ImportanceEntry::from)
                .collect(),
            None => result
                .importances()
                .iter()
                .map(ImportanceEntry::from)
                .collect(),
        };

        let artifact = ImportanceArtifact {
            experiment: self.experiment.as_str(),
            top_k,
            n_rows: rows.len(),
            rows,
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "importance result written");
        Ok(())
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).expect("serialization cannot fail");
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct SweepArtifact<'a> {
    experiment: &'a str,
    num_iterations: usize,
    failures: usize,
    records: &'a [EvaluationRecord],
}

#[derive(Serialize)]
struct ImportanceArtifact<'a> {
    experiment: &'a str,
    top_k: Option<usize>,
    n_rows: usize,
    rows: Vec<ImportanceEntry<'a>>,
}

#[derive(Serialize)]
struct ImportanceEntry<'a> {
    iteration: usize,
    feature: &'a str,
    score: f64,
    rank: usize,
}

impl<'a> From<&'a wane_harness::ImportanceRecord> for ImportanceEntry<'a> {
    fn from(record: &'a wane_harness::ImportanceRecord) -> Self {
        Self {
            iteration: record.iteration,
            feature: &record.feature,
            score: record.score,
            rank: record.rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wane_harness::{BalancedPool, ExperimentRunner, Group, ScheduleConfig};
    use wane_model::LogisticRegression;

    fn run_small_sweep() -> ResultSet {
        let mut features = Vec::new();
        let mut groups = Vec::new();
        for i in 0..30 {
            features.push(vec![i as f64 * 0.01, 0.5]);
            groups.push(Group::A);
            features.push(vec![10.0 + i as f64 * 0.01, 0.5]);
            groups.push(Group::B);
        }
        let pool = BalancedPool::new(
            features,
            groups,
            vec!["x".to_string(), "y".to_string()],
            30,
        )
        .unwrap();
        let schedule = ScheduleConfig::new(3)
            .unwrap()
            .with_initial_group_a_size(30)
            .with_step_size(3)
            .with_initial_test_a_size(10)
            .with_initial_test_b_size(10)
            .with_fixed_group_b_size(30);
        ExperimentRunner::new(schedule)
            .run(&pool, &LogisticRegression::new())
            .unwrap()
    }

    #[test]
    fn write_sweep_creates_named_file() {
        let dir = TempDir::new().unwrap();
        let result = run_small_sweep();
        let writer =
            ResultWriter::new(dir.path(), ExperimentName::new("unit".to_string()).unwrap())
                .unwrap();
        writer.write_sweep(&result).unwrap();

        let raw = fs::read_to_string(dir.path().join("unit_sweep.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["experiment"], "unit");
        assert_eq!(parsed["num_iterations"], 3);
        assert_eq!(parsed["records"].as_array().unwrap().len(), 3);
        assert_eq!(parsed["records"][0]["iteration"], 1);
    }

    #[test]
    fn write_importance_honors_top_k() {
        let dir = TempDir::new().unwrap();
        let result = run_small_sweep();
        let writer =
            ResultWriter::new(dir.path(), ExperimentName::new("unit".to_string()).unwrap())
                .unwrap();
        writer.write_importance(&result, Some(1)).unwrap();

        let raw = fs::read_to_string(dir.path().join("unit_importance.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["top_k"], 1);
        let rows = parsed["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r["rank"] == 1));
    }

    #[test]
    fn nested_output_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer =
            ResultWriter::new(&nested, ExperimentName::new("deep".to_string()).unwrap()).unwrap();
        writer.write_sweep(&run_small_sweep()).unwrap();
        assert!(nested.join("deep_sweep.json").is_file());
    }
}
