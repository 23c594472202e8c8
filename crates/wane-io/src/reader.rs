//! CSV pool reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use wane_harness::Group;

use crate::IoError;

/// A labeled feature table parsed from CSV, in row order.
///
/// Feed `features`/`groups`/`feature_names` straight into
/// [`wane_harness::BalancedPool::new`].
#[derive(Debug)]
pub struct PoolTable {
    /// Group label per row.
    pub groups: Vec<Group>,
    /// Feature column names from the CSV header.
    pub feature_names: Vec<String>,
    /// Feature values: `features[row][feature]`.
    pub features: Vec<Vec<f64>>,
}

impl PoolTable {
    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.groups.len()
    }

    /// Count rows labeled `group`.
    #[must_use]
    pub fn count(&self, group: Group) -> usize {
        self.groups.iter().filter(|&&g| g == group).count()
    }
}

/// Reads a labeled feature pool from a CSV file.
///
/// Expected CSV format:
/// - Header row required (first column is the group label, remaining are
///   feature names)
/// - `group,f1,f2,...,fn`
/// - One row per sample; the group cell is `A` or `B` (case-insensitive)
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Header has no columns after the group |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::UnknownGroup`] | Group cell is not A or B |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct PoolReader {
    path: PathBuf,
}

impl PoolReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`PoolTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<PoolTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) allows rows with varying column counts so that our own
        // InconsistentRowLength check fires instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let expected_cols = header.len();
        if expected_cols < 2 {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let feature_names: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
        debug!(n_features = feature_names.len(), "read CSV header");

        let mut groups = Vec::new();
        let mut features = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let raw_group = record.get(0).unwrap_or("");
            let group = match raw_group.trim() {
                g if g.eq_ignore_ascii_case("a") => Group::A,
                g if g.eq_ignore_ascii_case("b") => Group::B,
                _ => {
                    return Err(IoError::UnknownGroup {
                        path: self.path.clone(),
                        row_index,
                        raw: raw_group.to_string(),
                    });
                }
            };

            let mut values = Vec::with_capacity(expected_cols - 1);
            for col_index in 1..record.len() {
                let raw = record.get(col_index).unwrap_or("");
                let value: f64 = raw.parse().map_err(|_| IoError::NonFiniteValue {
                    path: self.path.clone(),
                    row_index,
                    col_index: col_index - 1,
                    raw: raw.to_string(),
                })?;
                if !value.is_finite() {
                    return Err(IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        col_index: col_index - 1,
                        raw: raw.to_string(),
                    });
                }
                values.push(value);
            }

            groups.push(group);
            features.push(values);
        }

        if groups.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let table = PoolTable {
            groups,
            feature_names,
            features,
        };
        info!(
            n_rows = table.n_rows(),
            n_group_a = table.count(Group::A),
            n_group_b = table.count(Group::B),
            "pool loaded"
        );
        Ok(table)
    }
}
