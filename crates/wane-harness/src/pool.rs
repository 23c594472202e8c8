//! The balanced source pool and labeled row sets sliced from it.

use crate::error::HarnessError;

/// Binary group label: A is the shrinking minority, B the fixed majority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Group {
    /// The minority class under attrition.
    A,
    /// The fixed-size majority class.
    B,
}

impl Group {
    /// Zero-based label encoding: A = 0, B = 1.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Group::A => 0,
            Group::B => 1,
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Group::A => "A",
            Group::B => "B",
        })
    }
}

/// The validated, class-balanced source pool for a whole run.
///
/// Holds the full feature matrix plus one immutable index list per group,
/// each truncated (in row order) to `per_class` rows at construction. The
/// index lists never change across iterations.
#[derive(Debug)]
pub struct BalancedPool {
    features: Vec<Vec<f64>>,
    feature_names: Vec<String>,
    group_a: Vec<usize>,
    group_b: Vec<usize>,
    per_class: usize,
}

impl BalancedPool {
    /// Build a pool from row-major features with parallel group labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`HarnessError::EmptyPool`] | Zero rows |
    /// | [`HarnessError::InvalidPoolSize`] | `per_class` is zero |
    /// | [`HarnessError::LabelCountMismatch`] | Label count differs from row count |
    /// | [`HarnessError::FeatureCountMismatch`] | Rows have inconsistent widths |
    /// | [`HarnessError::NonFiniteValue`] | Any value is NaN or infinite |
    /// | [`HarnessError::InsufficientData`] | A group has fewer than `per_class` rows |
    pub fn new(
        features: Vec<Vec<f64>>,
        groups: Vec<Group>,
        feature_names: Vec<String>,
        per_class: usize,
    ) -> Result<Self, HarnessError> {
        if features.is_empty() {
            return Err(HarnessError::EmptyPool);
        }
        if per_class == 0 {
            return Err(HarnessError::InvalidPoolSize);
        }
        if groups.len() != features.len() {
            return Err(HarnessError::LabelCountMismatch {
                n_rows: features.len(),
                n_labels: groups.len(),
            });
        }
        let n_features = features[0].len();
        for (row, values) in features.iter().enumerate() {
            if values.len() != n_features {
                return Err(HarnessError::FeatureCountMismatch {
                    expected: n_features,
                    got: values.len(),
                    row,
                });
            }
            for (column, &val) in values.iter().enumerate() {
                if !val.is_finite() {
                    return Err(HarnessError::NonFiniteValue { row, column });
                }
            }
        }

        let mut group_a = Vec::new();
        let mut group_b = Vec::new();
        for (row, group) in groups.iter().enumerate() {
            match group {
                Group::A => group_a.push(row),
                Group::B => group_b.push(row),
            }
        }
        for (group, indices) in [(Group::A, &mut group_a), (Group::B, &mut group_b)] {
            if indices.len() < per_class {
                return Err(HarnessError::InsufficientData {
                    group,
                    requested: per_class,
                    available: indices.len(),
                });
            }
            indices.truncate(per_class);
        }

        Ok(Self {
            features,
            feature_names,
            group_a,
            group_b,
            per_class,
        })
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the pool size per class.
    #[must_use]
    pub fn per_class(&self) -> usize {
        self.per_class
    }

    /// Return the group-A row indices (pool order, immutable for the run).
    #[must_use]
    pub fn group_a_indices(&self) -> &[usize] {
        &self.group_a
    }

    /// Return the group-B row indices (pool order, immutable for the run).
    #[must_use]
    pub fn group_b_indices(&self) -> &[usize] {
        &self.group_b
    }

    /// Return one feature row.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        &self.features[index]
    }
}

/// A labeled set of rows sliced out of the pool (or synthesized by the
/// balancer). Labels use the [`Group::index`] encoding.
#[derive(Debug, Clone)]
pub struct SampleSet {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl SampleSet {
    /// Create a set from parallel features and labels.
    #[must_use]
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Self {
        debug_assert_eq!(features.len(), labels.len());
        Self { features, labels }
    }

    /// Materialize pool rows for a group-A index slice and a group-B index slice.
    #[must_use]
    pub fn from_indices(pool: &BalancedPool, a_indices: &[usize], b_indices: &[usize]) -> Self {
        let mut features = Vec::with_capacity(a_indices.len() + b_indices.len());
        let mut labels = Vec::with_capacity(a_indices.len() + b_indices.len());
        for &i in a_indices {
            features.push(pool.row(i).to_vec());
            labels.push(Group::A.index());
        }
        for &i in b_indices {
            features.push(pool.row(i).to_vec());
            labels.push(Group::B.index());
        }
        Self { features, labels }
    }

    /// Return the feature rows.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the labels (0 = A, 1 = B).
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Return true when the set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Count rows belonging to `group`.
    #[must_use]
    pub fn count(&self, group: Group) -> usize {
        self.labels.iter().filter(|&&l| l == group.index()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pool_inputs(n_a: usize, n_b: usize) -> (Vec<Vec<f64>>, Vec<Group>, Vec<String>) {
        let mut features = Vec::new();
        let mut groups = Vec::new();
        for i in 0..n_a {
            features.push(vec![i as f64, 0.0]);
            groups.push(Group::A);
        }
        for i in 0..n_b {
            features.push(vec![100.0 + i as f64, 1.0]);
            groups.push(Group::B);
        }
        (features, groups, vec!["x".to_string(), "y".to_string()])
    }

    #[test]
    fn truncates_each_group_to_per_class() {
        let (features, groups, names) = make_pool_inputs(10, 15);
        let pool = BalancedPool::new(features, groups, names, 8).unwrap();
        assert_eq!(pool.group_a_indices().len(), 8);
        assert_eq!(pool.group_b_indices().len(), 8);
        // Truncation keeps the earliest rows in pool order.
        assert_eq!(pool.group_a_indices()[0], 0);
        assert_eq!(pool.group_b_indices()[0], 10);
    }

    #[test]
    fn short_group_rejected() {
        let (features, groups, names) = make_pool_inputs(5, 20);
        let err = BalancedPool::new(features, groups, names, 8).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::InsufficientData {
                group: Group::A,
                requested: 8,
                available: 5
            }
        ));
    }

    #[test]
    fn non_finite_value_rejected() {
        let (mut features, groups, names) = make_pool_inputs(3, 3);
        features[1][1] = f64::NAN;
        let err = BalancedPool::new(features, groups, names, 2).unwrap_err();
        assert!(matches!(err, HarnessError::NonFiniteValue { row: 1, column: 1 }));
    }

    #[test]
    fn inconsistent_row_width_rejected() {
        let (mut features, groups, names) = make_pool_inputs(3, 3);
        features[2] = vec![1.0];
        let err = BalancedPool::new(features, groups, names, 2).unwrap_err();
        assert!(matches!(err, HarnessError::FeatureCountMismatch { row: 2, .. }));
    }

    #[test]
    fn sample_set_from_indices_labels_by_group() {
        let (features, groups, names) = make_pool_inputs(4, 4);
        let pool = BalancedPool::new(features, groups, names, 4).unwrap();
        let set = SampleSet::from_indices(&pool, &[0, 1], &[4, 5, 6]);
        assert_eq!(set.len(), 5);
        assert_eq!(set.count(Group::A), 2);
        assert_eq!(set.count(Group::B), 3);
        assert_eq!(set.features()[2], pool.row(4));
    }
}
