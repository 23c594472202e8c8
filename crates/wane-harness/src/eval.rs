//! Confusion counts, threshold metrics, and rank-based ROC-AUC.

use crate::error::HarnessError;
use crate::pool::Group;

/// 2x2 confusion counts over {A, B}.
///
/// Cell names read actual-then-predicted: `ab` is an actual-A row predicted
/// B. Labels absent from the test set simply leave their cells at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ConfusionCounts {
    /// Actual A, predicted A.
    pub aa: usize,
    /// Actual A, predicted B.
    pub ab: usize,
    /// Actual B, predicted A.
    pub ba: usize,
    /// Actual B, predicted B.
    pub bb: usize,
}

impl ConfusionCounts {
    /// Build counts from true labels and P(B) scores, thresholding at 0.5
    /// (a score of exactly 0.5 predicts B).
    #[must_use]
    pub fn from_probabilities(labels: &[usize], proba: &[f64]) -> Self {
        debug_assert_eq!(labels.len(), proba.len());
        let mut counts = Self::default();
        for (&label, &p) in labels.iter().zip(proba) {
            let predicted_b = p >= 0.5;
            match (label == Group::B.index(), predicted_b) {
                (false, false) => counts.aa += 1,
                (false, true) => counts.ab += 1,
                (true, false) => counts.ba += 1,
                (true, true) => counts.bb += 1,
            }
        }
        counts
    }

    /// Total rows counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.aa + self.ab + self.ba + self.bb
    }

    /// Fraction of rows on the diagonal. NaN for an empty test set.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        (self.aa + self.bb) as f64 / self.total() as f64
    }

    /// Group-A precision: of rows predicted A, the fraction actually A.
    /// NaN when nothing was predicted A.
    #[must_use]
    pub fn precision(&self) -> f64 {
        self.aa as f64 / (self.aa + self.ba) as f64
    }

    /// Group-A recall: of actual-A rows, the fraction predicted A.
    /// NaN when the test set has no group-A rows.
    #[must_use]
    pub fn recall(&self) -> f64 {
        self.aa as f64 / (self.aa + self.ab) as f64
    }

    /// Harmonic mean of group-A precision and recall. NaN propagates from
    /// either input or a zero sum.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        2.0 * p * r / (p + r)
    }

    /// Percentage of actual-A rows classified correctly. NaN when none exist.
    #[must_use]
    pub fn percent_true_a(&self) -> f64 {
        100.0 * self.aa as f64 / (self.aa + self.ab) as f64
    }

    /// Percentage of actual-B rows classified correctly. NaN when none exist.
    #[must_use]
    pub fn percent_true_b(&self) -> f64 {
        100.0 * self.bb as f64 / (self.ba + self.bb) as f64
    }
}

impl std::fmt::Display for ConfusionCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "          predicted A  predicted B")?;
        writeln!(f, "actual A  {:>11}  {:>11}", self.aa, self.ab)?;
        write!(f, "actual B  {:>11}  {:>11}", self.ba, self.bb)
    }
}

/// Rank-based ROC-AUC with B as the positive class.
///
/// Mann-Whitney estimator over tie-averaged ranks of the P(B) scores, so
/// tied probabilities contribute half credit.
///
/// # Errors
///
/// Returns [`HarnessError::DegenerateLabels`] when the test set contains a
/// single class, which leaves the statistic undefined.
pub fn roc_auc(labels: &[usize], proba: &[f64]) -> Result<f64, HarnessError> {
    debug_assert_eq!(labels.len(), proba.len());
    let n_pos = labels.iter().filter(|&&l| l == Group::B.index()).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 {
        return Err(HarnessError::DegenerateLabels {
            group: Group::A,
            n_samples: labels.len(),
        });
    }
    if n_neg == 0 {
        return Err(HarnessError::DegenerateLabels {
            group: Group::B,
            n_samples: labels.len(),
        });
    }

    let mut order: Vec<usize> = (0..proba.len()).collect();
    order.sort_by(|&i, &j| proba[i].total_cmp(&proba[j]));

    // Tie-averaged ranks, 1-based.
    let mut ranks = vec![0.0_f64; proba.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && proba[order[end]] == proba[order[start]] {
            end += 1;
        }
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = mean_rank;
        }
        start = end;
    }

    let rank_sum_pos: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|&(&l, _)| l == Group::B.index())
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-3, "{a} != {b}");
    }

    #[test]
    fn counts_from_thresholded_probabilities() {
        let labels = [0, 0, 1, 1, 0];
        let proba = [0.2, 0.8, 0.9, 0.3, 0.5];
        let counts = ConfusionCounts::from_probabilities(&labels, &proba);
        // 0.5 predicts B.
        assert_eq!(
            counts,
            ConfusionCounts {
                aa: 1,
                ab: 2,
                ba: 1,
                bb: 1
            }
        );
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn reference_metric_values() {
        let counts = ConfusionCounts {
            aa: 120,
            ab: 30,
            ba: 10,
            bb: 140,
        };
        approx(counts.accuracy(), 0.867);
        approx(counts.precision(), 0.923);
        approx(counts.recall(), 0.8);
        approx(counts.f1(), 0.857);
        approx(counts.percent_true_a(), 80.0);
        approx(counts.percent_true_b(), 140.0 / 150.0 * 100.0);
    }

    #[test]
    fn zero_denominators_propagate_nan() {
        // Everything predicted B, nothing actually A.
        let counts = ConfusionCounts {
            aa: 0,
            ab: 0,
            ba: 0,
            bb: 10,
        };
        assert!(counts.precision().is_nan());
        assert!(counts.recall().is_nan());
        assert!(counts.f1().is_nan());
        assert!(counts.percent_true_a().is_nan());
        assert!((counts.accuracy() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn perfect_separation_gives_unit_auc() {
        let labels = [0, 0, 0, 1, 1, 1];
        let proba = [0.1, 0.2, 0.3, 0.7, 0.8, 0.9];
        approx(roc_auc(&labels, &proba).unwrap(), 1.0);
    }

    #[test]
    fn reversed_separation_gives_zero_auc() {
        let labels = [1, 1, 0, 0];
        let proba = [0.1, 0.2, 0.8, 0.9];
        approx(roc_auc(&labels, &proba).unwrap(), 0.0);
    }

    #[test]
    fn ties_average_to_half() {
        let labels = [0, 1, 0, 1];
        let proba = [0.5, 0.5, 0.5, 0.5];
        approx(roc_auc(&labels, &proba).unwrap(), 0.5);
    }

    #[test]
    fn known_mixed_ranking() {
        // Positives at ranks 2 and 4 of 4: U = (2+4) - 2*3/2 = 3, AUC = 3/4.
        let labels = [0, 1, 0, 1];
        let proba = [0.1, 0.4, 0.6, 0.9];
        approx(roc_auc(&labels, &proba).unwrap(), 0.75);
    }

    #[test]
    fn single_class_test_set_rejected() {
        let err = roc_auc(&[1, 1, 1], &[0.5, 0.6, 0.7]).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::DegenerateLabels {
                group: Group::B,
                n_samples: 3
            }
        ));
        let err = roc_auc(&[0, 0], &[0.5, 0.6]).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::DegenerateLabels {
                group: Group::A,
                n_samples: 2
            }
        ));
    }

    #[test]
    fn display_renders_grid() {
        let counts = ConfusionCounts {
            aa: 1,
            ab: 2,
            ba: 3,
            bb: 4,
        };
        let rendered = counts.to_string();
        assert!(rendered.contains("predicted A"));
        assert!(rendered.contains("actual B"));
    }
}
