//! A single class-weighted CART tree for the binary forest.
//!
//! Trees are grown on column-major data with Gini impurity, an optional depth
//! limit, and per-split feature subsampling. Leaves store the weighted
//! group-B probability rather than a hard vote so the forest can average
//! probabilities.

use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;

/// Growth parameters shared by every tree in a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_features: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Sample weights by label: `[weight_a, weight_b]`.
    pub class_weights: [f64; 2],
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        /// Weighted probability of group B at this leaf.
        p_b: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted binary decision tree stored as an index arena.
#[derive(Debug, Clone)]
pub(crate) struct Tree {
    nodes: Vec<TreeNode>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Weighted impurity decrease: `w·g − w_l·g_l − w_r·g_r`.
    decrease: f64,
}

/// Weighted Gini impurity for a two-class weight pair.
fn gini(w_a: f64, w_b: f64) -> f64 {
    let w = w_a + w_b;
    if w == 0.0 {
        return 0.0;
    }
    1.0 - (w_a * w_a + w_b * w_b) / (w * w)
}

impl Tree {
    /// Grow a tree over `indices` into `cols` (column-major features).
    ///
    /// Accumulates each split's weighted impurity decrease into `importances`
    /// (indexed by feature), which the forest normalizes after training.
    pub(crate) fn grow(
        cols: &[Vec<f64>],
        labels: &[usize],
        indices: &[usize],
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> Self {
        let mut nodes = Vec::new();
        grow_node(cols, labels, indices, params, 0, rng, &mut nodes, importances);
        Self { nodes }
    }

    /// Return the leaf probability of group B for one sample row.
    pub(crate) fn predict_p_b(&self, row: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { p_b } => return *p_b,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Recursively grow one node; returns its arena index.
#[allow(clippy::too_many_arguments)]
fn grow_node(
    cols: &[Vec<f64>],
    labels: &[usize],
    indices: &[usize],
    params: &TreeParams,
    depth: usize,
    rng: &mut ChaCha8Rng,
    nodes: &mut Vec<TreeNode>,
    importances: &mut [f64],
) -> usize {
    let [weight_a, weight_b] = params.class_weights;
    let n_b = indices.iter().filter(|&&i| labels[i] == 1).count();
    let n_a = indices.len() - n_b;
    let (w_a, w_b) = (n_a as f64 * weight_a, n_b as f64 * weight_b);
    let impurity = gini(w_a, w_b);

    let make_leaf = |nodes: &mut Vec<TreeNode>| -> usize {
        let idx = nodes.len();
        nodes.push(TreeNode::Leaf {
            p_b: w_b / (w_a + w_b),
        });
        idx
    };

    let depth_exceeded = params.max_depth.is_some_and(|max_d| depth >= max_d);
    if impurity == 0.0 || indices.len() < params.min_samples_split || depth_exceeded {
        return make_leaf(nodes);
    }

    let Some(split) = find_best_split(cols, labels, indices, params, impurity, w_a + w_b, rng)
    else {
        return make_leaf(nodes);
    };

    importances[split.feature] += split.decrease;

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| cols[split.feature][i] <= split.threshold);

    // Reserve the split's slot so children get stable arena indices.
    let node_idx = nodes.len();
    nodes.push(TreeNode::Leaf { p_b: 0.0 });

    let left = grow_node(cols, labels, &left_indices, params, depth + 1, rng, nodes, importances);
    let right = grow_node(cols, labels, &right_indices, params, depth + 1, rng, nodes, importances);

    nodes[node_idx] = TreeNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };
    node_idx
}

/// Exhaustive threshold scan over a random feature subset.
fn find_best_split(
    cols: &[Vec<f64>],
    labels: &[usize],
    indices: &[usize],
    params: &TreeParams,
    node_impurity: f64,
    node_weight: f64,
    rng: &mut ChaCha8Rng,
) -> Option<BestSplit> {
    let [weight_a, weight_b] = params.class_weights;
    let n_features = cols.len();
    let n_try = params.max_features.min(n_features);
    let candidates = sample(rng, n_features, n_try);

    let mut best: Option<BestSplit> = None;

    // (value, label) pairs sorted by value, reused across candidate features.
    let mut ordered: Vec<(f64, usize)> = Vec::with_capacity(indices.len());

    for feature in candidates {
        ordered.clear();
        ordered.extend(indices.iter().map(|&i| (cols[feature][i], labels[i])));
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total_b = ordered.iter().filter(|&&(_, l)| l == 1).count();
        let total_a = ordered.len() - total_b;

        let mut left_a = 0usize;
        let mut left_b = 0usize;
        for pos in 0..ordered.len() - 1 {
            if ordered[pos].1 == 1 {
                left_b += 1;
            } else {
                left_a += 1;
            }
            // No threshold between equal values.
            if ordered[pos].0 == ordered[pos + 1].0 {
                continue;
            }
            let left_n = pos + 1;
            let right_n = ordered.len() - left_n;
            if left_n < params.min_samples_leaf || right_n < params.min_samples_leaf {
                continue;
            }

            let wl_a = left_a as f64 * weight_a;
            let wl_b = left_b as f64 * weight_b;
            let wr_a = (total_a - left_a) as f64 * weight_a;
            let wr_b = (total_b - left_b) as f64 * weight_b;
            let (wl, wr) = (wl_a + wl_b, wr_a + wr_b);
            let decrease =
                node_weight * node_impurity - wl * gini(wl_a, wl_b) - wr * gini(wr_a, wr_b);

            if decrease > best.as_ref().map_or(0.0, |b| b.decrease) {
                best = Some(BestSplit {
                    feature,
                    threshold: (ordered[pos].0 + ordered[pos + 1].0) / 2.0,
                    decrease,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params_all(n_features: usize) -> TreeParams {
        TreeParams {
            max_features: n_features,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            class_weights: [1.0, 1.0],
        }
    }

    fn to_cols(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        (0..rows[0].len())
            .map(|f| rows.iter().map(|r| r[f]).collect())
            .collect()
    }

    #[test]
    fn pure_node_is_single_leaf() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let cols = to_cols(&rows);
        let labels = vec![0, 0, 0];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut imp = vec![0.0];
        let tree = Tree::grow(&cols, &labels, &[0, 1, 2], &params_all(1), &mut rng, &mut imp);
        assert_eq!(tree.n_nodes(), 1);
        assert!((tree.predict_p_b(&[2.0]) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn separable_split_found() {
        let rows = vec![
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![10.0],
            vec![11.0],
            vec![12.0],
        ];
        let cols = to_cols(&rows);
        let labels = vec![0, 0, 0, 1, 1, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut imp = vec![0.0];
        let tree = Tree::grow(&cols, &labels, &[0, 1, 2, 3, 4, 5], &params_all(1), &mut rng, &mut imp);
        assert!(tree.predict_p_b(&[2.0]) < 0.5);
        assert!(tree.predict_p_b(&[11.0]) > 0.5);
        assert!(imp[0] > 0.0);
    }

    #[test]
    fn max_depth_zero_splits() {
        let rows = vec![vec![1.0], vec![10.0]];
        let cols = to_cols(&rows);
        let labels = vec![0, 1];
        let mut params = params_all(1);
        params.max_depth = Some(0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut imp = vec![0.0];
        let tree = Tree::grow(&cols, &labels, &[0, 1], &params, &mut rng, &mut imp);
        assert_eq!(tree.n_nodes(), 1);
        // Mixed leaf reports the mixed probability.
        assert!((tree.predict_p_b(&[5.0]) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn majority_weight_shifts_leaf_probability() {
        let rows = vec![vec![1.0], vec![1.0]];
        let cols = to_cols(&rows);
        let labels = vec![0, 1];
        let mut params = params_all(1);
        params.class_weights = [1.0, 3.0];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut imp = vec![0.0];
        let tree = Tree::grow(&cols, &labels, &[0, 1], &params, &mut rng, &mut imp);
        // One sample each, B weighted 3x: p_b = 3/4.
        assert!((tree.predict_p_b(&[1.0]) - 0.75).abs() < 1e-12);
    }
}
