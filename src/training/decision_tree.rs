//! Gini classification tree

use ndarray::{Array2, ArrayView1};
use rand::seq::index;
use rand::Rng;
use serde::Serialize;

use crate::error::{InsightsError, Result};

#[derive(Debug, Clone, Serialize)]
pub enum TreeNode {
    Leaf {
        class: usize,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split; all when `None`.
    pub max_features: Option<usize>,
    n_classes: usize,
    feature_importances: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_classes: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Fits on the rows of `x` listed in `indices` (repeats allowed, as in a bootstrap draw).
    pub fn fit<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        rng: &mut R,
    ) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(InsightsError::MalformedInput(format!(
                "feature matrix has {} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if indices.is_empty() {
            return Err(InsightsError::InsufficientData { needed: 1, got: 0 });
        }

        self.n_classes = y.iter().copied().max().map_or(0, |m| m + 1);
        let mut importances = vec![0.0; x.ncols()];
        self.root = Some(self.build_tree(x, y, indices, 0, &mut importances, rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = importances;
        Ok(self)
    }

    fn class_counts(&self, y: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    fn build_tree<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d)
            || pure;

        if should_stop {
            return TreeNode::Leaf {
                class: majority(&counts),
                n_samples,
            };
        }

        let Some((feature_idx, threshold, gain)) = self.find_best_split(x, y, indices, &counts, rng)
        else {
            return TreeNode::Leaf {
                class: majority(&counts),
                n_samples,
            };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Best `(feature, threshold, gain)` over a random subset of features.
    fn find_best_split<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        parent_counts: &[usize],
        rng: &mut R,
    ) -> Option<(usize, f64, f64)> {
        let n_features = x.ncols();
        let n_try = self.max_features.unwrap_or(n_features).clamp(1, n_features);
        let mut candidates = index::sample(rng, n_features, n_try).into_vec();
        // Scan in index order so equal gains resolve the same way every run.
        candidates.sort_unstable();

        let n = indices.len() as f64;
        let parent_impurity = gini(parent_counts, indices.len());
        let mut best: Option<(usize, f64, f64)> = None;

        for feature_idx in candidates {
            let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature_idx]]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for window in values.windows(2) {
                let threshold = (window[0] + window[1]) / 2.0;

                let mut left_counts = vec![0usize; self.n_classes];
                let mut left_total = 0usize;
                for &i in indices {
                    if x[[i, feature_idx]] <= threshold {
                        left_counts[y[i]] += 1;
                        left_total += 1;
                    }
                }
                let right_total = indices.len() - left_total;
                if left_total < self.min_samples_leaf || right_total < self.min_samples_leaf {
                    continue;
                }
                let right_counts: Vec<usize> = parent_counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(p, l)| p - l)
                    .collect();

                let weighted = (left_total as f64 * gini(&left_counts, left_total)
                    + right_total as f64 * gini(&right_counts, right_total))
                    / n;
                let gain = parent_impurity - weighted;

                if gain > 0.0 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, threshold, gain));
                }
            }
        }

        best
    }

    /// Class for a single sample.
    pub fn predict_one(&self, sample: ArrayView1<f64>) -> Result<usize> {
        let mut node = self.root.as_ref().ok_or(InsightsError::ModelNotTrained)?;
        loop {
            match node {
                TreeNode::Leaf { class, .. } => return Ok(*class),
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Edges on the longest root-to-leaf path; a lone leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / n).powi(2))
        .sum::<f64>()
}

/// Most frequent class; ties go to the lowest class index.
pub(crate) fn majority(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .fold((0usize, 0usize), |(best, best_count), (class, &count)| {
            if count > best_count {
                (class, count)
            } else {
                (best, best_count)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fit(x: &Array2<f64>, y: &[usize], tree: DecisionTree) -> DecisionTree {
        let mut tree = tree;
        let indices: Vec<usize> = (0..y.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        tree.fit(x, y, &indices, &mut rng).unwrap();
        tree
    }

    #[test]
    fn separates_linearly_separable_classes() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = [0, 0, 1, 1];
        let tree = fit(&x, &y, DecisionTree::new());

        for (row, &label) in x.rows().into_iter().zip(&y) {
            assert_eq!(tree.predict_one(row).unwrap(), label);
        }
    }

    #[test]
    fn respects_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = [0, 1, 0, 1];
        let tree = fit(&x, &y, DecisionTree::new().with_max_depth(Some(2)));
        assert!(tree.depth() <= 2);
        assert!(tree.depth() >= 1);

        let unbounded = fit(&x, &y, DecisionTree::new());
        assert!(unbounded.depth() > 2);
    }

    #[test]
    fn pure_labels_give_a_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let tree = fit(&x, &[1, 1, 1], DecisionTree::new());
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn constant_feature_gets_no_importance() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = [0, 0, 1, 1];
        let tree = fit(&x, &y, DecisionTree::new());
        let importances = tree.feature_importances();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn unfitted_tree_refuses_to_predict() {
        let tree = DecisionTree::new();
        let x = array![[1.0]];
        assert!(matches!(
            tree.predict_one(x.row(0)),
            Err(InsightsError::ModelNotTrained)
        ));
    }

    #[test]
    fn majority_breaks_ties_low() {
        assert_eq!(majority(&[2, 2]), 0);
        assert_eq!(majority(&[1, 3]), 1);
        assert_eq!(majority(&[]), 0);
    }
}
