//! Decision tree implementation
//!
//! Splits are found with a sorted sweep per feature, so each node costs
//! `O(features * n log n)` instead of re-scanning rows per threshold.

use super::{check_fit_input, check_width, encode_labels, Classifier};
use crate::error::{KolosalError, Result};
use ndarray::ArrayView2;
use rand::seq::index;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Splits must beat this impurity decrease to be kept
const MIN_GAIN: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node; a class position for classifiers, a mean for regressors
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    Mse,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Gini => f.write_str("gini"),
            Criterion::Entropy => f.write_str("entropy"),
            Criterion::Mse => f.write_str("mse"),
        }
    }
}

/// What the tree is fitted against
#[derive(Clone, Copy)]
pub(crate) enum Targets<'a> {
    Classes { y: &'a [usize], n_classes: usize },
    Values(&'a [f64]),
}

struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (`None` grows until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (`None` = all)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    seed: u64,
    n_features: usize,
    classes: Vec<i64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            seed: 0,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::Mse,
            ..Self::new_classifier()
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Seed for per-node feature sampling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit on a subset of rows (duplicates allowed, as in bootstrap samples)
    pub(crate) fn fit_rows(
        &mut self,
        x: ArrayView2<'_, f64>,
        targets: Targets<'_>,
        rows: Vec<usize>,
    ) -> Result<()> {
        match (targets, self.criterion) {
            (Targets::Classes { .. }, Criterion::Mse) | (Targets::Values(_), Criterion::Gini | Criterion::Entropy) => {
                return Err(KolosalError::invalid_parameter(
                    "criterion",
                    self.criterion,
                    "does not match the target type",
                ));
            }
            _ => {}
        }
        if rows.is_empty() {
            return Err(KolosalError::InvalidInput("cannot fit a tree on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        self.root = Some(self.build_node(&x, targets, rows, 0, &mut rng));
        Ok(())
    }

    /// Raw leaf value for every row
    pub fn predict_values(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        let root = self.root.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        check_width(&x, self.n_features)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { value, .. } => break *value,
                        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                            node = if row[*feature_idx] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect())
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Get number of leaves
    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        self.root.as_ref().map_or(0, count)
    }

    fn build_node(
        &self,
        x: &ArrayView2<'_, f64>,
        targets: Targets<'_>,
        rows: Vec<usize>,
        depth: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) -> TreeNode {
        let n_samples = rows.len();
        let leaf = TreeNode::Leaf {
            value: leaf_value(targets, &rows),
            n_samples,
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || is_pure(targets, &rows);
        if should_stop {
            return leaf;
        }

        let features = self.candidate_features(x.ncols(), rng);
        let parent = node_impurity(targets, &rows, self.criterion);
        let best = features
            .par_iter()
            .filter_map(|&f| self.best_split_for(x, targets, &rows, f, parent))
            .max_by(|a, b| {
                a.gain
                    .partial_cmp(&b.gain)
                    .unwrap_or(Ordering::Equal)
                    .then(b.feature_idx.cmp(&a.feature_idx))
            });

        let Some(split) = best else {
            return leaf;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| x[[r, split.feature_idx]] <= split.threshold);

        let left = Box::new(self.build_node(x, targets, left_rows, depth + 1, rng));
        let right = Box::new(self.build_node(x, targets, right_rows, depth + 1, rng));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
        }
    }

    fn candidate_features(&self, n_features: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < n_features => {
                let mut picked = index::sample(rng, n_features, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..n_features).collect(),
        }
    }

    fn best_split_for(
        &self,
        x: &ArrayView2<'_, f64>,
        targets: Targets<'_>,
        rows: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let n = rows.len();
        let mut order = rows.to_vec();
        order.sort_unstable_by(|&a, &b| {
            x[[a, feature_idx]]
                .partial_cmp(&x[[b, feature_idx]])
                .unwrap_or(Ordering::Equal)
        });

        let mut best: Option<SplitCandidate> = None;
        let mut consider = |pos: usize, weighted: f64| {
            let gain = parent_impurity - weighted;
            if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                let lo = x[[order[pos], feature_idx]];
                let hi = x[[order[pos + 1], feature_idx]];
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: lo + (hi - lo) / 2.0,
                    gain,
                });
            }
        };

        match targets {
            Targets::Classes { y, n_classes } => {
                let mut total = vec![0usize; n_classes];
                for &r in &order {
                    total[y[r]] += 1;
                }
                let mut left = vec![0usize; n_classes];
                for pos in 0..n - 1 {
                    left[y[order[pos]]] += 1;
                    if !self.is_valid_cut(x, &order, pos, feature_idx) {
                        continue;
                    }
                    let n_left = pos + 1;
                    let n_right = n - n_left;
                    let il = count_impurity(left.iter().copied(), n_left, self.criterion);
                    let ir = count_impurity(
                        total.iter().zip(&left).map(|(t, l)| t - l),
                        n_right,
                        self.criterion,
                    );
                    consider(pos, (n_left as f64 * il + n_right as f64 * ir) / n as f64);
                }
            }
            Targets::Values(values) => {
                let (total_sum, total_sq) = order.iter().fold((0.0, 0.0), |(s, q), &r| {
                    (s + values[r], q + values[r] * values[r])
                });
                let (mut left_sum, mut left_sq) = (0.0, 0.0);
                for pos in 0..n - 1 {
                    let v = values[order[pos]];
                    left_sum += v;
                    left_sq += v * v;
                    if !self.is_valid_cut(x, &order, pos, feature_idx) {
                        continue;
                    }
                    let n_left = (pos + 1) as f64;
                    let n_right = (n - pos - 1) as f64;
                    let var_left = left_sq / n_left - (left_sum / n_left).powi(2);
                    let right_sum = total_sum - left_sum;
                    let var_right = (total_sq - left_sq) / n_right - (right_sum / n_right).powi(2);
                    consider(pos, (n_left * var_left + n_right * var_right) / n as f64);
                }
            }
        }

        best
    }

    /// A cut after `pos` must separate distinct values and respect leaf sizes
    fn is_valid_cut(&self, x: &ArrayView2<'_, f64>, order: &[usize], pos: usize, feature_idx: usize) -> bool {
        let n_left = pos + 1;
        let n_right = order.len() - n_left;
        n_left >= self.min_samples_leaf
            && n_right >= self.min_samples_leaf
            && x[[order[pos + 1], feature_idx]] > x[[order[pos], feature_idx]]
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[i64]) -> Result<()> {
        check_fit_input(&x, y)?;
        let (classes, encoded) = encode_labels(y);
        let n_classes = classes.len();
        self.classes = classes;
        self.fit_rows(
            x,
            Targets::Classes { y: &encoded, n_classes },
            (0..y.len()).collect(),
        )
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>> {
        if self.classes.is_empty() {
            return Err(KolosalError::ModelNotFitted);
        }
        Ok(self
            .predict_values(x)?
            .into_iter()
            .map(|v| self.classes[v as usize])
            .collect())
    }
}

fn count_impurity<I: Iterator<Item = usize>>(counts: I, n: usize, criterion: Criterion) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    match criterion {
        Criterion::Entropy => -counts
            .filter(|&c| c > 0)
            .map(|c| {
                let p = c as f64 / n;
                p * p.ln()
            })
            .sum::<f64>(),
        _ => 1.0 - counts.map(|c| (c as f64 / n).powi(2)).sum::<f64>(),
    }
}

fn node_impurity(targets: Targets<'_>, rows: &[usize], criterion: Criterion) -> f64 {
    match targets {
        Targets::Classes { y, n_classes } => {
            let mut counts = vec![0usize; n_classes];
            for &r in rows {
                counts[y[r]] += 1;
            }
            count_impurity(counts.into_iter(), rows.len(), criterion)
        }
        Targets::Values(values) => {
            let n = rows.len() as f64;
            let mean = rows.iter().map(|&r| values[r]).sum::<f64>() / n;
            rows.iter().map(|&r| (values[r] - mean).powi(2)).sum::<f64>() / n
        }
    }
}

fn leaf_value(targets: Targets<'_>, rows: &[usize]) -> f64 {
    match targets {
        Targets::Classes { y, n_classes } => {
            let mut counts = vec![0usize; n_classes];
            for &r in rows {
                counts[y[r]] += 1;
            }
            // First maximum, so ties go to the smaller class
            let mut best = 0;
            for (class, &count) in counts.iter().enumerate() {
                if count > counts[best] {
                    best = class;
                }
            }
            best as f64
        }
        Targets::Values(values) => {
            rows.iter().map(|&r| values[r]).sum::<f64>() / rows.len().max(1) as f64
        }
    }
}

fn is_pure(targets: Targets<'_>, rows: &[usize]) -> bool {
    let Some(&first) = rows.first() else {
        return true;
    };
    match targets {
        Targets::Classes { y, .. } => rows.iter().all(|&r| y[r] == y[first]),
        Targets::Values(values) => rows.iter().all(|&r| (values[r] - values[first]).abs() < 1e-12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::test_data::{accuracy, blobs};
    use ndarray::array;

    #[test]
    fn test_classifier_separates_blobs() {
        let (x, y) = blobs(30);
        let mut tree = DecisionTree::new_classifier();
        tree.fit(x.view(), &y).unwrap();

        let pred = tree.predict(x.view()).unwrap();
        assert_eq!(accuracy(&pred, &y), 1.0);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = vec![0, 1, 0, 1, 0, 1];
        let mut tree = DecisionTree::new_classifier().with_max_depth(2);
        tree.fit(x.view(), &y).unwrap();
        assert!(tree.depth() <= 3);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn test_constant_features_give_single_leaf() {
        let x = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let y = vec![0, 1, 1];
        let mut tree = DecisionTree::new_classifier();
        tree.fit(x.view(), &y).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(x.view()).unwrap(), vec![1, 1, 1]);
    }

    #[test]
    fn test_regressor_fits_step() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let values = [0.0, 0.0, 10.0, 10.0];
        let mut tree = DecisionTree::new_regressor().with_max_depth(1);
        tree.fit_rows(x.view(), Targets::Values(&values), vec![0, 1, 2, 3]).unwrap();
        assert_eq!(tree.predict_values(x.view()).unwrap(), vec![0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_criterion_mismatch_rejected() {
        let x = array![[1.0], [2.0]];
        let mut tree = DecisionTree::new_classifier();
        let err = tree.fit_rows(x.view(), Targets::Values(&[0.0, 1.0]), vec![0, 1]).unwrap_err();
        assert!(matches!(err, KolosalError::InvalidParameter { .. }));
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new_classifier();
        let x = array![[1.0]];
        assert!(matches!(tree.predict(x.view()), Err(KolosalError::ModelNotFitted)));
    }

    #[test]
    fn test_width_mismatch() {
        let (x, y) = blobs(5);
        let mut tree = DecisionTree::new_classifier();
        tree.fit(x.view(), &y).unwrap();
        let narrow = array![[1.0]];
        assert!(matches!(tree.predict(narrow.view()), Err(KolosalError::ShapeError { .. })));
    }
}
