//! Deterministic stratified train/test split

use super::Dataset;
use crate::error::{KolosalError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::debug;

/// Guards `ceil` against products like `0.2 * 1000` landing a hair above an integer
const CEIL_EPSILON: f64 = 1e-9;

/// A train/test partition of one dataset sample
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
    /// Rows of the original sample that went to `train`, in `train` order
    pub train_indices: Vec<usize>,
    /// Rows of the original sample that went to `test`, in `test` order
    pub test_indices: Vec<usize>,
}

/// Stratified shuffle splitter with a fixed seed
#[derive(Debug, Clone)]
pub struct StratifiedSplitter {
    test_fraction: f64,
    seed: u64,
}

impl StratifiedSplitter {
    pub fn new(test_fraction: f64, seed: u64) -> Self {
        Self { test_fraction, seed }
    }

    /// Split `dataset` so every class keeps its proportion in both parts.
    ///
    /// The test partition holds `ceil(test_fraction * n)` rows. Each class's
    /// share of it is allocated by largest remainder, so no class is more
    /// than one row away from its exact proportional count.
    pub fn split(&self, dataset: &Dataset) -> Result<TrainTestSplit> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(KolosalError::InvalidInput(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }

        let n_rows = dataset.n_rows();
        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in dataset.labels().iter().enumerate() {
            by_class.entry(label).or_default().push(idx);
        }

        if by_class.len() < 2 {
            return Err(KolosalError::InvalidInput(format!(
                "stratified split needs at least 2 classes, found {}",
                by_class.len()
            )));
        }
        if let Some((label, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
            return Err(KolosalError::InvalidInput(format!(
                "class {} has {} member(s); at least 2 are required to stratify",
                label,
                rows.len()
            )));
        }

        let n_test = ((self.test_fraction * n_rows as f64) - CEIL_EPSILON).ceil() as usize;
        let n_train = n_rows - n_test;
        if n_test < by_class.len() || n_train < by_class.len() {
            return Err(KolosalError::InvalidInput(format!(
                "{} test / {} train rows cannot hold {} classes",
                n_test,
                n_train,
                by_class.len()
            )));
        }

        let counts: Vec<(i64, usize)> = by_class.iter().map(|(&l, rows)| (l, rows.len())).collect();
        let allocation = allocate_test_counts(&counts, n_rows, n_test);

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut train_indices = Vec::with_capacity(n_train);
        let mut test_indices = Vec::with_capacity(n_test);

        for ((label, mut rows), &class_test) in by_class.into_iter().zip(allocation.iter()) {
            if class_test == 0 || class_test == rows.len() {
                return Err(KolosalError::InvalidInput(format!(
                    "class {} ({} rows) is too small to stratify at test_fraction {}",
                    label,
                    rows.len(),
                    self.test_fraction
                )));
            }
            rows.shuffle(&mut rng);
            test_indices.extend_from_slice(&rows[..class_test]);
            train_indices.extend_from_slice(&rows[class_test..]);
        }

        train_indices.shuffle(&mut rng);
        test_indices.shuffle(&mut rng);

        debug!(n_train = train_indices.len(), n_test = test_indices.len(), "stratified split");

        Ok(TrainTestSplit {
            train: dataset.select(&train_indices),
            test: dataset.select(&test_indices),
            train_indices,
            test_indices,
        })
    }
}

/// Stratified split of `dataset` with the given seed and held-out fraction
pub fn train_test_split(dataset: &Dataset, seed: u64, test_fraction: f64) -> Result<TrainTestSplit> {
    StratifiedSplitter::new(test_fraction, seed).split(dataset)
}

/// Largest-remainder apportionment of `n_test` rows across classes.
///
/// `counts` is ordered by label; ties on the remainder go to the smaller label.
fn allocate_test_counts(counts: &[(i64, usize)], n_rows: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = counts
        .iter()
        .map(|&(_, c)| c as f64 * n_test as f64 / n_rows as f64)
        .collect();
    let mut allocation: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let assigned: usize = allocation.iter().sum();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    for &idx in order.iter().take(n_test.saturating_sub(assigned)) {
        allocation[idx] += 1;
    }
    allocation
}
