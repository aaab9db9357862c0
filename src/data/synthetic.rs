//! Synthetic classification data
//!
//! Gaussian blobs around per-class centroids. Used by the `generate`
//! command, the tests and the benches when the real dataset is absent.

use super::Dataset;
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Shape and difficulty of a generated dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub n_rows: usize,
    pub n_features: usize,
    pub n_classes: usize,
    /// Distance of each centroid coordinate from the origin
    pub class_sep: f64,
    /// Fraction of labels flipped to a random class
    pub flip_fraction: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_rows: 1_000,
            n_features: 5,
            n_classes: 2,
            class_sep: 1.0,
            flip_fraction: 0.01,
            seed: 12,
        }
    }
}

impl SyntheticConfig {
    pub fn new(n_rows: usize, n_features: usize, seed: u64) -> Self {
        Self {
            n_rows,
            n_features,
            seed,
            ..Self::default()
        }
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn with_class_sep(mut self, class_sep: f64) -> Self {
        self.class_sep = class_sep;
        self
    }

    pub fn with_flip_fraction(mut self, flip_fraction: f64) -> Self {
        self.flip_fraction = flip_fraction;
        self
    }
}

/// Generate a dataset with balanced classes (row `i` starts in class `i % n_classes`)
pub fn make_classification(config: &SyntheticConfig) -> Result<Dataset> {
    if config.n_classes < 2 {
        return Err(KolosalError::invalid_parameter("n_classes", config.n_classes, "must be at least 2"));
    }
    if config.n_features == 0 {
        return Err(KolosalError::invalid_parameter("n_features", 0, "must be positive"));
    }
    if !(0.0..=1.0).contains(&config.flip_fraction) {
        return Err(KolosalError::invalid_parameter(
            "flip_fraction",
            config.flip_fraction,
            "must be in [0, 1]",
        ));
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

    // Feature 0 spreads the classes evenly over [-sep, sep]; the rest are random corners
    let centroids: Vec<Vec<f64>> = (0..config.n_classes)
        .map(|class| {
            let spread = 2.0 * class as f64 / (config.n_classes - 1) as f64 - 1.0;
            (0..config.n_features)
                .map(|j| match j {
                    0 => config.class_sep * spread,
                    _ if rng.gen::<bool>() => config.class_sep,
                    _ => -config.class_sep,
                })
                .collect()
        })
        .collect();

    let mut features = Array2::<f32>::zeros((config.n_rows, config.n_features));
    let mut labels = Array1::<i64>::zeros(config.n_rows);

    for row in 0..config.n_rows {
        let class = row % config.n_classes;
        for (j, &center) in centroids[class].iter().enumerate() {
            features[[row, j]] = (center + standard_normal(&mut rng)) as f32;
        }
        labels[row] = if rng.gen::<f64>() < config.flip_fraction {
            rng.gen_range(0..config.n_classes) as i64
        } else {
            class as i64
        };
    }

    Dataset::new(features, labels)
}

/// Box-Muller transform
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
