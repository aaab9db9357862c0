//! Gaussian Naive Bayes for continuous features

use super::{check_fit_input, check_width, encode_labels, Classifier};
use crate::error::{KolosalError, Result};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Gaussian Naive Bayes Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Per class, per feature mean
    means: Vec<Vec<f64>>,
    /// Per class, per feature variance
    variances: Vec<Vec<f64>>,
    log_priors: Vec<f64>,
    classes: Vec<i64>,
    /// Added to every variance, scaled by the largest feature variance
    var_smoothing: f64,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            means: Vec::new(),
            variances: Vec::new(),
            log_priors: Vec::new(),
            classes: Vec::new(),
            var_smoothing: 1e-9,
        }
    }

    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    fn joint_log_likelihood(&self, row: &[f64], class: usize) -> f64 {
        let ll: f64 = row
            .iter()
            .zip(&self.means[class])
            .zip(&self.variances[class])
            .map(|((&xi, &mean), &var)| -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln()))
            .sum();
        self.log_priors[class] + ll
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[i64]) -> Result<()> {
        check_fit_input(&x, y)?;
        let n_features = x.ncols();
        let (classes, encoded) = encode_labels(y);
        let n_classes = classes.len();

        // Welford's single pass per class
        let mut counts = vec![0usize; n_classes];
        let mut means = vec![vec![0.0; n_features]; n_classes];
        let mut m2 = vec![vec![0.0; n_features]; n_classes];
        for (row, &class) in x.rows().into_iter().zip(&encoded) {
            counts[class] += 1;
            let n = counts[class] as f64;
            for (j, &val) in row.iter().enumerate() {
                let delta = val - means[class][j];
                means[class][j] += delta / n;
                m2[class][j] += delta * (val - means[class][j]);
            }
        }

        let max_var = x
            .columns()
            .into_iter()
            .map(|col| col.var(0.0))
            .fold(0.0f64, f64::max);
        let epsilon = (self.var_smoothing * max_var).max(f64::MIN_POSITIVE);

        self.variances = m2
            .iter()
            .zip(&counts)
            .map(|(feature_m2, &n)| feature_m2.iter().map(|&v| v / n as f64 + epsilon).collect())
            .collect();
        self.means = means;
        self.log_priors = counts.iter().map(|&c| (c as f64 / y.len() as f64).ln()).collect();
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>> {
        let Some(first) = self.means.first() else {
            return Err(KolosalError::ModelNotFitted);
        };
        check_width(&x, first.len())?;

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                let mut best = 0;
                let mut best_ll = f64::NEG_INFINITY;
                for class in 0..self.classes.len() {
                    let ll = self.joint_log_likelihood(&row, class);
                    if ll > best_ll {
                        best_ll = ll;
                        best = class;
                    }
                }
                self.classes[best]
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::test_data::{accuracy, blobs};
    use ndarray::array;

    #[test]
    fn test_fits_blobs() {
        let (x, y) = blobs(20);
        let mut model = GaussianNaiveBayes::new();
        model.fit(x.view(), &y).unwrap();
        assert_eq!(accuracy(&model.predict(x.view()).unwrap(), &y), 1.0);
    }

    #[test]
    fn test_constant_feature_does_not_produce_nan() {
        let x = array![[1.0, 0.0], [1.0, 0.1], [1.0, 5.0], [1.0, 5.1]];
        let y = vec![0, 0, 1, 1];
        let mut model = GaussianNaiveBayes::new();
        model.fit(x.view(), &y).unwrap();
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }
}
