//! Logistic regression

use super::{check_fit_input, check_width, encode_labels, Classifier};
use crate::error::{KolosalError, Result};
use ndarray::{Array1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// L2-regularised logistic regression trained by batch gradient descent.
///
/// Binary problems fit one weight vector. More classes are fitted one-vs-rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    weights: Vec<(Array1<f64>, f64)>,
    classes: Vec<i64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            weights: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    fn fit_binary(&self, x: ArrayView2<'_, f64>, target: &Array1<f64>) -> (Array1<f64>, f64) {
        let n_samples = x.nrows() as f64;
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let errors = (x.dot(&weights) + bias).mapv(Self::sigmoid) - target;
            let dw = x.t().dot(&errors) / n_samples + self.alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights.scaled_add(-self.learning_rate, &dw);
            bias -= self.learning_rate * db;
        }

        (weights, bias)
    }

    /// Decision scores, one column per fitted weight vector
    fn decision(&self, x: ArrayView2<'_, f64>) -> Vec<Array1<f64>> {
        self.weights.iter().map(|(w, b)| x.dot(w) + *b).collect()
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[i64]) -> Result<()> {
        check_fit_input(&x, y)?;
        if self.learning_rate <= 0.0 {
            return Err(KolosalError::invalid_parameter("learning_rate", self.learning_rate, "must be positive"));
        }

        let (classes, encoded) = encode_labels(y);
        let positives: Vec<usize> = if classes.len() <= 2 {
            vec![classes.len() - 1]
        } else {
            (0..classes.len()).collect()
        };

        self.weights = positives
            .par_iter()
            .map(|&class| {
                let target: Array1<f64> = encoded.iter().map(|&c| if c == class { 1.0 } else { 0.0 }).collect();
                self.fit_binary(x, &target)
            })
            .collect();
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<i64>> {
        let Some((first, _)) = self.weights.first() else {
            return Err(KolosalError::ModelNotFitted);
        };
        check_width(&x, first.len())?;

        let scores = self.decision(x);
        if self.classes.len() <= 2 {
            let positive = self.classes.len() - 1;
            return Ok(scores[0]
                .iter()
                .map(|&s| if s > 0.0 { self.classes[positive] } else { self.classes[0] })
                .collect());
        }

        Ok((0..x.nrows())
            .map(|row| {
                let mut best = 0;
                for class in 1..scores.len() {
                    if scores[class][row] > scores[best][row] {
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
    fn test_binary_separable() {
        let (x, y) = blobs(20);
        let mut model = LogisticRegression::new().with_learning_rate(0.5).with_max_iter(500);
        model.fit(x.view(), &y).unwrap();
        assert_eq!(accuracy(&model.predict(x.view()).unwrap(), &y), 1.0);
    }

    #[test]
    fn test_labels_are_preserved() {
        let x = array![[-2.0], [-1.5], [1.5], [2.0]];
        let y = vec![-3, -3, 8, 8];
        let mut model = LogisticRegression::new().with_learning_rate(1.0);
        model.fit(x.view(), &y).unwrap();
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_unfitted() {
        let model = LogisticRegression::new();
        let x = array![[1.0]];
        assert!(matches!(model.predict(x.view()), Err(KolosalError::ModelNotFitted)));
    }
}
