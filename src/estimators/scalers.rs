//! Feature scaling implementations

use super::{check_width, Transformer};
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Fitted `(x - center) / scale` per column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ColumnParams {
    center: Array1<f64>,
    scale: Array1<f64>,
}

impl ColumnParams {
    fn apply(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if self.scale.is_empty() {
            return Err(KolosalError::ModelNotFitted);
        }
        check_width(&x, self.scale.len())?;
        Ok((&x - &self.center) / &self.scale)
    }
}

/// Zero scale would divide by zero; constant columns pass through centred
fn guard_scale(scale: Array1<f64>) -> Array1<f64> {
    scale.mapv(|s| if s.abs() < f64::EPSILON || !s.is_finite() { 1.0 } else { s })
}

fn require_rows(x: &ArrayView2<'_, f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(KolosalError::InvalidInput("cannot fit a scaler on zero rows".to_string()));
    }
    Ok(())
}

/// Standard scaling (z-score normalization): (x - mean) / std
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: ColumnParams,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<()> {
        require_rows(&x)?;
        let center = x.mean_axis(Axis(0)).ok_or(KolosalError::ModelNotFitted)?;
        let scale = x.std_axis(Axis(0), 0.0);
        self.params = ColumnParams { center, scale: guard_scale(scale) };
        Ok(())
    }

    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.params.apply(x)
    }
}

/// Min-Max scaling: (x - min) / (max - min)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: ColumnParams,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for MinMaxScaler {
    fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<()> {
        require_rows(&x)?;
        let min = x.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
        let range = &max - &min;
        self.params = ColumnParams { center: min, scale: guard_scale(range) };
        Ok(())
    }

    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.params.apply(x)
    }
}

/// Max absolute scaling: x / max(|x|)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaxAbsScaler {
    params: ColumnParams,
}

impl MaxAbsScaler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for MaxAbsScaler {
    fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<()> {
        require_rows(&x)?;
        let max_abs = x.fold_axis(Axis(0), 0.0f64, |&acc, &v| acc.max(v.abs()));
        self.params = ColumnParams {
            center: Array1::zeros(x.ncols()),
            scale: guard_scale(max_abs),
        };
        Ok(())
    }

    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.params.apply(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [3.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(x.view()).unwrap();
        assert_eq!(out, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_min_max_scaler() {
        let x = array![[0.0], [5.0], [10.0]];
        let mut scaler = MinMaxScaler::new();
        let out = scaler.fit_transform(x.view()).unwrap();
        assert_eq!(out, array![[0.0], [0.5], [1.0]]);
    }

    #[test]
    fn test_max_abs_scaler() {
        let x = array![[-4.0, 1.0], [2.0, 0.5]];
        let mut scaler = MaxAbsScaler::new();
        let out = scaler.fit_transform(x.view()).unwrap();
        assert_eq!(out, array![[-1.0, 1.0], [0.5, 0.5]]);
    }

    #[test]
    fn test_fitted_scaler_serializes() {
        let x = array![[1.0, -2.0], [3.0, 2.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(x.view()).unwrap();

        let json = serde_json::to_string(&scaler).unwrap();
        let restored: StandardScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.transform(x.view()).unwrap(), scaler.transform(x.view()).unwrap());
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        let x = array![[1.0]];
        assert!(matches!(scaler.transform(x.view()), Err(KolosalError::ModelNotFitted)));
    }
}
