//! Min-max feature scaling

use crate::error::{DetectorError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // observed min
    scale: f64,  // observed range
}

/// Min-Max scaler: (x - min) / (max - min)
///
/// Fitted once on the training corpus; the same parameters are reapplied to
/// every row scored later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit column minimums and ranges
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(DetectorError::ValidationError(
                "Cannot fit scaler on zero rows".to_string(),
            ));
        }

        self.params = x
            .axis_iter(Axis(1))
            .map(|column| {
                let min = column.iter().copied().fold(f64::INFINITY, f64::min);
                let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                ScalerParams {
                    center: min,
                    // Constant columns map to zero
                    scale: if range == 0.0 { 1.0 } else { range },
                }
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Scale a matrix with the fitted parameters
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;
        let mut result = x.clone();
        for (mut column, params) in result.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            column.mapv_inplace(|v| (v - params.center) / params.scale);
        }
        Ok(result)
    }

    /// Scale a single row with the fitted parameters
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.params.iter())
            .map(|(&v, params)| (v - params.center) / params.scale)
            .collect())
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Undo the scaling
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;
        let mut result = x.clone();
        for (mut column, params) in result.axis_iter_mut(Axis(1)).zip(self.params.iter()) {
            column.mapv_inplace(|v| v * params.scale + params.center);
        }
        Ok(result)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if !self.is_fitted {
            return Err(DetectorError::NotFitted);
        }
        if width != self.params.len() {
            return Err(DetectorError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", width),
            });
        }
        Ok(())
    }
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_minmax_scaler() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [5.0, 50.0]];
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        for column in scaled.axis_iter(Axis(1)) {
            let min = column.iter().copied().fold(f64::INFINITY, f64::min);
            let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert!((min - 0.0).abs() < 1e-10);
            assert!((max - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let x = array![[4.0], [4.0], [4.0]];
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        assert!(scaled.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_row_uses_fitted_range() {
        let x = array![[0.0, 100.0], [10.0, 200.0]];
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&x).unwrap();

        // Values outside the fitted range are not refit or clipped
        let row = scaler.transform_row(&[20.0, 150.0]).unwrap();
        assert_eq!(row, vec![2.0, 0.5]);
    }

    #[test]
    fn test_inverse_transform() {
        let x = array![[1.0, -3.0], [2.0, 0.0], [7.0, 9.0]];
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();
        for (o, r) in x.iter().zip(restored.iter()) {
            assert!((o - r).abs() < 1e-10);
        }
    }

    #[test]
    fn test_unfitted_scaler_rejects_input() {
        let scaler = MinMaxScaler::new();
        assert!(matches!(scaler.transform_row(&[1.0]), Err(DetectorError::NotFitted)));
    }
}
