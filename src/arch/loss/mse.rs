use ndarray::{Array2, ArrayView2};

use super::LossFn;
use crate::{MlpErr, Result};

/// Mean squared error loss function: the squared error of each row summed over its columns,
/// averaged over the rows.
#[derive(Default, Clone, Copy, Debug)]
pub struct Mse;

impl Mse {
    fn check(y_pred: &ArrayView2<f64>, y: &ArrayView2<f64>) -> Result<()> {
        if y_pred.nrows() != y.nrows() {
            return Err(MlpErr::SizeMismatch {
                what: "target rows",
                got: y.nrows(),
                expected: y_pred.nrows(),
            });
        }

        if y_pred.ncols() != y.ncols() {
            return Err(MlpErr::SizeMismatch {
                what: "target columns",
                got: y.ncols(),
                expected: y_pred.ncols(),
            });
        }

        Ok(())
    }
}

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<f64> {
        Self::check(&y_pred, &y)?;

        if y.nrows() == 0 {
            return Ok(0.);
        }

        let sum: f64 = y_pred
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum();

        Ok(sum / y.nrows() as f64)
    }

    fn loss_prime(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<Array2<f64>> {
        Self::check(&y_pred, &y)?;

        let scale = 2. / y.nrows().max(1) as f64;
        Ok((&y_pred - &y) * scale)
    }
}
