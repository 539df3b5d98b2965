use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A training objective over a batch of predictions.
pub trait LossFn {
    /// Computes the loss of `y_pred` against the targets `y`.
    fn loss(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<f64>;

    /// Computes the gradient of `loss` with respect to `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<Array2<f64>>;
}
