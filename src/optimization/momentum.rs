use ndarray::{Array, Dimension, ShapeBuilder};

/// The velocity of one parameter tensor under gradient descent with momentum.
#[derive(Clone, Debug)]
pub struct Momentum<D: Dimension> {
    velocity: Array<f64, D>,
}

impl<D: Dimension> Momentum<D> {
    /// Creates a new `Momentum` with zero velocity.
    ///
    /// # Arguments
    /// * `shape` - The shape of the parameter tensor this velocity tracks.
    pub fn new<Sh: ShapeBuilder<Dim = D>>(shape: Sh) -> Self {
        Self {
            velocity: Array::zeros(shape),
        }
    }

    /// Makes a step in the opposite direction of the velocity after folding in `grad`:
    /// `v = momentum * v + grad`, `params -= learning_rate * v`.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The accumulated gradient of `params`.
    /// * `learning_rate` - The *length* of the step taken.
    /// * `momentum` - How much of the previous velocity is kept.
    pub fn step(
        &mut self,
        params: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        learning_rate: f64,
        momentum: f64,
    ) {
        let (lr, mu) = (learning_rate, momentum);

        self.velocity.zip_mut_with(grad, |v, &g| *v = mu * *v + g);
        params.zip_mut_with(&self.velocity, |w, &v| *w -= lr * v);
    }

    /// Forgets the accumulated velocity.
    pub fn reset(&mut self) {
        self.velocity.fill(0.);
    }
}
