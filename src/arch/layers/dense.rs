use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Ix1, Ix2, linalg};
use rand::Rng;

use crate::{
    MlpErr, Result, arch::activations::ActFn, error::check_size as check,
    initialization::RandParamGen, optimization::Momentum,
};

/// A fully connected layer: `a = act_fn(x · wᵗ + b)`.
///
/// The layer owns its parameters, the gradients accumulated since the last `update` and the
/// momentum velocities. The forward cache (`x`, `a`) is only valid until the next `forward`.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: ActFn,

    weights: Array2<f64>,
    bias: Array1<f64>,

    // Forward metadata
    x: Array2<f64>,
    a: Array2<f64>,
    forwarded: bool,

    // Backward metadata
    delta: Array2<f64>,
    dx: Array2<f64>,
    dw: Array2<f64>,
    db: Array1<f64>,

    vw: Momentum<Ix2>,
    vb: Momentum<Ix1>,
}

impl Dense {
    /// Creates a new `Dense` layer with zeroed parameters.
    ///
    /// # Arguments
    /// * `dim` - The `(input, output)` sizes of the layer.
    /// * `act_fn` - The activation applied to the affine map.
    pub fn new(dim: (usize, usize), act_fn: ActFn) -> Self {
        let (input, output) = dim;

        Self {
            dim,
            act_fn,
            weights: Array2::zeros((output, input)),
            bias: Array1::zeros(output),
            x: Array2::zeros((0, input)),
            a: Array2::zeros((0, output)),
            forwarded: false,
            delta: Array2::zeros((0, output)),
            dx: Array2::zeros((0, input)),
            dw: Array2::zeros((output, input)),
            db: Array1::zeros(output),
            vw: Momentum::new((output, input)),
            vb: Momentum::new(output),
        }
    }

    pub fn input_size(&self) -> usize {
        self.dim.0
    }

    pub fn output_size(&self) -> usize {
        self.dim.1
    }

    pub fn act_fn(&self) -> ActFn {
        self.act_fn
    }

    /// The `(output, input)` weight matrix.
    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    pub fn bias(&self) -> ArrayView1<'_, f64> {
        self.bias.view()
    }

    /// Draws new parameters using Xavier normal initialization and forgets every gradient,
    /// velocity and cached pass.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    pub fn init<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let (input, output) = self.dim;
        let param_gen = RandParamGen::xavier(input, output)?;

        self.weights = param_gen.matrix(rng, (output, input));
        self.bias = param_gen.vector(rng, output);
        self.reset();
        Ok(())
    }

    /// Replaces the parameters and the activation of this layer.
    ///
    /// # Arguments
    /// * `weights` - An `(output, input)` weight matrix.
    /// * `bias` - A bias vector of length `output`.
    /// * `act_fn` - The new activation.
    ///
    /// # Returns
    /// An error if the given shapes don't match the layer's sizes.
    pub fn set_params(
        &mut self,
        weights: ArrayView2<f64>,
        bias: ArrayView1<f64>,
        act_fn: ActFn,
    ) -> Result<()> {
        let (input, output) = self.dim;

        check("weight rows", weights.nrows(), output)?;
        check("weight columns", weights.ncols(), input)?;
        check("bias length", bias.len(), output)?;

        self.weights.assign(&weights);
        self.bias.assign(&bias);
        self.act_fn = act_fn;
        self.reset();
        Ok(())
    }

    /// Makes a forward pass over a batch, caching what `backward` needs.
    ///
    /// # Arguments
    /// * `x` - A `(batch, input)` matrix.
    ///
    /// # Returns
    /// A view of the `(batch, output)` activations.
    pub fn forward(&mut self, x: ArrayView2<f64>) -> Result<ArrayView2<'_, f64>> {
        check("layer input columns", x.ncols(), self.dim.0)?;

        let shape = (x.nrows(), self.dim.1);

        fit(&mut self.x, x.dim());
        self.x.assign(&x);

        fit(&mut self.a, shape);
        linalg::general_mat_mul(1.0, &x, &self.weights.t(), 0.0, &mut self.a);
        self.a += &self.bias;
        self.act_fn.apply(&mut self.a);

        self.forwarded = true;
        Ok(self.a.view())
    }

    /// Propagates the gradient of the loss with respect to this layer's output of the last
    /// forward pass, accumulating the weight and bias gradients summed over the batch.
    ///
    /// # Arguments
    /// * `d` - A `(batch, output)` gradient.
    ///
    /// # Returns
    /// A view of the `(batch, input)` gradient with respect to this layer's input.
    pub fn backward(&mut self, d: ArrayView2<f64>) -> Result<ArrayView2<'_, f64>> {
        if !self.forwarded {
            return Err(MlpErr::NoForwardPass);
        }

        check("output gradient rows", d.nrows(), self.a.nrows())?;
        check("output gradient columns", d.ncols(), self.dim.1)?;

        fit(&mut self.delta, d.dim());
        self.delta.assign(&d);
        self.act_fn.chain(&mut self.delta, &self.a);

        linalg::general_mat_mul(1.0, &self.delta.t(), &self.x, 1.0, &mut self.dw);
        for row in self.delta.rows() {
            self.db += &row;
        }

        fit(&mut self.dx, self.x.dim());
        linalg::general_mat_mul(1.0, &self.delta, &self.weights, 0.0, &mut self.dx);

        Ok(self.dx.view())
    }

    /// Applies one step of gradient descent with momentum using the gradients accumulated since
    /// the last call, then clears them.
    pub fn update(&mut self, learning_rate: f64, momentum: f64) {
        self.vw
            .step(&mut self.weights, &self.dw, learning_rate, momentum);
        self.vb.step(&mut self.bias, &self.db, learning_rate, momentum);

        self.dw.fill(0.);
        self.db.fill(0.);
    }

    /// Computes the activations of a single frame into `out` without allocating and without
    /// touching the forward cache.
    ///
    /// # Arguments
    /// * `x` - A frame of length `input`.
    /// * `out` - A buffer of length `output`.
    pub fn forward_frame(&self, x: ArrayView1<f64>, mut out: ArrayViewMut1<f64>) -> Result<()> {
        check("frame length", x.len(), self.dim.0)?;
        check("frame output length", out.len(), self.dim.1)?;

        out.assign(&self.bias);
        linalg::general_mat_vec_mul(1.0, &self.weights, &x, 1.0, &mut out);
        self.act_fn.apply(&mut out);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn grads(&self) -> (ArrayView2<'_, f64>, ArrayView1<'_, f64>) {
        (self.dw.view(), self.db.view())
    }

    fn reset(&mut self) {
        self.dw.fill(0.);
        self.db.fill(0.);
        self.vw.reset();
        self.vb.reset();
        self.forwarded = false;
    }
}

/// Resizes `buf` only when its shape differs, so same-sized batches reuse the memory.
fn fit(buf: &mut Array2<f64>, shape: (usize, usize)) {
    if buf.dim() != shape {
        *buf = Array2::zeros(shape);
    }
}
