use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};
use rand::rngs::StdRng;

use super::{
    activations::ActFn,
    layers::Dense,
    loss::{LossFn, Mse},
};
use crate::{
    MlpErr, Result,
    error::check_size,
    specs::{MlpSpec, Topology, generate_rng},
};

/// A copy of one layer's learned state.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerParams {
    /// The `(output, input)` weight matrix.
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub act_fn: ActFn,
}

/// A multilayer perceptron: an ordered stack of `Dense` layers, each one feeding the next.
///
/// The network only provides single-pass primitives (`forward`, `backward`, `update`); looping
/// over epochs and deciding when to stop is left to the caller (see `training::Sgd`).
///
/// Instances are not meant to be shared between threads without external synchronization:
/// every pass mutates layer owned caches.
#[derive(Clone, Debug)]
pub struct Mlp {
    layers: Vec<Dense>,
    // One buffer per layer output, sized at build time for the frame path.
    frames: Vec<Array1<f64>>,
    forwarded_to: Option<usize>,
    // Reported by `topology` when there are no hidden layers to read it from.
    hidden_act: ActFn,
    initialized: bool,
    trained: bool,
    rng: StdRng,
}

impl Default for Mlp {
    fn default() -> Self {
        Self::new()
    }
}

impl Mlp {
    /// Creates a new unbuilt `Mlp` seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(generate_rng(None))
    }

    /// Creates a new unbuilt `Mlp` whose parameter initialization is reproducible.
    ///
    /// # Arguments
    /// * `seed` - The seed for the random number generator used by `init` and `clear`.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(generate_rng(Some(seed)))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            layers: Vec::new(),
            frames: Vec::new(),
            forwarded_to: None,
            hidden_act: ActFn::default(),
            initialized: false,
            trained: false,
            rng,
        }
    }

    /// Builds and initializes a new `Mlp` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The network configuration.
    pub fn from_spec(spec: &MlpSpec) -> Result<Self> {
        let mut mlp = Self::with_rng(generate_rng(spec.seed));
        mlp.init_topology(&spec.topology)?;
        Ok(mlp)
    }

    /// Rebuilds the whole layer stack from scratch, discarding any previous parameters.
    ///
    /// The network ends up with `hidden_sizes.len() + 1` randomly initialized layers, every
    /// hidden layer using `hidden_act` and the last one using `output_act`.
    ///
    /// # Returns
    /// An error if any of the sizes is zero, in which case the network is left untouched.
    pub fn init(
        &mut self,
        input_size: usize,
        output_size: usize,
        hidden_sizes: &[usize],
        hidden_act: ActFn,
        output_act: ActFn,
    ) -> Result<()> {
        let topology = Topology {
            input_size,
            output_size,
            hidden_sizes: hidden_sizes.to_vec(),
            hidden_act,
            output_act,
        };

        self.init_topology(&topology)
    }

    /// Same as `init`, taking the whole topology descriptor.
    pub fn init_topology(&mut self, topology: &Topology) -> Result<()> {
        topology.validate()?;

        let dims = topology.layer_dims();
        let last = dims.len() - 1;
        let mut layers = Vec::with_capacity(dims.len());

        for (i, dim) in dims.into_iter().enumerate() {
            let act_fn = if i == last {
                topology.output_act
            } else {
                topology.hidden_act
            };

            let mut layer = Dense::new(dim, act_fn);
            layer.init(&mut self.rng)?;
            layers.push(layer);
        }

        self.frames = layers
            .iter()
            .map(|layer| Array1::zeros(layer.output_size()))
            .collect();
        self.layers = layers;
        self.forwarded_to = None;
        self.hidden_act = topology.hidden_act;
        self.initialized = true;
        self.trained = false;

        debug!(layers = self.layers.len(), dims = topology.input_size; "built mlp");
        Ok(())
    }

    /// Draws new random parameters for every layer, keeping the topology. Does nothing on an
    /// unbuilt network besides resetting the trained flag.
    pub fn clear(&mut self) -> Result<()> {
        for layer in &mut self.layers {
            layer.init(&mut self.rng)?;
        }

        self.forwarded_to = None;
        self.initialized = !self.layers.is_empty();
        self.trained = false;

        debug!(layers = self.layers.len(); "cleared mlp");
        Ok(())
    }

    /// Returns a copy of the learned state of the `layer`-th layer.
    ///
    /// # Returns
    /// `NotInitialized` on an unbuilt network, `LayerOutOfRange` for a bad index.
    pub fn params(&self, layer: usize) -> Result<LayerParams> {
        let dense = self.layer(layer)?;

        Ok(LayerParams {
            weights: dense.weights().to_owned(),
            bias: dense.bias().to_owned(),
            act_fn: dense.act_fn(),
        })
    }

    /// Replaces the learned state of the `layer`-th layer, e.g. when loading a trained network.
    ///
    /// # Arguments
    /// * `layer` - The index of the layer.
    /// * `weights` - An `(output, input)` weight matrix.
    /// * `bias` - A bias vector of length `output`.
    /// * `act_fn` - The layer's new activation.
    ///
    /// # Returns
    /// `NotInitialized` on an unbuilt network, or an error if the index is out of range or the
    /// shapes don't match the layer's sizes.
    pub fn set_params(
        &mut self,
        layer: usize,
        weights: ArrayView2<f64>,
        bias: ArrayView1<f64>,
        act_fn: ActFn,
    ) -> Result<()> {
        self.last_layer()?;

        let len = self.layers.len();
        let dense = self
            .layers
            .get_mut(layer)
            .ok_or(MlpErr::LayerOutOfRange { layer, len })?;

        dense.set_params(weights, bias, act_fn)?;
        self.forwarded_to = None;
        self.initialized = true;

        debug!(layer = layer, act_fn = act_fn.id(); "loaded layer parameters");
        Ok(())
    }

    /// Runs every layer over a `(batch, dims)` input.
    ///
    /// # Returns
    /// A view of the `(batch, output)` prediction.
    pub fn forward<'x>(&'x mut self, x: ArrayView2<'x, f64>) -> Result<ArrayView2<'x, f64>> {
        let end = self.last_layer()?;
        self.forward_range(x, 0, end)
    }

    /// Runs layers `0..=end` over a `(batch, dims)` input, returning the activations of the
    /// `end`-th layer.
    ///
    /// `start` is only validated: the computation always begins at the first layer. Callers
    /// who need a true partial chain should feed the intermediate activations themselves.
    ///
    /// # Returns
    /// An error unless `start <= end < len()`, or if the input has the wrong amount of columns.
    pub fn forward_range<'x>(
        &'x mut self,
        mut x: ArrayView2<'x, f64>,
        start: usize,
        end: usize,
    ) -> Result<ArrayView2<'x, f64>> {
        self.check_range(start, end)?;
        check_size("input columns", x.ncols(), self.dims())?;

        if end + 1 != self.layers.len() {
            trace!(start = start, end = end; "ranged forward");
        }

        self.forwarded_to = Some(end);

        for layer in &mut self.layers[..=end] {
            x = layer.forward(x)?;
        }

        Ok(x)
    }

    /// Runs every layer over a single frame, writing the prediction into `output`.
    ///
    /// Uses buffers sized at build time, so it does not allocate.
    pub fn process_frame(
        &mut self,
        input: ArrayView1<f64>,
        output: ArrayViewMut1<f64>,
    ) -> Result<()> {
        let end = self.last_layer()?;
        self.process_frame_range(input, output, 0, end)
    }

    /// Single frame counterpart of `forward_range`.
    pub fn process_frame_range(
        &mut self,
        input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
        start: usize,
        end: usize,
    ) -> Result<()> {
        self.check_range(start, end)?;
        check_size("frame length", input.len(), self.dims())?;
        check_size(
            "frame output length",
            output.len(),
            self.layers[end].output_size(),
        )?;

        self.run_frame(input, end)?;
        output.assign(&self.frames[end]);
        Ok(())
    }

    /// Lenient single frame inference for real-time callers that must never fail.
    ///
    /// An `end` past the last layer is clamped to it. If the network is unbuilt or either buffer
    /// has the wrong length, `output` is zeroed instead.
    ///
    /// # Returns
    /// Whether `output` holds an actual prediction.
    pub fn process_frame_clamped(
        &mut self,
        input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
        end: usize,
    ) -> bool {
        let Ok(last) = self.last_layer() else {
            output.fill(0.);
            return false;
        };

        let end = end.min(last);
        let fits = input.len() == self.dims() && output.len() == self.layers[end].output_size();

        if !fits || self.run_frame(input, end).is_err() {
            output.fill(0.);
            return false;
        }

        output.assign(&self.frames[end]);
        true
    }

    /// Propagates the gradient of the loss with respect to the network's output from the last
    /// layer to the first, accumulating every layer's parameter gradients.
    ///
    /// # Arguments
    /// * `d` - A `(batch, output)` gradient for the batch of the last full `forward`.
    pub fn backward(&mut self, d: ArrayView2<f64>) -> Result<()> {
        let last = self.last_layer()?;

        if self.forwarded_to != Some(last) {
            return Err(MlpErr::NoForwardPass);
        }

        let mut d = d;
        for layer in self.layers.iter_mut().rev() {
            d = layer.backward(d)?;
        }

        Ok(())
    }

    /// Applies the accumulated gradients of every layer with the same hyperparameters.
    pub fn update(&mut self, learning_rate: f64, momentum: f64) {
        for layer in &mut self.layers {
            layer.update(learning_rate, momentum);
        }
    }

    /// Mean squared error of `y_pred` against `y`, see `Mse`.
    ///
    /// Takes no receiver so it can be fed the view returned by `forward`.
    pub fn loss(y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<f64> {
        Mse.loss(y_pred, y)
    }

    /// Returns the topology descriptor of the network, or `None` if it is unbuilt or its hidden
    /// layers no longer share one activation.
    pub fn topology(&self) -> Option<Topology> {
        let (output, hidden) = self.layers.split_last()?;

        let hidden_act = hidden.first().map_or(self.hidden_act, Dense::act_fn);

        if hidden.iter().any(|layer| layer.act_fn() != hidden_act) {
            return None;
        }

        Some(Topology {
            input_size: self.dims(),
            output_size: output.output_size(),
            hidden_sizes: hidden.iter().map(Dense::output_size).collect(),
            hidden_act,
            output_act: output.act_fn(),
        })
    }

    /// The amount of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The input size of the network, 0 when unbuilt.
    pub fn dims(&self) -> usize {
        self.layers.first().map_or(0, Dense::input_size)
    }

    /// The input size of the `layer`-th layer, 0 when out of range.
    pub fn input_size(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, Dense::input_size)
    }

    /// The output size of the `layer`-th layer, 0 when out of range.
    pub fn output_size(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, Dense::output_size)
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn trained(&self) -> bool {
        self.trained
    }

    pub fn set_trained(&mut self, trained: bool) {
        self.trained = trained;
    }

    fn layer(&self, layer: usize) -> Result<&Dense> {
        self.last_layer()?;

        self.layers.get(layer).ok_or(MlpErr::LayerOutOfRange {
            layer,
            len: self.layers.len(),
        })
    }

    fn last_layer(&self) -> Result<usize> {
        self.layers.len().checked_sub(1).ok_or(MlpErr::NotInitialized)
    }

    fn check_range(&self, start: usize, end: usize) -> Result<()> {
        let len = self.layers.len();

        if len == 0 {
            return Err(MlpErr::NotInitialized);
        }

        for layer in [start, end] {
            if layer >= len {
                return Err(MlpErr::LayerOutOfRange { layer, len });
            }
        }

        if start > end {
            return Err(MlpErr::InvalidRange { start, end });
        }

        Ok(())
    }

    /// Chains the frame buffers of layers `0..=end`, the input size must already be checked.
    fn run_frame(&mut self, input: ArrayView1<f64>, end: usize) -> Result<()> {
        for i in 0..=end {
            let (done, rest) = self.frames.split_at_mut(i);
            let x = match done.last() {
                Some(prev) => prev.view(),
                None => input.view(),
            };

            self.layers[i].forward_frame(x, rest[0].view_mut())?;
        }

        Ok(())
    }
}
