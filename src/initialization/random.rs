use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::Result;

/// A parameter generator that follows a certain probabilistic distribution.
#[derive(Clone, Debug)]
pub struct RandParamGen<D: Distribution<f64>> {
    distribution: D,
}

impl<D: Distribution<f64>> RandParamGen<D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `distribution` - The distribution to sample the parameters from.
    pub fn new(distribution: D) -> Self {
        Self { distribution }
    }

    /// Samples a matrix of the given shape.
    pub fn matrix<R: Rng + ?Sized>(&self, rng: &mut R, shape: (usize, usize)) -> Array2<f64> {
        Array2::random_using(shape, &self.distribution, rng)
    }

    /// Samples a vector of the given length.
    pub fn vector<R: Rng + ?Sized>(&self, rng: &mut R, len: usize) -> Array1<f64> {
        Array1::random_using(len, &self.distribution, rng)
    }
}

impl RandParamGen<Normal<f64>> {
    /// Creates a new `RandParamGen` parameter generator with a normal distribution.
    ///
    /// # Arguments
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (NaN or infinite).
    pub fn normal(mean: f64, std_dev: f64) -> Result<Self> {
        Ok(Self::new(Normal::new(mean, std_dev)?))
    }

    /// Creates a new `RandParamGen` parameter generator using Xavier normal initialization.
    ///
    /// # Arguments
    /// * `fan_in` - The number of input units of the layer.
    /// * `fan_out` - The number of output units of the layer.
    ///
    /// # Returns
    /// An error if the calculated standard deviation is not finite.
    pub fn xavier(fan_in: usize, fan_out: usize) -> Result<Self> {
        let std_dev = (2. / (fan_in + fan_out) as f64).sqrt();
        Self::normal(0., std_dev)
    }
}
