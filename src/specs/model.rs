use serde::{Deserialize, Serialize};

use crate::{MlpErr, Result, arch::activations::ActFn};

/// The shape of a network: enough to rebuild an untrained network of the same shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub input_size: usize,
    pub output_size: usize,
    #[serde(default)]
    pub hidden_sizes: Vec<usize>,
    #[serde(default)]
    pub hidden_act: ActFn,
    #[serde(default)]
    pub output_act: ActFn,
}

impl Topology {
    /// Returns the `(input, output)` sizes of every layer this topology describes.
    pub fn layer_dims(&self) -> Vec<(usize, usize)> {
        let sizes: Vec<_> = std::iter::once(self.input_size)
            .chain(self.hidden_sizes.iter().copied())
            .chain(std::iter::once(self.output_size))
            .collect();

        sizes.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Checks that every size is nonzero.
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(MlpErr::InvalidTopology("the input size must be nonzero"));
        }

        if self.output_size == 0 {
            return Err(MlpErr::InvalidTopology("the output size must be nonzero"));
        }

        if self.hidden_sizes.contains(&0) {
            return Err(MlpErr::InvalidTopology("hidden sizes must be nonzero"));
        }

        Ok(())
    }
}

/// Network selection and configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlpSpec {
    #[serde(flatten)]
    pub topology: Topology,
    /// Optional seed for deterministic initialization.
    #[serde(default)]
    pub seed: Option<u64>,
}
