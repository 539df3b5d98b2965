use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Training configuration for the `Sgd` trainer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSpec {
    pub epochs: usize,
    pub batch_size: NonZeroUsize,
    pub learning_rate: f64,
    #[serde(default)]
    pub momentum: f64,
    /// Fraction of the data held out for validation, in `[0, 1)`.
    #[serde(default)]
    pub validation: f64,
    /// Optional seed for deterministic shuffling.
    #[serde(default)]
    pub seed: Option<u64>,
}
