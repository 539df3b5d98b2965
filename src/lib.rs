//! A small feed-forward neural network engine: an ordered stack of fully connected layers with
//! batch and single frame inference, backpropagation and gradient descent with momentum.

pub mod arch;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod specs;
pub mod training;

pub use arch::{LayerParams, Mlp, activations::ActFn};
pub use error::{ErrKind, MlpErr, Result};
