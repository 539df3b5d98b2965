mod dataset;
mod sgd;

pub use dataset::Dataset;
pub use sgd::Sgd;
