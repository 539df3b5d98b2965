mod momentum;

pub use momentum::Momentum;
