mod act_fn;
mod identity;
mod relu;
mod sigmoid;
mod tanh;

pub use act_fn::ActFn;
