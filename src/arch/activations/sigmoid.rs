/// The logistic function.
pub fn f(z: f64) -> f64 {
    1. / (1. + (-z).exp())
}

/// Derivative of the logistic function in terms of its output.
pub fn df(y: f64) -> f64 {
    y * (1. - y)
}
