pub fn f(z: f64) -> f64 {
    z.tanh()
}

/// Derivative of the hyperbolic tangent in terms of its output.
pub fn df(y: f64) -> f64 {
    1. - y * y
}
