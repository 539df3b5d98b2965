pub fn f(z: f64) -> f64 {
    z.max(0.)
}

/// The derivative at the kink is taken as 0.
pub fn df(y: f64) -> f64 {
    if y > 0. { 1. } else { 0. }
}
