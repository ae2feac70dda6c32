//! F distribution

use crate::special::{invert_cdf, regularized_incomplete_beta};

pub fn f_cdf(x: f64, d1: f64, d2: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    // I_{d1·x/(d1·x+d2)}(d1/2, d2/2)
    let z = d1 * x / (d1 * x + d2);
    regularized_incomplete_beta(d1 / 2.0, d2 / 2.0, z)
}

/// Quantile: the x with `f_cdf(x, d1, d2) = p`, for 0 < p < 1.
pub fn f_inv(p: f64, d1: f64, d2: f64) -> f64 {
    invert_cdf(|x| f_cdf(x, d1, d2), p, 0.0, 2.0)
}
