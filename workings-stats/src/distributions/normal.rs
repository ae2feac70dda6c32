//! Normal distribution

use crate::special::erf;

/// Φ(z)
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

pub fn normal_cdf(x: f64, mean: f64, sd: f64) -> f64 {
    standard_normal_cdf((x - mean) / sd)
}
