//! Chi-squared distribution

use crate::special::{invert_cdf, lower_incomplete_gamma};

pub fn chi_cdf(x: f64, df: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    // P(k/2, x/2)
    lower_incomplete_gamma(df / 2.0, x / 2.0)
}

/// Quantile: the x with `chi_cdf(x, df) = p`, for 0 < p < 1.
pub fn chi_inv(p: f64, df: f64) -> f64 {
    invert_cdf(|x| chi_cdf(x, df), p, 0.0, df.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chi_cdf() {
        // P(χ²₁ ≤ 3.841) ≈ 0.95
        assert!((chi_cdf(3.841, 1.0) - 0.95).abs() < 0.001);
        assert_eq!(chi_cdf(0.0, 3.0), 0.0);
    }

    #[test]
    fn test_chi_inv_matches_tables() {
        assert!((chi_inv(0.95, 1.0) - 3.841).abs() < 0.001);
        assert!((chi_inv(0.95, 3.0) - 7.815).abs() < 0.001);
        assert!((chi_inv(0.99, 10.0) - 23.209).abs() < 0.001);
    }
}
