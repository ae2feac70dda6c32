//! Student's t distribution

use crate::special::{invert_cdf, regularized_incomplete_beta};

pub fn t_cdf(x: f64, df: f64) -> f64 {
    let t2 = x * x;
    let p = df / (df + t2);

    if x >= 0.0 {
        1.0 - 0.5 * regularized_incomplete_beta(df / 2.0, 0.5, p)
    } else {
        0.5 * regularized_incomplete_beta(df / 2.0, 0.5, p)
    }
}

/// Quantile: the t with `t_cdf(t, df) = p`, for 0 < p < 1.
pub fn t_inv(p: f64, df: f64) -> f64 {
    if p < 0.5 {
        return -t_inv(1.0 - p, df);
    }
    if p == 0.5 {
        return 0.0;
    }
    invert_cdf(|x| t_cdf(x, df), p, 0.0, 4.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_cdf_zero() {
        assert!((t_cdf(0.0, 10.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_t_inv_matches_tables() {
        assert!((t_inv(0.975, 1.0) - 12.706).abs() < 0.001);
        assert!((t_inv(0.975, 8.0) - 2.306).abs() < 0.001);
        assert!((t_inv(0.95, 30.0) - 1.697).abs() < 0.001);
        assert!((t_inv(0.025, 8.0) + 2.306).abs() < 0.001);
    }

    #[test]
    fn test_t_inv_round_trip() {
        let t = t_inv(0.9, 12.0);
        assert!((t_cdf(t, 12.0) - 0.9).abs() < 1e-9);
    }
}
