//! Numeric primitives shared by every calculator
//!
//! Minimum sample sizes are the caller's business: an empty slice is an
//! error here, but a single observation has a variance of 0.

use crate::distributions::standard_normal_cdf;
use dashu_int::ops::BitTest;
use dashu_int::UBig;
use serde::Serialize;
use workings_core::StatsError;

/// Largest n whose factorial is finite in f64
pub const FACTORIAL_CEILING: u64 = 170;

pub fn sum(xs: &[f64]) -> f64 {
    xs.iter().sum()
}

/// Σx²
pub fn sum_of_squares(xs: &[f64]) -> f64 {
    xs.iter().map(|x| x * x).sum()
}

/// Σ(x − m)²
pub fn sum_sq_dev(xs: &[f64], m: f64) -> f64 {
    xs.iter().map(|x| (x - m) * (x - m)).sum()
}

pub fn mean(xs: &[f64]) -> Result<f64, StatsError> {
    if xs.is_empty() {
        return Err(StatsError::no_data());
    }
    Ok(sum(xs) / xs.len() as f64)
}

/// Sample variance with divisor n − 1; 0 for a single observation.
pub fn sample_variance(xs: &[f64]) -> Result<f64, StatsError> {
    if xs.is_empty() {
        return Err(StatsError::insufficient_data("Variance", 1, 0));
    }
    if xs.len() == 1 {
        return Ok(0.0);
    }
    let m = mean(xs)?;
    Ok(sum_sq_dev(xs, m) / (xs.len() - 1) as f64)
}

pub fn sample_std_dev(xs: &[f64]) -> Result<f64, StatsError> {
    sample_variance(xs).map(f64::sqrt)
}

/// Population variance with divisor n.
pub fn population_variance(xs: &[f64]) -> Result<f64, StatsError> {
    if xs.is_empty() {
        return Err(StatsError::insufficient_data("Variance", 1, 0));
    }
    let m = mean(xs)?;
    Ok(sum_sq_dev(xs, m) / xs.len() as f64)
}

/// Sorted copy (total order, NaN last)
pub fn sorted(xs: &[f64]) -> Vec<f64> {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Median of already-sorted data; `None` when empty.
pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

// ========== Combinatorics ==========

/// n!; `None` for negative n or beyond the f64 ceiling.
pub fn factorial(n: i64) -> Option<f64> {
    if n < 0 || n as u64 > FACTORIAL_CEILING {
        return None;
    }
    Some((2..=n).fold(1.0, |acc, k| acc * k as f64))
}

/// ln(k!)
pub fn ln_factorial(k: u64) -> f64 {
    (2..=k).map(|i| (i as f64).ln()).sum()
}

/// nPr = n!/(n−r)!; `None` when r > n, either is negative, or the
/// result overflows.
pub fn permutation(n: i64, r: i64) -> Option<f64> {
    if n < 0 || r < 0 || r > n {
        return None;
    }
    let p = ((n - r + 1)..=n).fold(1.0, |acc, k| acc * k as f64);
    p.is_finite().then_some(p)
}

/// nCr as an exact integer; `None` when r > n.
pub fn binomial(n: u64, r: u64) -> Option<UBig> {
    if r > n {
        return None;
    }
    let r = r.min(n - r);
    let mut c = UBig::ONE;
    for i in 1..=r {
        // Each partial product is itself a binomial coefficient, so the division is exact
        c = c * UBig::from(n - r + i) / UBig::from(i);
    }
    Some(c)
}

/// nCr as f64; `None` when undefined or not representable.
pub fn combination(n: i64, r: i64) -> Option<f64> {
    if n < 0 || r < 0 {
        return None;
    }
    binomial(n as u64, r as u64).and_then(|c| big_to_f64(&c))
}

/// Top 53 bits as a float plus the binary exponent that was shifted out.
fn split(x: &UBig) -> Option<(f64, i32)> {
    let bits = x.bit_len();
    if bits <= 53 {
        let v: u64 = x.clone().try_into().ok()?;
        return Some((v as f64, 0));
    }
    let extra_bits = bits - 53;
    let shifted = x >> extra_bits;
    let v: u64 = shifted.try_into().ok()?;
    Some((v as f64, extra_bits as i32))
}

pub fn big_to_f64(x: &UBig) -> Option<f64> {
    let (m, e) = split(x)?;
    let f = m * 2f64.powi(e);
    f.is_finite().then_some(f)
}

/// num / den for big integers without overflowing either side.
pub fn ratio_to_f64(num: &UBig, den: &UBig) -> Option<f64> {
    if *den == UBig::ZERO {
        return None;
    }
    let (mn, en) = split(num)?;
    let (md, ed) = split(den)?;
    Some(mn / md * 2f64.powi(en - ed))
}

// ========== Normal approximation ==========

/// Continuity-corrected normal probability for an integer range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalRange {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub z_lower: f64,
    pub z_upper: f64,
    pub probability: f64,
}

/// P(min ≤ X ≤ max) ≈ Φ((max + 0.5 − μ)/σ) − Φ((min − 0.5 − μ)/σ)
pub fn continuity_corrected_range(min: u64, max: u64, mean: f64, sd: f64) -> NormalRange {
    let lower_bound = min as f64 - 0.5;
    let upper_bound = max as f64 + 0.5;
    let z_lower = (lower_bound - mean) / sd;
    let z_upper = (upper_bound - mean) / sd;
    let probability = (standard_normal_cdf(z_upper) - standard_normal_cdf(z_lower)).clamp(0.0, 1.0);
    NormalRange {
        lower_bound,
        upper_bound,
        z_lower,
        z_upper,
        probability,
    }
}
