//! Per-call calculation settings

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Largest number of decimal places a trace will print
pub const MAX_PRECISION: usize = 12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("alpha must lie strictly between 0 and 1, got {0}")]
    Alpha(f64),
    #[error("unknown tails setting '{0}' (use 1, 2, two, upper or lower)")]
    Tails(String),
    #[error("precision must be between 0 and {MAX_PRECISION}, got {0}")]
    Precision(i64),
}

/// Which tail(s) of the sampling distribution hold the rejection region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tails {
    /// Reject when |statistic| exceeds the α/2 critical value
    Two,
    /// Reject when the statistic exceeds the α critical value
    Upper,
    /// Reject when the statistic is below the negated α critical value
    Lower,
}

impl Tails {
    /// Numeric form used by exam sheets: 1 or 2 tails.
    pub fn from_count(count: i64) -> Result<Self, ConfigError> {
        match count {
            1 => Ok(Tails::Upper),
            2 => Ok(Tails::Two),
            other => Err(ConfigError::Tails(other.to_string())),
        }
    }

    /// Tail area used to look up the critical value.
    pub fn tail_area(&self, alpha: f64) -> f64 {
        match self {
            Tails::Two => alpha / 2.0,
            Tails::Upper | Tails::Lower => alpha,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tails::Two => "two-tailed",
            Tails::Upper => "upper-tailed",
            Tails::Lower => "lower-tailed",
        }
    }
}

impl FromStr for Tails {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "2" | "two" | "both" | "two-tailed" => Ok(Tails::Two),
            "1" | "upper" | "right" | "greater" => Ok(Tails::Upper),
            "lower" | "left" | "less" => Ok(Tails::Lower),
            other => Err(ConfigError::Tails(other.to_string())),
        }
    }
}

impl std::fmt::Display for Tails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Significance level, tails and display precision for one calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalcConfig {
    pub alpha: f64,
    pub tails: Tails,
    /// Decimal places used in trace strings
    pub precision: usize,
}

impl CalcConfig {
    pub fn new() -> Self {
        Self {
            alpha: 0.05,
            tails: Tails::Two,
            precision: 4,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Result<Self, ConfigError> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::Alpha(alpha));
        }
        self.alpha = alpha;
        Ok(self)
    }

    pub fn with_tails(mut self, tails: Tails) -> Self {
        self.tails = tails;
        self
    }

    pub fn with_precision(mut self, precision: i64) -> Result<Self, ConfigError> {
        if !(0..=MAX_PRECISION as i64).contains(&precision) {
            return Err(ConfigError::Precision(precision));
        }
        self.precision = precision as usize;
        Ok(self)
    }
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self::new()
    }
}
