//! Workings Core - Fundamental types
//!
//! This crate provides the core types used throughout Workings:
//! - `Value`: dynamic values at the calculator boundary
//! - `Step`, `Trace`, `CalculationResult`: the narrated derivation
//! - `StatsError`: structured errors with machine-readable codes
//! - `CalcConfig`: significance level, tails and display precision

mod config;
mod error;
pub mod format;
mod trace;
mod value;

pub use config::{CalcConfig, ConfigError, Tails, MAX_PRECISION};
pub use error::{codes, ErrorContext, StatsError};
pub use trace::{CalculationResult, Step, Trace};
pub use value::Value;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::codes;
    pub use crate::format::{num, num_list, paren, sum_terms};
    pub use crate::{CalcConfig, CalculationResult, StatsError, Step, Tails, Trace, Value};
}
