//! Structured errors for calculator callers
//!
//! Precondition violations are values, not panics. Each one carries a
//! machine-readable code, a message and, where it helps, a suggestion for
//! fixing the input.

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const INSUFFICIENT_DATA: &str = "INSUFFICIENT_DATA";
    pub const INSUFFICIENT_GROUPS: &str = "INSUFFICIENT_GROUPS";
    pub const INSUFFICIENT_DESIGN: &str = "INSUFFICIENT_DESIGN";
    pub const NO_DATA: &str = "NO_DATA";
    pub const LENGTH_MISMATCH: &str = "LENGTH_MISMATCH";
    pub const MISMATCHED_PAIRS: &str = "MISMATCHED_PAIRS";
    pub const UNBALANCED_DESIGN: &str = "UNBALANCED_DESIGN";
    pub const NON_POSITIVE_EXPECTED: &str = "NON_POSITIVE_EXPECTED";
    pub const NEGATIVE_FREQUENCY: &str = "NEGATIVE_FREQUENCY";
    pub const RANGE_TOO_LARGE: &str = "RANGE_TOO_LARGE";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    // Registry boundary
    pub const ARG_MISSING: &str = "ARG_MISSING";
    pub const ARG_TYPE: &str = "ARG_TYPE";
    pub const UNKNOWN_CALCULATOR: &str = "UNKNOWN_CALCULATOR";
    pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
}

/// Where an error occurred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Calculator that rejected the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculator: Option<String>,

    /// Offending argument
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured error returned by every calculator entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

impl StatsError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            context: None,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set calculator context
    pub fn in_calculator(mut self, name: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.calculator = Some(name.into());
        self
    }

    /// Builder: set argument context
    pub fn for_argument(mut self, arg: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.argument = Some(arg.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    /// True when the error carries the given code
    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    // ========== Common Error Constructors ==========

    pub fn insufficient_data(what: &str, min: usize, got: usize) -> Self {
        Self::new(
            codes::INSUFFICIENT_DATA,
            format!("{} requires at least {} values, got {}", what, min, got),
        )
        .with_suggestion(format!("Provide {} or more observations", min))
    }

    pub fn insufficient_groups(got: usize) -> Self {
        Self::new(
            codes::INSUFFICIENT_GROUPS,
            format!("ANOVA requires at least 2 non-empty groups, got {}", got),
        )
        .with_suggestion("Use a t-test to compare a single pair of means")
    }

    pub fn insufficient_design(details: impl Into<String>) -> Self {
        Self::new(
            codes::INSUFFICIENT_DESIGN,
            format!("Insufficient design: {}", details.into()),
        )
        .with_suggestion("Two-way ANOVA needs at least 2 rows, 2 columns and 2 replicates per cell")
    }

    pub fn no_data() -> Self {
        Self::new(codes::NO_DATA, "No observations supplied")
            .with_suggestion("Provide at least one numeric value")
    }

    pub fn length_mismatch(what: &str, left: usize, right: usize) -> Self {
        Self::new(
            codes::LENGTH_MISMATCH,
            format!("{} must have equal length: {} vs {}", what, left, right),
        )
    }

    pub fn mismatched_pairs(before: usize, after: usize) -> Self {
        Self::new(
            codes::MISMATCHED_PAIRS,
            format!("Paired samples differ in length: {} before vs {} after", before, after),
        )
        .with_suggestion("Each subject needs exactly one before and one after measurement")
    }

    pub fn unbalanced_design(details: impl Into<String>) -> Self {
        Self::new(
            codes::UNBALANCED_DESIGN,
            format!("Unbalanced design: {}", details.into()),
        )
        .with_suggestion("Every cell must hold the same number of replicates")
    }

    pub fn non_positive_expected(position: &str, value: f64) -> Self {
        Self::new(
            codes::NON_POSITIVE_EXPECTED,
            format!("Expected frequency at {} must be positive, got {}", position, value),
        )
        .with_suggestion("Merge sparse categories or remove empty rows and columns")
    }

    pub fn negative_frequency(position: &str, value: f64) -> Self {
        Self::new(
            codes::NEGATIVE_FREQUENCY,
            format!("Observed frequency at {} is negative: {}", position, value),
        )
        .with_suggestion("Frequencies are counts and cannot be negative")
    }

    pub fn range_too_large(max: u64, ceiling: u64) -> Self {
        Self::new(
            codes::RANGE_TOO_LARGE,
            format!(
                "Upper bound {} exceeds the exact-computation ceiling of {}; use the normal approximation (poisson_normal)",
                max, ceiling
            ),
        )
        .with_suggestion("Use the normal approximation (poisson_normal) for large ranges")
    }

    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_INPUT, format!("Invalid input: {}", details.into()))
    }

    pub fn arg_missing(calculator: &str, arg: &str) -> Self {
        Self::new(
            codes::ARG_MISSING,
            format!("{}: missing required argument '{}'", calculator, arg),
        )
        .with_suggestion(format!("Use help('{}') for usage", calculator))
    }

    pub fn arg_type(calculator: &str, arg: &str, expected: &str, got: &str) -> Self {
        Self::new(
            codes::ARG_TYPE,
            format!("{}: argument '{}' expected {}, got {}", calculator, arg, expected, got),
        )
    }

    pub fn unknown_calculator(name: &str) -> Self {
        Self::new(codes::UNKNOWN_CALCULATOR, format!("Unknown calculator: {}", name))
            .with_suggestion("Use list_calculators() to see what is available")
    }
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for StatsError {}

impl From<ConfigError> for StatsError {
    fn from(err: ConfigError) -> Self {
        let arg = match &err {
            ConfigError::Alpha(_) => "alpha",
            ConfigError::Tails(_) => "tails",
            ConfigError::Precision(_) => "precision",
        };
        Self::new(codes::INVALID_CONFIG, err.to_string()).for_argument(arg)
    }
}
