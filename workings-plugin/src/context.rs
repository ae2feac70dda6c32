//! Calculation context

use crate::args;
use workings_core::{CalcConfig, ConfigError, StatsError, Tails, Value};

/// Context passed to calculator plugins
#[derive(Debug, Clone, Default)]
pub struct CalcContext {
    pub config: CalcConfig,
}

impl CalcContext {
    pub fn new(config: CalcConfig) -> Self {
        Self { config }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Result<Self, StatsError> {
        self.config = self.config.with_alpha(alpha)?;
        Ok(self)
    }

    pub fn with_tails(mut self, tails: Tails) -> Self {
        self.config = self.config.with_tails(tails);
        self
    }

    pub fn with_precision(mut self, precision: i64) -> Result<Self, StatsError> {
        self.config = self.config.with_precision(precision)?;
        Ok(self)
    }

    /// Context config with any `alpha`, `tails` or `precision` found in the
    /// call arguments applied on top.
    pub fn config_for(&self, call_args: &Value) -> Result<CalcConfig, StatsError> {
        let mut config = self.config;
        if let Some(alpha) = args::opt_number(call_args, "alpha")? {
            config = config.with_alpha(alpha)?;
        }
        match call_args.get("tails") {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) => {
                if n.fract() != 0.0 || !n.is_finite() {
                    return Err(ConfigError::Tails(n.to_string()).into());
                }
                config = config.with_tails(Tails::from_count(*n as i64)?);
            }
            Some(Value::Text(s)) => config = config.with_tails(s.parse()?),
            Some(other) => {
                return Err(args::InputError::WrongType {
                    arg: "tails".to_string(),
                    expected: "1, 2 or a tail name",
                    got: other.type_name(),
                }
                .into());
            }
        }
        if let Some(precision) = args::opt_number(call_args, "precision")? {
            config = config.with_precision(precision as i64)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overrides_from_args() {
        let ctx = CalcContext::default();
        let args = Value::from(json!({"alpha": 0.01, "tails": 1, "precision": 2}));
        let config = ctx.config_for(&args).unwrap();
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.tails, Tails::Upper);
        assert_eq!(config.precision, 2);
    }

    #[test]
    fn test_no_overrides_keeps_context() {
        let ctx = CalcContext::default().with_tails(Tails::Lower);
        let config = ctx.config_for(&Value::from(json!({}))).unwrap();
        assert_eq!(config.tails, Tails::Lower);
        assert_eq!(config.alpha, 0.05);
    }

    #[test]
    fn test_bad_alpha_rejected() {
        let ctx = CalcContext::default();
        let err = ctx.config_for(&Value::from(json!({"alpha": 2}))).unwrap_err();
        assert_eq!(err.code, workings_core::codes::INVALID_CONFIG);
    }

    #[test]
    fn test_fractional_tails_rejected() {
        let ctx = CalcContext::default();
        let err = ctx.config_for(&Value::from(json!({"tails": 1.5}))).unwrap_err();
        assert_eq!(err.code, workings_core::codes::INVALID_CONFIG);
        assert_eq!(err.context.and_then(|c| c.argument).as_deref(), Some("tails"));
        let config = ctx.config_for(&Value::from(json!({"tails": 2.0}))).unwrap();
        assert_eq!(config.tails, Tails::Two);
    }
}
