//! Workings - statistics calculators that show their working
//!
//! ```ignore
//! let workings = Workings::with_standard_library();
//! let answer = workings.calculate_json("one_way_anova", &json!({"groups": [[1, 2, 3], [4, 5, 6]]}))?;
//! println!("{}", answer.markdown);
//! ```

mod render;

pub use render::Renderer;
pub use workings_core::{CalcConfig, CalculationResult, StatsError, Step, Tails, Value};
pub use workings_plugin::{CalcContext, CalculatorRegistry};
pub use workings_stats as stats;

use serde::Serialize;
use std::sync::Arc;

/// A finished calculation: structured result plus its answer sheet
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub calculator: String,
    pub result: CalculationResult<Value>,
    pub markdown: String,
}

/// Main Workings engine
pub struct Workings {
    registry: Arc<CalculatorRegistry>,
    config: CalcConfig,
}

impl Workings {
    pub fn new(registry: CalculatorRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            config: CalcConfig::default(),
        }
    }

    pub fn with_standard_library() -> Self {
        Self::new(workings_stats::standard_registry())
    }

    pub fn with_config(mut self, config: CalcConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CalcConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<CalculatorRegistry> {
        self.registry.clone()
    }

    /// Run a calculator by name with named arguments.
    pub fn calculate(&self, name: &str, args: &Value) -> Result<Answer, StatsError> {
        let ctx = CalcContext::new(self.config);
        let result = self.registry.call(name, args, &ctx)?;
        // Per-call precision overrides apply to the rendered inputs too
        let precision = ctx.config_for(args).map(|c| c.precision).unwrap_or(self.config.precision);
        let title = self
            .registry
            .get(name)
            .map(|c| c.meta().description)
            .unwrap_or(name);
        let markdown = Renderer::new().with_precision(precision).render(title, &result);
        tracing::debug!(calculator = name, steps = result.steps.len(), "calculation complete");
        Ok(Answer {
            calculator: name.to_lowercase(),
            result,
            markdown,
        })
    }

    pub fn calculate_json(&self, name: &str, args: &serde_json::Value) -> Result<Answer, StatsError> {
        self.calculate(name, &Value::from(args.clone()))
    }

    pub fn help(&self, name: Option<&str>) -> Result<Value, StatsError> {
        self.registry.help(name)
    }

    pub fn list_calculators(&self, category: Option<&str>) -> Value {
        self.registry.list(category)
    }
}

impl Default for Workings {
    fn default() -> Self {
        Self::with_standard_library()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use workings_core::codes;

    fn engine() -> Workings {
        Workings::with_standard_library()
    }

    fn number(answer: &Answer, key: &str) -> f64 {
        answer.result.value.get(key).and_then(Value::as_number).unwrap()
    }

    fn last_result(answer: &Answer) -> &str {
        answer.result.last_step().and_then(|s| s.result.as_deref()).unwrap()
    }

    #[test]
    fn test_one_way_scenario() {
        let a = engine()
            .calculate_json("one_way_anova", &json!({"groups": [[1, 2, 3], [4, 5, 6], [7, 8, 9]]}))
            .unwrap();
        assert_eq!(number(&a, "df_between"), 2.0);
        assert_eq!(number(&a, "df_within"), 6.0);
        assert!((number(&a, "ss_between") - 54.0).abs() < 1e-9);
        assert!((number(&a, "ss_within") - 6.0).abs() < 1e-9);
        assert!((number(&a, "f_stat") - 27.0).abs() < 1e-9);
        assert_eq!(last_result(&a), "Reject H₀");
        assert!(a.markdown.contains("**Answer:** Reject H₀"));
    }

    #[test]
    fn test_independent_t_scenario() {
        let w = engine();
        let ab = w
            .calculate_json("t_test_independent", &json!({"sample1": [2, 4, 6, 8], "sample2": [1, 3, 5, 7]}))
            .unwrap();
        let ba = w
            .calculate_json("t_test_independent", &json!({"sample1": [1, 3, 5, 7], "sample2": [2, 4, 6, 8]}))
            .unwrap();
        assert_eq!(number(&ab, "pooled_variance"), number(&ba, "pooled_variance"));
        assert!((number(&ab, "t_stat") + number(&ba, "t_stat")).abs() < 1e-12);
    }

    #[test]
    fn test_hypergeometric_scenario() {
        let a = engine()
            .calculate_json(
                "hypergeometric",
                &json!({"population": 52, "successes": 13, "draws": 5, "observed": 2}),
            )
            .unwrap();
        assert!((number(&a, "probability") - 0.2743).abs() < 1e-4);
    }

    #[test]
    fn test_poisson_scenario() {
        let w = engine();
        for name in ["poisson_exact", "poisson_normal"] {
            let a = w.calculate_json(name, &json!({"lambda": 3.5, "min": 2, "max": 4})).unwrap();
            let p = number(&a, "probability");
            assert!((0.0..=1.0).contains(&p), "{} gave {}", name, p);
        }
        let err = w
            .calculate_json("poisson_exact", &json!({"lambda": 3.5, "min": 2, "max": 200}))
            .unwrap_err();
        assert!(err.is(codes::RANGE_TOO_LARGE));
    }

    #[test]
    fn test_goodness_of_fit_scenario() {
        let a = engine()
            .calculate_json(
                "chi_square_goodness_of_fit",
                &json!({"observed": [20, 30, 25, 25], "expected": [25, 25, 25, 25]}),
            )
            .unwrap();
        assert_eq!(number(&a, "df"), 3.0);
        assert!((number(&a, "chi_square") - 2.0).abs() < 1e-12);
        assert_eq!(last_result(&a), "Fail to reject H₀");
    }

    #[test]
    fn test_regression_scenario() {
        let w = engine();
        let a = w
            .calculate_json("linear_regression", &json!({"x": [1, 2, 3, 4, 5], "y": [2, 4, 5, 4, 5]}))
            .unwrap();
        assert!((number(&a, "slope") - 0.6).abs() < 1e-12);
        assert!((number(&a, "intercept") - 2.2).abs() < 1e-12);
        assert!((number(&a, "r") - 0.7746).abs() < 1e-4);
        assert!((number(&a, "r_squared") - 0.6).abs() < 1e-12);

        let flat = w
            .calculate_json("linear_regression", &json!({"x": [3, 3, 3], "y": [1, 2, 3]}))
            .unwrap();
        for key in ["slope", "r", "t_stat"] {
            assert_eq!(number(&flat, key), 0.0);
        }
    }

    #[test]
    fn test_numeric_step_results_round_trip() {
        let w = engine();
        let tolerance = 10f64.powi(-(w.config().precision as i32));
        let cases = [
            ("linear_regression", json!({"x": [1, 2, 3, 4, 5], "y": [2, 4, 5, 4, 5]}), "correlation", "r"),
            ("linear_regression", json!({"x": [1, 2, 3, 4, 5], "y": [2, 4, 5, 4, 5]}), "t_statistic", "t_stat"),
            ("one_way_anova", json!({"groups": [[3, 5, 4], [8, 6, 7, 9]]}), "f_statistic", "f_stat"),
            ("descriptive", json!({"data": [1, 2, 4]}), "mean", "mean"),
        ];
        for (name, args, step, field) in cases {
            let a = w.calculate_json(name, &args).unwrap();
            let shown: f64 = a.result.step(step).and_then(|s| s.result.as_deref()).unwrap().parse().unwrap();
            assert!((shown - number(&a, field)).abs() <= tolerance, "{}.{}", name, step);
        }
    }

    #[test]
    fn test_idempotent() {
        let w = engine();
        let args = json!({"cells": [[[4, 5], [6, 7]], [[8, 9], [5, 6]]]});
        let first = w.calculate_json("two_way_anova", &args).unwrap();
        let second = w.calculate_json("two_way_anova", &args).unwrap();
        assert_eq!(first.result, second.result);
        assert_eq!(first.markdown, second.markdown);
    }

    #[test]
    fn test_per_call_overrides() {
        let w = engine();
        let a = w
            .calculate_json(
                "t_test_one_sample",
                &json!({"data": [10, 12, 14, 16, 18], "mu": 6, "tails": 1, "alpha": 0.01, "precision": 2}),
            )
            .unwrap();
        assert_eq!(a.result.value.get("critical_value").and_then(Value::as_number), Some(3.747));
        assert_eq!(a.result.step("t_statistic").and_then(|s| s.result.as_deref()), Some("5.66"));
    }

    #[test]
    fn test_engine_config() {
        let config = CalcConfig::default().with_alpha(0.01).unwrap();
        let w = Workings::with_standard_library().with_config(config);
        let a = w
            .calculate_json("chi_square_independence", &json!({"observed": [[10, 20], [20, 10]]}))
            .unwrap();
        assert_eq!(a.result.value.get("critical_value").and_then(Value::as_number), Some(6.635));
        assert_eq!(last_result(&a), "Reject H₀");
    }

    #[test]
    fn test_unknown_calculator_suggests() {
        let err = engine().calculate_json("one_way_anva", &json!({})).unwrap_err();
        assert!(err.is(codes::UNKNOWN_CALCULATOR));
        assert!(err.suggestion.unwrap().contains("one_way_anova"));
    }

    #[test]
    fn test_missing_argument() {
        let err = engine().calculate_json("descriptive", &json!({})).unwrap_err();
        assert!(err.is(codes::ARG_MISSING));
        let ctx = err.context.unwrap();
        assert_eq!(ctx.argument.as_deref(), Some("data"));
        assert_eq!(ctx.calculator.as_deref(), Some("descriptive"));
    }

    #[test]
    fn test_help_and_list() {
        let w = engine();
        assert!(matches!(w.help(None).unwrap(), Value::Object(_)));
        let help = w.help(Some("box_plot")).unwrap();
        assert_eq!(help.get("name").and_then(Value::as_text), Some("box_plot"));
        match w.list_calculators(Some("t_tests")) {
            Value::List(items) => assert_eq!(items.len(), 4),
            other => panic!("expected a list, got {}", other),
        }
    }
}
