//! Reject / fail-to-reject decisions
//!
//! Every hypothesis test ends the same way: state the critical value, compare
//! the statistic against it, and record the decision as the last step. When
//! no critical value exists (df beyond the printed tables) the comparison
//! falls back to the p-value.

use crate::tables::{describe_lookup, CriticalValue};
use serde::{Deserialize, Serialize};
use workings_core::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Reject,
    FailToReject,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Reject => "Reject H₀",
            Decision::FailToReject => "Fail to reject H₀",
        }
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Decision::Reject)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Compare a statistic to its critical value, or the p-value to α when no
/// critical value is available.
pub fn decide(statistic: f64, critical: Option<f64>, p_value: f64, alpha: f64, tails: Tails) -> Decision {
    let reject = match critical {
        Some(c) => match tails {
            Tails::Two => statistic.abs() > c,
            Tails::Upper => statistic > c,
            Tails::Lower => statistic < -c,
        },
        None => p_value < alpha,
    };
    if reject {
        Decision::Reject
    } else {
        Decision::FailToReject
    }
}

/// p-value for a statistic given its CDF.
pub fn p_value(statistic: f64, tails: Tails, cdf: impl Fn(f64) -> f64) -> f64 {
    let p = match tails {
        Tails::Two => 2.0 * (1.0 - cdf(statistic.abs())),
        Tails::Upper => 1.0 - cdf(statistic),
        Tails::Lower => cdf(statistic),
    };
    p.clamp(0.0, 1.0)
}

/// Outcome recorded on every test result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub critical_value: Option<f64>,
    pub p_value: f64,
    pub decision: Decision,
}

/// Everything the closing steps need to know about a test statistic
pub struct TestStatistic<'a> {
    /// Display symbol: "t", "F", "χ²"
    pub symbol: &'a str,
    /// Table name for the lookup narrative
    pub table: &'a str,
    pub value: f64,
    pub df: String,
    pub tails: Tails,
    pub lookup: Option<CriticalValue>,
    pub p_value: f64,
    /// Distinguishes the effects of a multi-test design ("rows", "interaction")
    pub effect: Option<&'a str>,
}

pub fn hypotheses_step(h0: &str, h1: &str, config: &CalcConfig) -> Step {
    Step::new("hypotheses", "Hypotheses")
        .with_description(format!("H₀: {}\nH₁: {}", h0, h1))
        .with_note(format!("α = {}", num(config.alpha, config.precision)))
}

fn suffixed(base: &str, effect: Option<&str>) -> String {
    match effect {
        Some(e) => format!("{}_{}", base, e),
        None => base.to_string(),
    }
}

fn titled(base: &str, effect: Option<&str>) -> String {
    match effect {
        Some(e) => format!("{} ({})", base, e),
        None => base.to_string(),
    }
}

fn push_critical_step(trace: &mut Trace, test: &TestStatistic<'_>, config: &CalcConfig) -> Option<f64> {
    let p = config.precision;
    let tail_area = test.tails.tail_area(config.alpha);
    let critical = test.lookup.map(|c| c.value);

    let formula = match test.tails {
        Tails::Two => format!("{}(α/2, df)", test.symbol),
        Tails::Upper | Tails::Lower => format!("{}(α, df)", test.symbol),
    };
    trace.push(
        Step::new(suffixed("critical_value", test.effect), titled("Critical value", test.effect))
            .with_description(format!(
                "{} test at α = {}, df = {}",
                test.tails.label(),
                num(config.alpha, p),
                test.df
            ))
            .with_formula(formula)
            .with_calculation(describe_lookup(test.table, &test.df, tail_area, test.lookup.as_ref(), p))
            .with_result(match critical {
                Some(c) => num(c, p),
                None => "unavailable".to_string(),
            }),
    );
    critical
}

/// Push the critical value and decision steps and return the outcome.
pub fn conclude(trace: &mut Trace, test: TestStatistic<'_>, config: &CalcConfig) -> Outcome {
    let p = config.precision;
    let critical = push_critical_step(trace, &test, config);

    let decision = decide(test.value, critical, test.p_value, config.alpha, test.tails);
    let (lhs, rhs) = match (critical, test.tails) {
        (Some(c), Tails::Two) => (format!("|{}| = {}", test.symbol, num(test.value.abs(), p)), num(c, p)),
        (Some(c), Tails::Upper) => (format!("{} = {}", test.symbol, num(test.value, p)), num(c, p)),
        (Some(c), Tails::Lower) => (format!("{} = {}", test.symbol, num(test.value, p)), num(-c, p)),
        (None, _) => (format!("p = {}", num(test.p_value, p)), format!("α = {}", num(config.alpha, p))),
    };
    let comparison = match (critical, test.tails, decision) {
        (Some(_), Tails::Lower, Decision::Reject) | (None, _, Decision::Reject) => "<",
        (Some(_), Tails::Lower, Decision::FailToReject) | (None, _, Decision::FailToReject) => "≥",
        (Some(_), _, Decision::Reject) => ">",
        (Some(_), _, Decision::FailToReject) => "≤",
    };

    let mut step = Step::new(suffixed("decision", test.effect), titled("Decision", test.effect))
        .with_calculation(format!("{} {} {}", lhs, comparison, rhs))
        .with_note(format!("p-value = {}", num(test.p_value, p)));
    if critical.is_none() {
        step = step.add_note("No tabulated critical value for this df; decided by comparing the p-value with α.");
    }
    trace.push(step.with_result(decision.label()));

    Outcome {
        critical_value: critical,
        p_value: test.p_value,
        decision,
    }
}

/// Close a test whose statistic is unbounded because its standard error is
/// zero while the effect is not: H₀ is rejected with p = 0.
pub fn conclude_exact(trace: &mut Trace, test: TestStatistic<'_>, reason: &str, config: &CalcConfig) -> Outcome {
    let critical = push_critical_step(trace, &test, config);
    trace.push(
        Step::new(suffixed("decision", test.effect), titled("Decision", test.effect))
            .with_calculation(format!("p = 0 < α = {}", num(config.alpha, config.precision)))
            .with_note(reason)
            .with_result(Decision::Reject.label()),
    );
    Outcome {
        critical_value: critical,
        p_value: 0.0,
        decision: Decision::Reject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::LookupMethod;

    fn crit(value: f64) -> Option<CriticalValue> {
        Some(CriticalValue { value, method: LookupMethod::Table })
    }

    #[test]
    fn test_decide_two_tailed() {
        assert_eq!(decide(-2.5, Some(2.306), 0.03, 0.05, Tails::Two), Decision::Reject);
        assert_eq!(decide(2.306, Some(2.306), 0.05, 0.05, Tails::Two), Decision::FailToReject);
    }

    #[test]
    fn test_decide_one_tailed() {
        assert_eq!(decide(2.0, Some(1.86), 0.04, 0.05, Tails::Upper), Decision::Reject);
        assert_eq!(decide(-2.0, Some(1.86), 0.96, 0.05, Tails::Upper), Decision::FailToReject);
        assert_eq!(decide(-2.0, Some(1.86), 0.04, 0.05, Tails::Lower), Decision::Reject);
    }

    #[test]
    fn test_decide_falls_back_to_p_value() {
        assert_eq!(decide(10.0, None, 0.001, 0.05, Tails::Upper), Decision::Reject);
        assert_eq!(decide(10.0, None, 0.2, 0.05, Tails::Upper), Decision::FailToReject);
    }

    #[test]
    fn test_p_value_tails() {
        let cdf = |x: f64| crate::distributions::standard_normal_cdf(x);
        assert!((p_value(1.96, Tails::Two, cdf) - 0.05).abs() < 0.001);
        assert!((p_value(1.645, Tails::Upper, cdf) - 0.05).abs() < 0.001);
        assert!((p_value(-1.645, Tails::Lower, cdf) - 0.05).abs() < 0.001);
    }

    #[test]
    fn test_conclude_appends_decision_last() {
        let mut trace = Trace::new();
        let config = CalcConfig::default();
        let outcome = conclude(
            &mut trace,
            TestStatistic {
                symbol: "t",
                table: "t",
                value: 3.0,
                df: "8".to_string(),
                tails: Tails::Two,
                lookup: crit(2.306),
                p_value: 0.017,
                effect: None,
            },
            &config,
        );
        assert_eq!(outcome.decision, Decision::Reject);
        let result = trace.finish((), "", Value::Null);
        let last = result.last_step().unwrap();
        assert_eq!(last.id, "decision");
        assert_eq!(last.result.as_deref(), Some("Reject H₀"));
        assert_eq!(last.calculation.as_deref(), Some("|t| = 3 > 2.306"));
    }

    #[test]
    fn test_conclude_without_critical_value_notes_fallback() {
        let mut trace = Trace::new();
        let outcome = conclude(
            &mut trace,
            TestStatistic {
                symbol: "χ²",
                table: "chi-square",
                value: 150.0,
                df: "150".to_string(),
                tails: Tails::Upper,
                lookup: None,
                p_value: 0.4,
                effect: Some("rows"),
            },
            &CalcConfig::default(),
        );
        assert_eq!(outcome.critical_value, None);
        let result = trace.finish((), "", Value::Null);
        assert_eq!(result.steps[0].id, "critical_value_rows");
        assert_eq!(result.steps[0].result.as_deref(), Some("unavailable"));
        let last = result.last_step().unwrap();
        assert_eq!(last.id, "decision_rows");
        assert_eq!(last.result.as_deref(), Some("Fail to reject H₀"));
        assert!(last.note.as_deref().unwrap().contains("p-value"));
    }

    #[test]
    fn test_conclude_exact_rejects_with_zero_p() {
        let mut trace = Trace::new();
        let outcome = conclude_exact(
            &mut trace,
            TestStatistic {
                symbol: "t",
                table: "t",
                value: 0.0,
                df: "1".to_string(),
                tails: Tails::Two,
                lookup: crit(12.706),
                p_value: 1.0,
                effect: None,
            },
            "Exact fit",
            &CalcConfig::default(),
        );
        assert_eq!(outcome.decision, Decision::Reject);
        assert_eq!(outcome.p_value, 0.0);
        assert_eq!(outcome.critical_value, Some(12.706));
        let result = trace.finish((), "", Value::Null);
        assert_eq!(result.steps[0].id, "critical_value");
        let last = result.last_step().unwrap();
        assert_eq!(last.calculation.as_deref(), Some("p = 0 < α = 0.05"));
        assert_eq!(last.note.as_deref(), Some("Exact fit"));
    }
}
