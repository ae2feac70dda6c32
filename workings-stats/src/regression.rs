//! Simple linear regression by ordinary least squares
//!
//! Everything is built from the corrected sums Sxx, Syy and Sxy. A constant x
//! (or y) degrades to zeros instead of NaN. A non-zero slope with no residual
//! error is an exact fit: t is unbounded and H₀ is rejected with p = 0.

use crate::decision::{self, conclude, conclude_exact, hypotheses_step, Outcome, TestStatistic};
use crate::distributions::t_cdf;
use crate::primitives::{mean, sum_sq_dev};
use crate::tables::T_TABLE;
use serde::Serialize;
use workings_plugin::prelude::*;

/// Residual SS at or below this share of Syy counts as an exact fit
const EXACT_FIT_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    pub n: usize,
    pub mean_x: f64,
    pub mean_y: f64,
    pub sxx: f64,
    pub syy: f64,
    pub sxy: f64,
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub r_squared: f64,
    pub sse: f64,
    pub standard_error: f64,
    pub slope_se: f64,
    pub t_stat: f64,
    pub df: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

pub fn linear_regression(x: &[f64], y: &[f64], config: &CalcConfig) -> Result<CalculationResult<RegressionResult>, StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::length_mismatch("x and y", x.len(), y.len()));
    }
    let n = x.len();
    if n < 3 {
        return Err(StatsError::insufficient_data("Linear regression", 3, n));
    }
    let p = config.precision;
    let inputs = Value::object([("x", Value::from(x)), ("y", Value::from(y))]);
    let mut trace = Trace::new();
    trace.push(hypotheses_step("β = 0 (no linear relationship)", "β ≠ 0", config));

    let mx = mean(x)?;
    let my = mean(y)?;
    trace.push(
        Step::new("means", "Means")
            .with_formula("x̄ = Σx/n, ȳ = Σy/n")
            .with_result(format!("x̄ = {}, ȳ = {}", num(mx, p), num(my, p))),
    );

    let sxx = sum_sq_dev(x, mx);
    let syy = sum_sq_dev(y, my);
    let sxy: f64 = x.iter().zip(y).map(|(xi, yi)| (xi - mx) * (yi - my)).sum();
    trace.push(
        Step::new("sums_of_squares", "Corrected sums of squares and products")
            .with_formula("Sxx = Σ(x − x̄)², Syy = Σ(y − ȳ)², Sxy = Σ(x − x̄)(y − ȳ)")
            .with_result(format!("Sxx = {}, Syy = {}, Sxy = {}", num(sxx, p), num(syy, p), num(sxy, p))),
    );

    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    let mut slope_step = Step::new("slope", "Slope")
        .with_formula("b = Sxy/Sxx")
        .with_calculation(format!("{}/{}", num(sxy, p), num(sxx, p)))
        .with_result(num(slope, p));
    if sxx == 0.0 {
        slope_step = slope_step.with_note("x has no variation, so the slope is reported as 0");
    }
    trace.push(slope_step);

    let intercept = my - slope * mx;
    trace.push(
        Step::new("intercept", "Intercept")
            .with_formula("a = ȳ − b·x̄")
            .with_calculation(format!("{} − {} × {}", num(my, p), paren(slope, p), paren(mx, p)))
            .with_result(num(intercept, p)),
    );

    let r = if sxx > 0.0 && syy > 0.0 { sxy / (sxx * syy).sqrt() } else { 0.0 };
    trace.push(
        Step::new("correlation", "Correlation coefficient")
            .with_formula("r = Sxy/√(Sxx·Syy)")
            .with_calculation(format!("{}/√({} × {})", num(sxy, p), num(sxx, p), num(syy, p)))
            .with_result(num(r, p)),
    );

    let r_squared = r * r;
    trace.push(
        Step::new("r_squared", "Coefficient of determination")
            .with_formula("r²")
            .with_calculation(format!("{}²", paren(r, p)))
            .with_result(num(r_squared, p)),
    );

    let df = n - 2;
    let sse = (syy - slope * sxy).max(0.0);
    let see = (sse / df as f64).sqrt();
    trace.push(
        Step::new("standard_error", "Standard error of estimate")
            .with_formula("SSE = Syy − b·Sxy, SEE = √(SSE/(n − 2))")
            .with_calculation(format!(
                "SSE = {} − {} × {} = {}, SEE = √({}/{})",
                num(syy, p),
                paren(slope, p),
                paren(sxy, p),
                num(sse, p),
                num(sse, p),
                df
            ))
            .with_result(num(see, p)),
    );

    let slope_se = if sxx > 0.0 { see / sxx.sqrt() } else { 0.0 };
    trace.push(
        Step::new("slope_standard_error", "Standard error of the slope")
            .with_formula("SE(b) = SEE/√Sxx")
            .with_calculation(format!("{}/√{}", num(see, p), num(sxx, p)))
            .with_result(num(slope_se, p)),
    );

    let exact_fit = sxx > 0.0 && slope != 0.0 && sse <= EXACT_FIT_TOLERANCE * syy;
    let t = if slope_se > 0.0 && !exact_fit { slope / slope_se } else { 0.0 };
    let mut t_step = Step::new("t_statistic", "Test statistic")
        .with_formula("t = b/SE(b)")
        .with_calculation(format!("{}/{}", num(slope, p), num(slope_se, p)))
        .with_result(num(t, p));
    if exact_fit {
        t_step = t_step.with_note("Every point lies on the line: SE(b) is 0 and t is unbounded, reported as 0");
    } else if slope_se == 0.0 {
        t_step = t_step.with_note("SE(b) is 0, so t is reported as 0");
    }
    trace.push(t_step);

    trace.push(
        Step::new("degrees_of_freedom", "Degrees of freedom")
            .with_formula("df = n − 2")
            .with_calculation(format!("{} − 2", n))
            .with_result(df.to_string()),
    );

    let test = TestStatistic {
        symbol: "t",
        table: "t",
        value: t,
        df: df.to_string(),
        tails: Tails::Two,
        lookup: T_TABLE.lookup(df, Tails::Two.tail_area(config.alpha)),
        p_value: decision::p_value(t, Tails::Two, |v| t_cdf(v, df as f64)),
        effect: None,
    };
    let outcome = if exact_fit {
        conclude_exact(&mut trace, test, "Exact fit with a non-zero slope: p-value = 0", config)
    } else {
        conclude(&mut trace, test, config)
    };

    let value = RegressionResult {
        n,
        mean_x: mx,
        mean_y: my,
        sxx,
        syy,
        sxy,
        slope,
        intercept,
        r,
        r_squared,
        sse,
        standard_error: see,
        slope_se,
        t_stat: t,
        df,
        outcome,
    };
    Ok(trace.finish(value, "ŷ = a + b·x, b = Sxy/Sxx", inputs))
}

pub struct LinearRegression;

static REGRESSION_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("x", "List<Number>", "Predictor values"),
    ArgMeta::required("y", "List<Number>", "Response values, same length as x"),
    ArgMeta::optional("alpha", "Number", "Significance level for the slope test", "0.05"),
];
static REGRESSION_EXAMPLES: [&str; 1] = ["linear_regression(x: [1,2,3,4,5], y: [2,4,5,4,5]) → ŷ = 2.2 + 0.6x"];
static REGRESSION_RELATED: [&str; 1] = ["descriptive"];

impl CalculatorPlugin for LinearRegression {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "linear_regression",
            description: "Least-squares line, correlation and a two-tailed slope t-test",
            usage: "linear_regression(x, y, alpha?)",
            args: &REGRESSION_ARGS,
            returns: "RegressionResult",
            examples: &REGRESSION_EXAMPLES,
            category: "regression",
            related: &REGRESSION_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let x = args::numbers(a, "x")?;
        let y = args::numbers(a, "y")?;
        Ok(linear_regression(&x, &y, &config)?.erase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;

    #[test]
    fn test_textbook_line() {
        let r = linear_regression(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 5.0, 4.0, 5.0], &CalcConfig::default()).unwrap();
        let v = &r.value;
        assert!((v.slope - 0.6).abs() < 1e-12);
        assert!((v.intercept - 2.2).abs() < 1e-12);
        assert!((v.r - 0.774_597).abs() < 1e-6);
        assert!((v.r_squared - 0.6).abs() < 1e-12);
        assert!((v.t_stat - 2.121_320).abs() < 1e-6);
        assert_eq!(v.df, 3);
        assert_eq!(v.outcome.critical_value, Some(3.182));
        assert_eq!(v.outcome.decision, Decision::FailToReject);
        assert_eq!(r.step("slope").unwrap().result.as_deref(), Some("0.6"));
        assert_eq!(r.last_step().unwrap().result.as_deref(), Some("Fail to reject H₀"));
    }

    #[test]
    fn test_constant_x_degrades_to_zero() {
        let v = linear_regression(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0], &CalcConfig::default()).unwrap().value;
        assert_eq!(v.slope, 0.0);
        assert_eq!(v.r, 0.0);
        assert_eq!(v.t_stat, 0.0);
        assert_eq!(v.intercept, 2.0);
        assert!(v.standard_error.is_finite());
        assert!(v.outcome.p_value.is_finite());
    }

    #[test]
    fn test_constant_y() {
        let v = linear_regression(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0], &CalcConfig::default()).unwrap().value;
        assert_eq!(v.slope, 0.0);
        assert_eq!(v.r, 0.0);
        assert_eq!(v.t_stat, 0.0);
    }

    #[test]
    fn test_exact_fit_rejects() {
        let r = linear_regression(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0], &CalcConfig::default()).unwrap();
        let v = &r.value;
        assert_eq!(v.slope, 2.0);
        assert_eq!(v.r, 1.0);
        assert_eq!(v.sse, 0.0);
        assert_eq!(v.t_stat, 0.0);
        assert_eq!(v.outcome.p_value, 0.0);
        assert_eq!(v.outcome.decision, Decision::Reject);
        let last = r.last_step().unwrap();
        assert_eq!(last.result.as_deref(), Some("Reject H₀"));
        assert!(last.note.as_deref().unwrap().contains("Exact fit"));
        assert!(r.step("t_statistic").unwrap().note.as_deref().unwrap().contains("unbounded"));
    }

    #[test]
    fn test_errors() {
        let cfg = CalcConfig::default();
        assert!(linear_regression(&[1.0, 2.0], &[1.0, 2.0], &cfg).unwrap_err().is(codes::INSUFFICIENT_DATA));
        assert!(linear_regression(&[1.0, 2.0, 3.0], &[1.0, 2.0], &cfg).unwrap_err().is(codes::LENGTH_MISMATCH));
    }
}
