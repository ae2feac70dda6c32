//! Descriptive statistics for a single sample

use crate::primitives::{mean, median_sorted, population_variance, sample_variance, sorted, sum, sum_sq_dev};
use serde::Serialize;
use workings_plugin::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveResult {
    pub n: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    /// Every value tied at the highest frequency; empty when nothing repeats
    pub modes: Vec<f64>,
    pub sample_variance: f64,
    pub sample_sd: f64,
    pub population_variance: f64,
    pub population_sd: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
}

/// Modes of sorted data, with their frequency.
fn modes(sorted: &[f64]) -> (Vec<f64>, usize) {
    let mut runs: Vec<(f64, usize)> = Vec::new();
    for &x in sorted {
        match runs.last_mut() {
            Some((v, count)) if *v == x => *count += 1,
            _ => runs.push((x, 1)),
        }
    }
    let top = runs.iter().map(|(_, c)| *c).max().unwrap_or(0);
    if top < 2 {
        return (Vec::new(), top);
    }
    (runs.into_iter().filter(|(_, c)| *c == top).map(|(v, _)| v).collect(), top)
}

pub fn describe(data: &[f64], target: Option<f64>, config: &CalcConfig) -> Result<CalculationResult<DescriptiveResult>, StatsError> {
    if data.is_empty() {
        return Err(StatsError::no_data());
    }
    let p = config.precision;
    let n = data.len();
    let mut trace = Trace::new();

    let ordered = sorted(data);
    trace.push(
        Step::new("sorted", "Sorted data")
            .with_description(num_list(&ordered, p))
            .with_result(format!("n = {}", n)),
    );

    let total = sum(data);
    let terms: Vec<String> = data.iter().map(|x| num(*x, p)).collect();
    trace.push(
        Step::new("sum", "Sum")
            .with_formula("Σx")
            .with_calculation(sum_terms(&terms))
            .with_result(num(total, p)),
    );

    let m = mean(data)?;
    trace.push(
        Step::new("mean", "Mean")
            .with_formula("x̄ = Σx/n")
            .with_calculation(format!("{}/{}", num(total, p), n))
            .with_result(num(m, p)),
    );

    let median = median_sorted(&ordered).ok_or_else(StatsError::no_data)?;
    let median_calc = if n % 2 == 1 {
        format!("middle value (position {})", n / 2 + 1)
    } else {
        format!(
            "({} + {})/2",
            num(ordered[n / 2 - 1], p),
            num(ordered[n / 2], p)
        )
    };
    trace.push(
        Step::new("median", "Median")
            .with_calculation(median_calc)
            .with_result(num(median, p)),
    );

    let (mode_values, frequency) = modes(&ordered);
    let mode_step = Step::new("mode", "Mode");
    trace.push(if mode_values.is_empty() {
        mode_step.with_result("none").with_note("No value occurs more than once")
    } else {
        mode_step
            .with_result(num_list(&mode_values, p))
            .with_note(format!("each occurs {} times", frequency))
    });

    let ss = sum_sq_dev(data, m);
    let s2 = sample_variance(data)?;
    let s = s2.sqrt();
    let mut variance_step = Step::new("sample_variance", "Sample variance and standard deviation")
        .with_formula("s² = Σ(x − x̄)²/(n − 1), s = √s²")
        .with_calculation(format!("{}/{}", num(ss, p), n.saturating_sub(1)))
        .with_result(format!("s² = {}, s = {}", num(s2, p), num(s, p)));
    if n == 1 {
        variance_step = variance_step.with_note("A single observation has no spread; reported as 0");
    }
    trace.push(variance_step);

    let sigma2 = population_variance(data)?;
    let sigma = sigma2.sqrt();
    trace.push(
        Step::new("population_variance", "Population variance and standard deviation")
            .with_formula("σ² = Σ(x − x̄)²/n, σ = √σ²")
            .with_calculation(format!("{}/{}", num(ss, p), n))
            .with_result(format!("σ² = {}, σ = {}", num(sigma2, p), num(sigma, p))),
    );

    let min = ordered[0];
    let max = ordered[n - 1];
    trace.push(
        Step::new("range", "Range")
            .with_formula("max − min")
            .with_calculation(format!("{} − {}", num(max, p), paren(min, p)))
            .with_result(num(max - min, p)),
    );

    let z_score = target.map(|x| {
        let z = if s == 0.0 { 0.0 } else { (x - m) / s };
        let mut step = Step::new("z_score", "z-score")
            .with_formula("z = (x − x̄)/s")
            .with_calculation(format!("({} − {})/{}", num(x, p), paren(m, p), num(s, p)))
            .with_result(num(z, p));
        if s == 0.0 {
            step = step.with_note("s = 0, so the z-score is reported as 0");
        }
        trace.push(step);
        z
    });

    let mut inputs = vec![("data", Value::from(data))];
    if let Some(t) = target {
        inputs.push(("target", Value::from(t)));
    }
    let value = DescriptiveResult {
        n,
        sum: total,
        mean: m,
        median,
        modes: mode_values,
        sample_variance: s2,
        sample_sd: s,
        population_variance: sigma2,
        population_sd: sigma,
        min,
        max,
        range: max - min,
        target,
        z_score,
    };
    Ok(trace.finish(value, "x̄ = Σx/n, s² = Σ(x − x̄)²/(n − 1)", Value::object(inputs)))
}

pub struct Descriptive;

static DESCRIPTIVE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("data", "List<Number>", "Sample observations"),
    ArgMeta::optional("target", "Number", "Value to express as a z-score", "none"),
];
static DESCRIPTIVE_EXAMPLES: [&str; 2] = [
    "descriptive(data: [2,4,4,4,5,5,7,9]) → mean 5, mode 4",
    "descriptive(data: [2,4,4,4,5,5,7,9], target: 9) → z = 1.871",
];
static DESCRIPTIVE_RELATED: [&str; 1] = ["box_plot"];

impl CalculatorPlugin for Descriptive {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "descriptive",
            description: "Summary statistics: centre, spread, modes and an optional z-score",
            usage: "descriptive(data, target?)",
            args: &DESCRIPTIVE_ARGS,
            returns: "DescriptiveResult",
            examples: &DESCRIPTIVE_EXAMPLES,
            category: "descriptive",
            related: &DESCRIPTIVE_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let data = args::numbers(a, "data")?;
        let target = args::opt_number(a, "target")?;
        Ok(describe(&data, target, &config)?.erase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let r = describe(&data, Some(9.0), &CalcConfig::default()).unwrap().value;
        assert_eq!(r.n, 8);
        assert_eq!(r.sum, 40.0);
        assert_eq!(r.mean, 5.0);
        assert_eq!(r.median, 4.5);
        assert_eq!(r.modes, vec![4.0]);
        assert!((r.population_variance - 4.0).abs() < 1e-12);
        assert_eq!(r.population_sd, 2.0);
        assert!((r.sample_variance - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(r.range, 7.0);
        assert!((r.z_score.unwrap() - 4.0 / (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_modes() {
        let r = describe(&[1.0, 2.0, 3.0], None, &CalcConfig::default()).unwrap();
        assert!(r.value.modes.is_empty());
        assert_eq!(r.step("mode").unwrap().result.as_deref(), Some("none"));

        let r = describe(&[3.0, 1.0, 3.0, 1.0, 2.0], None, &CalcConfig::default()).unwrap().value;
        assert_eq!(r.modes, vec![1.0, 3.0]);
        assert_eq!(r.median, 2.0);
    }

    #[test]
    fn test_zero_spread_z_score() {
        let r = describe(&[4.0, 4.0, 4.0], Some(10.0), &CalcConfig::default()).unwrap();
        assert_eq!(r.value.z_score, Some(0.0));
        assert!(r.step("z_score").unwrap().note.is_some());
    }

    #[test]
    fn test_single_value_and_empty() {
        let r = describe(&[7.0], None, &CalcConfig::default()).unwrap().value;
        assert_eq!(r.sample_variance, 0.0);
        assert_eq!(r.median, 7.0);
        assert!(describe(&[], None, &CalcConfig::default()).unwrap_err().is(codes::NO_DATA));
    }

    #[test]
    fn test_no_z_step_without_target() {
        let r = describe(&[1.0, 2.0], None, &CalcConfig::default()).unwrap();
        assert!(r.step("z_score").is_none());
        assert_eq!(r.last_step().unwrap().id, "range");
    }
}
