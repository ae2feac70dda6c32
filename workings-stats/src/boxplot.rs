//! Five-number summary, fences and outliers
//!
//! Quartiles use the exclusive-median convention: for odd n the median is
//! left out of both halves, and Q1/Q3 are the medians of the lower and upper
//! halves. Other conventions (inclusive, interpolated) give different
//! quartiles for the same data.

use crate::primitives::{median_sorted, sorted};
use serde::Serialize;
use workings_plugin::prelude::*;

const FENCE_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotResult {
    pub n: usize,
    pub sorted: Vec<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub iqr: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub outliers: Vec<f64>,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
}

/// Lower and upper halves excluding the median for odd n.
fn halves(ordered: &[f64]) -> (&[f64], &[f64]) {
    let n = ordered.len();
    let half = n / 2;
    (&ordered[..half], &ordered[n - half..])
}

pub fn box_plot(data: &[f64], config: &CalcConfig) -> Result<CalculationResult<BoxPlotResult>, StatsError> {
    if data.len() < 2 {
        return Err(StatsError::insufficient_data("Box plot", 2, data.len()));
    }
    let p = config.precision;
    let n = data.len();
    let ordered = sorted(data);
    let mut trace = Trace::new();

    trace.push(
        Step::new("sorted", "Sorted data")
            .with_description(num_list(&ordered, p))
            .with_result(format!("n = {}", n)),
    );

    let median = median_sorted(&ordered).ok_or_else(StatsError::no_data)?;
    trace.push(
        Step::new("median", "Median (Q2)")
            .with_calculation(if n % 2 == 1 {
                format!("middle value (position {})", n / 2 + 1)
            } else {
                format!("({} + {})/2", num(ordered[n / 2 - 1], p), num(ordered[n / 2], p))
            })
            .with_result(num(median, p)),
    );

    let (lower, upper) = halves(&ordered);
    let q1 = median_sorted(lower).ok_or_else(StatsError::no_data)?;
    let q3 = median_sorted(upper).ok_or_else(StatsError::no_data)?;
    let mut quartile_step = Step::new("quartiles", "Quartiles")
        .with_description(format!("Lower half: {}\nUpper half: {}", num_list(lower, p), num_list(upper, p)))
        .with_formula("Q1 = median of lower half, Q3 = median of upper half")
        .with_result(format!("Q1 = {}, Q3 = {}", num(q1, p), num(q3, p)));
    if n % 2 == 1 {
        quartile_step = quartile_step.with_note("n is odd, so the median is excluded from both halves");
    }
    trace.push(quartile_step);

    let iqr = q3 - q1;
    trace.push(
        Step::new("iqr", "Interquartile range")
            .with_formula("IQR = Q3 − Q1")
            .with_calculation(format!("{} − {}", num(q3, p), paren(q1, p)))
            .with_result(num(iqr, p)),
    );

    let lower_fence = q1 - FENCE_MULTIPLIER * iqr;
    let upper_fence = q3 + FENCE_MULTIPLIER * iqr;
    trace.push(
        Step::new("fences", "Fences")
            .with_formula("Q1 − 1.5·IQR, Q3 + 1.5·IQR")
            .with_calculation(format!(
                "{} − 1.5 × {}, {} + 1.5 × {}",
                num(q1, p),
                num(iqr, p),
                num(q3, p),
                num(iqr, p)
            ))
            .with_result(format!("[{}, {}]", num(lower_fence, p), num(upper_fence, p))),
    );

    let outliers: Vec<f64> = ordered
        .iter()
        .copied()
        .filter(|x| *x < lower_fence || *x > upper_fence)
        .collect();
    trace.push(
        Step::new("outliers", "Outliers")
            .with_description("Values strictly outside the fences")
            .with_result(if outliers.is_empty() {
                "none".to_string()
            } else {
                num_list(&outliers, p)
            }),
    );

    let min = ordered[0];
    let max = ordered[n - 1];
    let inside = || ordered.iter().copied().filter(|x| *x >= lower_fence && *x <= upper_fence);
    let lower_whisker = inside().next().unwrap_or(min);
    let upper_whisker = inside().last().unwrap_or(max);
    trace.push(
        Step::new("whiskers", "Whiskers")
            .with_description("Most extreme values that are not outliers")
            .with_result(format!("{} to {}", num(lower_whisker, p), num(upper_whisker, p))),
    );

    trace.push(
        Step::new("five_number_summary", "Five-number summary")
            .with_formula("min, Q1, median, Q3, max")
            .with_result(num_list(&[min, q1, median, q3, max], p)),
    );

    let inputs = Value::object([("data", Value::from(data))]);
    let value = BoxPlotResult {
        n,
        sorted: ordered.clone(),
        min,
        q1,
        median,
        q3,
        max,
        iqr,
        lower_fence,
        upper_fence,
        outliers,
        lower_whisker,
        upper_whisker,
    };
    Ok(trace.finish(value, "IQR = Q3 − Q1; fences Q1 − 1.5·IQR, Q3 + 1.5·IQR", inputs))
}

pub struct BoxPlot;

static BOX_PLOT_ARGS: [ArgMeta; 1] = [ArgMeta::required("data", "List<Number>", "At least two observations")];
static BOX_PLOT_EXAMPLES: [&str; 1] = ["box_plot(data: [1,2,3,4,5,6,7,8,9,100]) → Q1 3, Q3 8, outlier 100"];
static BOX_PLOT_RELATED: [&str; 1] = ["descriptive"];

impl CalculatorPlugin for BoxPlot {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "box_plot",
            description: "Quartiles (exclusive median), IQR, fences, whiskers and outliers",
            usage: "box_plot(data)",
            args: &BOX_PLOT_ARGS,
            returns: "BoxPlotResult",
            examples: &BOX_PLOT_EXAMPLES,
            category: "descriptive",
            related: &BOX_PLOT_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let data = args::numbers(a, "data")?;
        Ok(box_plot(&data, &config)?.erase())
    }
}
