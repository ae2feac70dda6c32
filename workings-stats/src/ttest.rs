//! t-tests: one-sample, paired and independent (pooled variance)
//!
//! The paired test is a one-sample test on the differences. The independent
//! test accepts raw samples or `{n, mean, sd}` summaries; both entry points
//! run through the same core and produce the same steps.

use crate::decision::{self, conclude, hypotheses_step, Outcome, TestStatistic};
use crate::distributions::t_cdf;
use crate::primitives::{mean, sample_std_dev};
use crate::tables::T_TABLE;
use serde::{Deserialize, Serialize};
use workings_plugin::prelude::*;

/// Size, mean and sample SD of one group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
}

impl SampleSummary {
    pub fn from_data(xs: &[f64]) -> Result<Self, StatsError> {
        Ok(SampleSummary {
            n: xs.len(),
            mean: mean(xs)?,
            sd: sample_std_dev(xs)?,
        })
    }

    fn variance(&self) -> f64 {
        self.sd * self.sd
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneSampleResult {
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
    pub mu0: f64,
    pub se: f64,
    pub t_stat: f64,
    pub df: usize,
    pub tails: Tails,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedResult {
    pub n: usize,
    pub differences: Vec<f64>,
    pub mean_difference: f64,
    pub sd_difference: f64,
    pub se: f64,
    pub t_stat: f64,
    pub df: usize,
    pub tails: Tails,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndependentResult {
    pub n1: usize,
    pub n2: usize,
    pub mean1: f64,
    pub mean2: f64,
    pub sd1: f64,
    pub sd2: f64,
    pub pooled_variance: f64,
    pub se: f64,
    pub t_stat: f64,
    pub df: usize,
    pub tails: Tails,
    #[serde(flatten)]
    pub outcome: Outcome,
}

fn require_sample(xs: &[f64], what: &str) -> Result<(), StatsError> {
    if xs.len() < 2 {
        return Err(StatsError::insufficient_data(what, 2, xs.len()));
    }
    Ok(())
}

/// H₀/H₁ wording for a comparison of `lhs` against `rhs`.
fn hypotheses(lhs: &str, rhs: &str, tails: Tails) -> (String, String) {
    match tails {
        Tails::Two => (format!("{} = {}", lhs, rhs), format!("{} ≠ {}", lhs, rhs)),
        Tails::Upper => (format!("{} ≤ {}", lhs, rhs), format!("{} > {}", lhs, rhs)),
        Tails::Lower => (format!("{} ≥ {}", lhs, rhs), format!("{} < {}", lhs, rhs)),
    }
}

/// t = difference/SE, or 0 when the standard error vanishes.
fn t_ratio(difference: f64, se: f64) -> f64 {
    if se == 0.0 {
        0.0
    } else {
        difference / se
    }
}

fn t_step(formula: &str, calculation: String, t: f64, se: f64, p: usize) -> Step {
    let step = Step::new("t_statistic", "Test statistic")
        .with_formula(formula)
        .with_calculation(calculation)
        .with_result(num(t, p));
    if se == 0.0 {
        step.with_note("Standard error is 0 (no variation), so t is reported as 0")
    } else {
        step
    }
}

/// Critical value, p-value and decision for a t statistic.
fn finish_t(trace: &mut Trace, t: f64, df: usize, config: &CalcConfig) -> Outcome {
    let tails = config.tails;
    conclude(
        trace,
        TestStatistic {
            symbol: "t",
            table: "t",
            value: t,
            df: df.to_string(),
            tails,
            lookup: T_TABLE.lookup(df, tails.tail_area(config.alpha)),
            p_value: decision::p_value(t, tails, |x| t_cdf(x, df as f64)),
            effect: None,
        },
        config,
    )
}

/// Steps shared by the one-sample and paired tests, starting after the
/// hypotheses. Returns (SE, t, df, outcome).
fn one_sample_core(
    trace: &mut Trace,
    summary: SampleSummary,
    mu0: f64,
    symbol: &str,
    config: &CalcConfig,
) -> (f64, f64, usize, Outcome) {
    let p = config.precision;
    let SampleSummary { n, mean, sd } = summary;
    trace.push(
        Step::new("sample_stats", "Sample statistics")
            .with_formula(format!("{s} = Σx/n, s = √(Σ(x − {s})²/(n − 1))", s = symbol))
            .with_calculation(format!("n = {}", n))
            .with_result(format!("{} = {}, s = {}", symbol, num(mean, p), num(sd, p))),
    );

    let se = sd / (n as f64).sqrt();
    trace.push(
        Step::new("standard_error", "Standard error")
            .with_formula("SE = s/√n")
            .with_calculation(format!("{}/√{}", num(sd, p), n))
            .with_result(num(se, p)),
    );

    let t = t_ratio(mean - mu0, se);
    trace.push(t_step(
        &format!("t = ({} − μ₀)/SE", symbol),
        format!("({} − {})/{}", num(mean, p), paren(mu0, p), num(se, p)),
        t,
        se,
        p,
    ));

    let df = n - 1;
    trace.push(
        Step::new("degrees_of_freedom", "Degrees of freedom")
            .with_formula("df = n − 1")
            .with_calculation(format!("{} − 1", n))
            .with_result(df.to_string()),
    );

    let outcome = finish_t(trace, t, df, config);
    (se, t, df, outcome)
}

pub fn one_sample(sample: &[f64], mu0: f64, config: &CalcConfig) -> Result<CalculationResult<OneSampleResult>, StatsError> {
    require_sample(sample, "One-sample t-test")?;
    let summary = SampleSummary::from_data(sample)?;
    let inputs = Value::object([("data", Value::from(sample)), ("mu", Value::from(mu0))]);

    let mut trace = Trace::new();
    let (h0, h1) = hypotheses("μ", &num(mu0, config.precision), config.tails);
    trace.push(hypotheses_step(&h0, &h1, config));
    let (se, t, df, outcome) = one_sample_core(&mut trace, summary, mu0, "x̄", config);

    let value = OneSampleResult {
        n: summary.n,
        mean: summary.mean,
        sd: summary.sd,
        mu0,
        se,
        t_stat: t,
        df,
        tails: config.tails,
        outcome,
    };
    Ok(trace.finish(value, "t = (x̄ − μ₀)/(s/√n)", inputs))
}

pub fn paired(before: &[f64], after: &[f64], config: &CalcConfig) -> Result<CalculationResult<PairedResult>, StatsError> {
    if before.len() != after.len() {
        return Err(StatsError::mismatched_pairs(before.len(), after.len()));
    }
    require_sample(before, "Paired t-test")?;
    let p = config.precision;
    let inputs = Value::object([("before", Value::from(before)), ("after", Value::from(after))]);

    let mut trace = Trace::new();
    let (h0, h1) = hypotheses("μd", "0", config.tails);
    trace.push(hypotheses_step(&h0, &h1, config));

    let differences: Vec<f64> = before.iter().zip(after).map(|(b, a)| a - b).collect();
    trace.push(
        Step::new("differences", "Differences")
            .with_formula("d = after − before")
            .with_result(num_list(&differences, p)),
    );

    let summary = SampleSummary::from_data(&differences)?;
    let (se, t, df, outcome) = one_sample_core(&mut trace, summary, 0.0, "d̄", config);

    let value = PairedResult {
        n: summary.n,
        differences,
        mean_difference: summary.mean,
        sd_difference: summary.sd,
        se,
        t_stat: t,
        df,
        tails: config.tails,
        outcome,
    };
    Ok(trace.finish(value, "t = d̄/(s_d/√n)", inputs))
}

fn check_summary(s: &SampleSummary, label: &str) -> Result<(), StatsError> {
    if s.n < 2 {
        return Err(StatsError::insufficient_data(label, 2, s.n));
    }
    if !s.mean.is_finite() {
        return Err(StatsError::invalid_input(format!("{}: mean must be finite", label)));
    }
    if !(s.sd >= 0.0) || !s.sd.is_finite() {
        return Err(StatsError::invalid_input(format!(
            "{}: standard deviation must be non-negative, got {}",
            label, s.sd
        )));
    }
    Ok(())
}

fn independent_core(
    s1: SampleSummary,
    s2: SampleSummary,
    source: &str,
    inputs: Value,
    config: &CalcConfig,
) -> CalculationResult<IndependentResult> {
    let p = config.precision;
    let mut trace = Trace::new();
    let (h0, h1) = hypotheses("μ₁", "μ₂", config.tails);
    trace.push(hypotheses_step(&h0, &h1, config));

    trace.push(
        Step::new("sample_stats", "Sample statistics")
            .with_description(source)
            .with_result(format!(
                "n₁ = {}, x̄₁ = {}, s₁ = {}; n₂ = {}, x̄₂ = {}, s₂ = {}",
                s1.n,
                num(s1.mean, p),
                num(s1.sd, p),
                s2.n,
                num(s2.mean, p),
                num(s2.sd, p)
            )),
    );

    let df = s1.n + s2.n - 2;
    let pooled = ((s1.n - 1) as f64 * s1.variance() + (s2.n - 1) as f64 * s2.variance()) / df as f64;
    trace.push(
        Step::new("pooled_variance", "Pooled variance")
            .with_formula("sp² = ((n₁ − 1)s₁² + (n₂ − 1)s₂²)/(n₁ + n₂ − 2)")
            .with_calculation(format!(
                "({} × {} + {} × {})/{}",
                s1.n - 1,
                num(s1.variance(), p),
                s2.n - 1,
                num(s2.variance(), p),
                df
            ))
            .with_result(num(pooled, p)),
    );

    let se = (pooled * (1.0 / s1.n as f64 + 1.0 / s2.n as f64)).sqrt();
    trace.push(
        Step::new("standard_error", "Standard error of the difference")
            .with_formula("SE = √(sp²(1/n₁ + 1/n₂))")
            .with_calculation(format!("√({} × (1/{} + 1/{}))", num(pooled, p), s1.n, s2.n))
            .with_result(num(se, p)),
    );

    let t = t_ratio(s1.mean - s2.mean, se);
    trace.push(t_step(
        "t = (x̄₁ − x̄₂)/SE",
        format!("({} − {})/{}", num(s1.mean, p), paren(s2.mean, p), num(se, p)),
        t,
        se,
        p,
    ));

    trace.push(
        Step::new("degrees_of_freedom", "Degrees of freedom")
            .with_formula("df = n₁ + n₂ − 2")
            .with_calculation(format!("{} + {} − 2", s1.n, s2.n))
            .with_result(df.to_string()),
    );

    let outcome = finish_t(&mut trace, t, df, config);
    let value = IndependentResult {
        n1: s1.n,
        n2: s2.n,
        mean1: s1.mean,
        mean2: s2.mean,
        sd1: s1.sd,
        sd2: s2.sd,
        pooled_variance: pooled,
        se,
        t_stat: t,
        df,
        tails: config.tails,
        outcome,
    };
    trace.finish(value, "t = (x̄₁ − x̄₂)/√(sp²(1/n₁ + 1/n₂))", inputs)
}

pub fn independent(sample1: &[f64], sample2: &[f64], config: &CalcConfig) -> Result<CalculationResult<IndependentResult>, StatsError> {
    require_sample(sample1, "Sample 1")?;
    require_sample(sample2, "Sample 2")?;
    let s1 = SampleSummary::from_data(sample1)?;
    let s2 = SampleSummary::from_data(sample2)?;
    let inputs = Value::object([("sample1", Value::from(sample1)), ("sample2", Value::from(sample2))]);
    Ok(independent_core(s1, s2, "Computed from the raw samples", inputs, config))
}

pub fn independent_from_summary(
    s1: SampleSummary,
    s2: SampleSummary,
    config: &CalcConfig,
) -> Result<CalculationResult<IndependentResult>, StatsError> {
    check_summary(&s1, "Sample 1")?;
    check_summary(&s2, "Sample 2")?;
    let inputs = Value::object([
        ("sample1", Value::from_serialize(&s1)),
        ("sample2", Value::from_serialize(&s2)),
    ]);
    Ok(independent_core(s1, s2, "Given as summary statistics", inputs, config))
}

// ========== Plugins ==========

static ONE_SAMPLE_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("data", "List<Number>", "Sample observations"),
    ArgMeta::optional("mu", "Number", "Hypothesized population mean μ₀", "0"),
    ArgMeta::optional("tails", "Number | Text", "1/upper, lower, or 2/two", "2"),
    ArgMeta::optional("alpha", "Number", "Significance level", "0.05"),
];
static ONE_SAMPLE_EXAMPLES: [&str; 1] = ["t_test_one_sample(data: [10,12,14,16,18], mu: 6) → t = 5.657"];
static ONE_SAMPLE_RELATED: [&str; 2] = ["t_test_paired", "t_test_independent"];

pub struct OneSampleTTest;

impl CalculatorPlugin for OneSampleTTest {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "t_test_one_sample",
            description: "One-sample t-test against a hypothesized mean",
            usage: "t_test_one_sample(data, mu?, tails?, alpha?)",
            args: &ONE_SAMPLE_ARGS,
            returns: "OneSampleResult",
            examples: &ONE_SAMPLE_EXAMPLES,
            category: "t_tests",
            related: &ONE_SAMPLE_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let data = args::numbers(a, "data")?;
        let mu = args::opt_number(a, "mu")?.unwrap_or(0.0);
        Ok(one_sample(&data, mu, &config)?.erase())
    }
}

static PAIRED_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("before", "List<Number>", "First measurement of each pair"),
    ArgMeta::required("after", "List<Number>", "Second measurement of each pair"),
    ArgMeta::optional("tails", "Number | Text", "1/upper, lower, or 2/two", "2"),
    ArgMeta::optional("alpha", "Number", "Significance level", "0.05"),
];
static PAIRED_EXAMPLES: [&str; 1] = ["t_test_paired(before: [10,12,14], after: [12,15,15])"];
static PAIRED_RELATED: [&str; 1] = ["t_test_one_sample"];

pub struct PairedTTest;

impl CalculatorPlugin for PairedTTest {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "t_test_paired",
            description: "Paired t-test on after − before differences",
            usage: "t_test_paired(before, after, tails?, alpha?)",
            args: &PAIRED_ARGS,
            returns: "PairedResult",
            examples: &PAIRED_EXAMPLES,
            category: "t_tests",
            related: &PAIRED_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let before = args::numbers(a, "before")?;
        let after = args::numbers(a, "after")?;
        Ok(paired(&before, &after, &config)?.erase())
    }
}

static INDEPENDENT_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("sample1", "List<Number>", "First group"),
    ArgMeta::required("sample2", "List<Number>", "Second group"),
    ArgMeta::optional("tails", "Number | Text", "1/upper, lower, or 2/two", "2"),
    ArgMeta::optional("alpha", "Number", "Significance level", "0.05"),
];
static INDEPENDENT_EXAMPLES: [&str; 1] = ["t_test_independent(sample1: [2,4,6,8], sample2: [1,3,5,7])"];
static INDEPENDENT_RELATED: [&str; 2] = ["t_test_independent_summary", "one_way_anova"];

pub struct IndependentTTest;

impl CalculatorPlugin for IndependentTTest {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "t_test_independent",
            description: "Independent two-sample t-test with pooled variance",
            usage: "t_test_independent(sample1, sample2, tails?, alpha?)",
            args: &INDEPENDENT_ARGS,
            returns: "IndependentResult",
            examples: &INDEPENDENT_EXAMPLES,
            category: "t_tests",
            related: &INDEPENDENT_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let s1 = args::numbers(a, "sample1")?;
        let s2 = args::numbers(a, "sample2")?;
        Ok(independent(&s1, &s2, &config)?.erase())
    }
}

static SUMMARY_ARGS: [ArgMeta; 8] = [
    ArgMeta::required("n1", "Number", "Size of group 1"),
    ArgMeta::required("mean1", "Number", "Mean of group 1"),
    ArgMeta::required("sd1", "Number", "Sample SD of group 1"),
    ArgMeta::required("n2", "Number", "Size of group 2"),
    ArgMeta::required("mean2", "Number", "Mean of group 2"),
    ArgMeta::required("sd2", "Number", "Sample SD of group 2"),
    ArgMeta::optional("tails", "Number | Text", "1/upper, lower, or 2/two", "2"),
    ArgMeta::optional("alpha", "Number", "Significance level", "0.05"),
];
static SUMMARY_EXAMPLES: [&str; 1] =
    ["t_test_independent_summary(n1: 25, mean1: 80, sd1: 10, n2: 30, mean2: 74, sd2: 12)"];
static SUMMARY_RELATED: [&str; 1] = ["t_test_independent"];

pub struct IndependentSummaryTTest;

fn summary_arg(a: &Value, suffix: &str) -> Result<SampleSummary, StatsError> {
    let n = args::count(a, &format!("n{}", suffix))?;
    Ok(SampleSummary {
        n: usize::try_from(n).map_err(|_| StatsError::invalid_input(format!("n{} is too large", suffix)))?,
        mean: args::number(a, &format!("mean{}", suffix))?,
        sd: args::number(a, &format!("sd{}", suffix))?,
    })
}

impl CalculatorPlugin for IndependentSummaryTTest {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "t_test_independent_summary",
            description: "Independent two-sample t-test from n, mean and SD of each group",
            usage: "t_test_independent_summary(n1, mean1, sd1, n2, mean2, sd2, tails?, alpha?)",
            args: &SUMMARY_ARGS,
            returns: "IndependentResult",
            examples: &SUMMARY_EXAMPLES,
            category: "t_tests",
            related: &SUMMARY_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let s1 = summary_arg(a, "1")?;
        let s2 = summary_arg(a, "2")?;
        Ok(independent_from_summary(s1, s2, &config)?.erase())
    }
}
