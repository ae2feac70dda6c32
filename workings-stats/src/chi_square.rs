//! Chi-square goodness-of-fit and independence tests

use crate::decision::{conclude, hypotheses_step, Outcome, TestStatistic};
use crate::distributions::chi_cdf;
use crate::tables::CHI_SQUARE_TABLE;
use serde::Serialize;
use workings_plugin::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoodnessOfFitResult {
    pub observed: Vec<f64>,
    pub expected: Vec<f64>,
    pub contributions: Vec<f64>,
    pub chi_square: f64,
    pub df: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndependenceResult {
    pub observed: Vec<Vec<f64>>,
    pub row_totals: Vec<f64>,
    pub col_totals: Vec<f64>,
    pub grand_total: f64,
    pub expected: Vec<Vec<f64>>,
    pub contributions: Vec<Vec<f64>>,
    pub chi_square: f64,
    pub df: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// (O − E)²/E
fn contribution(o: f64, e: f64) -> f64 {
    (o - e) * (o - e) / e
}

fn contribution_calc(o: f64, e: f64, p: usize) -> String {
    format!("({} − {})²/{}", num(o, p), num(e, p), num(e, p))
}

/// Upper-tail χ² decision shared by both tests.
fn finish_chi(trace: &mut Trace, chi: f64, df: usize, config: &CalcConfig) -> Outcome {
    conclude(
        trace,
        TestStatistic {
            symbol: "χ²",
            table: "chi-square",
            value: chi,
            df: df.to_string(),
            tails: Tails::Upper,
            lookup: CHI_SQUARE_TABLE.lookup(df, config.alpha),
            p_value: (1.0 - chi_cdf(chi, df as f64)).clamp(0.0, 1.0),
            effect: None,
        },
        config,
    )
}

pub fn goodness_of_fit(observed: &[f64], expected: &[f64], config: &CalcConfig) -> Result<CalculationResult<GoodnessOfFitResult>, StatsError> {
    if observed.len() != expected.len() {
        return Err(StatsError::length_mismatch("observed and expected", observed.len(), expected.len()));
    }
    let k = observed.len();
    if k < 2 {
        return Err(StatsError::insufficient_data("Goodness of fit", 2, k));
    }
    for (i, (&o, &e)) in observed.iter().zip(expected).enumerate() {
        let position = format!("category {}", i + 1);
        if o < 0.0 {
            return Err(StatsError::negative_frequency(&position, o));
        }
        if e <= 0.0 {
            return Err(StatsError::non_positive_expected(&position, e));
        }
    }

    let p = config.precision;
    let inputs = Value::object([("observed", Value::from(observed)), ("expected", Value::from(expected))]);
    let mut trace = Trace::new();
    trace.push(hypotheses_step(
        "the observed frequencies follow the expected distribution",
        "the observed frequencies differ from the expected distribution",
        config,
    ));
    trace.push(
        Step::new("frequencies", "Observed and expected frequencies")
            .with_description(format!("O: {}\nE: {}", num_list(observed, p), num_list(expected, p)))
            .with_note(format!("{} categories", k)),
    );

    let contributions: Vec<f64> = observed.iter().zip(expected).map(|(&o, &e)| contribution(o, e)).collect();
    let lines: Vec<String> = observed
        .iter()
        .zip(expected)
        .zip(&contributions)
        .enumerate()
        .map(|(i, ((&o, &e), &c))| format!("Category {}: {} = {}", i + 1, contribution_calc(o, e, p), num(c, p)))
        .collect();
    trace.push(
        Step::new("contributions", "Contributions")
            .with_description(lines.join("\n"))
            .with_formula("(O − E)²/E"),
    );

    let chi: f64 = contributions.iter().sum();
    let terms: Vec<String> = contributions.iter().map(|c| num(*c, p)).collect();
    trace.push(
        Step::new("chi_square", "Test statistic")
            .with_formula("χ² = Σ(O − E)²/E")
            .with_calculation(sum_terms(&terms))
            .with_result(num(chi, p)),
    );

    let df = k - 1;
    trace.push(
        Step::new("degrees_of_freedom", "Degrees of freedom")
            .with_formula("df = k − 1")
            .with_calculation(format!("{} − 1", k))
            .with_result(df.to_string()),
    );

    let outcome = finish_chi(&mut trace, chi, df, config);
    let value = GoodnessOfFitResult {
        observed: observed.to_vec(),
        expected: expected.to_vec(),
        contributions,
        chi_square: chi,
        df,
        outcome,
    };
    Ok(trace.finish(value, "χ² = Σ(O − E)²/E", inputs))
}

pub fn independence(table: &[Vec<f64>], config: &CalcConfig) -> Result<CalculationResult<IndependenceResult>, StatsError> {
    let r = table.len();
    if r < 2 {
        return Err(StatsError::insufficient_data("Contingency table rows", 2, r));
    }
    let c = table[0].len();
    if let Some(row) = table.iter().find(|row| row.len() != c) {
        return Err(StatsError::length_mismatch("contingency table rows", c, row.len()));
    }
    if c < 2 {
        return Err(StatsError::insufficient_data("Contingency table columns", 2, c));
    }
    for (i, row) in table.iter().enumerate() {
        for (j, &o) in row.iter().enumerate() {
            if o < 0.0 {
                return Err(StatsError::negative_frequency(&format!("cell ({}, {})", i + 1, j + 1), o));
            }
        }
    }

    let row_totals: Vec<f64> = table.iter().map(|row| row.iter().sum()).collect();
    let col_totals: Vec<f64> = (0..c).map(|j| table.iter().map(|row| row[j]).sum()).collect();
    let grand: f64 = row_totals.iter().sum();
    if grand == 0.0 {
        return Err(StatsError::no_data());
    }
    if let Some(i) = row_totals.iter().position(|t| *t == 0.0) {
        return Err(StatsError::non_positive_expected(&format!("row {}", i + 1), 0.0)
            .with_note("an all-zero row makes every expected count in it 0"));
    }
    if let Some(j) = col_totals.iter().position(|t| *t == 0.0) {
        return Err(StatsError::non_positive_expected(&format!("column {}", j + 1), 0.0)
            .with_note("an all-zero column makes every expected count in it 0"));
    }

    let p = config.precision;
    let inputs = Value::object([("observed", Value::from(table))]);
    let mut trace = Trace::new();
    trace.push(hypotheses_step(
        "the row and column variables are independent",
        "the row and column variables are associated",
        config,
    ));
    trace.push(
        Step::new("totals", "Marginal totals")
            .with_description(format!(
                "Row totals: {}\nColumn totals: {}",
                num_list(&row_totals, p),
                num_list(&col_totals, p)
            ))
            .with_formula("G = ΣRᵢ = ΣCⱼ")
            .with_result(num(grand, p)),
    );

    let expected: Vec<Vec<f64>> = row_totals
        .iter()
        .map(|ri| col_totals.iter().map(|cj| ri * cj / grand).collect())
        .collect();
    let mut lines = Vec::with_capacity(r * c);
    for i in 0..r {
        for j in 0..c {
            lines.push(format!(
                "E({}, {}) = {} × {}/{} = {}",
                i + 1,
                j + 1,
                num(row_totals[i], p),
                num(col_totals[j], p),
                num(grand, p),
                num(expected[i][j], p)
            ));
        }
    }
    trace.push(
        Step::new("expected", "Expected frequencies")
            .with_description(lines.join("\n"))
            .with_formula("Eᵢⱼ = Rᵢ·Cⱼ/G"),
    );

    let contributions: Vec<Vec<f64>> = table
        .iter()
        .zip(&expected)
        .map(|(obs, exp)| obs.iter().zip(exp).map(|(&o, &e)| contribution(o, e)).collect())
        .collect();
    let mut lines = Vec::with_capacity(r * c);
    for i in 0..r {
        for j in 0..c {
            lines.push(format!(
                "Cell ({}, {}): {} = {}",
                i + 1,
                j + 1,
                contribution_calc(table[i][j], expected[i][j], p),
                num(contributions[i][j], p)
            ));
        }
    }
    trace.push(
        Step::new("contributions", "Contributions")
            .with_description(lines.join("\n"))
            .with_formula("(O − E)²/E"),
    );

    let chi: f64 = contributions.iter().flatten().sum();
    let terms: Vec<String> = contributions.iter().flatten().map(|x| num(*x, p)).collect();
    trace.push(
        Step::new("chi_square", "Test statistic")
            .with_formula("χ² = ΣΣ(O − E)²/E")
            .with_calculation(sum_terms(&terms))
            .with_result(num(chi, p)),
    );

    let df = (r - 1) * (c - 1);
    trace.push(
        Step::new("degrees_of_freedom", "Degrees of freedom")
            .with_formula("df = (R − 1)(C − 1)")
            .with_calculation(format!("({} − 1)({} − 1)", r, c))
            .with_result(df.to_string()),
    );

    let outcome = finish_chi(&mut trace, chi, df, config);
    let value = IndependenceResult {
        observed: table.to_vec(),
        row_totals,
        col_totals,
        grand_total: grand,
        expected,
        contributions,
        chi_square: chi,
        df,
        outcome,
    };
    Ok(trace.finish(value, "χ² = ΣΣ(O − E)²/E, E = R·C/G", inputs))
}

// ========== Plugins ==========

static GOF_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("observed", "List<Number>", "Observed frequency per category"),
    ArgMeta::optional("expected", "List<Number>", "Expected frequency per category", "uniform"),
    ArgMeta::optional("alpha", "Number", "Significance level", "0.05"),
];
static GOF_EXAMPLES: [&str; 1] =
    ["chi_square_goodness_of_fit(observed: [20,30,25,25], expected: [25,25,25,25]) → χ² = 2"];
static GOF_RELATED: [&str; 2] = ["chi_square_independence", "critical_value"];

pub struct GoodnessOfFit;

impl CalculatorPlugin for GoodnessOfFit {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "chi_square_goodness_of_fit",
            description: "Chi-square goodness-of-fit test; expected defaults to a uniform split",
            usage: "chi_square_goodness_of_fit(observed, expected?, alpha?)",
            args: &GOF_ARGS,
            returns: "GoodnessOfFitResult",
            examples: &GOF_EXAMPLES,
            category: "chi_square",
            related: &GOF_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let observed = args::numbers(a, "observed")?;
        let expected = match a.get("expected") {
            None | Some(Value::Null) => {
                let share = observed.iter().sum::<f64>() / observed.len().max(1) as f64;
                vec![share; observed.len()]
            }
            Some(_) => args::numbers(a, "expected")?,
        };
        Ok(goodness_of_fit(&observed, &expected, &config)?.erase())
    }
}

static INDEPENDENCE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("observed", "List<List<Number>>", "R×C contingency table of counts"),
    ArgMeta::optional("alpha", "Number", "Significance level", "0.05"),
];
static INDEPENDENCE_EXAMPLES: [&str; 1] = ["chi_square_independence(observed: [[10,20],[20,10]]) → χ² = 6.667"];
static INDEPENDENCE_RELATED: [&str; 1] = ["chi_square_goodness_of_fit"];

pub struct Independence;

impl CalculatorPlugin for Independence {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "chi_square_independence",
            description: "Chi-square test of independence on a contingency table",
            usage: "chi_square_independence(observed, alpha?)",
            args: &INDEPENDENCE_ARGS,
            returns: "IndependenceResult",
            examples: &INDEPENDENCE_EXAMPLES,
            category: "chi_square",
            related: &INDEPENDENCE_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let table = args::groups(a, "observed")?;
        Ok(independence(&table, &config)?.erase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;

    #[test]
    fn test_goodness_of_fit() {
        let r = goodness_of_fit(&[20.0, 30.0, 25.0, 25.0], &[25.0; 4], &CalcConfig::default()).unwrap();
        assert_eq!(r.value.df, 3);
        assert!((r.value.chi_square - 2.0).abs() < 1e-12);
        assert_eq!(r.value.contributions, vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(r.value.outcome.critical_value, Some(7.815));
        assert_eq!(r.value.outcome.decision, Decision::FailToReject);
        assert_eq!(r.step("chi_square").unwrap().result.as_deref(), Some("2"));
    }

    #[test]
    fn test_goodness_of_fit_errors() {
        let cfg = CalcConfig::default();
        assert!(goodness_of_fit(&[1.0, 2.0], &[1.0], &cfg).unwrap_err().is(codes::LENGTH_MISMATCH));
        assert!(goodness_of_fit(&[1.0], &[1.0], &cfg).unwrap_err().is(codes::INSUFFICIENT_DATA));
        assert!(goodness_of_fit(&[1.0, 2.0], &[0.0, 3.0], &cfg).unwrap_err().is(codes::NON_POSITIVE_EXPECTED));
        assert!(goodness_of_fit(&[-1.0, 2.0], &[1.0, 3.0], &cfg).unwrap_err().is(codes::NEGATIVE_FREQUENCY));
    }

    #[test]
    fn test_independence() {
        let table = vec![vec![10.0, 20.0], vec![20.0, 10.0]];
        let r = independence(&table, &CalcConfig::default()).unwrap().value;
        assert_eq!(r.grand_total, 60.0);
        assert_eq!(r.expected, vec![vec![15.0, 15.0], vec![15.0, 15.0]]);
        assert!((r.chi_square - 20.0 / 3.0).abs() < 1e-12);
        assert_eq!(r.df, 1);
        assert_eq!(r.outcome.critical_value, Some(3.841));
        assert_eq!(r.outcome.decision, Decision::Reject);
        assert!(r.outcome.p_value < 0.05);
    }

    #[test]
    fn test_independence_errors() {
        let cfg = CalcConfig::default();
        assert!(independence(&[vec![1.0, 2.0]], &cfg).unwrap_err().is(codes::INSUFFICIENT_DATA));
        assert!(independence(&[vec![1.0], vec![2.0]], &cfg).unwrap_err().is(codes::INSUFFICIENT_DATA));
        assert!(independence(&[vec![1.0, 2.0], vec![3.0]], &cfg).unwrap_err().is(codes::LENGTH_MISMATCH));
        assert!(independence(&[vec![1.0, -2.0], vec![3.0, 4.0]], &cfg).unwrap_err().is(codes::NEGATIVE_FREQUENCY));
        assert!(independence(&[vec![0.0, 0.0], vec![0.0, 0.0]], &cfg).unwrap_err().is(codes::NO_DATA));
        assert!(independence(&[vec![0.0, 0.0], vec![3.0, 4.0]], &cfg).unwrap_err().is(codes::NON_POSITIVE_EXPECTED));
        assert!(independence(&[vec![0.0, 2.0], vec![0.0, 4.0]], &cfg).unwrap_err().is(codes::NON_POSITIVE_EXPECTED));
    }

    #[test]
    fn test_untabulated_alpha_uses_quantile() {
        let cfg = CalcConfig::default().with_alpha(0.2).unwrap();
        let r = goodness_of_fit(&[20.0, 30.0, 25.0, 25.0], &[25.0; 4], &cfg).unwrap().value;
        let crit = r.outcome.critical_value.unwrap();
        assert!((crit - 4.642).abs() < 0.01);
    }

    #[test]
    fn test_gof_plugin_defaults_to_uniform() {
        let args = Value::from(serde_json::json!({"observed": [20, 30, 25, 25]}));
        let r = GoodnessOfFit.call(&args, &CalcContext::default()).unwrap();
        assert_eq!(r.value.get("chi_square").and_then(Value::as_number), Some(2.0));
        assert_eq!(r.value.get("df").and_then(Value::as_number), Some(3.0));
    }
}
