//! One-way ANOVA
//!
//! Raw-score method: the correction factor CF = G²/N is subtracted from the
//! raw sums of squares, and the within-groups SS is always SST − SSB so the
//! decomposition adds up exactly.

use crate::decision::{conclude, hypotheses_step, Outcome, TestStatistic};
use crate::distributions::f_cdf;
use crate::primitives::{sum, sum_of_squares};
use crate::tables::f_critical;
use serde::Serialize;
use workings_plugin::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub n: usize,
    pub sum: f64,
    pub mean: f64,
    pub sum_sq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneWayResult {
    pub groups: Vec<GroupStats>,
    pub grand_sum: f64,
    pub grand_n: usize,
    pub correction_factor: f64,
    pub ss_between: f64,
    pub df_between: usize,
    pub ms_between: f64,
    pub ss_within: f64,
    pub df_within: usize,
    pub ms_within: f64,
    pub f_stat: f64,
    pub total_ss: f64,
    pub total_df: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// MS = SS/df, or 0 when there are no degrees of freedom.
pub(crate) fn mean_square(ss: f64, df: usize) -> f64 {
    if df == 0 {
        0.0
    } else {
        ss / df as f64
    }
}

pub fn one_way_anova(groups: &[Vec<f64>], config: &CalcConfig) -> Result<CalculationResult<OneWayResult>, StatsError> {
    let p = config.precision;
    let inputs = Value::object([("groups", Value::from(groups))]);

    let non_empty: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    let grand_n: usize = non_empty.iter().map(|g| g.len()).sum();
    if grand_n == 0 {
        return Err(StatsError::no_data());
    }
    if non_empty.len() < 2 {
        return Err(StatsError::insufficient_groups(non_empty.len()));
    }
    let k = non_empty.len();

    let mut trace = Trace::new();
    trace.push(hypotheses_step(
        &format!("all {} group means are equal", k),
        "at least one group mean differs",
        config,
    ));

    let stats: Vec<GroupStats> = non_empty
        .iter()
        .map(|g| {
            let s = sum(g);
            GroupStats {
                n: g.len(),
                sum: s,
                mean: s / g.len() as f64,
                sum_sq: sum_of_squares(g),
            }
        })
        .collect();

    let lines: Vec<String> = stats
        .iter()
        .enumerate()
        .map(|(i, g)| {
            format!(
                "Group {}: n = {}, T = ΣX = {}, X̄ = {}, ΣX² = {}",
                i + 1,
                g.n,
                num(g.sum, p),
                num(g.mean, p),
                num(g.sum_sq, p)
            )
        })
        .collect();
    let mut group_step = Step::new("group_totals", "Group totals")
        .with_description(lines.join("\n"))
        .with_formula("Tᵢ = ΣXᵢ, X̄ᵢ = Tᵢ/nᵢ");
    let skipped = groups.len() - k;
    if skipped > 0 {
        group_step = group_step.with_note(format!("{} empty group(s) ignored", skipped));
    }
    trace.push(group_step);

    let grand_sum: f64 = stats.iter().map(|g| g.sum).sum();
    let raw_sum_sq: f64 = stats.iter().map(|g| g.sum_sq).sum();
    trace.push(
        Step::new("grand_total", "Grand total")
            .with_description(format!("N = {} observations in {} groups, ΣX² = {}", grand_n, k, num(raw_sum_sq, p)))
            .with_formula("G = ΣTᵢ")
            .with_calculation(sum_terms(&stats.iter().map(|g| num(g.sum, p)).collect::<Vec<_>>()))
            .with_result(num(grand_sum, p)),
    );

    let cf = grand_sum * grand_sum / grand_n as f64;
    trace.push(
        Step::new("correction_factor", "Correction factor")
            .with_formula("CF = G²/N")
            .with_calculation(format!("{}²/{}", paren(grand_sum, p), grand_n))
            .with_result(num(cf, p)),
    );

    let total_ss = raw_sum_sq - cf;
    trace.push(
        Step::new("ss_total", "Total sum of squares")
            .with_formula("SST = ΣX² − CF")
            .with_calculation(format!("{} − {}", num(raw_sum_sq, p), num(cf, p)))
            .with_result(num(total_ss, p)),
    );

    let between_raw: f64 = stats.iter().map(|g| g.sum * g.sum / g.n as f64).sum();
    let ss_between = between_raw - cf;
    let terms: Vec<String> = stats
        .iter()
        .map(|g| format!("{}²/{}", paren(g.sum, p), g.n))
        .collect();
    trace.push(
        Step::new("ss_between", "Between-groups sum of squares")
            .with_formula("SSB = Σ(Tᵢ²/nᵢ) − CF")
            .with_calculation(format!("({}) − {}", sum_terms(&terms), num(cf, p)))
            .with_result(num(ss_between, p)),
    );

    let ss_within = total_ss - ss_between;
    trace.push(
        Step::new("ss_within", "Within-groups sum of squares")
            .with_formula("SSW = SST − SSB")
            .with_calculation(format!("{} − {}", num(total_ss, p), num(ss_between, p)))
            .with_result(num(ss_within, p)),
    );

    let df_between = k - 1;
    let df_within = grand_n - k;
    let total_df = grand_n - 1;
    trace.push(
        Step::new("degrees_of_freedom", "Degrees of freedom")
            .with_formula("dfB = k − 1, dfW = N − k, dfT = N − 1")
            .with_calculation(format!(
                "dfB = {} − 1 = {}, dfW = {} − {} = {}, dfT = {} − 1 = {}",
                k, df_between, grand_n, k, df_within, grand_n, total_df
            ))
            .with_result(format!("dfB = {}, dfW = {}", df_between, df_within)),
    );

    let ms_between = mean_square(ss_between, df_between);
    let ms_within = mean_square(ss_within, df_within);
    let mut ms_step = Step::new("mean_squares", "Mean squares")
        .with_formula("MSB = SSB/dfB, MSW = SSW/dfW")
        .with_calculation(format!(
            "MSB = {}/{} = {}, MSW = {}/{} = {}",
            num(ss_between, p),
            df_between,
            num(ms_between, p),
            num(ss_within, p),
            df_within,
            num(ms_within, p)
        ))
        .with_result(format!("MSB = {}, MSW = {}", num(ms_between, p), num(ms_within, p)));
    if df_within == 0 {
        ms_step = ms_step.with_note("Every group has one observation, so dfW = 0 and MSW is taken as 0");
    }
    trace.push(ms_step);

    let f_stat = if ms_within == 0.0 { 0.0 } else { ms_between / ms_within };
    let mut f_step = Step::new("f_statistic", "F statistic")
        .with_formula("F = MSB/MSW")
        .with_calculation(format!("{}/{}", num(ms_between, p), num(ms_within, p)))
        .with_result(num(f_stat, p));
    if ms_within == 0.0 {
        f_step = f_step.with_note("MSW = 0, so F is reported as 0");
    }
    trace.push(f_step);

    let p_value = if df_within == 0 || ms_within == 0.0 {
        1.0
    } else {
        1.0 - f_cdf(f_stat, df_between as f64, df_within as f64)
    };
    let outcome = conclude(
        &mut trace,
        TestStatistic {
            symbol: "F",
            table: "F",
            value: f_stat,
            df: format!("({}, {})", df_between, df_within),
            tails: Tails::Upper,
            lookup: f_critical(df_between, df_within, config.alpha),
            p_value,
            effect: None,
        },
        config,
    );

    let value = OneWayResult {
        groups: stats,
        grand_sum,
        grand_n,
        correction_factor: cf,
        ss_between,
        df_between,
        ms_between,
        ss_within,
        df_within,
        ms_within,
        f_stat,
        total_ss,
        total_df,
        outcome,
    };
    Ok(trace.finish(value, "F = MSB / MSW", inputs))
}

pub struct OneWayAnova;

static ONE_WAY_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("groups", "List<List<Number>>", "Two or more groups of observations"),
    ArgMeta::optional("alpha", "Number", "Significance level", "0.05"),
];

static ONE_WAY_EXAMPLES: [&str; 1] = ["one_way_anova(groups: [[1,2,3],[4,5,6],[7,8,9]]) → F = 27"];

static ONE_WAY_RELATED: [&str; 2] = ["two_way_anova", "t_test_independent"];

impl CalculatorPlugin for OneWayAnova {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "one_way_anova",
            description: "One-way analysis of variance by the raw-score method",
            usage: "one_way_anova(groups, alpha?)",
            args: &ONE_WAY_ARGS,
            returns: "OneWayResult",
            examples: &ONE_WAY_EXAMPLES,
            category: "anova",
            related: &ONE_WAY_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let groups = args::groups(a, "groups")?;
        Ok(one_way_anova(&groups, &config)?.erase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;

    fn three_groups() -> Vec<Vec<f64>> {
        vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]]
    }

    #[test]
    fn test_textbook_groups() {
        let r = one_way_anova(&three_groups(), &CalcConfig::default()).unwrap().value;
        assert_eq!(r.df_between, 2);
        assert_eq!(r.df_within, 6);
        assert!((r.correction_factor - 225.0).abs() < 1e-9);
        assert!((r.ss_between - 54.0).abs() < 1e-9);
        // Each group deviates 1, 0, 1 from its mean
        assert!((r.ss_within - 6.0).abs() < 1e-9);
        assert!((r.f_stat - 27.0).abs() < 1e-9);
        assert!((r.outcome.critical_value.unwrap() - 5.143).abs() < 0.001);
        assert_eq!(r.outcome.decision, Decision::Reject);
    }

    #[test]
    fn test_ss_and_df_additivity() {
        let groups = vec![
            vec![12.5, 14.1, 9.8, 11.0],
            vec![15.2, 16.8, 14.9],
            vec![10.1, 9.7, 12.2, 11.9, 10.4],
        ];
        let r = one_way_anova(&groups, &CalcConfig::default()).unwrap().value;
        let lhs = r.total_ss;
        let rhs = r.ss_between + r.ss_within;
        assert!((lhs - rhs).abs() <= 1e-6 * lhs.abs().max(1.0));
        assert_eq!(r.total_df, r.df_between + r.df_within);
    }

    #[test]
    fn test_errors() {
        let err = one_way_anova(&[vec![], vec![]], &CalcConfig::default()).unwrap_err();
        assert!(err.is(codes::NO_DATA));
        let err = one_way_anova(&[vec![1.0, 2.0], vec![]], &CalcConfig::default()).unwrap_err();
        assert!(err.is(codes::INSUFFICIENT_GROUPS));
    }

    #[test]
    fn test_single_observation_groups_guarded() {
        let r = one_way_anova(&[vec![1.0], vec![5.0]], &CalcConfig::default()).unwrap();
        assert_eq!(r.value.df_within, 0);
        assert_eq!(r.value.ms_within, 0.0);
        assert_eq!(r.value.f_stat, 0.0);
        assert!(r.value.f_stat.is_finite());
        assert_eq!(r.last_step().and_then(|s| s.result.as_deref()), Some("Fail to reject H₀"));
    }

    #[test]
    fn test_trace_round_trips_to_value() {
        let config = CalcConfig::default();
        let r = one_way_anova(&three_groups(), &config).unwrap();
        for (id, expected) in [
            ("correction_factor", r.value.correction_factor),
            ("ss_between", r.value.ss_between),
            ("ss_within", r.value.ss_within),
            ("f_statistic", r.value.f_stat),
        ] {
            let shown: f64 = r.step(id).and_then(|s| s.result.as_deref()).unwrap().parse().unwrap();
            assert!((shown - expected).abs() <= 10f64.powi(-(config.precision as i32)), "{}", id);
        }
    }

    #[test]
    fn test_idempotent() {
        let a = one_way_anova(&three_groups(), &CalcConfig::default()).unwrap();
        let b = one_way_anova(&three_groups(), &CalcConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_plugin_call() {
        let args = Value::from(serde_json::json!({"groups": [[1, 2, 3], [4, 5, 6], [7, 8, 9]]}));
        let r = OneWayAnova.call(&args, &CalcContext::default()).unwrap();
        assert_eq!(r.value.get("f_stat").and_then(|v| v.as_number()), Some(27.0));
        assert_eq!(r.value.get("decision").and_then(|v| v.as_text()), Some("reject"));
    }
}
