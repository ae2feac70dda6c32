//! Two-way ANOVA with replication
//!
//! Balanced R×C designs with n replicates per cell, by the deviation method.
//! The interaction SS is what remains of the total after rows, columns and
//! error are taken out.

use crate::anova::mean_square;
use crate::decision::{conclude, hypotheses_step, Outcome, TestStatistic};
use crate::distributions::f_cdf;
use crate::primitives::{sum, sum_sq_dev};
use crate::tables::f_critical;
use serde::Serialize;
use workings_plugin::prelude::*;

/// Below this the error mean square is treated as zero
const MSE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTerm {
    pub ss: f64,
    pub df: usize,
    pub ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectTest {
    pub ss: f64,
    pub df: usize,
    pub ms: f64,
    pub f_stat: f64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwoWayResult {
    pub rows: usize,
    pub columns: usize,
    pub replicates: usize,
    pub grand_sum: f64,
    pub grand_mean: f64,
    pub row_sums: Vec<f64>,
    pub row_means: Vec<f64>,
    pub col_sums: Vec<f64>,
    pub col_means: Vec<f64>,
    pub cell_sums: Vec<Vec<f64>>,
    pub cell_means: Vec<Vec<f64>>,
    pub cell_ss_within: Vec<Vec<f64>>,
    pub row_effect: EffectTest,
    pub column_effect: EffectTest,
    pub interaction: EffectTest,
    pub error: SourceTerm,
    pub total: SourceTerm,
}

/// Check the grid is a balanced design and return (R, C, n).
fn validate(grid: &[Vec<Vec<f64>>]) -> Result<(usize, usize, usize), StatsError> {
    let r = grid.len();
    if r < 2 {
        return Err(StatsError::insufficient_design(format!("need at least 2 rows, got {}", r)));
    }
    let c = grid[0].len();
    if let Some((i, row)) = grid.iter().enumerate().find(|(_, row)| row.len() != c) {
        return Err(StatsError::unbalanced_design(format!(
            "row {} has {} cells but row 1 has {}",
            i + 1,
            row.len(),
            c
        )));
    }
    if c < 2 {
        return Err(StatsError::insufficient_design(format!("need at least 2 columns, got {}", c)));
    }
    let n = grid[0][0].len();
    for (i, row) in grid.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            if cell.len() != n {
                return Err(StatsError::unbalanced_design(format!(
                    "cell ({}, {}) has {} replicates but cell (1, 1) has {}",
                    i + 1,
                    j + 1,
                    cell.len(),
                    n
                )));
            }
        }
    }
    if n < 2 {
        return Err(StatsError::insufficient_design(format!(
            "need at least 2 replicates per cell, got {}",
            n
        )));
    }
    Ok((r, c, n))
}

fn squared_deviations(means: &[f64], grand_mean: f64, p: usize) -> String {
    means
        .iter()
        .map(|m| format!("({} − {})²", num(*m, p), num(grand_mean, p)))
        .collect::<Vec<_>>()
        .join(" + ")
}

pub fn two_way_anova(grid: &[Vec<Vec<f64>>], config: &CalcConfig) -> Result<CalculationResult<TwoWayResult>, StatsError> {
    let p = config.precision;
    let inputs = Value::object([("cells", Value::from(grid))]);
    let (r, c, n) = validate(grid)?;
    let big_n = r * c * n;

    let mut trace = Trace::new();
    trace.push(hypotheses_step(
        "no row effect; no column effect; no row × column interaction",
        "the corresponding effect is present",
        config,
    ));

    let cell_sums: Vec<Vec<f64>> = grid.iter().map(|row| row.iter().map(|cell| sum(cell)).collect()).collect();
    let cell_means: Vec<Vec<f64>> = cell_sums
        .iter()
        .map(|row| row.iter().map(|s| s / n as f64).collect())
        .collect();
    let mut lines = Vec::with_capacity(r * c);
    for i in 0..r {
        for j in 0..c {
            lines.push(format!(
                "Cell ({}, {}): sum = {}, mean = {}",
                i + 1,
                j + 1,
                num(cell_sums[i][j], p),
                num(cell_means[i][j], p)
            ));
        }
    }
    trace.push(
        Step::new("cell_means", "Cell means")
            .with_description(lines.join("\n"))
            .with_formula("cell mean = cell sum / n")
            .with_note(format!("{} rows × {} columns × {} replicates", r, c, n)),
    );

    let row_sums: Vec<f64> = cell_sums.iter().map(|row| row.iter().sum()).collect();
    let col_sums: Vec<f64> = (0..c).map(|j| cell_sums.iter().map(|row| row[j]).sum()).collect();
    let grand_sum: f64 = row_sums.iter().sum();
    let grand_mean = grand_sum / big_n as f64;
    let row_means: Vec<f64> = row_sums.iter().map(|s| s / (c * n) as f64).collect();
    let col_means: Vec<f64> = col_sums.iter().map(|s| s / (r * n) as f64).collect();
    trace.push(
        Step::new("marginal_means", "Row, column and grand means")
            .with_description(format!(
                "Row means: {}\nColumn means: {}",
                num_list(&row_means, p),
                num_list(&col_means, p)
            ))
            .with_formula("row mean = row sum/(C·n), column mean = column sum/(R·n), x̄ = G/N")
            .with_calculation(format!("x̄ = {}/{}", num(grand_sum, p), big_n))
            .with_result(num(grand_mean, p)),
    );

    let total_ss: f64 = grid
        .iter()
        .flat_map(|row| row.iter())
        .map(|cell| sum_sq_dev(cell, grand_mean))
        .sum();
    trace.push(
        Step::new("ss_total", "Total sum of squares")
            .with_formula("SST = Σ(x − x̄)²")
            .with_calculation(format!("sum over all {} observations of (x − {})²", big_n, num(grand_mean, p)))
            .with_result(num(total_ss, p)),
    );

    let row_factor = (c * n) as f64;
    let ss_rows = row_factor * sum_sq_dev(&row_means, grand_mean);
    trace.push(
        Step::new("ss_rows", "Rows sum of squares")
            .with_formula("SSR = C·n·Σ(row mean − x̄)²")
            .with_calculation(format!("{} × [{}]", row_factor, squared_deviations(&row_means, grand_mean, p)))
            .with_result(num(ss_rows, p)),
    );

    let col_factor = (r * n) as f64;
    let ss_cols = col_factor * sum_sq_dev(&col_means, grand_mean);
    trace.push(
        Step::new("ss_columns", "Columns sum of squares")
            .with_formula("SSC = R·n·Σ(column mean − x̄)²")
            .with_calculation(format!("{} × [{}]", col_factor, squared_deviations(&col_means, grand_mean, p)))
            .with_result(num(ss_cols, p)),
    );

    let cell_ss_within: Vec<Vec<f64>> = grid
        .iter()
        .zip(&cell_means)
        .map(|(row, means)| row.iter().zip(means).map(|(cell, m)| sum_sq_dev(cell, *m)).collect())
        .collect();
    let ss_error: f64 = cell_ss_within.iter().flatten().sum();
    let cell_terms: Vec<String> = cell_ss_within.iter().flatten().map(|s| num(*s, p)).collect();
    trace.push(
        Step::new("ss_error", "Error (within-cell) sum of squares")
            .with_formula("SSE = ΣΣ(x − cell mean)²")
            .with_calculation(sum_terms(&cell_terms))
            .with_result(num(ss_error, p)),
    );

    let ss_interaction = total_ss - ss_rows - ss_cols - ss_error;
    trace.push(
        Step::new("ss_interaction", "Interaction sum of squares")
            .with_formula("SSI = SST − SSR − SSC − SSE")
            .with_calculation(format!(
                "{} − {} − {} − {}",
                num(total_ss, p),
                num(ss_rows, p),
                num(ss_cols, p),
                num(ss_error, p)
            ))
            .with_result(num(ss_interaction, p)),
    );

    let df_rows = r - 1;
    let df_cols = c - 1;
    let df_interaction = df_rows * df_cols;
    let df_error = r * c * (n - 1);
    let df_total = big_n - 1;
    trace.push(
        Step::new("degrees_of_freedom", "Degrees of freedom")
            .with_formula("R − 1, C − 1, (R − 1)(C − 1), RC(n − 1), N − 1")
            .with_calculation(format!(
                "rows {}, columns {}, interaction {}, error {}, total {}",
                df_rows, df_cols, df_interaction, df_error, df_total
            ))
            .with_result(format!(
                "{} + {} + {} + {} = {}",
                df_rows, df_cols, df_interaction, df_error, df_total
            )),
    );

    let ms_rows = mean_square(ss_rows, df_rows);
    let ms_cols = mean_square(ss_cols, df_cols);
    let ms_interaction = mean_square(ss_interaction, df_interaction);
    let ms_error = mean_square(ss_error, df_error);
    trace.push(
        Step::new("mean_squares", "Mean squares")
            .with_formula("MS = SS/df")
            .with_calculation(format!(
                "MSR = {}/{}, MSC = {}/{}, MSI = {}/{}, MSE = {}/{}",
                num(ss_rows, p),
                df_rows,
                num(ss_cols, p),
                df_cols,
                num(ss_interaction, p),
                df_interaction,
                num(ss_error, p),
                df_error
            ))
            .with_result(format!(
                "MSR = {}, MSC = {}, MSI = {}, MSE = {}",
                num(ms_rows, p),
                num(ms_cols, p),
                num(ms_interaction, p),
                num(ms_error, p)
            )),
    );

    let degenerate = ms_error.abs() < MSE_EPSILON;
    let ratio = |ms: f64| if degenerate { 0.0 } else { ms / ms_error };
    let effects = [
        ("rows", "F (rows)", "MSR", ss_rows, df_rows, ms_rows),
        ("columns", "F (columns)", "MSC", ss_cols, df_cols, ms_cols),
        ("interaction", "F (interaction)", "MSI", ss_interaction, df_interaction, ms_interaction),
    ];
    let mut f_stats = Vec::with_capacity(3);
    for (key, title, ms_label, _, _, ms) in effects.iter() {
        let f = ratio(*ms);
        let mut step = Step::new(format!("f_{}", key), *title)
            .with_formula(format!("F = {}/MSE", ms_label))
            .with_calculation(format!("{}/{}", num(*ms, p), num(ms_error, p)))
            .with_result(num(f, p));
        if degenerate {
            step = step.with_note("MSE is zero, so F is reported as 0");
        }
        trace.push(step);
        f_stats.push(f);
    }

    let mut tests = Vec::with_capacity(3);
    for ((key, _, _, ss, df, ms), f) in effects.iter().zip(&f_stats) {
        let p_value = if degenerate {
            1.0
        } else {
            1.0 - f_cdf(*f, *df as f64, df_error as f64)
        };
        let outcome = conclude(
            &mut trace,
            TestStatistic {
                symbol: "F",
                table: "F",
                value: *f,
                df: format!("({}, {})", df, df_error),
                tails: Tails::Upper,
                lookup: f_critical(*df, df_error, config.alpha),
                p_value,
                effect: Some(*key),
            },
            config,
        );
        tests.push(EffectTest {
            ss: *ss,
            df: *df,
            ms: *ms,
            f_stat: *f,
            outcome,
        });
    }
    let mut tests = tests.into_iter();
    let (Some(row_effect), Some(column_effect), Some(interaction)) = (tests.next(), tests.next(), tests.next()) else {
        return Err(StatsError::invalid_input("two-way design produced fewer than three effects"));
    };

    let value = TwoWayResult {
        rows: r,
        columns: c,
        replicates: n,
        grand_sum,
        grand_mean,
        row_sums,
        row_means,
        col_sums,
        col_means,
        cell_sums,
        cell_means,
        cell_ss_within,
        row_effect,
        column_effect,
        interaction,
        error: SourceTerm {
            ss: ss_error,
            df: df_error,
            ms: ms_error,
        },
        total: SourceTerm {
            ss: total_ss,
            df: df_total,
            ms: mean_square(total_ss, df_total),
        },
    };
    Ok(trace.finish(value, "F = MS(effect) / MSE", inputs))
}

pub struct TwoWayAnova;

static TWO_WAY_ARGS: [ArgMeta; 2] = [
    ArgMeta::required(
        "cells",
        "List<List<List<Number>>>",
        "cells[row][column] = replicate observations; every cell the same size",
    ),
    ArgMeta::optional("alpha", "Number", "Significance level", "0.05"),
];

static TWO_WAY_EXAMPLES: [&str; 1] =
    ["two_way_anova(cells: [[[4,5],[6,7]],[[8,9],[5,6]]]) → row, column and interaction F"];

static TWO_WAY_RELATED: [&str; 1] = ["one_way_anova"];

impl CalculatorPlugin for TwoWayAnova {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "two_way_anova",
            description: "Two-way ANOVA with replication for balanced designs",
            usage: "two_way_anova(cells, alpha?)",
            args: &TWO_WAY_ARGS,
            returns: "TwoWayResult",
            examples: &TWO_WAY_EXAMPLES,
            category: "anova",
            related: &TWO_WAY_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let grid = args::grid(a, "cells")?;
        Ok(two_way_anova(&grid, &config)?.erase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design() -> Vec<Vec<Vec<f64>>> {
        vec![
            vec![vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0], vec![5.0, 5.5, 6.5]],
            vec![vec![6.0, 7.0, 8.0], vec![5.0, 6.0, 4.0], vec![9.0, 10.0, 11.5]],
        ]
    }

    #[test]
    fn test_ss_decomposition() {
        let r = two_way_anova(&design(), &CalcConfig::default()).unwrap().value;
        let parts = r.row_effect.ss + r.column_effect.ss + r.interaction.ss + r.error.ss;
        assert!((r.total.ss - parts).abs() <= 1e-6 * r.total.ss.abs().max(1.0));
    }

    #[test]
    fn test_df_additivity() {
        let r = two_way_anova(&design(), &CalcConfig::default()).unwrap().value;
        assert_eq!(r.row_effect.df, 1);
        assert_eq!(r.column_effect.df, 2);
        assert_eq!(r.interaction.df, 2);
        assert_eq!(r.error.df, 12);
        assert_eq!(
            r.total.df,
            r.row_effect.df + r.column_effect.df + r.interaction.df + r.error.df
        );
    }

    #[test]
    fn test_known_values() {
        // 2×2, n = 2: rows differ by 4, no column effect, no interaction
        let grid = vec![
            vec![vec![1.0, 3.0], vec![1.0, 3.0]],
            vec![vec![5.0, 7.0], vec![5.0, 7.0]],
        ];
        let r = two_way_anova(&grid, &CalcConfig::default()).unwrap().value;
        assert!((r.grand_mean - 4.0).abs() < 1e-12);
        assert!((r.row_effect.ss - 32.0).abs() < 1e-9);
        assert!(r.column_effect.ss.abs() < 1e-9);
        assert!(r.interaction.ss.abs() < 1e-9);
        assert!((r.error.ss - 8.0).abs() < 1e-9);
        // MSE = 8/4 = 2, F rows = 32/2 = 16
        assert!((r.row_effect.f_stat - 16.0).abs() < 1e-9);
        assert_eq!(r.cell_ss_within[0][0], 2.0);
    }

    #[test]
    fn test_zero_error_variance_guarded() {
        let grid = vec![
            vec![vec![1.0, 1.0], vec![2.0, 2.0]],
            vec![vec![3.0, 3.0], vec![4.0, 4.0]],
        ];
        let r = two_way_anova(&grid, &CalcConfig::default()).unwrap().value;
        assert_eq!(r.row_effect.f_stat, 0.0);
        assert_eq!(r.interaction.f_stat, 0.0);
    }

    #[test]
    fn test_design_errors() {
        let cfg = CalcConfig::default();
        let one_row = vec![vec![vec![1.0, 2.0], vec![3.0, 4.0]]];
        assert!(two_way_anova(&one_row, &cfg).unwrap_err().is(codes::INSUFFICIENT_DESIGN));

        let one_col = vec![vec![vec![1.0, 2.0]], vec![vec![3.0, 4.0]]];
        assert!(two_way_anova(&one_col, &cfg).unwrap_err().is(codes::INSUFFICIENT_DESIGN));

        let single_rep = vec![vec![vec![1.0], vec![2.0]], vec![vec![3.0], vec![4.0]]];
        assert!(two_way_anova(&single_rep, &cfg).unwrap_err().is(codes::INSUFFICIENT_DESIGN));

        let ragged = vec![vec![vec![1.0, 2.0], vec![3.0, 4.0]], vec![vec![5.0, 6.0], vec![7.0]]];
        assert!(two_way_anova(&ragged, &cfg).unwrap_err().is(codes::UNBALANCED_DESIGN));

        let short_row = vec![vec![vec![1.0, 2.0], vec![3.0, 4.0]], vec![vec![5.0, 6.0]]];
        assert!(two_way_anova(&short_row, &cfg).unwrap_err().is(codes::UNBALANCED_DESIGN));
    }

    #[test]
    fn test_trace_ends_with_interaction_decision() {
        let r = two_way_anova(&design(), &CalcConfig::default()).unwrap();
        let last = r.last_step().unwrap();
        assert_eq!(last.id, "decision_interaction");
        assert!(matches!(last.result.as_deref(), Some("Reject H₀") | Some("Fail to reject H₀")));
        assert!(r.step("decision_rows").is_some());
        assert!(r.step("decision_columns").is_some());
    }
}
