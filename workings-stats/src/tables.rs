//! Critical value tables
//!
//! Printed-table values for t (one-tail area) and chi-square (upper-tail α).
//! Between tabulated df rows the value is interpolated linearly; tail areas
//! that have no column fall back to the analytic quantile. Beyond the last
//! row there is no value at all: lookups return `None` and never extrapolate.

use crate::distributions::{chi_inv, f_inv, t_inv};
use serde::Serialize;
use workings_plugin::prelude::*;

/// How a critical value was obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LookupMethod {
    Table,
    Interpolated { lower_df: usize, upper_df: usize },
    Quantile,
}

impl LookupMethod {
    pub fn name(&self) -> &'static str {
        match self {
            LookupMethod::Table => "table",
            LookupMethod::Interpolated { .. } => "interpolated",
            LookupMethod::Quantile => "quantile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalValue {
    pub value: f64,
    pub method: LookupMethod,
}

pub struct CriticalTable {
    pub name: &'static str,
    /// Tail areas, one per column
    pub columns: [f64; 5],
    pub rows: &'static [(usize, [f64; 5])],
    /// Analytic upper-tail quantile: (tail area, df) → value
    quantile: fn(f64, f64) -> f64,
}

impl CriticalTable {
    pub fn max_df(&self) -> usize {
        self.rows.last().map(|(df, _)| *df).unwrap_or(0)
    }

    fn column(&self, tail_area: f64) -> Option<usize> {
        self.columns.iter().position(|c| (c - tail_area).abs() < 1e-9)
    }

    pub fn lookup(&self, df: usize, tail_area: f64) -> Option<CriticalValue> {
        if df == 0 || df > self.max_df() || !(tail_area > 0.0 && tail_area < 1.0) {
            return None;
        }

        let Some(col) = self.column(tail_area) else {
            return Some(CriticalValue {
                value: (self.quantile)(tail_area, df as f64),
                method: LookupMethod::Quantile,
            });
        };

        // First row at or above the requested df
        let upper = self.rows.iter().position(|(row_df, _)| *row_df >= df)?;
        let (upper_df, upper_vals) = self.rows[upper];
        if upper_df == df || upper == 0 {
            return Some(CriticalValue {
                value: upper_vals[col],
                method: LookupMethod::Table,
            });
        }

        let (lower_df, lower_vals) = self.rows[upper - 1];
        let fraction = (df - lower_df) as f64 / (upper_df - lower_df) as f64;
        Some(CriticalValue {
            value: lower_vals[col] + fraction * (upper_vals[col] - lower_vals[col]),
            method: LookupMethod::Interpolated { lower_df, upper_df },
        })
    }
}

fn t_upper_quantile(tail_area: f64, df: f64) -> f64 {
    t_inv(1.0 - tail_area, df)
}

fn chi_upper_quantile(tail_area: f64, df: f64) -> f64 {
    chi_inv(1.0 - tail_area, df)
}

pub static T_TABLE: CriticalTable = CriticalTable {
    name: "t",
    columns: [0.10, 0.05, 0.025, 0.01, 0.005],
    rows: &[
        (1, [3.078, 6.314, 12.706, 31.821, 63.657]),
        (2, [1.886, 2.920, 4.303, 6.965, 9.925]),
        (3, [1.638, 2.353, 3.182, 4.541, 5.841]),
        (4, [1.533, 2.132, 2.776, 3.747, 4.604]),
        (5, [1.476, 2.015, 2.571, 3.365, 4.032]),
        (6, [1.440, 1.943, 2.447, 3.143, 3.707]),
        (7, [1.415, 1.895, 2.365, 2.998, 3.499]),
        (8, [1.397, 1.860, 2.306, 2.896, 3.355]),
        (9, [1.383, 1.833, 2.262, 2.821, 3.250]),
        (10, [1.372, 1.812, 2.228, 2.764, 3.169]),
        (11, [1.363, 1.796, 2.201, 2.718, 3.106]),
        (12, [1.356, 1.782, 2.179, 2.681, 3.055]),
        (13, [1.350, 1.771, 2.160, 2.650, 3.012]),
        (14, [1.345, 1.761, 2.145, 2.624, 2.977]),
        (15, [1.341, 1.753, 2.131, 2.602, 2.947]),
        (16, [1.337, 1.746, 2.120, 2.583, 2.921]),
        (17, [1.333, 1.740, 2.110, 2.567, 2.898]),
        (18, [1.330, 1.734, 2.101, 2.552, 2.878]),
        (19, [1.328, 1.729, 2.093, 2.539, 2.861]),
        (20, [1.325, 1.725, 2.086, 2.528, 2.845]),
        (21, [1.323, 1.721, 2.080, 2.518, 2.831]),
        (22, [1.321, 1.717, 2.074, 2.508, 2.819]),
        (23, [1.319, 1.714, 2.069, 2.500, 2.807]),
        (24, [1.318, 1.711, 2.064, 2.492, 2.797]),
        (25, [1.316, 1.708, 2.060, 2.485, 2.787]),
        (26, [1.315, 1.706, 2.056, 2.479, 2.779]),
        (27, [1.314, 1.703, 2.052, 2.473, 2.771]),
        (28, [1.313, 1.701, 2.048, 2.467, 2.763]),
        (29, [1.311, 1.699, 2.045, 2.462, 2.756]),
        (30, [1.310, 1.697, 2.042, 2.457, 2.750]),
        (40, [1.303, 1.684, 2.021, 2.423, 2.704]),
        (50, [1.299, 1.676, 2.009, 2.403, 2.678]),
        (60, [1.296, 1.671, 2.000, 2.390, 2.660]),
        (80, [1.292, 1.664, 1.990, 2.374, 2.639]),
        (100, [1.290, 1.660, 1.984, 2.364, 2.626]),
        (120, [1.289, 1.658, 1.980, 2.358, 2.617]),
    ],
    quantile: t_upper_quantile,
};

pub static CHI_SQUARE_TABLE: CriticalTable = CriticalTable {
    name: "chi-square",
    columns: [0.10, 0.05, 0.025, 0.01, 0.005],
    rows: &[
        (1, [2.706, 3.841, 5.024, 6.635, 7.879]),
        (2, [4.605, 5.991, 7.378, 9.210, 10.597]),
        (3, [6.251, 7.815, 9.348, 11.345, 12.838]),
        (4, [7.779, 9.488, 11.143, 13.277, 14.860]),
        (5, [9.236, 11.070, 12.833, 15.086, 16.750]),
        (6, [10.645, 12.592, 14.449, 16.812, 18.548]),
        (7, [12.017, 14.067, 16.013, 18.475, 20.278]),
        (8, [13.362, 15.507, 17.535, 20.090, 21.955]),
        (9, [14.684, 16.919, 19.023, 21.666, 23.589]),
        (10, [15.987, 18.307, 20.483, 23.209, 25.188]),
        (11, [17.275, 19.675, 21.920, 24.725, 26.757]),
        (12, [18.549, 21.026, 23.337, 26.217, 28.300]),
        (13, [19.812, 22.362, 24.736, 27.688, 29.819]),
        (14, [21.064, 23.685, 26.119, 29.141, 31.319]),
        (15, [22.307, 24.996, 27.488, 30.578, 32.801]),
        (16, [23.542, 26.296, 28.845, 32.000, 34.267]),
        (17, [24.769, 27.587, 30.191, 33.409, 35.718]),
        (18, [25.989, 28.869, 31.526, 34.805, 37.156]),
        (19, [27.204, 30.144, 32.852, 36.191, 38.582]),
        (20, [28.412, 31.410, 34.170, 37.566, 39.997]),
        (21, [29.615, 32.671, 35.479, 38.932, 41.401]),
        (22, [30.813, 33.924, 36.781, 40.289, 42.796]),
        (23, [32.007, 35.172, 38.076, 41.638, 44.181]),
        (24, [33.196, 36.415, 39.364, 42.980, 45.559]),
        (25, [34.382, 37.652, 40.646, 44.314, 46.928]),
        (26, [35.563, 38.885, 41.923, 45.642, 48.290]),
        (27, [36.741, 40.113, 43.195, 46.963, 49.645]),
        (28, [37.916, 41.337, 44.461, 48.278, 50.993]),
        (29, [39.087, 42.557, 45.722, 49.588, 52.336]),
        (30, [40.256, 43.773, 46.979, 50.892, 53.672]),
        (40, [51.805, 55.758, 59.342, 63.691, 66.766]),
        (50, [63.167, 67.505, 71.420, 76.154, 79.490]),
        (60, [74.397, 79.082, 83.298, 88.379, 91.952]),
        (70, [85.527, 90.531, 95.023, 100.425, 104.215]),
        (80, [96.578, 101.879, 106.629, 112.329, 116.321]),
        (90, [107.565, 113.145, 118.136, 124.116, 128.299]),
        (100, [118.498, 124.342, 129.561, 135.807, 140.169]),
    ],
    quantile: chi_upper_quantile,
};

/// t critical value for a one-tail area; `None` beyond df 120.
pub fn lookup_t(df: usize, tail_area: f64) -> Option<f64> {
    T_TABLE.lookup(df, tail_area).map(|c| c.value)
}

/// Chi-square critical value for an upper-tail α; `None` beyond df 100.
pub fn lookup_chi_square(df: usize, alpha: f64) -> Option<f64> {
    CHI_SQUARE_TABLE.lookup(df, alpha).map(|c| c.value)
}

/// F critical value from the analytic quantile.
pub fn f_critical(df1: usize, df2: usize, alpha: f64) -> Option<CriticalValue> {
    if df1 == 0 || df2 == 0 || !(alpha > 0.0 && alpha < 1.0) {
        return None;
    }
    Some(CriticalValue {
        value: f_inv(1.0 - alpha, df1 as f64, df2 as f64),
        method: LookupMethod::Quantile,
    })
}

/// Human-readable account of a lookup for the trace.
pub fn describe_lookup(table: &str, df: &str, tail_area: f64, lookup: Option<&CriticalValue>, precision: usize) -> String {
    match lookup {
        None => format!("df = {} is outside the {} table; no critical value", df, table),
        Some(c) => match c.method {
            LookupMethod::Table => format!("{} table, df = {}, tail area {}", table, df, num(tail_area, precision)),
            LookupMethod::Interpolated { lower_df, upper_df } => format!(
                "{} table, linear interpolation between df = {} and df = {}",
                table, lower_df, upper_df
            ),
            LookupMethod::Quantile => format!(
                "{} quantile computed for df = {}, tail area {}",
                table, df, num(tail_area, precision)
            ),
        },
    }
}

// ============ Critical value calculator ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalValueResult {
    pub distribution: String,
    pub df: usize,
    pub tail_area: f64,
    pub critical_value: Option<f64>,
    pub method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    T,
    ChiSquare,
}

impl Distribution {
    fn table(&self) -> &'static CriticalTable {
        match self {
            Distribution::T => &T_TABLE,
            Distribution::ChiSquare => &CHI_SQUARE_TABLE,
        }
    }
}

/// Look up a critical value and narrate how it was found.
pub fn critical_value(distribution: Distribution, df: usize, tail_area: f64, config: &CalcConfig) -> CalculationResult<CriticalValueResult> {
    let p = config.precision;
    let table = distribution.table();
    let lookup = table.lookup(df, tail_area);
    let mut trace = Trace::new();

    trace.push(
        Step::new("request", "Request")
            .with_description(format!("{} distribution, df = {}, tail area {}", table.name, df, num(tail_area, p)))
            .with_note(format!("Tabulated df run from 1 to {}", table.max_df())),
    );

    let mut step = Step::new("lookup", "Critical value")
        .with_calculation(describe_lookup(table.name, &df.to_string(), tail_area, lookup.as_ref(), p));
    if let Some(LookupMethod::Interpolated { lower_df, upper_df }) = lookup.map(|c| c.method) {
        let col = table.column(tail_area).unwrap_or(0);
        let at = |d: usize| {
            table.rows.iter().find(|(row_df, _)| *row_df == d).map(|(_, v)| v[col]).unwrap_or(f64::NAN)
        };
        step = step.with_formula("v = v₁ + (df − df₁)/(df₂ − df₁) × (v₂ − v₁)").with_note(format!(
            "{} + ({} − {})/({} − {}) × ({} − {})",
            num(at(lower_df), 3),
            df,
            lower_df,
            upper_df,
            lower_df,
            num(at(upper_df), 3),
            num(at(lower_df), 3)
        ));
    }
    trace.push(step.with_result(match lookup {
        Some(c) => num(c.value, p),
        None => "unavailable".to_string(),
    }));

    let inputs = Value::object([
        ("distribution", Value::from(table.name)),
        ("df", Value::from(df)),
        ("tail_area", Value::from(tail_area)),
    ]);
    let value = CriticalValueResult {
        distribution: table.name.to_string(),
        df,
        tail_area,
        critical_value: lookup.map(|c| c.value),
        method: lookup.map(|c| c.method.name()).unwrap_or("unavailable").to_string(),
    };
    trace.finish(value, format!("{}(tail area, df)", table.name), inputs)
}

pub struct CriticalValueLookup;

static CRITICAL_VALUE_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("distribution", "Text", "'t' or 'chi_square'"),
    ArgMeta::required("df", "Number", "Degrees of freedom (1 to 120 for t, 1 to 100 for chi-square)"),
    ArgMeta::optional("tail_area", "Number", "One-tail area; defaults to α (chi-square) or the α split by tails (t)", "alpha"),
];

static CRITICAL_VALUE_EXAMPLES: [&str; 2] = [
    "critical_value(distribution: 't', df: 8, tail_area: 0.025) → 2.306",
    "critical_value(distribution: 'chi_square', df: 150) → null",
];

static CRITICAL_VALUE_RELATED: [&str; 2] = ["t_test_independent", "chi_square_goodness_of_fit"];

impl CalculatorPlugin for CriticalValueLookup {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "critical_value",
            description: "Critical value lookup with interpolation; null outside the table",
            usage: "critical_value(distribution, df, tail_area?)",
            args: &CRITICAL_VALUE_ARGS,
            returns: "CriticalValueResult",
            examples: &CRITICAL_VALUE_EXAMPLES,
            category: "tables",
            related: &CRITICAL_VALUE_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let distribution = match args::opt_text(a, "distribution")?.map(|s| s.to_lowercase()) {
            Some(ref s) if s == "t" => Distribution::T,
            Some(ref s) if s == "chi_square" || s == "chi-square" || s == "chi2" => Distribution::ChiSquare,
            Some(other) => {
                return Err(StatsError::invalid_input(format!("unknown distribution '{}'", other))
                    .for_argument("distribution"))
            }
            None => return Err(args::InputError::Missing("distribution".to_string()).into()),
        };
        let df = args::count(a, "df")? as usize;
        let tail_area = match args::opt_number(a, "tail_area")? {
            Some(t) => t,
            None if distribution == Distribution::T => config.tails.tail_area(config.alpha),
            None => config.alpha,
        };
        Ok(critical_value(distribution, df, tail_area, &config).erase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_rows() {
        assert_eq!(lookup_t(8, 0.025), Some(2.306));
        assert_eq!(lookup_t(1, 0.05), Some(6.314));
        assert_eq!(lookup_chi_square(3, 0.05), Some(7.815));
        assert_eq!(lookup_chi_square(100, 0.005), Some(140.169));
    }

    #[test]
    fn test_interpolation_between_rows() {
        // df 35 sits halfway between 30 (2.042) and 40 (2.021)
        let v = lookup_t(35, 0.025).unwrap();
        assert!((v - 2.0315).abs() < 1e-9);
        let c = T_TABLE.lookup(35, 0.025).unwrap();
        assert_eq!(c.method, LookupMethod::Interpolated { lower_df: 30, upper_df: 40 });

        let chi = lookup_chi_square(45, 0.05).unwrap();
        assert!((chi - (55.758 + 67.505) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_null_beyond_table() {
        assert_eq!(lookup_t(121, 0.025), None);
        assert_eq!(lookup_t(0, 0.025), None);
        assert_eq!(lookup_chi_square(101, 0.05), None);
        assert_eq!(lookup_chi_square(5, 0.0), None);
    }

    #[test]
    fn test_untabulated_alpha_uses_quantile() {
        let c = CHI_SQUARE_TABLE.lookup(3, 0.2).unwrap();
        assert_eq!(c.method, LookupMethod::Quantile);
        assert!((c.value - 4.642).abs() < 0.001);
        let t = T_TABLE.lookup(10, 0.2).unwrap();
        assert!((t.value - 0.879).abs() < 0.001);
    }

    #[test]
    fn test_table_agrees_with_quantile() {
        for (df, vals) in T_TABLE.rows.iter() {
            let q = t_upper_quantile(0.025, *df as f64);
            assert!((q - vals[2]).abs() < 0.002, "t df {}: {} vs {}", df, q, vals[2]);
        }
        for (df, vals) in CHI_SQUARE_TABLE.rows.iter() {
            let q = chi_upper_quantile(0.05, *df as f64);
            assert!((q - vals[1]).abs() < 0.002, "chi df {}: {} vs {}", df, q, vals[1]);
        }
    }

    #[test]
    fn test_f_critical() {
        let f = f_critical(2, 6, 0.05).unwrap();
        assert!((f.value - 5.143).abs() < 0.001);
        assert!(f_critical(0, 6, 0.05).is_none());
    }

    #[test]
    fn test_calculator_reports_unavailable() {
        let result = critical_value(Distribution::ChiSquare, 150, 0.05, &CalcConfig::default());
        assert_eq!(result.value.critical_value, None);
        assert_eq!(result.value.method, "unavailable");
        assert_eq!(result.last_step().and_then(|s| s.result.as_deref()), Some("unavailable"));
    }

    #[test]
    fn test_plugin_defaults_tail_area_from_config() {
        let args = Value::object([("distribution", Value::from("t")), ("df", Value::from(8usize))]);
        let result = CriticalValueLookup.call(&args, &CalcContext::default()).unwrap();
        assert_eq!(result.value.get("critical_value").and_then(|v| v.as_number()), Some(2.306));
    }
}
