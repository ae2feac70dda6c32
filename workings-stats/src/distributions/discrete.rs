//! Discrete probability calculators: Poisson (exact and normal approximation)
//! and hypergeometric

use crate::primitives::{big_to_f64, binomial, continuity_corrected_range, ln_factorial, ratio_to_f64};
use serde::Serialize;
use workings_plugin::prelude::*;

/// Largest k the exact Poisson sum accepts; k! overflows f64 beyond it
pub const POISSON_EXACT_CEILING: u64 = 170;

fn check_poisson_inputs(lambda: f64, min: u64, max: u64) -> Result<(), StatsError> {
    if !(lambda > 0.0) || !lambda.is_finite() {
        return Err(StatsError::invalid_input(format!("λ must be positive, got {}", lambda)).for_argument("lambda"));
    }
    if min > max {
        return Err(StatsError::invalid_input(format!("min ({}) is greater than max ({})", min, max)).for_argument("min"));
    }
    Ok(())
}

fn poisson_inputs(lambda: f64, min: u64, max: u64) -> Value {
    Value::object([
        ("lambda", Value::from(lambda)),
        ("min", Value::from(min)),
        ("max", Value::from(max)),
    ])
}

// ========== Poisson, exact ==========

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoissonTerm {
    pub k: u64,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoissonExactResult {
    pub lambda: f64,
    pub min: u64,
    pub max: u64,
    pub terms: Vec<PoissonTerm>,
    pub probability: f64,
}

/// P(min ≤ X ≤ max) for X ~ Poisson(λ), summed term by term.
pub fn poisson_exact(lambda: f64, min: u64, max: u64, config: &CalcConfig) -> Result<CalculationResult<PoissonExactResult>, StatsError> {
    check_poisson_inputs(lambda, min, max)?;
    if max > POISSON_EXACT_CEILING {
        return Err(StatsError::range_too_large(max, POISSON_EXACT_CEILING));
    }
    let p = config.precision;
    let mut trace = Trace::new();

    trace.push(
        Step::new("setup", "Distribution")
            .with_description(format!(
                "X ~ Poisson(λ = {}); find P({} ≤ X ≤ {})",
                num(lambda, p),
                min,
                max
            ))
            .with_formula("P(X = k) = λᵏ·e^(−λ)/k!"),
    );

    let ln_lambda = lambda.ln();
    let terms: Vec<PoissonTerm> = (min..=max)
        .map(|k| PoissonTerm {
            k,
            // Log space keeps λᵏ and k! from overflowing separately
            probability: (k as f64 * ln_lambda - lambda - ln_factorial(k)).exp(),
        })
        .collect();
    let lines: Vec<String> = terms
        .iter()
        .map(|t| {
            format!(
                "P(X = {k}) = {l}^{k}·e^(−{l})/{k}! = {v}",
                k = t.k,
                l = num(lambda, p),
                v = num(t.probability, p)
            )
        })
        .collect();
    trace.push(
        Step::new("terms", "Individual probabilities")
            .with_description(lines.join("\n"))
            .with_note(format!("e^(−{}) = {}", num(lambda, p), num((-lambda).exp(), p))),
    );

    let probability = terms.iter().map(|t| t.probability).sum::<f64>().clamp(0.0, 1.0);
    let formatted: Vec<String> = terms.iter().map(|t| num(t.probability, p)).collect();
    trace.push(
        Step::new("sum", "Sum over the range")
            .with_formula(format!("P({} ≤ X ≤ {}) = Σ P(X = k)", min, max))
            .with_calculation(sum_terms(&formatted))
            .with_result(num(probability, p)),
    );

    let value = PoissonExactResult {
        lambda,
        min,
        max,
        terms,
        probability,
    };
    Ok(trace.finish(value, "P(X = k) = λᵏe^(−λ)/k!", poisson_inputs(lambda, min, max)))
}

// ========== Poisson, normal approximation ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoissonApproxResult {
    pub lambda: f64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub sd: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub z_lower: f64,
    pub z_upper: f64,
    pub probability: f64,
}

/// Normal approximation with continuity correction; no ceiling on the range.
pub fn poisson_normal(lambda: f64, min: u64, max: u64, config: &CalcConfig) -> Result<CalculationResult<PoissonApproxResult>, StatsError> {
    check_poisson_inputs(lambda, min, max)?;
    let p = config.precision;
    let mean = lambda;
    let sd = lambda.sqrt();
    let range = continuity_corrected_range(min, max, mean, sd);
    let mut trace = Trace::new();

    trace.push(
        Step::new("parameters", "Normal parameters")
            .with_description(format!("Approximate Poisson(λ = {}) by a normal distribution", num(lambda, p)))
            .with_formula("μ = λ, σ = √λ")
            .with_calculation(format!("μ = {}, σ = √{}", num(mean, p), num(lambda, p)))
            .with_result(format!("μ = {}, σ = {}", num(mean, p), num(sd, p))),
    );
    trace.push(
        Step::new("continuity_correction", "Continuity correction")
            .with_formula("P(min ≤ X ≤ max) ≈ P(min − 0.5 < Y < max + 0.5)")
            .with_calculation(format!("{} − 0.5 = {}, {} + 0.5 = {}", min, num(range.lower_bound, p), max, num(range.upper_bound, p)))
            .with_result(format!("({}, {})", num(range.lower_bound, p), num(range.upper_bound, p))),
    );
    trace.push(
        Step::new("z_scores", "Standardize")
            .with_formula("z = (x − μ)/σ")
            .with_calculation(format!(
                "z₁ = ({} − {})/{}, z₂ = ({} − {})/{}",
                num(range.lower_bound, p),
                num(mean, p),
                num(sd, p),
                num(range.upper_bound, p),
                num(mean, p),
                num(sd, p)
            ))
            .with_result(format!("z₁ = {}, z₂ = {}", num(range.z_lower, p), num(range.z_upper, p))),
    );
    trace.push(
        Step::new("probability", "Probability")
            .with_formula("P = Φ(z₂) − Φ(z₁)")
            .with_calculation(format!(
                "Φ({}) − Φ({})",
                num(range.z_upper, p),
                num(range.z_lower, p)
            ))
            .with_result(num(range.probability, p)),
    );

    let value = PoissonApproxResult {
        lambda,
        min,
        max,
        mean,
        sd,
        lower_bound: range.lower_bound,
        upper_bound: range.upper_bound,
        z_lower: range.z_lower,
        z_upper: range.z_upper,
        probability: range.probability,
    };
    Ok(trace.finish(value, "Φ((max + 0.5 − λ)/√λ) − Φ((min − 0.5 − λ)/√λ)", poisson_inputs(lambda, min, max)))
}

// ========== Hypergeometric ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypergeometricResult {
    pub population: u64,
    pub successes: u64,
    pub draws: u64,
    pub observed: u64,
    /// C(K, k); `None` when undefined
    pub successes_choose: Option<f64>,
    /// C(N − K, n − k)
    pub failures_choose: Option<f64>,
    /// C(N, n)
    pub total_choose: Option<f64>,
    pub probability: f64,
}

/// P(X = k) drawing n from a population of N containing K successes.
pub fn hypergeometric(
    population: u64,
    successes: u64,
    draws: u64,
    observed: u64,
    config: &CalcConfig,
) -> Result<CalculationResult<HypergeometricResult>, StatsError> {
    let (big_n, big_k, n, k) = (population, successes, draws, observed);
    if big_k > big_n {
        return Err(StatsError::invalid_input(format!(
            "successes in population ({}) exceed the population size ({})",
            big_k, big_n
        ))
        .for_argument("successes"));
    }
    if n > big_n {
        return Err(StatsError::invalid_input(format!(
            "sample size ({}) exceeds the population size ({})",
            n, big_n
        ))
        .for_argument("draws"));
    }

    let p = config.precision;
    let inputs = Value::object([
        ("population", Value::from(big_n)),
        ("successes", Value::from(big_k)),
        ("draws", Value::from(n)),
        ("observed", Value::from(k)),
    ]);
    let mut trace = Trace::new();
    trace.push(
        Step::new("setup", "Distribution")
            .with_description(format!(
                "Population N = {}, successes K = {}, draws n = {}; find P(X = {})",
                big_n, big_k, n, k
            ))
            .with_formula("P(X = k) = C(K, k)·C(N − K, n − k)/C(N, n)"),
    );

    let violated = if k > n {
        Some(format!("k = {} exceeds the number of draws n = {}", k, n))
    } else if k > big_k {
        Some(format!("k = {} exceeds the successes available K = {}", k, big_k))
    } else if n - k > big_n - big_k {
        Some(format!(
            "n − k = {} exceeds the failures available N − K = {}",
            n - k,
            big_n - big_k
        ))
    } else {
        None
    };

    if let Some(reason) = violated {
        trace.push(
            Step::new("probability", "Probability")
                .with_description(reason)
                .with_result("0")
                .with_note("The outcome is impossible, so its probability is 0."),
        );
        let value = HypergeometricResult {
            population: big_n,
            successes: big_k,
            draws: n,
            observed: k,
            successes_choose: None,
            failures_choose: None,
            total_choose: big_to_f64_opt(binomial(big_n, n)),
            probability: 0.0,
        };
        return Ok(trace.finish(value, "C(K, k)·C(N − K, n − k)/C(N, n)", inputs));
    }

    let undefined = || StatsError::invalid_input("combinatorial term is undefined");
    let ways_success = binomial(big_k, k).ok_or_else(undefined)?;
    let ways_failure = binomial(big_n - big_k, n - k).ok_or_else(undefined)?;
    let ways_total = binomial(big_n, n).ok_or_else(undefined)?;

    trace.push(
        Step::new("successes_choose", "Ways to choose the successes")
            .with_formula("C(K, k)")
            .with_calculation(format!("C({}, {})", big_k, k))
            .with_result(ways_success.to_string()),
    );
    trace.push(
        Step::new("failures_choose", "Ways to choose the failures")
            .with_formula("C(N − K, n − k)")
            .with_calculation(format!("C({}, {})", big_n - big_k, n - k))
            .with_result(ways_failure.to_string()),
    );
    trace.push(
        Step::new("total_choose", "Ways to choose the sample")
            .with_formula("C(N, n)")
            .with_calculation(format!("C({}, {})", big_n, n))
            .with_result(ways_total.to_string()),
    );

    let favourable = &ways_success * &ways_failure;
    let probability = ratio_to_f64(&favourable, &ways_total)
        .ok_or_else(undefined)?
        .clamp(0.0, 1.0);
    trace.push(
        Step::new("probability", "Probability")
            .with_formula("P = C(K, k)·C(N − K, n − k)/C(N, n)")
            .with_calculation(format!("{} × {} / {}", ways_success, ways_failure, ways_total))
            .with_result(num(probability, p)),
    );

    let value = HypergeometricResult {
        population: big_n,
        successes: big_k,
        draws: n,
        observed: k,
        successes_choose: big_to_f64(&ways_success),
        failures_choose: big_to_f64(&ways_failure),
        total_choose: big_to_f64(&ways_total),
        probability,
    };
    Ok(trace.finish(value, "C(K, k)·C(N − K, n − k)/C(N, n)", inputs))
}

fn big_to_f64_opt(x: Option<dashu_int::UBig>) -> Option<f64> {
    x.as_ref().and_then(big_to_f64)
}

// ========== Plugins ==========

static POISSON_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("lambda", "Number", "Mean rate λ > 0"),
    ArgMeta::required("min", "Number", "Lowest count in the range"),
    ArgMeta::required("max", "Number", "Highest count in the range"),
];

static POISSON_EXACT_EXAMPLES: [&str; 1] = ["poisson_exact(lambda: 3.5, min: 2, max: 4) → 0.5896"];
static POISSON_EXACT_RELATED: [&str; 1] = ["poisson_normal"];

pub struct PoissonExact;

impl CalculatorPlugin for PoissonExact {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "poisson_exact",
            description: "Exact Poisson probability of a count range (max ≤ 170)",
            usage: "poisson_exact(lambda, min, max)",
            args: &POISSON_ARGS,
            returns: "PoissonExactResult",
            examples: &POISSON_EXACT_EXAMPLES,
            category: "distributions",
            related: &POISSON_EXACT_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let lambda = args::number(a, "lambda")?;
        let min = args::count(a, "min")?;
        let max = args::count(a, "max")?;
        Ok(poisson_exact(lambda, min, max, &config)?.erase())
    }
}

static POISSON_NORMAL_EXAMPLES: [&str; 1] = ["poisson_normal(lambda: 3.5, min: 2, max: 4)"];
static POISSON_NORMAL_RELATED: [&str; 1] = ["poisson_exact"];

pub struct PoissonNormal;

impl CalculatorPlugin for PoissonNormal {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "poisson_normal",
            description: "Normal approximation to a Poisson range with continuity correction",
            usage: "poisson_normal(lambda, min, max)",
            args: &POISSON_ARGS,
            returns: "PoissonApproxResult",
            examples: &POISSON_NORMAL_EXAMPLES,
            category: "distributions",
            related: &POISSON_NORMAL_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        let lambda = args::number(a, "lambda")?;
        let min = args::count(a, "min")?;
        let max = args::count(a, "max")?;
        Ok(poisson_normal(lambda, min, max, &config)?.erase())
    }
}

static HYPERGEOMETRIC_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("population", "Number", "Population size N"),
    ArgMeta::required("successes", "Number", "Successes in the population K"),
    ArgMeta::required("draws", "Number", "Sample size n"),
    ArgMeta::required("observed", "Number", "Successes in the sample k"),
];

static HYPERGEOMETRIC_EXAMPLES: [&str; 1] =
    ["hypergeometric(population: 52, successes: 13, draws: 5, observed: 2) → 0.2743"];
static HYPERGEOMETRIC_RELATED: [&str; 0] = [];

pub struct Hypergeometric;

impl CalculatorPlugin for Hypergeometric {
    fn meta(&self) -> CalculatorMeta {
        CalculatorMeta {
            name: "hypergeometric",
            description: "Probability of exactly k successes drawing without replacement",
            usage: "hypergeometric(population, successes, draws, observed)",
            args: &HYPERGEOMETRIC_ARGS,
            returns: "HypergeometricResult",
            examples: &HYPERGEOMETRIC_EXAMPLES,
            category: "distributions",
            related: &HYPERGEOMETRIC_RELATED,
        }
    }

    fn call(&self, a: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        let config = ctx.config_for(a)?;
        Ok(hypergeometric(
            args::count(a, "population")?,
            args::count(a, "successes")?,
            args::count(a, "draws")?,
            args::count(a, "observed")?,
            &config,
        )?
        .erase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poisson_exact_range() {
        let r = poisson_exact(3.5, 2, 4, &CalcConfig::default()).unwrap();
        assert!((r.value.probability - 0.589_557).abs() < 1e-5);
        assert_eq!(r.value.terms.len(), 3);
        assert_eq!(r.last_step().unwrap().result.as_deref(), Some("0.5896"));
    }

    #[test]
    fn test_poisson_exact_ceiling() {
        let err = poisson_exact(3.5, 0, 171, &CalcConfig::default()).unwrap_err();
        assert!(err.is(codes::RANGE_TOO_LARGE));
        assert!(err.message.contains("poisson_normal"));
        assert!(err.suggestion.as_deref().unwrap().contains("poisson_normal"));
        assert!(poisson_exact(100.0, 0, 170, &CalcConfig::default()).is_ok());
    }

    #[test]
    fn test_poisson_invalid_inputs() {
        let cfg = CalcConfig::default();
        assert!(poisson_exact(0.0, 0, 1, &cfg).unwrap_err().is(codes::INVALID_INPUT));
        assert!(poisson_exact(2.0, 3, 1, &cfg).unwrap_err().is(codes::INVALID_INPUT));
        assert!(poisson_normal(-1.0, 0, 1, &cfg).unwrap_err().is(codes::INVALID_INPUT));
    }

    #[test]
    fn test_poisson_normal_in_unit_interval() {
        let r = poisson_normal(3.5, 2, 4, &CalcConfig::default()).unwrap().value;
        assert_eq!(r.lower_bound, 1.5);
        assert_eq!(r.upper_bound, 4.5);
        assert!(r.probability > 0.0 && r.probability <= 1.0);
        // Normal approximation lands near the exact 0.5896
        assert!((r.probability - 0.5896).abs() < 0.05);
    }

    #[test]
    fn test_poisson_normal_handles_wide_ranges() {
        let r = poisson_normal(500.0, 0, 10_000, &CalcConfig::default()).unwrap().value;
        assert!(r.probability <= 1.0);
        assert!(r.probability > 0.999);
    }

    #[test]
    fn test_hypergeometric_cards() {
        let r = hypergeometric(52, 13, 5, 2, &CalcConfig::default()).unwrap();
        assert!((r.value.probability - 0.274_279).abs() < 1e-5);
        assert_eq!(r.value.successes_choose, Some(78.0));
        assert_eq!(r.value.failures_choose, Some(9139.0));
        assert_eq!(r.value.total_choose, Some(2_598_960.0));
        assert_eq!(r.step("total_choose").unwrap().result.as_deref(), Some("2598960"));
    }

    #[test]
    fn test_hypergeometric_impossible_outcome_is_zero() {
        let cfg = CalcConfig::default();
        let r = hypergeometric(10, 3, 5, 4, &cfg).unwrap();
        assert_eq!(r.value.probability, 0.0);
        assert!(r.last_step().unwrap().note.is_some());

        let r = hypergeometric(10, 8, 5, 1, &cfg).unwrap();
        assert_eq!(r.value.probability, 0.0);
        let r = hypergeometric(10, 3, 2, 3, &cfg).unwrap();
        assert_eq!(r.value.probability, 0.0);
    }

    #[test]
    fn test_hypergeometric_invalid_population() {
        let cfg = CalcConfig::default();
        assert!(hypergeometric(10, 11, 2, 1, &cfg).unwrap_err().is(codes::INVALID_INPUT));
        assert!(hypergeometric(10, 5, 11, 1, &cfg).unwrap_err().is(codes::INVALID_INPUT));
    }

    #[test]
    fn test_hypergeometric_large_population() {
        // Terms far beyond f64 still give a finite probability
        let r = hypergeometric(2000, 1000, 1000, 500, &CalcConfig::default()).unwrap().value;
        assert!(r.probability > 0.0 && r.probability < 0.1);
        assert_eq!(r.total_choose, None);
    }

    #[test]
    fn test_plugin_call() {
        let args = Value::from(serde_json::json!({"lambda": 3.5, "min": 2, "max": 4}));
        let r = PoissonExact.call(&args, &CalcContext::default()).unwrap();
        let p = r.value.get("probability").and_then(Value::as_number).unwrap();
        assert!((p - 0.5896).abs() < 1e-4);

        let bad = Value::from(serde_json::json!({"lambda": 3.5, "min": -1, "max": 4}));
        assert!(PoissonExact.call(&bad, &CalcContext::default()).unwrap_err().is(codes::INVALID_INPUT));
    }
}
