//! Workings Statistics Library
//!
//! Hypothesis tests, probability calculators and descriptive summaries. Each
//! calculator is a typed function returning a [`CalculationResult`] whose
//! steps narrate the arithmetic, plus a plugin wrapper for the registry.
//!
//! [`CalculationResult`]: workings_core::CalculationResult

pub mod primitives;
pub mod special;
pub mod distributions;
pub mod tables;
pub mod decision;
mod anova;
mod two_way;
mod ttest;
mod chi_square;
mod descriptive;
mod boxplot;
mod regression;

pub use anova::{one_way_anova, GroupStats, OneWayResult};
pub use boxplot::{box_plot, BoxPlotResult};
pub use chi_square::{goodness_of_fit, independence, GoodnessOfFitResult, IndependenceResult};
pub use decision::{decide, Decision, Outcome};
pub use descriptive::{describe, DescriptiveResult};
pub use distributions::{
    hypergeometric, poisson_exact, poisson_normal, HypergeometricResult, PoissonApproxResult,
    PoissonExactResult, PoissonTerm,
};
pub use regression::{linear_regression, RegressionResult};
pub use tables::{critical_value, f_critical, lookup_chi_square, lookup_t, CriticalValueResult, Distribution};
pub use ttest::{
    independent, independent_from_summary, one_sample, paired, IndependentResult, OneSampleResult,
    PairedResult, SampleSummary,
};
pub use two_way::{two_way_anova, EffectTest, SourceTerm, TwoWayResult};

use workings_plugin::CalculatorRegistry;

/// Load the statistics calculators into a registry
pub fn load_stats_library(registry: CalculatorRegistry) -> CalculatorRegistry {
    registry
        // ANOVA
        .with_calculator(anova::OneWayAnova)
        .with_calculator(two_way::TwoWayAnova)

        // t-tests
        .with_calculator(ttest::OneSampleTTest)
        .with_calculator(ttest::PairedTTest)
        .with_calculator(ttest::IndependentTTest)
        .with_calculator(ttest::IndependentSummaryTTest)

        // Chi-square
        .with_calculator(chi_square::GoodnessOfFit)
        .with_calculator(chi_square::Independence)

        // Distributions
        .with_calculator(distributions::PoissonExact)
        .with_calculator(distributions::PoissonNormal)
        .with_calculator(distributions::Hypergeometric)

        // Descriptive and regression
        .with_calculator(descriptive::Descriptive)
        .with_calculator(boxplot::BoxPlot)
        .with_calculator(regression::LinearRegression)

        // Tables
        .with_calculator(tables::CriticalValueLookup)
}

/// A registry holding every standard calculator.
pub fn standard_registry() -> CalculatorRegistry {
    load_stats_library(CalculatorRegistry::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use workings_core::Value;
    use workings_plugin::CalcContext;

    #[test]
    fn test_standard_registry_names() {
        let registry = standard_registry();
        assert_eq!(registry.len(), 15);
        for name in [
            "one_way_anova",
            "two_way_anova",
            "t_test_one_sample",
            "t_test_paired",
            "t_test_independent",
            "t_test_independent_summary",
            "chi_square_goodness_of_fit",
            "chi_square_independence",
            "poisson_exact",
            "poisson_normal",
            "hypergeometric",
            "descriptive",
            "box_plot",
            "linear_regression",
            "critical_value",
        ] {
            assert!(registry.get(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_every_calculator_documents_itself() {
        let registry = standard_registry();
        for name in registry.names() {
            let help = registry.help(Some(name)).unwrap();
            assert!(help.get("description").is_some(), "{} has no description", name);
        }
    }

    #[test]
    fn test_registry_call_adds_calculator_context() {
        let registry = standard_registry();
        let args = Value::from(serde_json::json!({"groups": [[1, 2, 3]]}));
        let err = registry.call("one_way_anova", &args, &CalcContext::default()).unwrap_err();
        assert_eq!(err.code, workings_core::codes::INSUFFICIENT_GROUPS);
        assert_eq!(err.context.and_then(|c| c.calculator).as_deref(), Some("one_way_anova"));
    }
}
