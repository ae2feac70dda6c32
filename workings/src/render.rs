//! Markdown renderer
//!
//! Renders a calculation as an answer sheet: inputs, one section per step,
//! and the final answer.

use workings_core::format::num;
use workings_core::{CalculationResult, StatsError, Step, Value};

/// Lists longer than this are shown by count
const INLINE_LIST_MAX: usize = 12;

/// Answer-sheet renderer
pub struct Renderer {
    precision: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Self { precision: 4 }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Render a calculation with its inputs and working
    pub fn render(&self, title: &str, result: &CalculationResult<Value>) -> String {
        let mut output = format!("# {}\n\n", title);

        if let Value::Object(inputs) = &result.inputs {
            if !inputs.is_empty() {
                output.push_str("## Inputs\n\n");
                output.push_str("| name | value |\n");
                output.push_str("|------|-------|\n");
                for (name, value) in inputs {
                    output.push_str(&format!("| {} | {} |\n", name, self.render_value(value)));
                }
                output.push('\n');
            }
        }

        if !result.formula.is_empty() {
            output.push_str(&format!("**Formula:** `{}`\n\n", result.formula));
        }

        output.push_str("## Working\n\n");
        for (i, step) in result.steps.iter().enumerate() {
            self.render_step(&mut output, i + 1, step);
        }

        if let Some(answer) = result.last_step().and_then(|s| s.result.as_deref()) {
            output.push_str(&format!("**Answer:** {}\n", answer));
        }

        output
    }

    fn render_step(&self, output: &mut String, index: usize, step: &Step) {
        output.push_str(&format!("### {}. {}\n\n", index, step.title));
        if let Some(description) = &step.description {
            for line in description.lines() {
                output.push_str(line);
                output.push_str("  \n");
            }
            output.push('\n');
        }
        if let Some(formula) = &step.formula {
            output.push_str(&format!("- Formula: `{}`\n", formula));
        }
        if let Some(calculation) = &step.calculation {
            output.push_str(&format!("- Calculation: {}\n", calculation));
        }
        if let Some(result) = &step.result {
            output.push_str(&format!("- Result: **{}**\n", result));
        }
        if let Some(note) = &step.note {
            output.push_str(&format!("\n> {}\n", note));
        }
        output.push('\n');
    }

    /// Render a rejected calculation
    pub fn render_error(&self, title: &str, error: &StatsError) -> String {
        let mut output = format!("# {}\n\n**Error** `{}`: {}\n", title, error.code, error.message);
        if let Some(suggestion) = &error.suggestion {
            output.push_str(&format!("\nSuggestion: {}\n", suggestion));
        }
        if let Some(notes) = error.context.as_ref().map(|c| &c.notes) {
            for note in notes {
                output.push_str(&format!("\n> {}\n", note));
            }
        }
        output
    }

    fn render_value(&self, value: &Value) -> String {
        match value {
            Value::Number(n) => num(*n, self.precision),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Object(_) => "[Object]".to_string(),
            Value::List(items) if items.len() <= INLINE_LIST_MAX => {
                let inner: Vec<String> = items.iter().map(|v| self.render_value(v)).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::List(items) => format!("[{} items]", items.len()),
            Value::Null => "null".to_string(),
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workings_core::Trace;

    fn sample() -> CalculationResult<Value> {
        let mut trace = Trace::new();
        trace.push(
            Step::new("mean", "Mean")
                .with_formula("x̄ = Σx/n")
                .with_calculation("6/3")
                .with_result("2"),
        );
        trace.push(Step::new("decision", "Decision").with_result("Reject H₀").with_note("p-value = 0.01"));
        trace.finish(
            Value::Null,
            "x̄ = Σx/n",
            Value::object([("data", Value::from(&[1.0, 2.0, 3.0][..]))]),
        )
    }

    #[test]
    fn test_render_sections() {
        let md = Renderer::new().render("Example", &sample());
        assert!(md.starts_with("# Example"));
        assert!(md.contains("| data | [1, 2, 3] |"));
        assert!(md.contains("### 1. Mean"));
        assert!(md.contains("- Calculation: 6/3"));
        assert!(md.contains("> p-value = 0.01"));
        assert!(md.trim_end().ends_with("**Answer:** Reject H₀"));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let md = Renderer::new().render("Example", &sample());
        let decision = md.split("### 2. Decision").nth(1).unwrap();
        assert!(!decision.contains("Formula"));
        assert!(!decision.contains("undefined"));
    }

    #[test]
    fn test_render_error() {
        let err = StatsError::insufficient_groups(1).with_suggestion("Add another group");
        let md = Renderer::new().render_error("One-way ANOVA", &err);
        assert!(md.contains("`INSUFFICIENT_GROUPS`"));
        assert!(md.contains("Suggestion: Add another group"));
    }

    #[test]
    fn test_long_lists_by_count() {
        let values: Vec<f64> = (0..20).map(f64::from).collect();
        assert_eq!(Renderer::new().render_value(&Value::from(&values[..])), "[20 items]");
    }
}
