//! Calculation traces
//!
//! Every calculator narrates its arithmetic as an ordered list of [`Step`]s.
//! A [`Trace`] is owned by a single call, only ever appended to, and consumed
//! into the [`CalculationResult`] that the call returns.

use crate::Value;
use serde::{Deserialize, Serialize};

/// One narrated unit of a derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Stable short key, unique within a trace
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// Symbolic formula
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub formula: Option<String>,
    /// The formula with numbers substituted
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub calculation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            formula: None,
            calculation: None,
            result: None,
            note: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_calculation(mut self, calculation: impl Into<String>) -> Self {
        self.calculation = Some(calculation.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Append to an existing note, or start one.
    pub fn add_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = Some(match self.note.take() {
            Some(existing) => format!("{} {}", existing, note),
            None => note,
        });
        self
    }
}

/// Value, derivation and input echo returned by every calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult<T> {
    pub value: T,
    pub steps: Vec<Step>,
    /// Master symbolic formula
    pub formula: String,
    /// Normalized inputs as received
    pub inputs: Value,
}

impl<T> CalculationResult<T> {
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CalculationResult<U> {
        CalculationResult {
            value: f(self.value),
            steps: self.steps,
            formula: self.formula,
            inputs: self.inputs,
        }
    }
}

impl<T: Serialize> CalculationResult<T> {
    /// Replace the typed value with its dynamic form.
    pub fn erase(self) -> CalculationResult<Value> {
        self.map(|v| Value::from_serialize(&v))
    }
}

/// Append-only step collector for one calculation
#[derive(Debug, Default)]
pub struct Trace {
    steps: Vec<Step>,
}

impl Trace {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step. Ids must be unique within a trace.
    pub fn push(&mut self, step: Step) {
        debug_assert!(
            self.steps.iter().all(|s| s.id != step.id),
            "duplicate step id '{}'",
            step.id
        );
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn finish<T>(self, value: T, formula: impl Into<String>, inputs: Value) -> CalculationResult<T> {
        CalculationResult {
            value,
            steps: self.steps,
            formula: formula.into(),
            inputs,
        }
    }
}
