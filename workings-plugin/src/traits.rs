//! Plugin traits

use crate::CalcContext;
use serde::Serialize;
use workings_core::{CalculationResult, StatsError, Value};

/// Metadata about a calculator argument
#[derive(Debug, Clone, Serialize)]
pub struct ArgMeta {
    pub name: &'static str,
    pub typ: &'static str,
    pub description: &'static str,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

impl ArgMeta {
    pub const fn required(name: &'static str, typ: &'static str, description: &'static str) -> Self {
        Self { name, typ, description, optional: false, default: None }
    }

    pub const fn optional(name: &'static str, typ: &'static str, description: &'static str, default: &'static str) -> Self {
        Self { name, typ, description, optional: true, default: Some(default) }
    }
}

/// Metadata for a calculator plugin
#[derive(Debug, Clone, Serialize)]
pub struct CalculatorMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub args: &'static [ArgMeta],
    pub returns: &'static str,
    pub examples: &'static [&'static str],
    pub category: &'static str,
    pub related: &'static [&'static str],
}

/// A statistics calculator callable by name with named arguments
pub trait CalculatorPlugin: Send + Sync {
    fn meta(&self) -> CalculatorMeta;
    fn call(&self, args: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError>;
}
