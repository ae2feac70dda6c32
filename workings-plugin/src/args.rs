//! Named-argument extraction
//!
//! Calculators receive a `Value::Object` of named arguments. These helpers
//! pull typed data out of it and report precisely which argument was wrong.

use thiserror::Error;
use workings_core::{StatsError, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("missing required argument '{0}'")]
    Missing(String),
    #[error("argument '{arg}' expected {expected}, got {got}")]
    WrongType {
        arg: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("argument '{0}' must be finite")]
    NotFinite(String),
    #[error("argument '{arg}' must be a non-negative whole number, got {value}")]
    NotCount { arg: String, value: f64 },
}

impl From<InputError> for StatsError {
    fn from(err: InputError) -> Self {
        let arg = match &err {
            InputError::Missing(a) | InputError::NotFinite(a) => a.clone(),
            InputError::WrongType { arg, .. } | InputError::NotCount { arg, .. } => arg.clone(),
        };
        let code = match err {
            InputError::Missing(_) => workings_core::codes::ARG_MISSING,
            InputError::WrongType { .. } => workings_core::codes::ARG_TYPE,
            InputError::NotFinite(_) | InputError::NotCount { .. } => workings_core::codes::INVALID_INPUT,
        };
        StatsError::new(code, err.to_string()).for_argument(arg)
    }
}

/// Required field; `Null` counts as missing.
pub fn field<'a>(args: &'a Value, key: &str) -> Result<&'a Value, InputError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(InputError::Missing(key.to_string())),
        Some(v) => Ok(v),
    }
}

fn to_f64(value: &Value, arg: &str) -> Result<f64, InputError> {
    let n = match value {
        Value::Number(n) => *n,
        // Numbers sometimes arrive quoted
        Value::Text(s) => s.trim().parse::<f64>().map_err(|_| InputError::WrongType {
            arg: arg.to_string(),
            expected: "Number",
            got: "Text",
        })?,
        other => {
            return Err(InputError::WrongType {
                arg: arg.to_string(),
                expected: "Number",
                got: other.type_name(),
            })
        }
    };
    if !n.is_finite() {
        return Err(InputError::NotFinite(arg.to_string()));
    }
    Ok(n)
}

fn to_list<'a>(value: &'a Value, arg: &str, expected: &'static str) -> Result<&'a [Value], InputError> {
    value.as_list().ok_or_else(|| InputError::WrongType {
        arg: arg.to_string(),
        expected,
        got: value.type_name(),
    })
}

pub fn number(args: &Value, key: &str) -> Result<f64, InputError> {
    to_f64(field(args, key)?, key)
}

pub fn opt_number(args: &Value, key: &str) -> Result<Option<f64>, InputError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => to_f64(v, key).map(Some),
    }
}

/// Non-negative whole number.
pub fn count(args: &Value, key: &str) -> Result<u64, InputError> {
    let n = number(args, key)?;
    if n < 0.0 || n.fract() != 0.0 || n > u64::MAX as f64 {
        return Err(InputError::NotCount { arg: key.to_string(), value: n });
    }
    Ok(n as u64)
}

pub fn numbers(args: &Value, key: &str) -> Result<Vec<f64>, InputError> {
    to_list(field(args, key)?, key, "List<Number>")?
        .iter()
        .map(|v| to_f64(v, key))
        .collect()
}

pub fn groups(args: &Value, key: &str) -> Result<Vec<Vec<f64>>, InputError> {
    to_list(field(args, key)?, key, "List<List<Number>>")?
        .iter()
        .map(|g| {
            to_list(g, key, "List<List<Number>>")?
                .iter()
                .map(|v| to_f64(v, key))
                .collect()
        })
        .collect()
}

pub fn grid(args: &Value, key: &str) -> Result<Vec<Vec<Vec<f64>>>, InputError> {
    to_list(field(args, key)?, key, "List<List<List<Number>>>")?
        .iter()
        .map(|row| {
            to_list(row, key, "List<List<List<Number>>>")?
                .iter()
                .map(|cell| {
                    to_list(cell, key, "List<List<List<Number>>>")?
                        .iter()
                        .map(|v| to_f64(v, key))
                        .collect()
                })
                .collect()
        })
        .collect()
}

pub fn opt_text<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, InputError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(InputError::WrongType {
            arg: key.to_string(),
            expected: "Text",
            got: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_accepts_quoted() {
        let args = Value::from(json!({"data": [1, "2.5", 3]}));
        assert_eq!(numbers(&args, "data").unwrap(), vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_missing_and_null() {
        let args = Value::from(json!({"data": null}));
        assert_eq!(numbers(&args, "data"), Err(InputError::Missing("data".to_string())));
        assert_eq!(numbers(&args, "other"), Err(InputError::Missing("other".to_string())));
    }

    #[test]
    fn test_wrong_type() {
        let args = Value::from(json!({"data": [1, true]}));
        assert!(matches!(numbers(&args, "data"), Err(InputError::WrongType { got: "Bool", .. })));
    }

    #[test]
    fn test_groups_and_grid() {
        let args = Value::from(json!({
            "groups": [[1, 2], [3]],
            "cells": [[[1, 2], [3, 4]], [[5, 6], [7, 8]]]
        }));
        assert_eq!(groups(&args, "groups").unwrap(), vec![vec![1.0, 2.0], vec![3.0]]);
        let g = grid(&args, "cells").unwrap();
        assert_eq!(g[1][0], vec![5.0, 6.0]);
    }

    #[test]
    fn test_count() {
        let args = Value::from(json!({"k": 3, "bad": 2.5, "neg": -1}));
        assert_eq!(count(&args, "k").unwrap(), 3);
        assert!(matches!(count(&args, "bad"), Err(InputError::NotCount { .. })));
        assert!(matches!(count(&args, "neg"), Err(InputError::NotCount { .. })));
    }

    #[test]
    fn test_into_stats_error() {
        let err: StatsError = InputError::Missing("lambda".to_string()).into();
        assert_eq!(err.code, workings_core::codes::ARG_MISSING);
        assert_eq!(err.context.unwrap().argument, Some("lambda".to_string()));
    }
}
