//! Calculator Registry

use crate::{CalcContext, CalculatorMeta, CalculatorPlugin};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use workings_core::{CalculationResult, StatsError, Value};

/// Central calculator registry
pub struct CalculatorRegistry {
    calculators: HashMap<String, Arc<dyn CalculatorPlugin>>,
}

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self {
            calculators: HashMap::new(),
        }
    }

    pub fn with_calculator<C: CalculatorPlugin + 'static>(mut self, c: C) -> Self {
        let name = c.meta().name.to_lowercase();
        self.calculators.insert(name, Arc::new(c));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn CalculatorPlugin> {
        self.calculators.get(&name.to_lowercase()).map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    /// Sorted calculator names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.calculators.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn call(&self, name: &str, args: &Value, ctx: &CalcContext) -> Result<CalculationResult<Value>, StatsError> {
        match self.get(name) {
            Some(c) => {
                tracing::debug!(calculator = name, "calling calculator");
                c.call(args, ctx).map_err(|e| {
                    tracing::debug!(calculator = name, code = %e.code, "calculator rejected input");
                    e.in_calculator(name.to_lowercase())
                })
            }
            None => {
                // Find similar calculator names for better error message
                let similar = self.find_similar(name);
                let mut err = StatsError::unknown_calculator(name);
                if !similar.is_empty() {
                    let suggestions: Vec<&str> = similar.iter().take(5).map(|s| s.as_str()).collect();
                    err = err.with_suggestion(format!(
                        "Similar: {}. Use list_calculators() for the full list.",
                        suggestions.join(", ")
                    ));
                }
                Err(err)
            }
        }
    }

    /// Calculator names similar to the given name (for error suggestions)
    fn find_similar(&self, name: &str) -> Vec<String> {
        let name_lower = name.to_lowercase();
        let mut matches: Vec<(String, usize)> = self
            .calculators
            .keys()
            .filter_map(|calc_name| {
                let score = Self::similarity_score(&name_lower, calc_name);
                if score > 0 {
                    Some((calc_name.clone(), score))
                } else {
                    None
                }
            })
            .collect();

        // Higher score first, then alphabetical for stable output
        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.into_iter().map(|(name, _)| name).collect()
    }

    fn similarity_score(query: &str, candidate: &str) -> usize {
        let mut score = 0;

        if candidate.starts_with(query) {
            score += 100;
        } else if candidate.contains(query) {
            score += 50;
        } else if query.contains(candidate) {
            score += 30;
        }

        // Shared words ("t_test" vs "test_t")
        let query_words: HashSet<&str> = query.split('_').filter(|w| !w.is_empty()).collect();
        let shared = candidate.split('_').filter(|w| query_words.contains(w)).count();
        score += shared * 20;

        let query_chars: HashSet<char> = query.chars().collect();
        let candidate_chars: HashSet<char> = candidate.chars().collect();
        let common = query_chars.intersection(&candidate_chars).count();

        // Character overlap alone is noise; require it to cover most of the query
        if score == 0 && common * 4 < query_chars.len() * 3 {
            return 0;
        }
        score += common * 2;

        let len_diff = (query.len() as i32 - candidate.len() as i32).unsigned_abs() as usize;
        if len_diff < 5 && score > 0 {
            score += 5 - len_diff;
        }

        score
    }

    pub fn help(&self, name: Option<&str>) -> Result<Value, StatsError> {
        match name {
            Some(n) => self.help_for(n),
            None => Ok(self.general_help()),
        }
    }

    fn help_for(&self, name: &str) -> Result<Value, StatsError> {
        match self.calculators.get(&name.to_lowercase()) {
            Some(c) => Ok(Self::meta_to_help(c.meta())),
            None => Err(StatsError::unknown_calculator(name)),
        }
    }

    fn general_help(&self) -> Value {
        let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, c) in &self.calculators {
            by_category
                .entry(c.meta().category.to_string())
                .or_default()
                .push(name.clone());
        }
        for names in by_category.values_mut() {
            names.sort();
        }

        Value::object([
            (
                "calculators",
                Value::Object(
                    by_category
                        .into_iter()
                        .map(|(k, v)| (k, Value::List(v.into_iter().map(Value::Text).collect())))
                        .collect(),
                ),
            ),
            ("usage", Value::from("Call help('calculator_name') for detailed help.")),
        ])
    }

    fn meta_to_help(meta: CalculatorMeta) -> Value {
        Value::object([
            ("name", Value::from(meta.name)),
            ("description", Value::from(meta.description)),
            ("usage", Value::from(meta.usage)),
            ("returns", Value::from(meta.returns)),
            ("category", Value::from(meta.category)),
            (
                "args",
                Value::List(
                    meta.args
                        .iter()
                        .map(|a| {
                            Value::object([
                                ("name", Value::from(a.name)),
                                ("type", Value::from(a.typ)),
                                ("description", Value::from(a.description)),
                                ("optional", Value::from(a.optional)),
                                ("default", a.default.map(Value::from).unwrap_or(Value::Null)),
                            ])
                        })
                        .collect(),
                ),
            ),
            (
                "examples",
                Value::List(meta.examples.iter().map(|e| Value::from(*e)).collect()),
            ),
            (
                "related",
                Value::List(meta.related.iter().map(|r| Value::from(*r)).collect()),
            ),
        ])
    }

    pub fn list(&self, category: Option<&str>) -> Value {
        let mut metas: Vec<CalculatorMeta> = self
            .calculators
            .values()
            .map(|c| c.meta())
            .filter(|m| category.map_or(true, |c| m.category == c))
            .collect();
        metas.sort_by_key(|m| m.name);

        Value::List(
            metas
                .into_iter()
                .map(|meta| {
                    Value::object([
                        ("name", Value::from(meta.name)),
                        ("description", Value::from(meta.description)),
                        ("usage", Value::from(meta.usage)),
                        ("category", Value::from(meta.category)),
                    ])
                })
                .collect(),
        )
    }
}

impl Default for CalculatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
