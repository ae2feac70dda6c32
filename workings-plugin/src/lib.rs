//! Workings Plugin System
//!
//! Every calculator is a [`CalculatorPlugin`] registered by name in a
//! [`CalculatorRegistry`], so callers can discover it, read its help and
//! invoke it with dynamically-typed named arguments.

pub mod args;
mod context;
mod registry;
mod traits;

pub use args::InputError;
pub use context::CalcContext;
pub use registry::CalculatorRegistry;
pub use traits::{ArgMeta, CalculatorMeta, CalculatorPlugin};

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::args;
    pub use crate::{ArgMeta, CalcContext, CalculatorMeta, CalculatorPlugin, CalculatorRegistry};
    pub use workings_core::prelude::*;
}
