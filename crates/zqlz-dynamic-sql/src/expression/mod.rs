//! Expression evaluation boundary
//!
//! Directives never interpret expressions themselves. They ask an injected
//! [`ExpressionEngine`] for a value and apply this crate's truthiness and
//! iteration rules to the result.

mod filters;
mod jinja;

pub use filters::{SqlFilters, register_filters};
pub use jinja::MiniJinjaEngine;

use minijinja::value::{Value, ValueKind};

use crate::error::{TemplateError, TemplateResult};
use crate::scope::Bindings;

/// One element produced by iterating a collection expression.
///
/// For sequences `key` is the zero-based position; for mappings it is the
/// entry's key.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationItem {
    pub key: Value,
    pub value: Value,
}

/// Evaluates textual expressions against a scope's bindings.
///
/// Implementations must be safe to share across threads; renders on
/// different threads evaluate the same expression text concurrently.
pub trait ExpressionEngine: Send + Sync {
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> TemplateResult<Value>;

    /// Evaluates `expression` and applies [`is_truthy`].
    fn evaluate_boolean(&self, expression: &str, bindings: &Bindings) -> TemplateResult<bool> {
        let value = self.evaluate(expression, bindings)?;
        Ok(is_truthy(&value))
    }

    /// Evaluates `expression` and unpacks the result into elements.
    fn evaluate_iterable(
        &self,
        expression: &str,
        bindings: &Bindings,
    ) -> TemplateResult<Vec<IterationItem>> {
        let value = self.evaluate(expression, bindings)?;
        iterate(expression, &value)
    }
}

/// Booleans are used directly, numbers are true unless exactly zero, none
/// and undefined are false, anything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => false,
        ValueKind::Bool => value.is_true(),
        ValueKind::Number if value.is_integer() => i64::try_from(value.clone())
            .map(|n| n != 0)
            .unwrap_or(true),
        ValueKind::Number => f64::try_from(value.clone())
            .map(|n| n != 0.0)
            .unwrap_or(true),
        _ => true,
    }
}

/// Unpacks sequences, byte strings and mappings into iteration elements.
pub fn iterate(expression: &str, value: &Value) -> TemplateResult<Vec<IterationItem>> {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Err(TemplateError::NullIterable {
            expression: expression.to_string(),
        }),
        ValueKind::Seq | ValueKind::Iterable => {
            let iter = value
                .try_iter()
                .map_err(|err| TemplateError::evaluation(expression, err))?;
            Ok(iter
                .enumerate()
                .map(|(position, value)| IterationItem {
                    key: Value::from(position),
                    value,
                })
                .collect())
        }
        ValueKind::Bytes => Ok(value
            .as_bytes()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(position, byte)| IterationItem {
                key: Value::from(position),
                value: Value::from(*byte),
            })
            .collect()),
        ValueKind::Map => {
            let keys = value
                .try_iter()
                .map_err(|err| TemplateError::evaluation(expression, err))?;
            keys.map(|key| {
                let entry = value
                    .get_item(&key)
                    .map_err(|err| TemplateError::evaluation(expression, err))?;
                Ok(IterationItem { key, value: entry })
            })
            .collect()
        }
        _ => Err(TemplateError::NotIterable {
            expression: expression.to_string(),
            value: value.to_string(),
        }),
    }
}
