//! Expression engine using MiniJinja

use std::collections::HashSet;
use std::sync::Arc;

use minijinja::value::{Enumerator, Object, Value};
use minijinja::Environment;

use super::filters::register_filters;
use super::ExpressionEngine;
use crate::error::{TemplateError, TemplateResult};
use crate::scope::Bindings;

/// Global spelled the way mapper expressions test for absence.
const NULL_LITERAL: &str = "null";

/// Builtin globals that scope lookups must not shadow.
const BUILTIN_GLOBALS: &[&str] = &[NULL_LITERAL, "range", "dict", "namespace", "debug"];

/// [`ExpressionEngine`] backed by MiniJinja's expression language.
///
/// Identifiers resolve against the render scope's bindings, falling back to
/// the parameter object; names that resolve nowhere evaluate to none, so
/// `name != null` works for absent properties.
///
/// ## Example
///
/// ```rust,ignore
/// use zqlz_dynamic_sql::{Bindings, ExpressionEngine, MiniJinjaEngine};
///
/// let engine = MiniJinjaEngine::new();
/// let bindings = Bindings::for_parameter(minijinja::Value::from(3), None, None);
/// assert!(engine.evaluate_boolean("value > 2", &bindings).unwrap());
/// ```
pub struct MiniJinjaEngine {
    env: Environment<'static>,
    globals: Arc<HashSet<String>>,
}

impl MiniJinjaEngine {
    /// Create a new engine with the SQL filters registered
    pub fn new() -> Self {
        let mut env = Environment::new();
        register_filters(&mut env);
        env.add_global(NULL_LITERAL, Value::from(()));

        Self {
            env,
            globals: Arc::new(BUILTIN_GLOBALS.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// Register a global value or function
    ///
    /// Globals take precedence over parameter properties of the same name.
    pub fn add_global(&mut self, name: &'static str, value: Value) {
        self.env.add_global(name, value);
        Arc::make_mut(&mut self.globals).insert(name.to_string());
    }

    /// Get a mutable reference to the environment for adding filters/tests
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MiniJinjaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniJinjaEngine")
            .field("globals", &self.globals)
            .finish_non_exhaustive()
    }
}

impl ExpressionEngine for MiniJinjaEngine {
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> TemplateResult<Value> {
        let compiled = self
            .env
            .compile_expression(expression)
            .map_err(|err| TemplateError::evaluation(expression, err))?;

        let context = Value::from_object(ScopeView {
            bindings: bindings.clone(),
            globals: Arc::clone(&self.globals),
        });

        let value = compiled
            .eval(context)
            .map_err(|err| TemplateError::evaluation(expression, err))?;
        tracing::trace!(expression, result = %value, "evaluated expression");
        Ok(value)
    }
}

/// Root context handed to MiniJinja for one evaluation.
#[derive(Debug)]
struct ScopeView {
    bindings: Bindings,
    globals: Arc<HashSet<String>>,
}

impl Object for ScopeView {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let name = key.as_str()?;
        if self.globals.contains(name) {
            return None;
        }
        Some(self.bindings.get(name).unwrap_or_else(|| Value::from(())))
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(
            self.bindings
                .entries()
                .keys()
                .map(|name| Value::from(name.as_str()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::PARAMETER_KEY;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bindings_for(param: serde_json::Value) -> Bindings {
        Bindings::for_parameter(Value::from_serialize(&param), None, Some("postgres"))
    }

    #[test]
    fn test_null_comparisons() {
        let engine = MiniJinjaEngine::new();
        let present = bindings_for(json!({ "name": "a" }));
        let missing = bindings_for(json!({ "name": null }));

        assert!(engine.evaluate_boolean("name != null", &present).unwrap());
        assert!(!engine.evaluate_boolean("name != null", &missing).unwrap());
        assert!(!engine.evaluate_boolean("nickname != null", &present).unwrap());
    }

    #[test]
    fn test_logical_and_property_access() {
        let engine = MiniJinjaEngine::new();
        let bindings = bindings_for(json!({ "user": { "age": 40, "roles": ["admin"] } }));

        assert!(engine
            .evaluate_boolean("user.age > 18 and user.roles | length > 0", &bindings)
            .unwrap());
        assert!(!engine
            .evaluate_boolean("user.age < 18 or not user.roles", &bindings)
            .unwrap());
    }

    #[test]
    fn test_reserved_bindings_are_visible() {
        let engine = MiniJinjaEngine::new();
        let bindings = bindings_for(json!({ "id": 5 }));

        assert!(engine
            .evaluate_boolean("_databaseId == 'postgres'", &bindings)
            .unwrap());
        assert_eq!(
            engine.evaluate("_parameter.id", &bindings).unwrap(),
            Value::from(5)
        );
        assert!(bindings.contains(PARAMETER_KEY));
    }

    #[test]
    fn test_scalar_parameter_resolves_any_name() {
        let engine = MiniJinjaEngine::new();
        let bindings = Bindings::for_parameter(Value::from(42), None, None);

        assert_eq!(
            engine.evaluate("whatever + 1", &bindings).unwrap(),
            Value::from(43)
        );
    }

    #[test]
    fn test_filters_and_builtins() {
        let engine = MiniJinjaEngine::new();
        let bindings = bindings_for(json!({ "col": "created_at" }));

        assert_eq!(
            engine.evaluate("col | identifier", &bindings).unwrap(),
            Value::from("\"created_at\"")
        );
        let items = engine.evaluate_iterable("range(3)", &bindings).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_syntax_error_names_expression() {
        let engine = MiniJinjaEngine::new();
        let err = engine
            .evaluate("name ==", &Bindings::empty())
            .unwrap_err();

        assert!(err.to_string().starts_with("error evaluating expression 'name =='"));
    }

    #[test]
    fn test_custom_global_wins_over_parameter() {
        let mut engine = MiniJinjaEngine::new();
        engine.add_global("limit", Value::from(100));
        let bindings = bindings_for(json!({ "limit": 5 }));

        assert_eq!(engine.evaluate("limit", &bindings).unwrap(), Value::from(100));
    }
}
