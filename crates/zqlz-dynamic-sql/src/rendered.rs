//! Output of a render: final SQL text plus ordered value extractors

use std::fmt;
use std::str::FromStr;

use minijinja::Value;
use serde::{Deserialize, Serialize};

use crate::error::TemplateResult;
use crate::expression::ExpressionEngine;
use crate::properties::{PathSegment, ValueType, parse_path};
use crate::scope::{Bindings, ParameterShape};

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl ParameterMode {
    /// True when the driver reads a value for this marker.
    pub fn is_input(self) -> bool {
        !matches!(self, Self::Out)
    }
}

impl FromStr for ParameterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "INOUT" => Ok(Self::InOut),
            other => Err(format!("unknown parameter mode '{other}'")),
        }
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
        })
    }
}

/// Describes how to pull one bound value out of the parameter object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueExtractor {
    /// Property path read from the bindings or the parameter object.
    pub property: String,
    /// Expression computing the value, for `#{(expr)}` placeholders.
    pub expression: Option<String>,
    /// Declared type of the bound value.
    pub value_type: ValueType,
    pub jdbc_type: Option<String>,
    pub mode: ParameterMode,
    pub numeric_scale: Option<u32>,
    pub result_map: Option<String>,
    pub type_handler: Option<String>,
    pub jdbc_type_name: Option<String>,
}

impl ValueExtractor {
    pub fn for_property(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ..Self::default()
        }
    }

    /// Resolves this extractor's value against `bindings`.
    ///
    /// Computed expressions are evaluated; a property whose root is an
    /// explicit binding (such as a per-iteration alias) is read from the
    /// bindings; otherwise the value comes from the parameter object.
    pub fn resolve(&self, bindings: &Bindings, engine: &dyn ExpressionEngine) -> TemplateResult<Value> {
        if let Some(expression) = &self.expression {
            return engine.evaluate(expression, bindings);
        }

        let rooted_in_bindings = matches!(
            parse_path(&self.property).first(),
            Some(PathSegment::Name(root)) if bindings.contains(root)
        );
        if rooted_in_bindings {
            return Ok(bindings
                .read_own_path(&self.property)
                .unwrap_or_else(|| Value::from(())));
        }

        let value = match bindings.shape() {
            ParameterShape::Absent => None,
            ParameterShape::Scalar => Some(bindings.parameter()),
            ParameterShape::Mapping | ParameterShape::Structured => {
                bindings.read_parameter_path(&self.property)
            }
        };
        Ok(value.unwrap_or_else(|| Value::from(())))
    }
}

/// A value ready to be bound to the marker at `position` (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundValue {
    pub position: usize,
    pub value: Value,
}

/// Final artifact of one render call.
#[derive(Debug, Clone)]
pub struct RenderedTemplate {
    sql: String,
    extractors: Vec<ValueExtractor>,
    bindings: Bindings,
}

impl RenderedTemplate {
    pub fn new(sql: String, extractors: Vec<ValueExtractor>, bindings: Bindings) -> Self {
        Self {
            sql,
            extractors,
            bindings,
        }
    }

    /// SQL text containing only driver-native positional markers.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// One extractor per marker, in marker order.
    pub fn extractors(&self) -> &[ValueExtractor] {
        &self.extractors
    }

    /// Bindings captured from the render scope at finalization.
    pub fn additional_bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// The caller's parameter object.
    pub fn parameter(&self) -> Value {
        self.bindings.parameter()
    }

    /// Resolves the value of every input marker, in marker order.
    ///
    /// `OUT` markers are skipped but still count towards positions.
    pub fn resolve_values(&self, engine: &dyn ExpressionEngine) -> TemplateResult<Vec<BoundValue>> {
        self.extractors
            .iter()
            .enumerate()
            .filter(|(_, extractor)| extractor.mode.is_input())
            .map(|(index, extractor)| {
                Ok(BoundValue {
                    position: index + 1,
                    value: extractor.resolve(&self.bindings, engine)?,
                })
            })
            .collect()
    }

    pub fn into_parts(self) -> (String, Vec<ValueExtractor>, Bindings) {
        (self.sql, self.extractors, self.bindings)
    }
}

/// Finalized text and extractors of a statement whose output never depends
/// on its parameter. Binding it to a parameter yields a [`RenderedTemplate`].
#[derive(Debug, Clone)]
pub struct StaticTemplate {
    sql: String,
    extractors: Vec<ValueExtractor>,
}

impl StaticTemplate {
    pub fn new(sql: String, extractors: Vec<ValueExtractor>) -> Self {
        Self { sql, extractors }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn extractors(&self) -> &[ValueExtractor] {
        &self.extractors
    }

    pub fn bind(&self, bindings: Bindings) -> RenderedTemplate {
        RenderedTemplate::new(self.sql.clone(), self.extractors.clone(), bindings)
    }
}

impl From<RenderedTemplate> for StaticTemplate {
    fn from(rendered: RenderedTemplate) -> Self {
        Self::new(rendered.sql, rendered.extractors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::MiniJinjaEngine;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bindings(param: serde_json::Value) -> Bindings {
        Bindings::for_parameter(Value::from_serialize(&param), None, None)
    }

    #[test]
    fn test_parameter_mode_parsing() {
        assert_eq!("in".parse::<ParameterMode>().unwrap(), ParameterMode::In);
        assert_eq!("INOUT".parse::<ParameterMode>().unwrap(), ParameterMode::InOut);
        assert!("sideways".parse::<ParameterMode>().is_err());
        assert_eq!(ParameterMode::Out.to_string(), "OUT");
    }

    #[test]
    fn test_resolve_prefers_explicit_bindings() {
        let mut bindings = bindings(json!({ "id": 1 }));
        bindings.insert("__frch_id_0", Value::from(7));
        let engine = MiniJinjaEngine::new();

        let alias = ValueExtractor::for_property("__frch_id_0");
        let property = ValueExtractor::for_property("id");
        assert_eq!(alias.resolve(&bindings, &engine).unwrap(), Value::from(7));
        assert_eq!(property.resolve(&bindings, &engine).unwrap(), Value::from(1));
    }

    #[test]
    fn test_resolve_scalar_and_absent_parameters() {
        let engine = MiniJinjaEngine::new();
        let extractor = ValueExtractor::for_property("anything");

        let scalar = Bindings::for_parameter(Value::from("x"), None, None);
        assert_eq!(extractor.resolve(&scalar, &engine).unwrap(), Value::from("x"));

        let absent = Bindings::for_parameter(Value::from(()), None, None);
        assert!(extractor.resolve(&absent, &engine).unwrap().is_none());
    }

    #[test]
    fn test_resolve_nested_and_missing_properties() {
        let bindings = bindings(json!({ "user": { "name": "ada", "tags": ["a", "b"] } }));
        let engine = MiniJinjaEngine::new();

        let name = ValueExtractor::for_property("user.name");
        let tag = ValueExtractor::for_property("user.tags[1]");
        let missing = ValueExtractor::for_property("user.email");
        assert_eq!(name.resolve(&bindings, &engine).unwrap(), Value::from("ada"));
        assert_eq!(tag.resolve(&bindings, &engine).unwrap(), Value::from("b"));
        assert!(missing.resolve(&bindings, &engine).unwrap().is_none());
    }

    #[test]
    fn test_resolve_computed_expression() {
        let bindings = bindings(json!({ "price": 10, "qty": 3 }));
        let extractor = ValueExtractor {
            expression: Some("price * qty".into()),
            ..ValueExtractor::default()
        };
        assert_eq!(
            extractor.resolve(&bindings, &MiniJinjaEngine::new()).unwrap(),
            Value::from(30)
        );
    }

    #[test]
    fn test_resolve_values_skips_out_parameters() {
        let rendered = RenderedTemplate::new(
            "{call f(?, ?, ?)}".into(),
            vec![
                ValueExtractor::for_property("a"),
                ValueExtractor {
                    mode: ParameterMode::Out,
                    ..ValueExtractor::for_property("result")
                },
                ValueExtractor::for_property("b"),
            ],
            bindings(json!({ "a": 1, "b": 2 })),
        );

        let values = rendered.resolve_values(&MiniJinjaEngine::new()).unwrap();
        assert_eq!(
            values,
            vec![
                BoundValue { position: 1, value: Value::from(1) },
                BoundValue { position: 3, value: Value::from(2) },
            ]
        );
    }

    #[test]
    fn test_static_template_binds_fresh_parameters() {
        let template = StaticTemplate::new(
            "SELECT * FROM t WHERE id = ?".into(),
            vec![ValueExtractor::for_property("id")],
        );
        let engine = MiniJinjaEngine::new();

        let first = template.bind(bindings(json!({ "id": 1 })));
        let second = template.bind(bindings(json!({ "id": 2 })));
        assert_eq!(first.sql(), second.sql());
        assert_eq!(first.resolve_values(&engine).unwrap()[0].value, Value::from(1));
        assert_eq!(second.resolve_values(&engine).unwrap()[0].value, Value::from(2));
    }
}
