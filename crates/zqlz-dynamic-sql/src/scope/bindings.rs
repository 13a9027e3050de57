//! Name/value bindings of a render scope

use std::sync::Arc;

use indexmap::IndexMap;
use minijinja::value::{Value, ValueKind};

use crate::properties::{
    ParamMap, PathSegment, PropertyAccess, ValueProperties, ValueType, parse_path, read_segments,
};

/// Binding holding the caller's parameter object verbatim.
pub const PARAMETER_KEY: &str = "_parameter";
/// Binding holding the configured database dialect id.
pub const DATABASE_ID_KEY: &str = "_databaseId";

/// How the parameter object participates in name lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterShape {
    /// No parameter object was supplied.
    Absent,
    /// A scalar value; any unbound name resolves to the value itself.
    Scalar,
    /// A plain name/value mapping.
    Mapping,
    /// A structured object navigated through a property accessor.
    Structured,
}

#[derive(Debug, Clone)]
enum Fallback {
    None,
    Scalar(Value),
    Properties(Arc<dyn PropertyAccess>),
}

/// Bindings of one render: explicit entries plus read-only fallback to the
/// parameter object.
///
/// Entries are copy-on-write so an expression engine can take a cheap
/// snapshot while the scope keeps rendering.
#[derive(Debug, Clone)]
pub struct Bindings {
    entries: Arc<IndexMap<String, Value>>,
    fallback: Fallback,
    shape: ParameterShape,
}

impl Default for Bindings {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bindings {
    /// Bindings with no entries and no parameter fallback.
    pub fn empty() -> Self {
        Self {
            entries: Arc::new(IndexMap::new()),
            fallback: Fallback::None,
            shape: ParameterShape::Absent,
        }
    }

    /// Builds bindings for `parameter`, seeding the reserved entries.
    ///
    /// Sequences are wrapped so they can be addressed as `collection`,
    /// `list` or `array`. When `accessor` is `None`, properties are read
    /// through [`ValueProperties`].
    pub fn for_parameter(
        parameter: Value,
        accessor: Option<Arc<dyn PropertyAccess>>,
        database_id: Option<&str>,
    ) -> Self {
        let (parameter, fallback, shape) = match parameter.kind() {
            ValueKind::Undefined | ValueKind::None => {
                (Value::from(()), Fallback::None, ParameterShape::Absent)
            }
            _ if ValueType::of(&parameter).is_scalar() => (
                parameter.clone(),
                Fallback::Scalar(parameter),
                ParameterShape::Scalar,
            ),
            ValueKind::Seq | ValueKind::Iterable => {
                let wrapped = ParamMap::wrap_collection(parameter);
                let props: Arc<dyn PropertyAccess> = Arc::new(ValueProperties::new(wrapped.clone()));
                (wrapped, Fallback::Properties(props), ParameterShape::Mapping)
            }
            kind => {
                let props = accessor
                    .unwrap_or_else(|| Arc::new(ValueProperties::new(parameter.clone())));
                let shape = if props.is_plain_mapping() || kind == ValueKind::Map {
                    ParameterShape::Mapping
                } else {
                    ParameterShape::Structured
                };
                (parameter, Fallback::Properties(props), shape)
            }
        };

        let mut bindings = Self {
            entries: Arc::new(IndexMap::new()),
            fallback,
            shape,
        };
        bindings.insert(PARAMETER_KEY, parameter);
        bindings.insert(
            DATABASE_ID_KEY,
            database_id.map(Value::from).unwrap_or_else(|| Value::from(())),
        );
        bindings
    }

    /// Looks up `name`, falling back to the parameter object.
    ///
    /// Lookups never write into the bindings.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.entries.get(name) {
            return Some(value.clone());
        }
        match &self.fallback {
            Fallback::None => None,
            Fallback::Scalar(value) => Some(value.clone()),
            Fallback::Properties(props) => props.read(name),
        }
    }

    /// Looks up an explicit entry only.
    pub fn get_own(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        Arc::make_mut(&mut self.entries).insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        if !self.entries.contains_key(name) {
            return None;
        }
        Arc::make_mut(&mut self.entries).shift_remove(name)
    }

    /// The parameter object as seeded under [`PARAMETER_KEY`].
    pub fn parameter(&self) -> Value {
        self.entries
            .get(PARAMETER_KEY)
            .cloned()
            .unwrap_or_else(|| Value::from(()))
    }

    pub fn shape(&self) -> ParameterShape {
        self.shape
    }

    /// True if the root segment of `path` is an explicit entry and the
    /// rest of the path is readable from it.
    pub fn has_own_path(&self, path: &str) -> bool {
        self.read_own_path(path).is_some()
    }

    /// Reads `path` from the explicit entries only.
    pub fn read_own_path(&self, path: &str) -> Option<Value> {
        let segments = parse_path(path);
        let (PathSegment::Name(root), rest) = segments.split_first()? else {
            return None;
        };
        let value = self.entries.get(root)?;
        read_segments(value, rest)
    }

    /// Reads `path` from the parameter object through the accessor.
    pub fn read_parameter_path(&self, path: &str) -> Option<Value> {
        match &self.fallback {
            Fallback::None => None,
            Fallback::Scalar(value) => Some(value.clone()),
            Fallback::Properties(props) => props.read(path),
        }
    }

    /// Declared type of `path` on the parameter object.
    pub fn parameter_type_of(&self, path: &str) -> ValueType {
        match &self.fallback {
            Fallback::None => ValueType::Any,
            Fallback::Scalar(value) => ValueType::of(value),
            Fallback::Properties(props) => props.declared_type_of(path),
        }
    }

    pub fn entries(&self) -> &IndexMap<String, Value> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_reserved_entries_are_seeded() {
        let bindings = Bindings::for_parameter(Value::from(42), None, Some("mysql"));

        assert_eq!(bindings.get_own(PARAMETER_KEY), Some(&Value::from(42)));
        assert_eq!(bindings.get_own(DATABASE_ID_KEY), Some(&Value::from("mysql")));
        assert_eq!(bindings.shape(), ParameterShape::Scalar);
    }

    #[test]
    fn test_scalar_parameter_answers_any_name() {
        let bindings = Bindings::for_parameter(Value::from("abc"), None, None);
        assert_eq!(bindings.get("whatever"), Some(Value::from("abc")));
    }

    #[test]
    fn test_mapping_fallback_is_read_only() {
        let param = Value::from_serialize(&json!({ "name": "bob" }));
        let bindings = Bindings::for_parameter(param, None, None);

        assert_eq!(bindings.get("name"), Some(Value::from("bob")));
        assert_eq!(bindings.get("missing"), None);
        assert!(!bindings.contains("name"));
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.shape(), ParameterShape::Mapping);
    }

    #[test]
    fn test_entries_shadow_parameter_properties() {
        let param = Value::from_serialize(&json!({ "name": "bob" }));
        let mut bindings = Bindings::for_parameter(param, None, None);
        bindings.insert("name", Value::from("carol"));

        assert_eq!(bindings.get("name"), Some(Value::from("carol")));
        assert_eq!(bindings.remove("name"), Some(Value::from("carol")));
        assert_eq!(bindings.get("name"), Some(Value::from("bob")));
    }

    #[test]
    fn test_sequence_parameter_is_wrapped() {
        let bindings = Bindings::for_parameter(Value::from(vec![1, 2]), None, None);

        assert_eq!(bindings.shape(), ParameterShape::Mapping);
        assert_eq!(bindings.get("list"), Some(Value::from(vec![1, 2])));
        assert_eq!(bindings.get("array"), Some(Value::from(vec![1, 2])));
    }

    #[test]
    fn test_absent_parameter() {
        let bindings = Bindings::for_parameter(Value::from(()), None, None);

        assert_eq!(bindings.shape(), ParameterShape::Absent);
        assert_eq!(bindings.get("id"), None);
        assert!(bindings.parameter().is_none());
    }

    #[test]
    fn test_own_path_reads() {
        let mut bindings = Bindings::empty();
        bindings.insert(
            "__frch_item_0",
            Value::from_serialize(&json!({ "name": "x" })),
        );

        assert!(bindings.has_own_path("__frch_item_0.name"));
        assert!(!bindings.has_own_path("__frch_item_1.name"));
        assert_eq!(
            bindings.read_own_path("__frch_item_0.name"),
            Some(Value::from("x"))
        );
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let mut bindings = Bindings::empty();
        bindings.insert("a", Value::from(1));
        let snapshot = bindings.clone();
        bindings.insert("a", Value::from(2));

        assert_eq!(snapshot.get("a"), Some(Value::from(1)));
        assert_eq!(bindings.get("a"), Some(Value::from(2)));
    }
}
