//! Property access over parameter objects
//!
//! Parameter objects reach the renderer as [`Value`]s. Lookups that miss the
//! render scope's own bindings fall back to reading a property of the
//! parameter object through the [`PropertyAccess`] boundary, so a reflective
//! layer can be plugged in without the rendering core knowing about it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use minijinja::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};

/// Declared type of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Any,
    Bool,
    Integer,
    Float,
    String,
    Bytes,
    Sequence,
    Map,
    Object,
}

impl ValueType {
    /// Infers the type of a runtime value. Absent values are `Any`.
    pub fn of(value: &Value) -> Self {
        match value.kind() {
            ValueKind::Undefined | ValueKind::None => Self::Any,
            ValueKind::Bool => Self::Bool,
            ValueKind::Number if value.is_integer() => Self::Integer,
            ValueKind::Number => Self::Float,
            ValueKind::String => Self::String,
            ValueKind::Bytes => Self::Bytes,
            ValueKind::Seq | ValueKind::Iterable => Self::Sequence,
            ValueKind::Map => Self::Map,
            _ => Self::Object,
        }
    }

    /// Scalar types bind directly without property navigation.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Integer | Self::Float | Self::String | Self::Bytes
        )
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "any" | "object" => Self::Any,
            "bool" | "boolean" => Self::Bool,
            "int" | "integer" | "long" | "short" | "byte" | "i8" | "i16" | "i32" | "i64"
            | "u8" | "u16" | "u32" | "u64" | "biginteger" => Self::Integer,
            "float" | "double" | "decimal" | "bigdecimal" | "f32" | "f64" => Self::Float,
            "string" | "str" | "char" | "character" => Self::String,
            "bytes" | "byte[]" | "_byte[]" => Self::Bytes,
            "list" | "seq" | "sequence" | "array" | "collection" => Self::Sequence,
            "map" | "hashmap" | "mapping" => Self::Map,
            other => return Err(format!("unknown value type '{other}'")),
        };
        Ok(ty)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Sequence => "sequence",
            Self::Map => "map",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Read access to the properties of one parameter object.
pub trait PropertyAccess: fmt::Debug + Send + Sync {
    /// Returns true if `path` names a readable property.
    fn has_readable(&self, path: &str) -> bool;

    /// Reads the value at `path`, or `None` when it cannot be read.
    fn read(&self, path: &str) -> Option<Value>;

    /// Returns the declared type of the property at `path`.
    fn declared_type_of(&self, path: &str) -> ValueType {
        self.read(path)
            .map(|value| ValueType::of(&value))
            .unwrap_or_default()
    }

    /// True when the underlying object is a plain name/value mapping.
    fn is_plain_mapping(&self) -> bool {
        false
    }
}

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Name(String),
    Index(usize),
    Key(String),
}

/// Splits `a.b[0].c` or `m[key]` into segments.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut name = String::new();
    let mut chars = path.trim().chars();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !name.is_empty() {
                    segments.push(PathSegment::Name(std::mem::take(&mut name)));
                }
            }
            '[' => {
                if !name.is_empty() {
                    segments.push(PathSegment::Name(std::mem::take(&mut name)));
                }
                let inner: String = chars.by_ref().take_while(|c| *c != ']').collect();
                let inner = inner.trim();
                match inner.parse::<usize>() {
                    Ok(index) => segments.push(PathSegment::Index(index)),
                    Err(_) => segments.push(PathSegment::Key(
                        inner.trim_matches(|c| c == '\'' || c == '"').to_string(),
                    )),
                }
            }
            c if c.is_whitespace() => {}
            c => name.push(c),
        }
    }
    if !name.is_empty() {
        segments.push(PathSegment::Name(name));
    }
    segments
}

/// Navigates `segments` starting at `root`.
///
/// Missing attributes and out-of-range indexes yield `None`; a present
/// property holding none yields `Some(none)`.
pub fn read_segments(root: &Value, segments: &[PathSegment]) -> Option<Value> {
    let mut current = root.clone();
    for segment in segments {
        let next = match segment {
            PathSegment::Name(name) => current.get_attr(name),
            PathSegment::Index(index) => current.get_item(&Value::from(*index)),
            PathSegment::Key(key) => current.get_item(&Value::from(key.as_str())),
        };
        current = next.ok().filter(|value| !value.is_undefined())?;
    }
    Some(current)
}

/// The default [`PropertyAccess`] implementation, reading through the
/// value's own attribute and item protocol.
#[derive(Debug, Clone)]
pub struct ValueProperties {
    root: Value,
}

impl ValueProperties {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

impl PropertyAccess for ValueProperties {
    fn has_readable(&self, path: &str) -> bool {
        self.read(path).is_some()
    }

    fn read(&self, path: &str) -> Option<Value> {
        let segments = parse_path(path);
        if segments.is_empty() {
            return None;
        }
        read_segments(&self.root, &segments)
    }

    fn is_plain_mapping(&self) -> bool {
        self.root.kind() == ValueKind::Map
    }
}

/// Builders for mapping-shaped parameter objects.
pub struct ParamMap;

impl ParamMap {
    const GENERIC_NAME_PREFIX: &'static str = "param";

    /// Builds a parameter map from named arguments, adding `param1..paramN`
    /// aliases for every argument whose alias is not already taken by a name.
    pub fn from_named<I, K>(args: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let args: Vec<(String, Value)> = args.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let mut map: BTreeMap<String, Value> = BTreeMap::new();

        for (position, (name, value)) in args.iter().enumerate() {
            map.insert(name.clone(), value.clone());
            let generic = format!("{}{}", Self::GENERIC_NAME_PREFIX, position + 1);
            if !args.iter().any(|(n, _)| *n == generic) {
                map.insert(generic, value.clone());
            }
        }
        Value::from_serialize(&map)
    }

    /// Exposes a sequence parameter under `collection`, `list` and `array`.
    pub fn wrap_collection(collection: Value) -> Value {
        let map: BTreeMap<&str, Value> = ["collection", "list", "array"]
            .into_iter()
            .map(|key| (key, collection.clone()))
            .collect();
        Value::from_serialize(&map)
    }
}
