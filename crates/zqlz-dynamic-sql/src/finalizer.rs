//! Bind placeholder finalization
//!
//! Rewrites every `#{...}` placeholder of rendered text into a driver-native
//! positional marker and records a [`ValueExtractor`] per marker, in
//! encounter order.
//!
//! Placeholder content follows `property[:JDBC_TYPE][,key=value]*`, or
//! `(expression)` in place of the property for computed values.
//!
//! # Example
//!
//! ```rust,ignore
//! use zqlz_dynamic_sql::{PlaceholderFinalizer, PlaceholderStyle, Bindings};
//!
//! let finalizer = PlaceholderFinalizer::new(PlaceholderStyle::DollarNumbered);
//! let rendered = finalizer.finalize("WHERE id = #{id} AND n = #{name,jdbcType=VARCHAR}", Bindings::empty())?;
//! assert_eq!(rendered.sql(), "WHERE id = $1 AND n = $2");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{TemplateError, TemplateResult};
use crate::properties::ValueType;
use crate::rendered::{ParameterMode, RenderedTemplate, ValueExtractor};
use crate::scanner::TokenScanner;
use crate::scope::{Bindings, ParameterShape};

const ALLOWED_QUALIFIERS: &str =
    "javaType,jdbcType,mode,numericScale,resultMap,typeHandler,jdbcTypeName";

const CURSOR_JDBC_TYPE: &str = "CURSOR";

/// Positional marker syntax of the target driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?` for every marker (JDBC, MySQL, SQLite)
    #[default]
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    DollarNumbered,
}

impl PlaceholderStyle {
    /// Marker for the 1-based `position`.
    pub fn marker(self, position: usize) -> String {
        match self {
            Self::QuestionMark => "?".to_string(),
            Self::DollarNumbered => format!("${position}"),
        }
    }
}

/// Second rendering pass turning bind placeholders into positional markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderFinalizer {
    style: PlaceholderStyle,
}

impl PlaceholderFinalizer {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    /// Finalizes `text` rendered against `bindings`.
    ///
    /// The bindings are captured into the result so per-iteration aliases
    /// stay resolvable at bind time.
    pub fn finalize(&self, text: &str, bindings: Bindings) -> TemplateResult<RenderedTemplate> {
        let mut extractors = Vec::new();
        let sql = TokenScanner::bind().scan(text, |content| {
            let extractor = build_extractor(content, &bindings)?;
            extractors.push(extractor);
            Ok::<_, TemplateError>(Some(self.style.marker(extractors.len())))
        })?;

        tracing::debug!(sql = %sql, extractors = extractors.len(), "finalized placeholders");
        Ok(RenderedTemplate::new(sql, extractors, bindings))
    }
}

/// Target of a bind placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Property(String),
    Expression(String),
}

/// Parsed placeholder content.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlaceholderSpec {
    target: Target,
    jdbc_type: Option<String>,
    qualifiers: Vec<(String, String)>,
}

fn build_extractor(content: &str, bindings: &Bindings) -> TemplateResult<ValueExtractor> {
    let parsed = parse_placeholder(content)?;
    let mut extractor = match parsed.target {
        Target::Property(property) => ValueExtractor::for_property(property),
        Target::Expression(expression) => ValueExtractor {
            expression: Some(expression),
            ..ValueExtractor::default()
        },
    };
    extractor.jdbc_type = parsed.jdbc_type;

    let mut java_type = None;
    for (key, value) in parsed.qualifiers {
        match key.as_str() {
            "javaType" => {
                let ty = value
                    .parse::<ValueType>()
                    .map_err(|reason| TemplateError::mapping(content, reason))?;
                java_type = Some(ty);
            }
            "jdbcType" => extractor.jdbc_type = Some(value),
            "mode" => {
                extractor.mode = value
                    .parse::<ParameterMode>()
                    .map_err(|reason| TemplateError::mapping(content, reason))?;
            }
            "numericScale" => {
                let scale = value.parse::<u32>().map_err(|_| {
                    TemplateError::mapping(content, format!("invalid numericScale '{value}'"))
                })?;
                extractor.numeric_scale = Some(scale);
            }
            "resultMap" => extractor.result_map = Some(value),
            "typeHandler" => extractor.type_handler = Some(value),
            "jdbcTypeName" => extractor.jdbc_type_name = Some(value),
            other => {
                return Err(TemplateError::mapping(
                    content,
                    format!("unknown property '{other}', valid properties are {ALLOWED_QUALIFIERS}"),
                ));
            }
        }
    }

    extractor.value_type = match java_type {
        Some(ty) => ty,
        None => declared_type(&extractor, bindings),
    };
    Ok(extractor)
}

fn declared_type(extractor: &ValueExtractor, bindings: &Bindings) -> ValueType {
    let property = extractor.property.as_str();
    if !property.is_empty() {
        if let Some(value) = bindings.read_own_path(property) {
            return ValueType::of(&value);
        }
    }
    if bindings.shape() == ParameterShape::Scalar {
        return ValueType::of(&bindings.parameter());
    }
    if extractor.jdbc_type.as_deref() == Some(CURSOR_JDBC_TYPE)
        || property.is_empty()
        || bindings.shape() == ParameterShape::Mapping
    {
        return ValueType::Any;
    }
    bindings.parameter_type_of(property)
}

fn parse_placeholder(content: &str) -> TemplateResult<PlaceholderSpec> {
    let bytes = content.as_bytes();
    let start = skip_whitespace(bytes, 0);

    let (target, rest) = if bytes.get(start) == Some(&b'(') {
        let close = matching_paren(bytes, start)
            .ok_or_else(|| TemplateError::mapping(content, "unbalanced parentheses"))?;
        let expression = content[start + 1..close].trim().to_string();
        (Target::Expression(expression), close + 1)
    } else {
        let end = skip_until(bytes, start, b",:");
        (Target::Property(content[start..end].trim().to_string()), end)
    };
    if matches!(&target, Target::Property(path) | Target::Expression(path) if path.is_empty()) {
        return Err(TemplateError::mapping(
            content,
            format!("missing property at position {start}"),
        ));
    }

    let mut parsed = PlaceholderSpec {
        target,
        jdbc_type: None,
        qualifiers: Vec::new(),
    };

    let position = skip_whitespace(bytes, rest);
    let qualifiers_from = match bytes.get(position) {
        None => return Ok(parsed),
        Some(b':') => {
            let end = skip_until(bytes, position + 1, b",");
            let jdbc_type = content[position + 1..end].trim();
            if jdbc_type.is_empty() {
                return Err(TemplateError::mapping(
                    content,
                    format!("missing jdbc type at position {}", position + 1),
                ));
            }
            parsed.jdbc_type = Some(jdbc_type.to_string());
            end + 1
        }
        Some(b',') => position + 1,
        Some(_) => {
            return Err(TemplateError::mapping(
                content,
                format!("parsing error at position {position}"),
            ));
        }
    };

    if qualifiers_from < content.len() {
        for option in content[qualifiers_from..].split(',') {
            if option.trim().is_empty() {
                continue;
            }
            let (key, value) = option.split_once('=').ok_or_else(|| {
                TemplateError::mapping(content, format!("expected key=value, found '{}'", option.trim()))
            })?;
            parsed
                .qualifiers
                .push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    Ok(parsed)
}

fn skip_whitespace(bytes: &[u8], mut position: usize) -> usize {
    while position < bytes.len() && bytes[position] <= b' ' {
        position += 1;
    }
    position
}

fn skip_until(bytes: &[u8], mut position: usize, stops: &[u8]) -> usize {
    while position < bytes.len() && !stops.contains(&bytes[position]) {
        position += 1;
    }
    position
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (position, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(position);
                }
            }
            _ => {}
        }
    }
    None
}
