//! Error types for dynamic SQL rendering

use thiserror::Error;

/// Boxed error produced by an expression engine implementation.
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while rendering or finalizing a statement template.
///
/// Every failure aborts the render in progress. Context variants
/// (`Conditional`, `Iteration`, `Statement`) wrap the underlying cause so
/// the chain names the directive, expression and element that failed.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("error evaluating expression '{expression}': {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: EngineError,
    },

    #[error("the expression '{expression}' evaluated to a null value")]
    NullIterable { expression: String },

    #[error("error evaluating expression '{expression}': return value ({value}) was not iterable")]
    NotIterable { expression: String, value: String },

    #[error("invalid input '{value}', please conform to pattern '{pattern}'")]
    Validation { value: String, pattern: String },

    #[error("invalid validation pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid parameter mapping '#{{{content}}}': {reason}")]
    ParameterMapping { content: String, reason: String },

    #[error("in <if test=\"{test}\">")]
    Conditional {
        test: String,
        #[source]
        source: Box<TemplateError>,
    },

    #[error("in <foreach collection=\"{expression}\"> at index {index}")]
    Iteration {
        expression: String,
        index: usize,
        #[source]
        source: Box<TemplateError>,
    },

    #[error("error rendering statement '{id}'")]
    Statement {
        id: String,
        #[source]
        source: Box<TemplateError>,
    },

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl TemplateError {
    pub(crate) fn evaluation(expression: &str, source: impl Into<EngineError>) -> Self {
        Self::Evaluation {
            expression: expression.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn mapping(content: &str, reason: impl Into<String>) -> Self {
        Self::ParameterMapping {
            content: content.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the innermost error of a context chain.
    pub fn root_cause(&self) -> &TemplateError {
        match self {
            Self::Conditional { source, .. }
            | Self::Iteration { source, .. }
            | Self::Statement { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_context_chain() {
        let err = TemplateError::Statement {
            id: "selectUsers".into(),
            source: Box::new(TemplateError::Iteration {
                expression: "ids".into(),
                index: 2,
                source: Box::new(TemplateError::NullIterable {
                    expression: "inner".into(),
                }),
            }),
        };

        assert!(matches!(
            err.root_cause(),
            TemplateError::NullIterable { expression } if expression == "inner"
        ));
        assert_eq!(err.to_string(), "error rendering statement 'selectUsers'");
    }

    #[test]
    fn test_mapping_error_message() {
        let err = TemplateError::mapping("id,foo=bar", "unknown property 'foo'");
        assert_eq!(
            err.to_string(),
            "invalid parameter mapping '#{id,foo=bar}': unknown property 'foo'"
        );
    }
}
