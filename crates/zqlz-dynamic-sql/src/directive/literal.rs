//! Literal text with `${...}` substitution

use minijinja::Value;
use regex::Regex;

use crate::error::{TemplateError, TemplateResult};
use crate::expression::ExpressionEngine;
use crate::properties::ValueType;
use crate::scanner::TokenScanner;
use crate::scope::{PARAMETER_KEY, RenderScope};

/// Name under which a scalar parameter is exposed to substitutions.
pub const VALUE_ALIAS: &str = "value";

/// A pattern every substituted value must match in full.
#[derive(Debug, Clone)]
pub struct ValidationPattern {
    source: String,
    regex: Regex,
}

impl ValidationPattern {
    pub fn new(pattern: &str) -> TemplateResult<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            TemplateError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn check(&self, value: &str) -> TemplateResult<()> {
        if self.regex.is_match(value) {
            Ok(())
        } else {
            Err(TemplateError::Validation {
                value: value.to_string(),
                pattern: self.source.clone(),
            })
        }
    }
}

/// Static SQL text, possibly containing `${...}` substitutions and
/// `#{...}` bind placeholders. Bind placeholders pass through untouched.
#[derive(Debug, Clone)]
pub struct Literal {
    text: String,
    validation: Option<ValidationPattern>,
}

impl Literal {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            validation: None,
        }
    }

    pub fn with_validation(text: impl Into<String>, pattern: &str) -> TemplateResult<Self> {
        Ok(Self {
            text: text.into(),
            validation: Some(ValidationPattern::new(pattern)?),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn validation(&self) -> Option<&ValidationPattern> {
        self.validation.as_ref()
    }

    /// True if the text contains a `${...}` substitution.
    pub fn is_dynamic(&self) -> bool {
        TokenScanner::literal().contains_token(&self.text)
    }

    pub(crate) fn apply(
        &self,
        scope: &mut dyn RenderScope,
        engine: &dyn ExpressionEngine,
    ) -> TemplateResult<bool> {
        let text = TokenScanner::literal().scan(&self.text, |content| {
            expose_scalar_parameter(scope);
            let value = engine.evaluate(content, scope.bindings())?;
            // absence renders as nothing, never as a "none" literal
            let text = if value.is_none() || value.is_undefined() {
                String::new()
            } else {
                value.to_string()
            };
            if let Some(pattern) = &self.validation {
                pattern.check(&text)?;
            }
            Ok::<_, TemplateError>(Some(text))
        })?;

        scope.append(&text);
        Ok(true)
    }
}

/// Binds a scalar (or absent) parameter under [`VALUE_ALIAS`].
fn expose_scalar_parameter(scope: &mut dyn RenderScope) {
    let parameter = scope
        .bindings()
        .get_own(PARAMETER_KEY)
        .cloned()
        .unwrap_or_else(|| Value::from(()));

    if parameter.is_none() || parameter.is_undefined() {
        scope.bind(VALUE_ALIAS, Value::from(()));
    } else if ValueType::of(&parameter).is_scalar() {
        scope.bind(VALUE_ALIAS, parameter);
    }
}
