//! Configuration variables in statement text
//!
//! Resolves `${key}` against [`EngineConfig::variables`] before a statement
//! is compiled. Unknown keys are left in place so the same text can still
//! carry render-time substitutions.

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::scanner::TokenScanner;

/// Substitutes configuration variables into text.
#[derive(Debug, Clone)]
pub struct VariableResolver<'a> {
    variables: &'a BTreeMap<String, String>,
    default_separator: Option<&'a str>,
}

impl<'a> VariableResolver<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            variables: &config.variables,
            default_separator: config
                .enable_default_value
                .then_some(config.default_value_separator.as_str())
                .filter(|separator| !separator.is_empty()),
        }
    }

    /// Replaces `${key}` (and `${key:default}` when enabled) in `text`.
    pub fn resolve(&self, text: &str) -> String {
        TokenScanner::literal().replace(text, |content| {
            if let Some(separator) = self.default_separator {
                if let Some((key, default)) = content.split_once(separator) {
                    let value = self
                        .variables
                        .get(key)
                        .map(String::as_str)
                        .unwrap_or(default);
                    return Some(value.to_string());
                }
            }
            self.variables.get(content).cloned()
        })
    }
}
