//! Engine configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! database_id = "postgresql"
//! placeholder_style = "dollar_numbered"
//! enable_default_value = true
//!
//! [database_id_aliases]
//! PostgreSQL = "postgresql"
//! MySQL = "mysql"
//!
//! [variables]
//! schema = "app"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TemplateResult;
use crate::finalizer::PlaceholderStyle;

/// Settings shared by every render of a [`crate::TemplateRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dialect id exposed to templates as `_databaseId`.
    pub database_id: Option<String>,
    /// Maps substrings of a driver's product name to dialect ids.
    pub database_id_aliases: BTreeMap<String, String>,
    pub placeholder_style: PlaceholderStyle,
    /// Values for `${key}` configuration variables.
    pub variables: BTreeMap<String, String>,
    /// Allows `${key:default}` in configuration variables.
    pub enable_default_value: bool,
    pub default_value_separator: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_id: None,
            database_id_aliases: BTreeMap::new(),
            placeholder_style: PlaceholderStyle::default(),
            variables: BTreeMap::new(),
            enable_default_value: false,
            default_value_separator: ":".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> TemplateResult<Self> {
        let config = toml::from_str(source)?;
        Ok(config)
    }

    pub fn with_database_id(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = Some(database_id.into());
        self
    }

    pub fn with_placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder_style = style;
        self
    }

    /// Maps a driver product name to a dialect id.
    ///
    /// Without aliases the product name is the id. Otherwise the first alias
    /// (in key order) contained in the product name wins, and no match
    /// yields `None`.
    pub fn resolve_database_id(&self, product_name: &str) -> Option<String> {
        if self.database_id_aliases.is_empty() {
            return Some(product_name.to_string());
        }
        self.database_id_aliases
            .iter()
            .find(|(alias, _)| product_name.contains(alias.as_str()))
            .map(|(_, id)| id.clone())
    }
}
