//! ZQLZ Dynamic SQL - statement templates with conditionals and loops
//!
//! This crate renders compiled statement templates into driver-ready SQL
//! plus an ordered list of value extractors, one per positional marker.
//!
//! ## Features
//!
//! - **Directives**: literal text, `<if>`-style conditionals, `<foreach>`-style
//!   iterations and sequences, built once and shared across threads
//! - **Placeholders**: `${expr}` substitutes text at render time, `#{path}`
//!   becomes a positional marker (`?` or `$n`) with a deferred value extractor
//! - **Expressions**: evaluated by a pluggable [`ExpressionEngine`];
//!   [`MiniJinjaEngine`] is provided, with SQL filters `sqlquote`,
//!   `inclause` and `identifier`
//! - **Parameters**: scalars, mappings, sequences and structured values,
//!   with an optional custom [`PropertyAccess`] layer
//!
//! ## Example
//!
//! ```rust,ignore
//! use zqlz_dynamic_sql::{Directive, Iteration, Statement, TemplateRenderer};
//! use minijinja::Value;
//!
//! let statement = Statement::new(
//!     "selectUsers",
//!     Directive::sequence(vec![
//!         Directive::text("SELECT * FROM users WHERE id IN"),
//!         Iteration::over("ids", Directive::text("#{id}"))
//!             .item("id")
//!             .open("(")
//!             .separator(",")
//!             .close(")")
//!             .into(),
//!         Directive::when("name != null", Directive::text("AND name = #{name}")),
//!     ]),
//! );
//!
//! let renderer = TemplateRenderer::with_defaults();
//! let rendered = statement.render(
//!     &renderer,
//!     Value::from_serialize(&serde_json::json!({ "ids": [1, 2], "name": null })),
//! )?;
//! assert_eq!(rendered.sql(), "SELECT * FROM users WHERE id IN ( ? , ? )");
//! let values = rendered.resolve_values(renderer.engine())?;
//! ```

mod config;
pub mod directive;
mod error;
pub mod expression;
mod finalizer;
pub mod properties;
mod rendered;
mod renderer;
pub mod scanner;
pub mod scope;
mod variables;

pub use config::EngineConfig;
pub use directive::{Conditional, Directive, Iteration, Literal, ValidationPattern};
pub use error::{EngineError, TemplateError, TemplateResult};
pub use expression::{ExpressionEngine, IterationItem, MiniJinjaEngine, SqlFilters, is_truthy};
pub use finalizer::{PlaceholderFinalizer, PlaceholderStyle};
pub use properties::{ParamMap, PropertyAccess, ValueProperties, ValueType};
pub use rendered::{BoundValue, ParameterMode, RenderedTemplate, StaticTemplate, ValueExtractor};
pub use renderer::{Statement, TemplateRenderer};
pub use scanner::TokenScanner;
pub use scope::{Bindings, RenderScope, RootScope};
pub use variables::VariableResolver;
