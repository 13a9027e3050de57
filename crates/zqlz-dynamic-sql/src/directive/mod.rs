//! Compiled statement templates
//!
//! A statement's dynamic SQL is a tree of [`Directive`]s built once by the
//! mapper compiler and shared read-only by every render of that statement.
//!
//! ## Example
//!
//! ```rust,ignore
//! use zqlz_dynamic_sql::{Directive, Iteration};
//!
//! let select = Directive::sequence(vec![
//!     Directive::text("SELECT * FROM users WHERE id IN"),
//!     Iteration::over("ids", Directive::text("#{id}"))
//!         .item("id")
//!         .open("(")
//!         .separator(",")
//!         .close(")")
//!         .into(),
//! ]);
//! ```

mod conditional;
mod iteration;
mod literal;

pub use conditional::Conditional;
pub use iteration::Iteration;
pub use literal::{Literal, VALUE_ALIAS, ValidationPattern};

use crate::error::TemplateResult;
use crate::expression::ExpressionEngine;
use crate::scope::RenderScope;

/// One node of a compiled statement template.
#[derive(Debug, Clone)]
pub enum Directive {
    Literal(Literal),
    Conditional(Conditional),
    Iteration(Iteration),
    Composite(Vec<Directive>),
}

impl Directive {
    /// Literal SQL text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Literal(Literal::new(text))
    }

    /// Literal SQL text whose `${...}` substitutions must match `pattern`.
    pub fn text_checked(text: impl Into<String>, pattern: &str) -> TemplateResult<Self> {
        Literal::with_validation(text, pattern).map(Self::Literal)
    }

    /// Renders `body` only when `test` holds.
    pub fn when(test: impl Into<String>, body: Directive) -> Self {
        Self::Conditional(Conditional::new(test, body))
    }

    /// Children rendered in order into the same scope.
    pub fn sequence(children: Vec<Directive>) -> Self {
        Self::Composite(children)
    }

    /// Renders this directive into `scope`.
    ///
    /// The returned flag reports whether anything was applied; a false
    /// conditional reports `false`. It never stops a sequence.
    pub fn apply(
        &self,
        scope: &mut dyn RenderScope,
        engine: &dyn ExpressionEngine,
    ) -> TemplateResult<bool> {
        match self {
            Self::Literal(literal) => literal.apply(scope, engine),
            Self::Conditional(conditional) => conditional.apply(scope, engine),
            Self::Iteration(iteration) => iteration.apply(scope, engine),
            Self::Composite(children) => {
                for child in children {
                    child.apply(scope, engine)?;
                }
                Ok(true)
            }
        }
    }

    /// True if rendering can depend on the parameter object.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Literal(literal) => literal.is_dynamic(),
            Self::Conditional(_) | Self::Iteration(_) => true,
            Self::Composite(children) => children.iter().any(Directive::is_dynamic),
        }
    }
}

impl From<Literal> for Directive {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Conditional> for Directive {
    fn from(conditional: Conditional) -> Self {
        Self::Conditional(conditional)
    }
}

impl From<Iteration> for Directive {
    fn from(iteration: Iteration) -> Self {
        Self::Iteration(iteration)
    }
}
