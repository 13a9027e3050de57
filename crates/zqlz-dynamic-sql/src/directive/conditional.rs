use super::Directive;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::ExpressionEngine;
use crate::scope::RenderScope;

/// Renders its body only when `test` is truthy.
#[derive(Debug, Clone)]
pub struct Conditional {
    test: String,
    body: Box<Directive>,
}

impl Conditional {
    pub fn new(test: impl Into<String>, body: Directive) -> Self {
        Self {
            test: test.into(),
            body: Box::new(body),
        }
    }

    pub fn test(&self) -> &str {
        &self.test
    }

    pub fn body(&self) -> &Directive {
        &self.body
    }

    pub(crate) fn apply(
        &self,
        scope: &mut dyn RenderScope,
        engine: &dyn ExpressionEngine,
    ) -> TemplateResult<bool> {
        let passed = engine.evaluate_boolean(&self.test, scope.bindings())?;
        tracing::trace!(test = %self.test, passed, "conditional");
        if !passed {
            return Ok(false);
        }

        self.body
            .apply(scope, engine)
            .map_err(|source| TemplateError::Conditional {
                test: self.test.clone(),
                source: Box::new(source),
            })?;
        Ok(true)
    }
}
