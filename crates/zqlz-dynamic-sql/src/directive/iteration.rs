use minijinja::Value;

use super::Directive;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::ExpressionEngine;
use crate::scope::{NameRewriting, PrefixOnce, RenderScope, itemize};

/// Renders its body once per element of a collection.
///
/// Each element is bound under the item name (and its position or map key
/// under the index name), plus a synthetic per-element alias that bind
/// placeholders in the body are rewritten to. Once the iteration finishes
/// the plain item and index names get back whatever an enclosing iteration
/// bound to them, or are removed; the aliases stay so the values can be
/// bound after rendering.
#[derive(Debug, Clone)]
pub struct Iteration {
    collection: String,
    body: Box<Directive>,
    item: Option<String>,
    index: Option<String>,
    open: Option<String>,
    close: Option<String>,
    separator: Option<String>,
}

impl Iteration {
    pub fn over(collection: impl Into<String>, body: Directive) -> Self {
        Self {
            collection: collection.into(),
            body: Box::new(body),
            item: None,
            index: None,
            open: None,
            close: None,
            separator: None,
        }
    }

    pub fn item(mut self, name: impl Into<String>) -> Self {
        self.item = non_empty(name.into());
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = non_empty(name.into());
        self
    }

    pub fn open(mut self, open: impl Into<String>) -> Self {
        self.open = Some(open.into());
        self
    }

    pub fn close(mut self, close: impl Into<String>) -> Self {
        self.close = Some(close.into());
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn body(&self) -> &Directive {
        &self.body
    }

    pub(crate) fn apply(
        &self,
        scope: &mut dyn RenderScope,
        engine: &dyn ExpressionEngine,
    ) -> TemplateResult<bool> {
        let items = engine.evaluate_iterable(&self.collection, scope.bindings())?;
        tracing::trace!(collection = %self.collection, elements = items.len(), "iteration");
        if items.is_empty() {
            return Ok(true);
        }

        if let Some(open) = &self.open {
            scope.append(open);
        }

        let shadowed_item = shadowed(scope, self.item.as_deref());
        let shadowed_index = shadowed(scope, self.index.as_deref());

        let mut first = true;
        for (position, element) in items.into_iter().enumerate() {
            let suffix = scope.next_unique_id();
            if let Some(index) = &self.index {
                scope.bind(index, element.key.clone());
                scope.bind(&itemize(index, suffix), element.key);
            }
            if let Some(item) = &self.item {
                scope.bind(item, element.value.clone());
                scope.bind(&itemize(item, suffix), element.value);
            }

            let prefix = match &self.separator {
                Some(separator) if !first => separator.as_str(),
                _ => "",
            };
            let mut prefixed = PrefixOnce::new(&mut *scope, prefix);
            let result = {
                let mut renamed = NameRewriting::new(
                    &mut prefixed,
                    self.item.as_deref(),
                    self.index.as_deref(),
                    suffix,
                );
                self.body.apply(&mut renamed, engine)
            };
            if let Err(source) = result {
                return Err(TemplateError::Iteration {
                    expression: self.collection.clone(),
                    index: position,
                    source: Box::new(source),
                });
            }
            if first {
                first = !prefixed.is_prefix_applied();
            }
        }

        if let Some(close) = &self.close {
            scope.append(close);
        }
        restore(scope, self.item.as_deref(), shadowed_item);
        restore(scope, self.index.as_deref(), shadowed_index);
        Ok(true)
    }
}

fn shadowed(scope: &dyn RenderScope, name: Option<&str>) -> Option<Value> {
    name.and_then(|name| scope.bindings().get_own(name).cloned())
}

fn restore(scope: &mut dyn RenderScope, name: Option<&str>, previous: Option<Value>) {
    let Some(name) = name else {
        return;
    };
    match previous {
        Some(value) => scope.bind(name, value),
        None => scope.unbind(name),
    }
}

fn non_empty(name: String) -> Option<String> {
    (!name.trim().is_empty()).then_some(name)
}
