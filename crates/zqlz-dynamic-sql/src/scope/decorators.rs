//! Scope decorators used while iterating

use minijinja::Value;

use super::{Bindings, RenderScope};
use crate::scanner::TokenScanner;

/// Prefix of synthetic per-element binding names.
pub const ITEM_PREFIX: &str = "__frch_";

/// Synthetic name of `name` for the iteration element numbered `suffix`.
pub fn itemize(name: &str, suffix: usize) -> String {
    format!("{ITEM_PREFIX}{name}_{suffix}")
}

/// Emits `prefix` before the first non-blank fragment, then passes through.
///
/// An element that renders to nothing never receives the prefix.
pub struct PrefixOnce<'a> {
    inner: &'a mut dyn RenderScope,
    prefix: &'a str,
    applied: bool,
}

impl<'a> PrefixOnce<'a> {
    pub fn new(inner: &'a mut dyn RenderScope, prefix: &'a str) -> Self {
        Self {
            inner,
            prefix,
            applied: false,
        }
    }

    /// True once a non-blank fragment has gone through.
    pub fn is_prefix_applied(&self) -> bool {
        self.applied
    }
}

impl RenderScope for PrefixOnce<'_> {
    fn bindings(&self) -> &Bindings {
        self.inner.bindings()
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.inner.bind(name, value);
    }

    fn unbind(&mut self, name: &str) {
        self.inner.unbind(name);
    }

    fn append(&mut self, fragment: &str) {
        if !self.applied && !fragment.trim().is_empty() {
            if !self.prefix.is_empty() {
                self.inner.append(self.prefix);
            }
            self.applied = true;
        }
        self.inner.append(fragment);
    }

    fn next_unique_id(&mut self) -> usize {
        self.inner.next_unique_id()
    }
}

/// Rewrites bind placeholders that start with the iteration's item or index
/// name to the element's synthetic name.
///
/// `#{item.name}` inside element 3 becomes `#{__frch_item_3.name}`, so nested
/// loops reusing a name bind to distinct values.
pub struct NameRewriting<'a> {
    inner: &'a mut dyn RenderScope,
    item: Option<&'a str>,
    index: Option<&'a str>,
    suffix: usize,
}

impl<'a> NameRewriting<'a> {
    pub fn new(
        inner: &'a mut dyn RenderScope,
        item: Option<&'a str>,
        index: Option<&'a str>,
        suffix: usize,
    ) -> Self {
        Self {
            inner,
            item,
            index,
            suffix,
        }
    }

    fn rewrite(&self, content: &str) -> String {
        self.item
            .and_then(|item| rewrite_leading_name(content, item, self.suffix))
            .or_else(|| {
                self.index
                    .and_then(|index| rewrite_leading_name(content, index, self.suffix))
            })
            .unwrap_or_else(|| content.to_string())
    }
}

/// Replaces `name` at the start of `content` when it is a whole token.
fn rewrite_leading_name(content: &str, name: &str, suffix: usize) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let rest = content.trim_start().strip_prefix(name)?;
    match rest.chars().next() {
        None => {}
        Some(c) if c.is_whitespace() || matches!(c, '.' | ',' | ':' | '[') => {}
        Some(_) => return None,
    }
    Some(format!("{}{}", itemize(name, suffix), rest))
}

impl RenderScope for NameRewriting<'_> {
    fn bindings(&self) -> &Bindings {
        self.inner.bindings()
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.inner.bind(name, value);
    }

    fn unbind(&mut self, name: &str) {
        self.inner.unbind(name);
    }

    fn append(&mut self, fragment: &str) {
        let rewritten = TokenScanner::bind().replace(fragment, |content| {
            Some(format!("#{{{}}}", self.rewrite(content)))
        });
        self.inner.append(&rewritten);
    }

    fn next_unique_id(&mut self) -> usize {
        self.inner.next_unique_id()
    }
}
