//! Render scopes
//!
//! A render scope is the mutable environment of one render call: the
//! bindings expressions are evaluated against, the accumulated SQL
//! fragments, and a counter for minting collision-free synthetic names.
//! Iteration wraps the scope in decorators ([`PrefixOnce`], [`NameRewriting`])
//! that intercept appends and delegate everything else.

mod bindings;
mod decorators;

pub use bindings::{Bindings, DATABASE_ID_KEY, PARAMETER_KEY, ParameterShape};
pub use decorators::{ITEM_PREFIX, NameRewriting, PrefixOnce, itemize};

use minijinja::Value;

/// Operations a directive needs from the scope it renders into.
pub trait RenderScope {
    fn bindings(&self) -> &Bindings;

    fn bind(&mut self, name: &str, value: Value);

    fn unbind(&mut self, name: &str);

    fn append(&mut self, fragment: &str);

    /// Returns the current counter value and advances it.
    fn next_unique_id(&mut self) -> usize;
}

/// The scope that owns bindings, fragments and the counter of one render.
#[derive(Debug, Default)]
pub struct RootScope {
    bindings: Bindings,
    fragments: Vec<String>,
    counter: usize,
}

impl RootScope {
    pub fn new(bindings: Bindings) -> Self {
        Self {
            bindings,
            fragments: Vec::new(),
            counter: 0,
        }
    }

    /// The accumulated fragments joined by single spaces and trimmed.
    pub fn text(&self) -> String {
        self.fragments.join(" ").trim().to_string()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn into_bindings(self) -> Bindings {
        self.bindings
    }
}

impl RenderScope for RootScope {
    fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.bindings.insert(name, value);
    }

    fn unbind(&mut self, name: &str) {
        self.bindings.remove(name);
    }

    fn append(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_string());
    }

    fn next_unique_id(&mut self) -> usize {
        let id = self.counter;
        self.counter += 1;
        id
    }
}
