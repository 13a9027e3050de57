//! Render orchestration
//!
//! [`TemplateRenderer`] builds a fresh render scope for a parameter object,
//! applies a directive tree to it and finalizes the accumulated text.
//! [`Statement`] pairs a tree with its id and skips re-rendering trees whose
//! output never depends on the parameter.

use std::sync::{Arc, OnceLock};

use minijinja::Value;

use crate::config::EngineConfig;
use crate::directive::Directive;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::{ExpressionEngine, MiniJinjaEngine};
use crate::finalizer::{PlaceholderFinalizer, PlaceholderStyle};
use crate::properties::PropertyAccess;
use crate::rendered::{RenderedTemplate, StaticTemplate};
use crate::scope::{Bindings, RootScope};

/// Renders directive trees into [`RenderedTemplate`]s.
///
/// A renderer holds no per-render state and can be shared across threads.
#[derive(Clone)]
pub struct TemplateRenderer {
    engine: Arc<dyn ExpressionEngine>,
    config: EngineConfig,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TemplateRenderer {
    pub fn new(engine: Arc<dyn ExpressionEngine>, config: EngineConfig) -> Self {
        Self { engine, config }
    }

    /// A renderer using [`MiniJinjaEngine`] and the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(MiniJinjaEngine::new()), EngineConfig::default())
    }

    pub fn engine(&self) -> &dyn ExpressionEngine {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh bindings for one render of `parameter`.
    pub fn bindings_for(
        &self,
        parameter: Value,
        accessor: Option<Arc<dyn PropertyAccess>>,
    ) -> Bindings {
        Bindings::for_parameter(parameter, accessor, self.config.database_id.as_deref())
    }

    /// Applies `root` to a fresh scope, returning the accumulated text and
    /// the scope. Bind placeholders are left unresolved.
    pub fn render_scope(
        &self,
        root: &Directive,
        parameter: Value,
        accessor: Option<Arc<dyn PropertyAccess>>,
    ) -> TemplateResult<(String, RootScope)> {
        let mut scope = RootScope::new(self.bindings_for(parameter, accessor));
        root.apply(&mut scope, self.engine.as_ref())?;
        let text = scope.text();
        tracing::trace!(text = %text, "rendered directives");
        Ok((text, scope))
    }

    /// Renders and finalizes `root` for `parameter`.
    pub fn render(&self, root: &Directive, parameter: Value) -> TemplateResult<RenderedTemplate> {
        self.render_with_accessor(root, parameter, None)
    }

    /// Like [`render`](Self::render), reading parameter properties through
    /// `accessor` instead of the value's own attribute protocol.
    pub fn render_with_accessor(
        &self,
        root: &Directive,
        parameter: Value,
        accessor: Option<Arc<dyn PropertyAccess>>,
    ) -> TemplateResult<RenderedTemplate> {
        let (text, scope) = self.render_scope(root, parameter, accessor)?;
        self.finalizer().finalize(&text, scope.into_bindings())
    }

    fn finalizer(&self) -> PlaceholderFinalizer {
        PlaceholderFinalizer::new(self.config.placeholder_style)
    }
}

/// A compiled statement: an id and its directive tree.
///
/// Trees without dynamic parts are rendered once per placeholder style, on
/// first use with that style, and the finalized text is reused by every later
/// call.
#[derive(Debug)]
pub struct Statement {
    id: String,
    root: Directive,
    dynamic: bool,
    cached: StaticCache,
}

impl Statement {
    pub fn new(id: impl Into<String>, root: Directive) -> Self {
        let dynamic = root.is_dynamic();
        Self {
            id: id.into(),
            root,
            dynamic,
            cached: StaticCache::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Directive {
        &self.root
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn render(
        &self,
        renderer: &TemplateRenderer,
        parameter: Value,
    ) -> TemplateResult<RenderedTemplate> {
        self.render_with_accessor(renderer, parameter, None)
    }

    pub fn render_with_accessor(
        &self,
        renderer: &TemplateRenderer,
        parameter: Value,
        accessor: Option<Arc<dyn PropertyAccess>>,
    ) -> TemplateResult<RenderedTemplate> {
        tracing::debug!(statement = %self.id, dynamic = self.dynamic, "rendering statement");
        let result = if self.dynamic {
            renderer.render_with_accessor(&self.root, parameter, accessor)
        } else {
            self.static_template(renderer)
                .map(|template| template.bind(renderer.bindings_for(parameter, accessor)))
        };
        result.map_err(|source| TemplateError::Statement {
            id: self.id.clone(),
            source: Box::new(source),
        })
    }

    fn static_template(&self, renderer: &TemplateRenderer) -> TemplateResult<&StaticTemplate> {
        let slot = self.cached.slot(renderer.config.placeholder_style);
        if let Some(template) = slot.get() {
            return Ok(template);
        }
        let rendered = renderer.render(&self.root, Value::from(()))?;
        Ok(slot.get_or_init(|| StaticTemplate::from(rendered)))
    }
}

/// Finalized static templates keyed by marker style.
#[derive(Debug, Default)]
struct StaticCache {
    question_mark: OnceLock<StaticTemplate>,
    dollar_numbered: OnceLock<StaticTemplate>,
}

impl StaticCache {
    fn slot(&self, style: PlaceholderStyle) -> &OnceLock<StaticTemplate> {
        match style {
            PlaceholderStyle::QuestionMark => &self.question_mark,
            PlaceholderStyle::DollarNumbered => &self.dollar_numbered,
        }
    }
}
