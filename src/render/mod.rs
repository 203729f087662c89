//! The render pipeline around compiled templates.
//!
//! A [`TemplateManager`] hands out [`Template`]s by name. [`HtmlRender`]
//! owns a manager built by a [`Factory`] and, in hot-reload mode, rebuilds
//! it on every lookup so that edited sources are picked up without a
//! restart. The manager is swapped behind an `RwLock<Arc<_>>`: readers clone
//! the `Arc` and never see a half-built manager.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, PoisonError, RwLock};

use http::HeaderMap;
use http::header::{CONTENT_TYPE, HeaderValue};

use crate::error::RenderError;
use crate::eval::Scope;

/// The content type attached to rendered HTML when none is set.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Something that can be executed against data to produce output.
pub trait Template: Send + Sync {
    fn execute(&self, w: &mut dyn io::Write, data: &dyn Scope) -> Result<(), RenderError>;
}

/// Looks up templates by name.
pub trait TemplateManager: Send + Sync {
    fn get_template(&self, name: &str) -> Result<Arc<dyn Template>, RenderError>;
}

/// Why a [`Factory`] is being asked to build a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildReason {
    /// The first build, from [`HtmlRender::new`].
    Startup,
    /// An explicit [`HtmlRender::reload`].
    Reload,
    /// A per-lookup rebuild in hot-reload mode.
    HotReload,
}

/// Builds (or rebuilds) the template manager.
pub type Factory =
    Arc<dyn Fn(BuildReason) -> Result<Arc<dyn TemplateManager>, RenderError> + Send + Sync>;

/// Wrap a closure as a [`Factory`].
///
/// ```rust
/// use std::sync::Arc;
/// use tagtpl::{factory, TemplateManager, TemplateSet};
///
/// let f = factory(|_reason| Ok(Arc::new(TemplateSet::new()) as Arc<dyn TemplateManager>));
/// ```
pub fn factory<F>(f: F) -> Factory
where
    F: Fn(BuildReason) -> Result<Arc<dyn TemplateManager>, RenderError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Execute `template` and collect its output.
pub fn render_to_string(template: &dyn Template, data: &dyn Scope) -> Result<String, RenderError> {
    let mut buf = Vec::new();
    template.execute(&mut buf, data)?;
    String::from_utf8(buf).map_err(|e| RenderError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

// ── Template set ────────────────────────────────────────────────────────

/// A [`TemplateManager`] backed by a map of named templates.
#[derive(Default)]
pub struct TemplateSet {
    templates: HashMap<String, Arc<dyn Template>>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template. A template with the same name is replaced.
    pub fn insert(&mut self, name: impl Into<String>, template: impl Template + 'static) {
        self.templates.insert(name.into(), Arc::new(template));
    }

    pub fn with(mut self, name: impl Into<String>, template: impl Template + 'static) -> Self {
        self.insert(name, template);
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateManager for TemplateSet {
    fn get_template(&self, name: &str) -> Result<Arc<dyn Template>, RenderError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::TemplateNotFound(name.to_string()))
    }
}

// ── Options ─────────────────────────────────────────────────────────────

/// Configuration for [`HtmlRender`].
///
/// ```rust
/// use tagtpl::RenderOptions;
///
/// let opts = RenderOptions::new().hot_reload(cfg!(debug_assertions));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Rebuild the template manager on every lookup instead of reusing the
    /// one built at startup.
    pub hot_reload: bool,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hot_reload(mut self, hot_reload: bool) -> Self {
        self.hot_reload = hot_reload;
        self
    }
}

// ── HTML render ─────────────────────────────────────────────────────────

/// Serves templates from a factory-built manager.
pub struct HtmlRender {
    options: RenderOptions,
    builder: Factory,
    manager: RwLock<Arc<dyn TemplateManager>>,
}

impl HtmlRender {
    /// Build the initial manager. A failing factory fails construction.
    pub fn new(builder: Factory, options: RenderOptions) -> Result<Self, RenderError> {
        let manager = builder(BuildReason::Startup)?;
        tracing::debug!(hot_reload = options.hot_reload, "template manager built");
        Ok(Self {
            options,
            builder,
            manager: RwLock::new(manager),
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn current(&self) -> Arc<dyn TemplateManager> {
        let guard = self.manager.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Rebuild the manager and swap it in.
    ///
    /// If the factory fails, the previous manager stays in place and keeps
    /// serving; the error is logged and returned.
    pub fn reload(&self) -> Result<(), RenderError> {
        match (self.builder)(BuildReason::Reload) {
            Ok(manager) => {
                let mut guard = self.manager.write().unwrap_or_else(PoisonError::into_inner);
                *guard = manager;
                tracing::debug!("template manager reloaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "template reload failed, keeping previous templates");
                Err(e)
            }
        }
    }

    /// Look up a template. In hot-reload mode a fresh manager is built for
    /// this lookup only and a build failure is returned.
    pub fn get_template(&self, name: &str) -> Result<Arc<dyn Template>, RenderError> {
        let manager = if self.options.hot_reload {
            tracing::trace!(template = name, "hot reload: rebuilding template manager");
            (self.builder)(BuildReason::HotReload)?
        } else {
            self.current()
        };
        manager.get_template(name)
    }

    /// Prepare a render of `name` with `data`. A lookup failure is kept and
    /// reported by [`Rendered::render`].
    pub fn instance<'a>(&self, name: &str, data: &'a dyn Scope) -> Rendered<'a> {
        Rendered {
            template: self.get_template(name),
            data,
        }
    }
}

impl std::fmt::Debug for HtmlRender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlRender")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A template bound to its data, ready to be written to a response.
pub struct Rendered<'a> {
    template: Result<Arc<dyn Template>, RenderError>,
    data: &'a dyn Scope,
}

impl Rendered<'_> {
    /// Execute into `w`, or return the lookup error.
    pub fn render(self, w: &mut dyn io::Write) -> Result<(), RenderError> {
        self.template?.execute(w, self.data)
    }

    /// Set `Content-Type` to [`HTML_CONTENT_TYPE`] unless one is present.
    pub fn write_content_type(&self, headers: &mut HeaderMap) {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::SimpleScope;

    struct Greeting;

    impl Template for Greeting {
        fn execute(&self, w: &mut dyn io::Write, data: &dyn Scope) -> Result<(), RenderError> {
            let name = data.resolve("name").map(|v| v.to_string()).unwrap_or_default();
            write!(w, "hello {name}")?;
            Ok(())
        }
    }

    fn greetings() -> Factory {
        factory(|_| Ok(Arc::new(TemplateSet::new().with("greet", Greeting)) as Arc<dyn TemplateManager>))
    }

    #[test]
    fn test_template_set_lookup() {
        let set = TemplateSet::new().with("greet", Greeting);
        assert_eq!(set.len(), 1);
        assert!(set.get_template("greet").is_ok());
        assert!(matches!(
            set.get_template("missing"),
            Err(RenderError::TemplateNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_instance_renders() {
        let render = HtmlRender::new(greetings(), RenderOptions::new()).unwrap();
        let data = SimpleScope::new().with("name", "Ann");
        let mut out = Vec::new();
        render.instance("greet", &data).render(&mut out).unwrap();
        assert_eq!(out, b"hello Ann");
    }

    #[test]
    fn test_instance_defers_lookup_error() {
        let render = HtmlRender::new(greetings(), RenderOptions::new()).unwrap();
        let rendered = render.instance("missing", &());
        let mut out = Vec::new();
        assert!(matches!(
            rendered.render(&mut out),
            Err(RenderError::TemplateNotFound(_))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_content_type_only_if_absent() {
        let render = HtmlRender::new(greetings(), RenderOptions::new()).unwrap();
        let rendered = render.instance("greet", &());

        let mut headers = HeaderMap::new();
        rendered.write_content_type(&mut headers);
        assert_eq!(headers[CONTENT_TYPE], HTML_CONTENT_TYPE);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        rendered.write_content_type(&mut headers);
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_startup_failure() {
        let failing = factory(|_| Err(RenderError::Build("no views".into())));
        assert!(matches!(
            HtmlRender::new(failing, RenderOptions::new()),
            Err(RenderError::Build(_))
        ));
    }

    #[test]
    fn test_render_to_string() {
        let data = SimpleScope::new().with("name", "Bo");
        assert_eq!(render_to_string(&Greeting, &data).unwrap(), "hello Bo");
    }
}
