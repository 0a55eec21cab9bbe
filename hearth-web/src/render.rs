/// Template rendering
///
/// Pages are MiniJinja templates read from the template directory. Files ending in
/// `.page.html` are views; files ending in `.layout.html` are layouts the views extend.
/// Both are registered under their file name, so a view starts with
/// `{% extends "base.layout.html" %}`.
///
/// In cache mode every template is compiled once by [`create_template_cache`] when the
/// [`Renderer`] is built. With the cache disabled the directory is re-read on every render,
/// which picks up template edits without a restart.
///
/// # Example
///
/// ```no_run
/// use hearth_web::render::{Renderer, TemplateData};
///
/// # fn example() -> Result<(), hearth_web::render::RenderError> {
/// let renderer = Renderer::new("./templates", true)?;
/// let html = renderer.render("about.page.html", &TemplateData::default())?;
/// # Ok(())
/// # }
/// ```

use hearth_shared::forms::Form;
use minijinja::Environment;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::session::{self, Session};

const PAGE_SUFFIX: &str = ".page.html";
const LAYOUT_SUFFIX: &str = ".layout.html";

/// Views the handlers render; startup fails if any is missing
pub const REQUIRED_VIEWS: &[&str] = &[
    "home.page.html",
    "about.page.html",
    "contact.page.html",
    "generals.page.html",
    "majors.page.html",
    "search-availability.page.html",
    "choose-room.page.html",
    "make-reservation.page.html",
    "reservation-summary.page.html",
    "login.page.html",
    "admin-dashboard.page.html",
    "admin-new-reservations.page.html",
    "admin-all-reservations.page.html",
    "admin-reservations-show.page.html",
    "admin-reservations-calendar.page.html",
];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template {0} not found")]
    TemplateMissing(String),

    #[error("failed to read templates from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Values handed to every template
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    pub string_map: HashMap<String, String>,
    pub int_map: HashMap<String, i64>,
    pub data: HashMap<String, serde_json::Value>,
    pub form: Form,
    pub flash: String,
    pub warning: String,
    pub error: String,
    pub is_authenticated: bool,
}

impl TemplateData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a serializable value to the data bag
    ///
    /// Values that fail to serialize are stored as `null`.
    pub fn with<T: Serialize>(mut self, key: &str, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn with_string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.string_map.insert(key.to_string(), value.into());
        self
    }

    pub fn with_int(mut self, key: &str, value: i64) -> Self {
        self.int_map.insert(key.to_string(), value);
        self
    }

    pub fn with_form(mut self, form: Form) -> Self {
        self.form = form;
        self
    }

    /// Moves the one-shot messages out of the session and records the login state
    pub async fn add_default_data(mut self, session: &Session) -> Self {
        self.flash = session::take_message(session, session::FLASH).await;
        self.warning = session::take_message(session, session::WARNING).await;
        self.error = session::take_message(session, session::ERROR).await;
        self.is_authenticated = session::is_logged_in(session).await;
        self
    }
}

/// Compiles every page and layout under `dir` into a new environment
///
/// # Errors
///
/// `Io` when the directory or a file cannot be read, `Template` on a syntax error, and
/// `TemplateMissing` for the first entry of [`REQUIRED_VIEWS`] that has no file.
pub fn create_template_cache(dir: &Path) -> Result<Environment<'static>, RenderError> {
    let io_err = |source| RenderError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut env = Environment::new();
    let mut count = 0usize;

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if !(name.ends_with(PAGE_SUFFIX) || name.ends_with(LAYOUT_SUFFIX)) {
            continue;
        }

        let source = std::fs::read_to_string(&path).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        env.add_template_owned(name, source)?;
        count += 1;
    }

    for view in REQUIRED_VIEWS {
        if env.get_template(view).is_err() {
            return Err(RenderError::TemplateMissing(view.to_string()));
        }
    }

    debug!(templates = count, dir = %dir.display(), "Compiled templates");
    Ok(env)
}

/// Renders views to HTML
#[derive(Debug, Clone)]
pub struct Renderer {
    template_dir: PathBuf,
    cache: Option<Arc<Environment<'static>>>,
}

impl Renderer {
    /// Builds a renderer, compiling all templates up front when `use_cache` is set
    ///
    /// The template set is validated in both modes so a broken directory fails at startup.
    pub fn new(template_dir: impl Into<PathBuf>, use_cache: bool) -> Result<Self, RenderError> {
        let template_dir = template_dir.into();
        let env = create_template_cache(&template_dir)?;

        info!(
            dir = %template_dir.display(),
            cached = use_cache,
            "Template renderer ready"
        );

        Ok(Self {
            template_dir,
            cache: use_cache.then(|| Arc::new(env)),
        })
    }

    /// Renders `view` with `data`
    pub fn render(&self, view: &str, data: &TemplateData) -> Result<String, RenderError> {
        match &self.cache {
            Some(env) => render_with(env, view, data),
            None => render_with(&create_template_cache(&self.template_dir)?, view, data),
        }
    }
}

fn render_with(env: &Environment<'_>, view: &str, data: &TemplateData) -> Result<String, RenderError> {
    let template = env.get_template(view).map_err(|e| match e.kind() {
        minijinja::ErrorKind::TemplateNotFound => RenderError::TemplateMissing(view.to_string()),
        _ => RenderError::Template(e),
    })?;
    Ok(template.render(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_dir() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../templates"))
    }

    #[test]
    fn test_cache_contains_required_views() {
        let env = create_template_cache(&template_dir()).unwrap();
        for view in REQUIRED_VIEWS {
            assert!(env.get_template(view).is_ok(), "{} missing", view);
        }
        assert!(env.get_template("base.layout.html").is_ok());
    }

    #[test]
    fn test_render_page_with_layout() {
        let renderer = Renderer::new(template_dir(), true).unwrap();
        let html = renderer.render("about.page.html", &TemplateData::default()).unwrap();
        assert!(html.contains("<html"));
        assert!(html.contains("About"));
    }

    #[test]
    fn test_flash_is_rendered_and_escaped() {
        let renderer = Renderer::new(template_dir(), false).unwrap();
        let data = TemplateData {
            flash: "<b>Saved</b>".to_string(),
            ..TemplateData::default()
        };
        let html = renderer.render("home.page.html", &data).unwrap();
        assert!(html.contains("&lt;b&gt;Saved"));
        assert!(!html.contains("<b>Saved"));
    }

    #[test]
    fn test_unknown_view_is_template_missing() {
        let renderer = Renderer::new(template_dir(), true).unwrap();
        let err = renderer
            .render("nope.page.html", &TemplateData::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::TemplateMissing(name) if name == "nope.page.html"));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let err = Renderer::new("/definitely/not/here", true).unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }

    #[test]
    fn test_incomplete_directory_is_template_missing() {
        let dir = std::env::temp_dir().join(format!("hearth-render-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("home.page.html"), "home").unwrap();

        let err = create_template_cache(&dir).unwrap_err();
        assert!(matches!(err, RenderError::TemplateMissing(_)));

        std::fs::remove_dir_all(&dir).ok();
    }
}
