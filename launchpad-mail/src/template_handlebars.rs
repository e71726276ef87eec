//! Handlebars template engine integration.

use handlebars::Handlebars;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

use crate::{MailError, RenderedTemplate, Result, TemplateEngine};

/// Templates compiled into the binary, as `(name, subject, html, text)`.
const BUILTIN_TEMPLATES: [(&str, &str, &str, &str); 3] = [
    (
        "waitlist-welcome",
        include_str!("../templates/waitlist-welcome/subject.hbs"),
        include_str!("../templates/waitlist-welcome/html.hbs"),
        include_str!("../templates/waitlist-welcome/text.hbs"),
    ),
    (
        "launch-announcement",
        include_str!("../templates/launch-announcement/subject.hbs"),
        include_str!("../templates/launch-announcement/html.hbs"),
        include_str!("../templates/launch-announcement/text.hbs"),
    ),
    (
        "product-update",
        include_str!("../templates/product-update/subject.hbs"),
        include_str!("../templates/product-update/html.hbs"),
        include_str!("../templates/product-update/text.hbs"),
    ),
];

/// Handlebars-based template engine for emails.
///
/// HTML bodies are rendered with HTML escaping; subjects and text bodies are
/// rendered verbatim. Both registries run in strict mode, so a variable the
/// context does not provide is a render error rather than an empty string.
#[derive(Debug)]
pub struct HandlebarsEngine {
    html: Handlebars<'static>,
    plain: Handlebars<'static>,
    defaults: Map<String, Value>,
}

impl HandlebarsEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        let mut html = Handlebars::new();
        html.set_strict_mode(true);

        let mut plain = Handlebars::new();
        plain.set_strict_mode(true);
        plain.register_escape_fn(handlebars::no_escape);

        Self {
            html,
            plain,
            defaults: Map::new(),
        }
    }

    /// Create an engine with the built-in templates registered.
    pub fn with_builtins() -> Result<Self> {
        let mut engine = Self::new();
        for (name, subject, html, text) in BUILTIN_TEMPLATES {
            engine.register_parts(name, Some(subject), Some(html), Some(text))?;
        }
        Ok(engine)
    }

    /// Built-in templates plus every template found under `path`.
    ///
    /// Templates on disk replace built-ins of the same name.
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self> {
        let mut engine = Self::with_builtins()?;
        engine.load_directory(path)?;
        Ok(engine)
    }

    /// Load templates from a directory, returning how many were found.
    ///
    /// Expected structure:
    /// ```text
    /// templates/
    ///   waitlist-welcome/
    ///     subject.hbs      (optional)
    ///     html.hbs
    ///     text.hbs         (optional)
    /// ```
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(MailError::Config(format!(
                "Template directory not found: {}",
                path.display()
            )));
        }

        let mut loaded = 0;
        for entry in std::fs::read_dir(path)? {
            let entry_path = entry?.path();
            if !entry_path.is_dir() {
                continue;
            }

            let name = entry_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| MailError::Config("Invalid template directory name".to_string()))?
                .to_string();

            let read = |part: &str| -> Result<Option<String>> {
                let file = entry_path.join(format!("{part}.hbs"));
                if file.exists() {
                    Ok(Some(std::fs::read_to_string(file)?))
                } else {
                    Ok(None)
                }
            };

            let (subject, html, text) = (read("subject")?, read("html")?, read("text")?);
            if html.is_none() && text.is_none() {
                debug!(template = %name, "Skipping template directory without a body");
                continue;
            }

            self.unregister(&name);
            self.register_parts(&name, subject.as_deref(), html.as_deref(), text.as_deref())?;
            debug!(template = %name, "Loaded email template");
            loaded += 1;
        }

        Ok(loaded)
    }

    /// Register the parts of one template. Missing parts are left unset.
    pub fn register_parts(
        &mut self,
        name: &str,
        subject: Option<&str>,
        html: Option<&str>,
        text: Option<&str>,
    ) -> Result<()> {
        if let Some(subject) = subject {
            self.plain
                .register_template_string(&format!("{name}/subject"), subject)?;
        }
        if let Some(html) = html {
            self.html
                .register_template_string(&format!("{name}/html"), html)?;
        }
        if let Some(text) = text {
            self.plain
                .register_template_string(&format!("{name}/text"), text)?;
        }
        Ok(())
    }

    /// Remove every part of a template.
    pub fn unregister(&mut self, name: &str) {
        self.plain.unregister_template(&format!("{name}/subject"));
        self.html.unregister_template(&format!("{name}/html"));
        self.plain.unregister_template(&format!("{name}/text"));
    }

    /// Add a variable available to every render unless the caller overrides it.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Register helpers.
    pub fn register_helper<H: handlebars::HelperDef + Send + Sync + Clone + 'static>(
        mut self,
        name: &str,
        helper: H,
    ) -> Self {
        self.html.register_helper(name, Box::new(helper.clone()));
        self.plain.register_helper(name, Box::new(helper));
        self
    }

    /// Names of all templates with a body.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .html
            .get_templates()
            .keys()
            .chain(self.plain.get_templates().keys())
            .filter_map(|key| {
                key.strip_suffix("/html")
                    .or_else(|| key.strip_suffix("/text"))
            })
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn context(&self, context: &Value) -> Value {
        let mut merged = self.defaults.clone();
        if let Value::Object(vars) = context {
            merged.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Value::Object(merged)
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, name: &str, context: &Value) -> Result<RenderedTemplate> {
        if !self.has_template(name) {
            return Err(MailError::TemplateNotFound(name.to_string()));
        }

        let context = self.context(context);

        let html_name = format!("{name}/html");
        let html = if self.html.has_template(&html_name) {
            Some(self.html.render(&html_name, &context)?)
        } else {
            None
        };

        let text_name = format!("{name}/text");
        let text = if self.plain.has_template(&text_name) {
            Some(self.plain.render(&text_name, &context)?)
        } else {
            None
        };

        let subject_name = format!("{name}/subject");
        let subject = if self.plain.has_template(&subject_name) {
            Some(self.plain.render(&subject_name, &context)?.trim().to_string())
        } else {
            None
        };

        Ok(RenderedTemplate {
            html,
            text,
            subject,
        })
    }

    fn render_inline(&self, source: &str, context: &Value) -> Result<String> {
        Ok(self.html.render_template(source, &self.context(context))?)
    }

    fn has_template(&self, name: &str) -> bool {
        self.html.has_template(&format!("{name}/html"))
            || self.plain.has_template(&format!("{name}/text"))
    }

    fn register_template(&mut self, name: &str, content: &str) -> Result<()> {
        self.register_parts(name, None, Some(content), None)
    }
}
