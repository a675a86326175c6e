//! Rendering prompt templates with a bag of variables.
//!
//! Rendering is delegated to `minijinja`. Before a template is parsed its
//! Django-style syntax is normalized (see [`crate::django`]), so prompts
//! written for pongo2 or Django render the same way here.
//!
//! Lookups on undefined values are chainable: `{{ a.b.c }}` renders as empty
//! when `a` is absent or `null`. Output is not HTML-escaped unless
//! [`PromptConfig::auto_escape`] is set, since prompts are plain text.

use crate::django;
use crate::error::TemplateError;
use crate::loops::is_loop_iterator;
use crate::schema::{SchemaDocument, Settings, build_schema, build_schema_json};
use crate::variables::extract_variables;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Variable values keyed by name, as provided by the caller.
pub type TemplateVariables = serde_json::Map<String, Value>;

/// Names bound by the engine inside loops; never reported as missing.
const ENGINE_ROOTS: &[&str] = &["loop", "forloop"];

/// Configuration for prompt rendering.
///
/// # Examples
///
/// ```
/// use prompt_schema::PromptConfig;
///
/// let config = PromptConfig::default().with_trim_output(false);
/// assert!(!config.trim_output);
/// assert!(config.django_compat);
/// ```
#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// Strip leading and trailing whitespace from the rendered text.
    ///
    /// **Default:** true
    pub trim_output: bool,

    /// Log a warning when the template references variables that were not provided.
    ///
    /// **Default:** true
    pub warn_on_missing: bool,

    /// Rewrite Django syntax and install Django filters before rendering.
    ///
    /// **Default:** true
    pub django_compat: bool,

    /// HTML-escape interpolated values, as Django does for web pages.
    ///
    /// **Default:** false
    pub auto_escape: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            trim_output: true,
            warn_on_missing: true,
            django_compat: true,
            auto_escape: false,
        }
    }
}

impl PromptConfig {
    pub fn with_trim_output(mut self, trim_output: bool) -> Self {
        self.trim_output = trim_output;
        self
    }

    pub fn with_warn_on_missing(mut self, warn_on_missing: bool) -> Self {
        self.warn_on_missing = warn_on_missing;
        self
    }

    pub fn with_django_compat(mut self, django_compat: bool) -> Self {
        self.django_compat = django_compat;
        self
    }

    pub fn with_auto_escape(mut self, auto_escape: bool) -> Self {
        self.auto_escape = auto_escape;
        self
    }
}

/// Settings accepted by [`PromptTemplate::from_settings`].
#[derive(Debug, Clone, Deserialize)]
pub struct PromptSettings {
    pub template: String,
}

/// The outcome of rendering a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPrompt {
    /// The rendered prompt text.
    pub text: String,
    /// Variables referenced by the template, in order of first appearance.
    pub detected: Vec<String>,
    /// Referenced variables whose root (the part before the first `.`) was
    /// absent or `null` in the input. Loop iterators are not reported.
    pub missing: Vec<String>,
}

/// A prompt template ready to be rendered.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    config: PromptConfig,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self::with_config(template, PromptConfig::default())
    }

    pub fn with_config(template: impl Into<String>, config: PromptConfig) -> Self {
        Self {
            template: template.into(),
            config,
        }
    }

    /// Creates a template from a host settings bag with a `template` string.
    ///
    /// An empty template is accepted here and rejected when rendering.
    pub fn from_settings(settings: &Settings) -> Result<Self, TemplateError> {
        let settings: PromptSettings = serde_json::from_value(Value::Object(settings.clone()))
            .map_err(|e| TemplateError::InvalidSettings(e.to_string()))?;

        info!("Prompt template initialized; variables are bound at render time");
        Ok(Self::new(settings.template))
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    /// The input schema describing the variables this template expects.
    pub fn input_schema(&self) -> SchemaDocument {
        build_schema(&self.template)
    }

    /// Renders the template with the given variables.
    ///
    /// `null` values are treated as absent. Variables referenced by the
    /// template but not provided render as empty and are listed in
    /// [`RenderedPrompt::missing`].
    pub fn render(&self, variables: &TemplateVariables) -> Result<RenderedPrompt, TemplateError> {
        if self.template.is_empty() {
            return Err(TemplateError::EmptyTemplate);
        }

        let detected = extract_variables(&self.template);
        if !detected.is_empty() {
            info!(variables = ?detected, "Template variables detected");
            debug!(schema = %build_schema_json(&self.template), "Generated JSON schema");
        }

        let context: TemplateVariables = variables
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if context.is_empty() {
            info!("No variables provided to template");
        } else {
            debug!(count = context.len(), "Template context prepared");
        }

        let missing = self.missing_variables(&detected, &context);
        if self.config.warn_on_missing && !missing.is_empty() {
            warn!(missing = ?missing, "Template expects variables that are not provided");
        }

        let raw = self.render_raw(&context)?;
        let text = if self.config.trim_output {
            raw.trim().to_string()
        } else {
            raw.clone()
        };
        debug!(
            raw_len = raw.len(),
            len = text.len(),
            "Template rendered successfully"
        );

        if text.is_empty() {
            warn!(
                template = %self.template,
                variables = ?context,
                raw = %raw,
                "Rendered output is empty"
            );
        } else {
            info!(len = text.len(), "Prompt rendered");
        }

        Ok(RenderedPrompt {
            text,
            detected,
            missing,
        })
    }

    fn render_raw(&self, context: &TemplateVariables) -> Result<String, TemplateError> {
        let source = if self.config.django_compat {
            django::normalize(&self.template)
        } else {
            Cow::Borrowed(self.template.as_str())
        };

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        if self.config.auto_escape {
            env.set_auto_escape_callback(|_| AutoEscape::Html);
        }
        if self.config.django_compat {
            django::register_filters(&mut env);
        }
        env.add_template("prompt", &source)
            .map_err(TemplateError::Parse)?;
        let tmpl = env.get_template("prompt").map_err(TemplateError::Parse)?;
        tmpl.render(context).map_err(TemplateError::Render)
    }

    fn missing_variables(&self, detected: &[String], context: &TemplateVariables) -> Vec<String> {
        detected
            .iter()
            .filter(|name| {
                let root = name.split('.').next().unwrap_or(name.as_str());
                !context.contains_key(root)
                    && !ENGINE_ROOTS.contains(&root)
                    && !is_loop_iterator(root, &self.template)
            })
            .cloned()
            .collect()
    }
}

/// Renders a template with the default configuration and returns the text.
///
/// # Examples
///
/// ```
/// use prompt_schema::render_prompt;
/// use serde_json::json;
///
/// let vars = json!({"name": "Alice", "age": 30});
/// let text = render_prompt(
///     "Hello {{ name }}! You are {{ age }} years old.",
///     vars.as_object().unwrap(),
/// )
/// .unwrap();
/// assert_eq!(text, "Hello Alice! You are 30 years old.");
/// ```
pub fn render_prompt(template: &str, variables: &TemplateVariables) -> Result<String, TemplateError> {
    PromptTemplate::new(template)
        .render(variables)
        .map(|rendered| rendered.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> TemplateVariables {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn test_render_basic() {
        let rendered = PromptTemplate::new("Hello {{ name }}! You are {{ age }} years old.")
            .render(&vars(json!({"name": "Alice", "age": 30})))
            .unwrap();
        assert_eq!(rendered.text, "Hello Alice! You are 30 years old.");
        assert_eq!(rendered.detected, vec!["name", "age"]);
        assert!(rendered.missing.is_empty());
    }

    #[test]
    fn test_render_empty_template_is_an_error() {
        let result = PromptTemplate::new("").render(&TemplateVariables::new());
        assert!(matches!(result, Err(TemplateError::EmptyTemplate)));
    }

    #[test]
    fn test_render_reports_missing_variables() {
        let template = "Hi {{ name }} {% for item in items %}{{ item.title }}{{ forloop.Counter }}{% endfor %}";
        let rendered = PromptTemplate::new(template)
            .render(&vars(json!({"items": [{"title": "a"}]})))
            .unwrap();
        assert_eq!(rendered.missing, vec!["name"]);
        assert_eq!(rendered.text, "Hi  a1");
    }

    #[test]
    fn test_render_dotted_path_checks_root() {
        let rendered = PromptTemplate::new("{{ info.records }} rows, {{ info.columns }} columns")
            .render(&vars(json!({"info": {"records": 150000, "columns": 23}})))
            .unwrap();
        assert_eq!(rendered.text, "150000 rows, 23 columns");
        assert!(rendered.missing.is_empty());
    }

    #[test]
    fn test_render_treats_null_as_missing() {
        let rendered = PromptTemplate::new("Hello {{ name }}!")
            .render(&vars(json!({"name": null})))
            .unwrap();
        assert_eq!(rendered.text, "Hello !");
        assert_eq!(rendered.missing, vec!["name"]);
    }

    #[test]
    fn test_render_undefined_dotted_root_is_empty() {
        let template = PromptTemplate::new("Records: {{ info.records.total }}");
        for input in [json!({}), json!({"info": null})] {
            let rendered = template.render(&vars(input)).unwrap();
            assert_eq!(rendered.text, "Records:");
            assert_eq!(rendered.missing, vec!["info.records.total"]);
        }
    }

    #[test]
    fn test_render_does_not_escape_by_default() {
        let rendered = PromptTemplate::new("{{ who }}")
            .render(&vars(json!({"who": "Tom & <Jerry>"})))
            .unwrap();
        assert_eq!(rendered.text, "Tom & <Jerry>");
    }

    #[test]
    fn test_render_with_auto_escape() {
        let config = PromptConfig::default().with_auto_escape(true);
        let rendered = PromptTemplate::with_config("{{ who }}", config)
            .render(&vars(json!({"who": "Tom & <Jerry>"})))
            .unwrap();
        assert_eq!(rendered.text, "Tom &amp; &lt;Jerry&gt;");
    }

    #[test]
    fn test_render_without_trim() {
        let config = PromptConfig::default().with_trim_output(false);
        let rendered = PromptTemplate::with_config("  {{ x }}\n", config)
            .render(&vars(json!({"x": "y"})))
            .unwrap();
        assert_eq!(rendered.text, "  y");
    }

    #[test]
    fn test_render_without_django_compat_rejects_colon_filters() {
        let config = PromptConfig::default().with_django_compat(false);
        let result = PromptTemplate::with_config("{{ x|floatformat:0 }}", config)
            .render(&vars(json!({"x": 1})));
        assert!(matches!(result, Err(TemplateError::Parse(_))));
    }

    #[test]
    fn test_render_parse_error() {
        let result = PromptTemplate::new("{% if %}oops{% endif %}").render(&TemplateVariables::new());
        assert!(matches!(result, Err(TemplateError::Parse(_))));
    }

    #[test]
    fn test_from_settings() {
        let template = PromptTemplate::from_settings(&vars(json!({"template": "{{ a }}"}))).unwrap();
        assert_eq!(template.template(), "{{ a }}");
        assert!(template.config().trim_output);
        assert!(!template.config().auto_escape);
    }

    #[test]
    fn test_from_settings_rejects_missing_or_non_string_template() {
        let missing = PromptTemplate::from_settings(&Settings::new());
        assert!(matches!(missing, Err(TemplateError::InvalidSettings(_))));

        let wrong_type = PromptTemplate::from_settings(&vars(json!({"template": 42})));
        assert!(matches!(wrong_type, Err(TemplateError::InvalidSettings(_))));
    }

    #[test]
    fn test_input_schema_matches_build_schema() {
        let template = "{% for t in tasks %}{{ t }}{% endfor %}";
        assert_eq!(PromptTemplate::new(template).input_schema(), build_schema(template));
    }
}
