use handlebars::Handlebars;
use mrml::prelude::render::RenderOptions;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::config::ValidationLevel;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Handlebars rendering error: {0}")]
    Template(String),

    #[error("Invalid MJML input: {0}")]
    Parse(String),

    #[error("Couldn't render MJML template: {0}")]
    Render(String),

    #[error("MJML validation failed: {}", .0.join("; "))]
    Strict(Vec<String>),
}

/// HTML produced from one document, with the non-fatal problems found on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub warnings: Vec<String>,
}

/// Turns MJML source into HTML. Rendering is CPU-bound and never suspends.
pub trait Renderer: Send + Sync {
    /// `data`, when given, is bound into the source as a Handlebars template
    /// before conversion.
    fn render(&self, source: &str, data: Option<&Value>) -> Result<Rendered, RenderError>;
}

pub struct MjmlRenderer {
    handlebars: Handlebars<'static>,
    level: ValidationLevel,
    options: RenderOptions,
}

impl MjmlRenderer {
    pub fn new(level: ValidationLevel) -> Self {
        MjmlRenderer {
            handlebars: Handlebars::new(),
            level,
            options: RenderOptions::default(),
        }
    }
}

impl Renderer for MjmlRenderer {
    fn render(&self, source: &str, data: Option<&Value>) -> Result<Rendered, RenderError> {
        let bound;
        let source = match data {
            Some(data) => {
                bound = self
                    .handlebars
                    .render_template(source, data)
                    .map_err(|e| RenderError::Template(e.to_string()))?;
                bound.as_str()
            }
            None => source,
        };

        let parsed = mrml::parse(source).map_err(|e| RenderError::Parse(e.to_string()))?;
        let warnings = parsed.warnings.iter().map(ToString::to_string).collect();
        let warnings = screen_warnings(self.level, warnings)?;

        let html = parsed
            .element
            .render(&self.options)
            .map_err(|e| RenderError::Render(e.to_string()))?;

        Ok(Rendered { html, warnings })
    }
}

/// Applies the validation level to the parser's warnings.
fn screen_warnings(
    level: ValidationLevel,
    warnings: Vec<String>,
) -> Result<Vec<String>, RenderError> {
    match level {
        ValidationLevel::Skip => Ok(Vec::new()),
        ValidationLevel::Strict if !warnings.is_empty() => Err(RenderError::Strict(warnings)),
        ValidationLevel::Soft if !warnings.is_empty() => {
            warn!(count = warnings.len(), ?warnings, "MJML conversion warnings");
            Ok(warnings)
        }
        _ => Ok(warnings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HELLO: &str = "<mjml><mj-body><mj-text>Hi</mj-text></mj-body></mjml>";
    const STRAY_ATTRIBUTE: &str =
        r#"<mjml foo="bar"><mj-body><mj-text>Hi</mj-text></mj-body></mjml>"#;

    #[test]
    fn test_renders_text_into_html() {
        let renderer = MjmlRenderer::new(ValidationLevel::Soft);
        let rendered = renderer.render(HELLO, None).unwrap();

        assert!(rendered.html.contains("<div"));
        assert!(rendered.html.contains("Hi"));
        assert!(rendered.warnings.is_empty());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let renderer = MjmlRenderer::new(ValidationLevel::Soft);
        let first = renderer.render(HELLO, None).unwrap();
        let second = renderer.render(HELLO, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unparsable_input_fails() {
        let renderer = MjmlRenderer::new(ValidationLevel::Soft);
        let err = renderer
            .render("<mjml><mj-body><mj-text>broken", None)
            .unwrap_err();
        assert!(matches!(err, RenderError::Parse(_)), "got {err:?}");
        assert!(err.to_string().starts_with("Invalid MJML input"));
    }

    #[test]
    fn test_payload_is_bound_before_conversion() {
        let renderer = MjmlRenderer::new(ValidationLevel::Soft);
        let source = "<mjml><mj-body><mj-text>Hello, {{name}}!</mj-text></mj-body></mjml>";

        let rendered = renderer
            .render(source, Some(&json!({ "name": "World" })))
            .unwrap();
        assert!(rendered.html.contains("Hello, World!"));
    }

    #[test]
    fn test_source_is_untouched_without_payload() {
        let renderer = MjmlRenderer::new(ValidationLevel::Soft);
        let source = "<mjml><mj-body><mj-text>{{name}}</mj-text></mj-body></mjml>";

        let rendered = renderer.render(source, None).unwrap();
        assert!(rendered.html.contains("{{name}}"));
    }

    #[test]
    fn test_broken_template_is_template_error() {
        let renderer = MjmlRenderer::new(ValidationLevel::Soft);
        let err = renderer
            .render("{{#if name}}<mjml></mjml>", Some(&json!({})))
            .unwrap_err();
        assert!(matches!(err, RenderError::Template(_)), "got {err:?}");
    }

    #[test]
    fn test_soft_level_renders_despite_parser_warning() {
        let renderer = MjmlRenderer::new(ValidationLevel::Soft);
        let rendered = renderer.render(STRAY_ATTRIBUTE, None).unwrap();

        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.warnings[0].contains("unexpected attribute"));
        assert!(rendered.html.contains("Hi"));
    }

    #[test]
    fn test_strict_level_rejects_parser_warning() {
        let renderer = MjmlRenderer::new(ValidationLevel::Strict);
        let err = renderer.render(STRAY_ATTRIBUTE, None).unwrap_err();

        assert!(matches!(err, RenderError::Strict(ref w) if w.len() == 1), "got {err:?}");
        assert!(err.to_string().starts_with("MJML validation failed"));
        assert!(renderer.render(HELLO, None).is_ok());
    }

    #[test]
    fn test_skip_level_drops_parser_warning() {
        let renderer = MjmlRenderer::new(ValidationLevel::Skip);
        let rendered = renderer.render(STRAY_ATTRIBUTE, None).unwrap();

        assert!(rendered.warnings.is_empty());
        assert!(rendered.html.contains("Hi"));
    }

    #[test]
    fn test_screen_warnings_by_level() {
        let warnings = vec!["unexpected attribute in mj-body".to_string()];

        let soft = screen_warnings(ValidationLevel::Soft, warnings.clone()).unwrap();
        assert_eq!(soft, warnings);

        let skipped = screen_warnings(ValidationLevel::Skip, warnings.clone()).unwrap();
        assert!(skipped.is_empty());

        let strict = screen_warnings(ValidationLevel::Strict, warnings).unwrap_err();
        assert!(matches!(strict, RenderError::Strict(ref w) if w.len() == 1));

        assert!(screen_warnings(ValidationLevel::Strict, Vec::new()).is_ok());
    }
}
