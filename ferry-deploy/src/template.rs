//! Script templating
//!
//! Persistent scripts are Handlebars templates rendered in strict mode:
//! `{{name}}` substitutes an HTML-escaped value, `{{{name}}}` substitutes it
//! verbatim, and referencing a variable that does not exist is an error rather
//! than an empty string. Comments, block helpers and `\{{` escapes behave as
//! Handlebars defines them.

use handlebars::{Handlebars, RenderError, RenderErrorReason, html_escape};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

static REGISTRY: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(html_escape);
    registry
});

/// Errors raised while rendering a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("variable '{name}' is not defined")]
    MissingVariable { name: String },

    #[error("invalid template: {0}")]
    Syntax(String),

    #[error("{0}")]
    Render(String),
}

impl From<RenderError> for TemplateError {
    fn from(err: RenderError) -> Self {
        match err.reason() {
            RenderErrorReason::MissingVariable(name) => TemplateError::MissingVariable {
                name: name.clone().unwrap_or_default(),
            },
            RenderErrorReason::TemplateError(source) => TemplateError::Syntax(source.to_string()),
            _ => TemplateError::Render(err.to_string()),
        }
    }
}

/// Renders `template` with `variables`
pub fn render(template: &str, variables: &Map<String, Value>) -> Result<String, TemplateError> {
    Ok(REGISTRY.render_template(template, variables)?)
}
