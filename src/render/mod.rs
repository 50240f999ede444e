//! HTML rendering
//!
//! Pages are Tera templates compiled into the binary from `templates/`.
//! Template names mirror their path, e.g. `newspapers/topic_list.html`.

mod error;

pub use error::RenderError;

use rust_embed::RustEmbed;
use std::error::Error as _;
use tera::{Context as TeraContext, Tera};

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct Templates;

/// Tera engine over the embedded templates
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Load and compile every embedded template.
    pub fn new() -> Result<Self, RenderError> {
        let mut templates = Vec::new();
        for name in Templates::iter() {
            let file = Templates::get(&name).ok_or_else(|| RenderError::InvalidTemplate {
                name: name.to_string(),
                message: "missing from embedded assets".to_string(),
            })?;
            let content = String::from_utf8(file.data.into_owned()).map_err(|e| {
                RenderError::InvalidTemplate {
                    name: name.to_string(),
                    message: e.to_string(),
                }
            })?;
            templates.push((name.to_string(), content));
        }

        let mut tera = Tera::default();
        // Resolves `extends`/`include` across the whole set at once
        tera.add_raw_templates(templates)
            .map_err(|e| RenderError::TemplateError(describe(&e)))?;

        tracing::debug!(
            count = tera.get_template_names().count(),
            "Templates loaded"
        );
        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, RenderError> {
        self.tera.render(template, context).map_err(|e| {
            RenderError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e)))
        })
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }
}

/// Flatten a Tera error and its causes into one message.
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  Caused by: {}", cause));
        source = cause.source();
    }
    message
}

/// Minimal page used when the error template itself cannot be rendered.
pub fn fallback_error_page(status: u16, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>{status}</title></head>\n\
         <body><h1>{status}</h1><p>{message}</p></body>\n</html>",
        status = status,
        message = tera::escape_html(message),
    )
}
