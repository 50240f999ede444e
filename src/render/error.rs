//! Template engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Embedded template could not be loaded or parsed
    #[error("Invalid template {name}: {message}")]
    InvalidTemplate { name: String, message: String },

    /// Template rendering error
    #[error("Template error: {0}")]
    TemplateError(String),
}
