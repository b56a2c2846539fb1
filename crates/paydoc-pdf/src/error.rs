//! Render Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, RenderError>;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// The PDF object model rejected what we built
    #[error("PDF error: {0}")]
    Pdf(String),

    /// A page content stream could not be encoded
    #[error("Content encoding error: {0}")]
    Encode(String),
}

impl RenderError {
    pub const fn user_message(&self) -> &str {
        "Failed to generate PDF"
    }
}
