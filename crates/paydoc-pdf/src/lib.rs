//! # paydoc-pdf
//!
//! Renders the "Business Information" document: a heading followed by one
//! `label: value` line per submitted field, paginated over A4 pages.
//!
//! ```rust,ignore
//! use paydoc_pdf::{DocumentFields, DocumentRenderer, PdfRenderer};
//!
//! let fields: DocumentFields = serde_json::from_str(r#"{"Company Name": "Acme"}"#)?;
//! let bytes = PdfRenderer::default().render(&fields)?;
//! ```

mod error;
mod fields;
mod layout;
mod renderer;

pub use error::{RenderError, Result};
pub use fields::DocumentFields;
pub use layout::{A4, FontRole, PageLayout, PlacedLine};
pub use renderer::{DEFAULT_HEADING, DocumentRenderer, PdfRenderer, read_text_lines};
