//! SVG handling: safety sanitizer, owned document tree, selector engine.

pub mod document;
pub mod sanitize;
pub mod selector;

pub use document::{Document, Element, Node, NodePath};
pub use sanitize::sanitize;
pub use selector::{select_all, Selector};

use crate::error::CoreError;

/// Sanitize `raw` and parse it into a fresh document.
///
/// Returns the document together with the cleaned markup it was parsed from.
/// Decoded attribute values and text are checked again after parsing.
pub fn parse_sanitized(raw: &str) -> Result<(Document, String), CoreError> {
    let cleaned = sanitize(raw)?;
    let doc = Document::parse(&cleaned)?;
    sanitize::check_decoded(&doc)?;
    Ok((doc, cleaned))
}
