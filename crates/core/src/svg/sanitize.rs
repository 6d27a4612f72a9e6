//! SVG safety sanitizer.
//!
//! Strips an optional XML preamble and leading comments, then rejects any
//! document carrying constructs that could execute code or pull external
//! resources once the overlay reaches the video renderer.

use std::sync::OnceLock;

use regex::Regex;

use super::document::{Document, Element, Node};
use crate::error::CoreError;

fn re_xml_decl() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?is)^<\?xml.*?\?>\s*").expect("static regex"))
}

fn re_doctype() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)<\s*!doctype").expect("static regex"))
}

fn re_script() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)<\s*script\b").expect("static regex"))
}

fn re_foreign_object() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)<\s*foreignObject\b").expect("static regex"))
}

fn re_image() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)<\s*image\b").expect("static regex"))
}

fn re_event_handler() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("static regex"))
}

fn re_href() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| {
        Regex::new(r#"(?i)\s(?:xlink:href|href)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("static regex")
    })
}

fn re_external_url() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| {
        Regex::new(r#"(?i)url\(\s*['"]?\s*(https?|data):"#).expect("static regex")
    })
}

/// Remove a leading BOM, whitespace, XML declaration and XML comments.
///
/// An unterminated leading comment is left in place; the `<svg` prefix check
/// in [`sanitize`] rejects it.
pub fn strip_preamble(raw: &str) -> &str {
    let mut s = raw.strip_prefix('\u{feff}').unwrap_or(raw).trim_start();
    if let Some(m) = re_xml_decl().find(s) {
        s = &s[m.end()..];
    }
    while s.starts_with("<!--") {
        let Some(end) = s.find("-->") else {
            break;
        };
        s = s[end + 3..].trim_start();
    }
    s
}

/// Clean `raw` and prove it is free of disallowed constructs.
///
/// Returns the cleaned markup (preamble stripped), which is what gets parsed
/// and, at authoring time, persisted.
pub fn sanitize(raw: &str) -> Result<String, CoreError> {
    let cleaned = strip_preamble(raw);

    let starts_with_svg = cleaned
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<svg"));
    if !starts_with_svg {
        return Err(CoreError::InvalidSvg(
            "SVG must start with <svg> (remove XML/metadata header).".to_string(),
        ));
    }

    if re_doctype().is_match(cleaned) {
        return Err(disallowed("SVG DOCTYPE is not allowed."));
    }
    if re_script().is_match(cleaned) {
        return Err(disallowed("SVG <script> is not allowed."));
    }
    if re_foreign_object().is_match(cleaned) {
        return Err(disallowed("SVG <foreignObject> is not allowed."));
    }
    if re_image().is_match(cleaned) {
        return Err(disallowed("SVG <image> is not allowed."));
    }
    if re_event_handler().is_match(cleaned) {
        return Err(disallowed("SVG event handler attributes are not allowed."));
    }

    for caps in re_href().captures_iter(cleaned) {
        let value = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        check_href(value)?;
    }
    check_url_references(cleaned)?;

    Ok(cleaned.to_string())
}

/// Re-check reference-bearing content after character references have been
/// decoded, so `&#104;ttps:` cannot slip past the markup-level scan.
pub fn check_decoded(doc: &Document) -> Result<(), CoreError> {
    check_element(doc.root())
}

fn check_element(el: &Element) -> Result<(), CoreError> {
    for attr in &el.attributes {
        if attr.name.eq_ignore_ascii_case("href") || attr.name.eq_ignore_ascii_case("xlink:href") {
            check_href(&attr.value)?;
        }
        check_url_references(&attr.value)?;
    }
    for child in &el.children {
        match child {
            Node::Element(inner) => check_element(inner)?,
            Node::Text(text) | Node::CData(text) => check_url_references(text)?,
            Node::Comment(_) | Node::ProcessingInstruction(_) => {}
        }
    }
    Ok(())
}

fn check_href(value: &str) -> Result<(), CoreError> {
    let value = value.trim();
    if !value.is_empty() && !value.starts_with('#') {
        return Err(disallowed(
            "External href/xlink:href references are not allowed in SVG.",
        ));
    }
    Ok(())
}

fn check_url_references(text: &str) -> Result<(), CoreError> {
    if let Some(caps) = re_external_url().captures(text) {
        let scheme = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Err(CoreError::InvalidSvg(format!(
            "External url({}:...) in SVG is not allowed.",
            scheme.to_ascii_lowercase()
        )));
    }
    Ok(())
}

fn disallowed(message: &str) -> CoreError {
    CoreError::InvalidSvg(message.to_string())
}
