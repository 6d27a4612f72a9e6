//! Restricted selector language used by descriptor bindings.
//!
//! A selector is a whitespace-separated list of parts combined as
//! descendants. Each part is either `#id` (absolute: resolved against the
//! whole document) or `tag` with an optional `[attr='value']` exact-match
//! filter. Commas, child/sibling combinators and pseudo-classes are rejected.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::document::{Document, Element, NodePath};
use crate::error::CoreError;

fn re_tag_part() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| {
        Regex::new(
            r#"^([A-Za-z][A-Za-z0-9_-]*)(?:\[\s*([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:'([^']*)'|"([^"]*)")\s*\])?$"#,
        )
        .expect("static regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorPart {
    /// `#id`: absolute lookup by id.
    Id(String),
    /// `tag` or `tag[attr='value']`, matched against descendants.
    Tag {
        name: String,
        attribute: Option<(String, String)>,
    },
}

impl SelectorPart {
    fn parse(part: &str) -> Result<Self, CoreError> {
        if let Some(id) = part.strip_prefix('#') {
            if id.is_empty() {
                return Err(unsupported(part));
            }
            return Ok(SelectorPart::Id(id.to_string()));
        }

        let caps = re_tag_part().captures(part).ok_or_else(|| unsupported(part))?;
        let name = caps[1].to_string();
        let attribute = caps.get(2).map(|attr| {
            let value = caps
                .get(3)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (attr.as_str().to_string(), value)
        });
        Ok(SelectorPart::Tag { name, attribute })
    }

    fn matches(&self, el: &Element) -> bool {
        match self {
            SelectorPart::Id(id) => el.attribute("id") == Some(id.as_str()),
            SelectorPart::Tag { name, attribute } => {
                if !el.has_tag(name) {
                    return false;
                }
                match attribute {
                    // A missing attribute compares as the empty string.
                    Some((attr, value)) => el.attribute(attr).unwrap_or_default() == value.as_str(),
                    None => true,
                }
            }
        }
    }
}

/// A parsed selector. Keeps its source text for error messages and for
/// serializing descriptors back to JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    parts: Vec<SelectorPart>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, CoreError> {
        let source = source.trim();
        if source.contains(',') {
            return Err(CoreError::InvalidDescriptor(format!(
                "Unsupported selector (commas not allowed): {source}"
            )));
        }
        let parts = source
            .split_whitespace()
            .map(SelectorPart::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[SelectorPart] {
        &self.parts
    }

    /// Evaluate left to right starting from the root element. Results are
    /// de-duplicated and returned in document order. An empty selector
    /// matches nothing.
    ///
    /// An `#id` part resolves against the whole document even when the
    /// preceding parts matched nothing.
    pub fn select_all(&self, doc: &Document) -> Vec<NodePath> {
        if self.parts.is_empty() {
            return Vec::new();
        }

        let mut current: Vec<NodePath> = vec![Vec::new()];
        for part in &self.parts {
            current = match part {
                SelectorPart::Id(id) => doc.find_by_id(id).into_iter().collect(),
                SelectorPart::Tag { .. } => {
                    let mut next: BTreeSet<NodePath> = BTreeSet::new();
                    for base in &current {
                        next.extend(doc.descendants_matching(base, |el| part.matches(el)));
                    }
                    // Lexicographic path order is document order.
                    next.into_iter().collect()
                }
            };
        }
        current
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Parse `selector` and evaluate it against `doc`.
pub fn select_all(doc: &Document, selector: &str) -> Result<Vec<NodePath>, CoreError> {
    Ok(Selector::parse(selector)?.select_all(doc))
}

fn unsupported(part: &str) -> CoreError {
    CoreError::InvalidDescriptor(format!("Unsupported selector syntax: {part}"))
}
