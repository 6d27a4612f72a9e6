//! Binding applier: writes resolved parameter values into a parsed document.
//!
//! The document is owned by the caller for the duration of one resolution
//! and mutated in place. `{value}` substitution is a literal
//! search-and-replace; nothing inside a template is ever interpreted.

use crate::descriptor::{DescriptorV1, DescriptorV2, TEXT_CONTENT, VALUE_PLACEHOLDER};
use crate::error::CoreError;
use crate::params::{normalize_hex_color, ParamValues};
use crate::svg::{Document, Element};

/// Apply V2 bindings in declaration order.
///
/// Bindings whose param has no resolved value are skipped. Each selector is
/// evaluated against the document as mutated by earlier bindings.
pub fn apply_bindings(doc: &mut Document, descriptor: &DescriptorV2, params: &ParamValues) {
    for binding in &descriptor.bindings {
        let Some(value) = params.get(&binding.param) else {
            continue;
        };
        for path in binding.selector.select_all(doc) {
            // A text replacement on an ancestor may have detached this node.
            let Some(el) = doc.element_mut(&path) else {
                continue;
            };
            for (attr, template) in &binding.attributes {
                if attr == TEXT_CONTENT {
                    el.replace_children_with_text(value.as_str());
                } else {
                    el.set_attribute(attr, substitute(template, value));
                }
            }
        }
    }
}

/// Replace every `{value}` in `template`, or use `value` verbatim when the
/// template has no placeholder.
pub fn substitute(template: &str, value: &str) -> String {
    if template.contains(VALUE_PLACEHOLDER) {
        template.replace(VALUE_PLACEHOLDER, value)
    } else {
        value.to_string()
    }
}

/// Apply V1 fields (text) and colors by element id.
pub fn apply_fields_and_colors(
    doc: &mut Document,
    descriptor: &DescriptorV1,
    params: &ParamValues,
) -> Result<(), CoreError> {
    for field in &descriptor.fields {
        let el = element_by_id(doc, &field.id)?;
        let text = params.get(&field.id).map(String::as_str).unwrap_or_default();
        el.replace_children_with_text(text);
    }

    for color in &descriptor.colors {
        let raw = params.get(&color.id).map(String::as_str).unwrap_or_default();
        let value = normalize_hex_color(raw)?;
        let el = element_by_id(doc, &color.id)?;
        let target = color_attribute(el);
        el.set_attribute(target, value);
    }

    Ok(())
}

/// `stop-color` for gradient stops (or elements already using it), `fill`
/// for everything else.
fn color_attribute(el: &Element) -> &'static str {
    let has_stop_color = el.attribute("stop-color").is_some_and(|v| !v.is_empty());
    if el.has_tag("stop") || has_stop_color {
        "stop-color"
    } else {
        "fill"
    }
}

fn element_by_id<'a>(doc: &'a mut Document, id: &str) -> Result<&'a mut Element, CoreError> {
    let missing = || CoreError::InvalidSvg(format!("SVG is missing a required id: {id}"));
    let path = doc.find_by_id(id).ok_or_else(missing)?;
    doc.element_mut(&path).ok_or_else(missing)
}
