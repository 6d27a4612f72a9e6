//! End-to-end template resolution.
//!
//! `sanitize -> parse -> check descriptor against the tree -> apply -> serialize`.
//! Every call parses a fresh document, so concurrent resolutions of the same
//! template never share state.

use serde::Serialize;
use serde_json::Value;

use crate::bindings::{apply_bindings, apply_fields_and_colors};
use crate::descriptor::{normalize_descriptor, Descriptor, DescriptorV1, DescriptorV2};
use crate::error::CoreError;
use crate::params::{resolve_params, ParamValues};
use crate::svg::{parse_sanitized, sanitize, Document};

/// A template draft that passed authoring-time validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDraft {
    /// Markup with the XML preamble removed; this is what gets persisted.
    pub svg_markup: String,
    pub descriptor: Descriptor,
}

/// Produce final markup for `raw_markup` with already-resolved params.
pub fn resolve_svg_markup(
    raw_markup: &str,
    descriptor: &Descriptor,
    params: &ParamValues,
) -> Result<String, CoreError> {
    let (mut doc, _) = parse_sanitized(raw_markup)?;

    match descriptor {
        Descriptor::V2(d) => {
            ensure_selectors_match(&doc, d)?;
            apply_bindings(&mut doc, d, params);
        }
        Descriptor::V1(d) => {
            ensure_ids_exist(&doc, d)?;
            apply_fields_and_colors(&mut doc, d, params)?;
        }
    }

    Ok(doc.to_markup())
}

/// Authoring-time check: the descriptor is well-formed, the markup is safe,
/// and the pair resolves with descriptor defaults alone.
pub fn validate_template_draft(
    svg_markup: &str,
    descriptor_json: &Value,
) -> Result<TemplateDraft, CoreError> {
    let descriptor = normalize_descriptor(descriptor_json)?;
    let cleaned = sanitize(svg_markup)?;

    let defaults = resolve_params(&descriptor, &ParamValues::new())?;
    resolve_svg_markup(&cleaned, &descriptor, &defaults)?;

    Ok(TemplateDraft {
        svg_markup: cleaned,
        descriptor,
    })
}

fn ensure_selectors_match(doc: &Document, descriptor: &DescriptorV2) -> Result<(), CoreError> {
    for binding in &descriptor.bindings {
        if binding.selector.select_all(doc).is_empty() {
            return Err(CoreError::InvalidDescriptor(format!(
                "Selector matched no nodes: {}",
                binding.selector
            )));
        }
    }
    Ok(())
}

fn ensure_ids_exist(doc: &Document, descriptor: &DescriptorV1) -> Result<(), CoreError> {
    let ids = descriptor
        .fields
        .iter()
        .map(|f| &f.id)
        .chain(descriptor.colors.iter().map(|c| &c.id));
    for id in ids {
        if doc.find_by_id(id).is_none() {
            return Err(CoreError::InvalidSvg(format!("SVG is missing id=\"{id}\"")));
        }
    }
    Ok(())
}
