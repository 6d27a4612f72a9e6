//! Parameter resolution: merge caller values with descriptor defaults and
//! enforce per-parameter text length and color format.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::descriptor::{Descriptor, DescriptorV1, DescriptorV2, ParamType};
use crate::error::CoreError;

/// Resolved (or provided) parameter values keyed by field/color/param id.
pub type ParamValues = IndexMap<String, String>;

/// Color used when neither the caller nor the descriptor supplies one.
pub const FALLBACK_COLOR: &str = "#000000";

fn re_hex_color() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("static regex"))
}

/// Validate a `#rrggbb` color. Surrounding whitespace is trimmed; case is
/// preserved as given.
pub fn normalize_hex_color(raw: &str) -> Result<String, CoreError> {
    let s = raw.trim();
    if re_hex_color().is_match(s) {
        Ok(s.to_string())
    } else {
        Err(CoreError::InvalidColor(format!(
            "Color '{s}' must be a hex value like #1a2b3c"
        )))
    }
}

/// Coerce a raw JSON params object into string values.
///
/// `null` means "no params". Keys are trimmed and empty keys dropped; scalar
/// values are stringified and `null` values become empty strings.
pub fn normalize_params(raw: &Value) -> Result<ParamValues, CoreError> {
    let obj = match raw {
        Value::Null => return Ok(ParamValues::new()),
        Value::Object(obj) => obj,
        _ => {
            return Err(CoreError::validation(
                "invalid_params",
                "Params must be a JSON object",
            ))
        }
    };

    let mut out = ParamValues::new();
    for (key, value) in obj {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

/// JSON object form of `values`, as persisted in `params_json`.
pub fn params_to_json(values: &ParamValues) -> Value {
    Value::Object(
        values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Resolve every declared parameter from `provided`, then descriptor
/// defaults, then the color fallback.
///
/// Undeclared provided keys are ignored; the output never contains them.
pub fn resolve_params(
    descriptor: &Descriptor,
    provided: &ParamValues,
) -> Result<ParamValues, CoreError> {
    match descriptor {
        Descriptor::V1(d) => resolve_v1(d, provided),
        Descriptor::V2(d) => resolve_v2(d, provided),
    }
}

fn resolve_v1(d: &DescriptorV1, provided: &ParamValues) -> Result<ParamValues, CoreError> {
    let mut out = ParamValues::new();

    for field in &d.fields {
        let text = provided
            .get(&field.id)
            .or_else(|| d.defaults.get(&field.id))
            .cloned()
            .unwrap_or_default();
        check_length(&field.id, &text, field.max_length)?;
        out.insert(field.id.clone(), text);
    }

    for color in &d.colors {
        let raw = provided
            .get(&color.id)
            .or_else(|| d.defaults.get(&color.id))
            .map(String::as_str)
            .unwrap_or(FALLBACK_COLOR);
        out.insert(color.id.clone(), normalize_hex_color(raw)?);
    }

    Ok(out)
}

fn resolve_v2(d: &DescriptorV2, provided: &ParamValues) -> Result<ParamValues, CoreError> {
    let mut out = ParamValues::new();

    for (key, spec) in &d.params {
        let value = provided.get(key).or(spec.default.as_ref());
        match spec.kind {
            ParamType::Text => {
                // Text without a value stays unresolved; its bindings are skipped.
                let Some(text) = value else {
                    continue;
                };
                check_length(key, text, spec.max_length)?;
                out.insert(key.clone(), text.clone());
            }
            ParamType::Color => {
                let raw = value.map(String::as_str).unwrap_or(FALLBACK_COLOR);
                out.insert(key.clone(), normalize_hex_color(raw)?);
            }
        }
    }

    Ok(out)
}

fn check_length(key: &str, text: &str, max_length: Option<usize>) -> Result<(), CoreError> {
    let Some(max) = max_length else {
        return Ok(());
    };
    let len = text.chars().count();
    if len > max {
        return Err(CoreError::InvalidText(format!(
            "'{key}' is {len} characters long (max {max})"
        )));
    }
    Ok(())
}
