//! Template descriptor normalization.
//!
//! A descriptor comes in one of two shapes, decided once here:
//!
//! - **V1** (legacy): `fields` and `colors` addressed by element id, plus a
//!   `defaults` map.
//! - **V2** (generic): a `params` map and an ordered list of `bindings`, each
//!   pairing a param with a selector and an attribute-template map.
//!
//! A raw object with both a `params` object and a `bindings` array is V2;
//! anything else is read as V1.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::svg::Selector;

/* --------------------------------------------------------------------------
   Constants
   -------------------------------------------------------------------------- */

/// Upper bound accepted for any `maxLength`.
pub const MAX_TEXT_LENGTH_LIMIT: usize = 500;

/// Binding attribute key that replaces element children with text.
pub const TEXT_CONTENT: &str = "textContent";

/// Literal placeholder substituted inside binding attribute templates.
pub const VALUE_PLACEHOLDER: &str = "{value}";

/* --------------------------------------------------------------------------
   Types
   -------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Descriptor {
    V1(DescriptorV1),
    V2(DescriptorV2),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorSpec {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorV1 {
    pub fields: Vec<FieldSpec>,
    pub colors: Vec<ColorSpec>,
    pub defaults: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Text,
    Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub param: String,
    pub selector: Selector,
    pub attributes: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorV2 {
    /// Informational only; the template row holds the canonical key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Informational only; the template row holds the canonical version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    pub params: IndexMap<String, ParamSpec>,
    pub bindings: Vec<Binding>,
}

impl Descriptor {
    /// Canonical JSON form, suitable for persisting as `descriptor_json`.
    pub fn to_json(&self) -> Value {
        // Serializing plain strings, maps and vectors cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/* --------------------------------------------------------------------------
   Normalization
   -------------------------------------------------------------------------- */

/// Validate and canonicalize a raw descriptor.
///
/// Accepts either a JSON object or a JSON string holding one (rows written
/// by older tooling store the descriptor as text).
pub fn normalize_descriptor(raw: &Value) -> Result<Descriptor, CoreError> {
    let parsed;
    let value = match raw {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text)
                .map_err(|e| invalid(format!("Descriptor is not valid JSON: {e}")))?;
            &parsed
        }
        other => other,
    };

    let obj = value
        .as_object()
        .ok_or_else(|| invalid("Descriptor must be a JSON object"))?;

    let is_v2 = obj.get("params").is_some_and(Value::is_object)
        && obj.get("bindings").is_some_and(Value::is_array);
    if is_v2 {
        normalize_v2(obj).map(Descriptor::V2)
    } else {
        normalize_v1(obj).map(Descriptor::V1)
    }
}

fn normalize_v1(obj: &serde_json::Map<String, Value>) -> Result<DescriptorV1, CoreError> {
    let mut fields = Vec::new();
    for raw in obj.get("fields").and_then(Value::as_array).into_iter().flatten() {
        let id = trimmed_text(raw.get("id"));
        let label = trimmed_text(raw.get("label"));
        if id.is_empty() || label.is_empty() {
            return Err(invalid("Every field needs a non-empty id and label"));
        }
        validate_identifier(&id, "Field id")?;
        let max_length = parse_max_length(raw.get("maxLength"), &id)?;
        fields.push(FieldSpec {
            id,
            label,
            max_length,
        });
    }

    let mut colors = Vec::new();
    for raw in obj.get("colors").and_then(Value::as_array).into_iter().flatten() {
        let id = trimmed_text(raw.get("id"));
        let label = trimmed_text(raw.get("label"));
        if id.is_empty() || label.is_empty() {
            return Err(invalid("Every color needs a non-empty id and label"));
        }
        validate_identifier(&id, "Color id")?;
        colors.push(ColorSpec { id, label });
    }

    let mut defaults = IndexMap::new();
    if let Some(raw_defaults) = obj.get("defaults").and_then(Value::as_object) {
        for (key, value) in raw_defaults {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            defaults.insert(key.to_string(), stringify(value));
        }
    }

    // Fields and colors share one id namespace.
    let mut seen = std::collections::HashSet::new();
    for id in fields.iter().map(|f| &f.id).chain(colors.iter().map(|c| &c.id)) {
        if !seen.insert(id.as_str()) {
            return Err(invalid(format!("Id '{id}' is declared more than once")));
        }
    }

    Ok(DescriptorV1 {
        fields,
        colors,
        defaults,
    })
}

fn normalize_v2(obj: &serde_json::Map<String, Value>) -> Result<DescriptorV2, CoreError> {
    let raw_params = obj
        .get("params")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("Descriptor params must be an object"))?;

    let mut params = IndexMap::new();
    for (key, raw) in raw_params {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        validate_identifier(key, "Param key")?;

        let kind = match trimmed_text(raw.get("type")).to_ascii_lowercase().as_str() {
            "text" => ParamType::Text,
            "color" => ParamType::Color,
            other => {
                return Err(invalid(format!(
                    "Param '{key}' has unsupported type '{other}' (expected text or color)"
                )))
            }
        };
        let label = trimmed_text(raw.get("label"));
        if label.is_empty() {
            return Err(invalid(format!("Param '{key}' needs a non-empty label")));
        }
        let max_length = parse_max_length(raw.get("maxLength"), key)?;
        let default = raw.get("default").filter(|v| !v.is_null()).map(stringify);

        params.insert(
            key.to_string(),
            ParamSpec {
                kind,
                label,
                max_length,
                default,
            },
        );
    }
    if params.is_empty() {
        return Err(invalid("Descriptor must declare at least one param"));
    }

    let raw_bindings = obj
        .get("bindings")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("Descriptor bindings must be an array"))?;

    let mut bindings = Vec::with_capacity(raw_bindings.len());
    for raw in raw_bindings {
        let param = trimmed_text(raw.get("param"));
        let selector = trimmed_text(raw.get("selector"));
        if param.is_empty() || selector.is_empty() {
            return Err(invalid("Every binding needs a param and a selector"));
        }
        if !params.contains_key(&param) {
            return Err(invalid(format!("Binding references undeclared param '{param}'")));
        }
        let selector = Selector::parse(&selector)?;

        let raw_attrs = raw
            .get("attributes")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid(format!("Binding for '{param}' needs an attributes object")))?;
        let mut attributes = IndexMap::new();
        for (name, template) in raw_attrs {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            validate_binding_attribute(name)?;
            attributes.insert(name.to_string(), stringify(template));
        }
        if attributes.is_empty() {
            return Err(invalid(format!(
                "Binding for '{param}' must set at least one attribute"
            )));
        }

        bindings.push(Binding {
            param,
            selector,
            attributes,
        });
    }
    if bindings.is_empty() {
        return Err(invalid("Descriptor must declare at least one binding"));
    }

    let template_id = obj.get("templateId").filter(|v| !v.is_null()).map(stringify);
    let version = obj.get("version").and_then(number_of).map(|n| n.round() as i64);

    Ok(DescriptorV2 {
        template_id,
        version,
        params,
        bindings,
    })
}

/* --------------------------------------------------------------------------
   Validation helpers
   -------------------------------------------------------------------------- */

/// `[A-Za-z0-9_-]+`
fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn validate_identifier(id: &str, what: &str) -> Result<(), CoreError> {
    if is_identifier(id) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{what} '{id}' may only contain letters, digits, '_' and '-'"
        )))
    }
}

/// Reject attribute names that could smuggle style, script or external
/// references into the output.
fn validate_binding_attribute(name: &str) -> Result<(), CoreError> {
    if name == TEXT_CONTENT {
        return Ok(());
    }
    let lower = name.to_ascii_lowercase();
    if lower == "style" {
        return Err(invalid("Binding attribute 'style' is not allowed"));
    }
    if is_event_handler(&lower) {
        return Err(invalid(format!(
            "Binding attribute '{name}' is an event handler"
        )));
    }
    if lower == "href" || lower == "xlink:href" {
        return Err(invalid(format!("Binding attribute '{name}' is not allowed")));
    }
    if !is_attribute_name(name) {
        return Err(invalid(format!("Binding attribute '{name}' is not a valid name")));
    }
    Ok(())
}

/// `on[a-z]+`, on an already lowercased name.
fn is_event_handler(lower: &str) -> bool {
    lower
        .strip_prefix("on")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_lowercase()))
}

/// `[A-Za-z_:][-A-Za-z0-9_:.]*`
fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn parse_max_length(raw: Option<&Value>, owner: &str) -> Result<Option<usize>, CoreError> {
    let Some(raw) = raw.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let n = number_of(raw)
        .ok_or_else(|| invalid(format!("maxLength for '{owner}' must be a number")))?;
    if !n.is_finite() || n.fract() != 0.0 || n <= 0.0 || n > MAX_TEXT_LENGTH_LIMIT as f64 {
        return Err(invalid(format!(
            "maxLength for '{owner}' must be an integer between 1 and {MAX_TEXT_LENGTH_LIMIT}"
        )));
    }
    Ok(Some(n as usize))
}

/// Numeric value of a JSON number or numeric string.
fn number_of(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Text form of a scalar; `null` and missing become empty.
fn trimmed_text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(other) => stringify(other).trim().to_string(),
    }
}

fn stringify(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::InvalidDescriptor(message.into())
}

/* --------------------------------------------------------------------------
   Tests
   -------------------------------------------------------------------------- */
