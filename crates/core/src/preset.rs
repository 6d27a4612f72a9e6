//! Lower-third config (preset) field normalization.
//!
//! Provides name/key/version limits, the timing policy type and its
//! normalization rules. Every failure is a [`CoreError::Validation`] carrying
//! the field-specific code callers surface to the user.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/* --------------------------------------------------------------------------
   Validation limits
   -------------------------------------------------------------------------- */

/// Maximum length for a config name.
pub const MAX_CONFIG_NAME_LEN: usize = 120;

/// Maximum length for a template key.
pub const MAX_TEMPLATE_KEY_LEN: usize = 80;

/// Maximum length for a template label.
pub const MAX_TEMPLATE_LABEL_LEN: usize = 200;

/// Maximum length for a template category.
pub const MAX_TEMPLATE_CATEGORY_LEN: usize = 80;

/// Allowed on-screen durations for [`TimingRule::FirstOnly`].
pub const TIMING_SECONDS_OPTIONS: &[i32] = &[5, 10, 15, 20];

/// Duration used when none is supplied.
pub const DEFAULT_TIMING_SECONDS: i32 = 10;

/// Default page size for config listings.
pub const DEFAULT_CONFIG_LIST_LIMIT: i64 = 200;

/// Upper bound for config listings.
pub const MAX_CONFIG_LIST_LIMIT: i64 = 500;

/* --------------------------------------------------------------------------
   Timing
   -------------------------------------------------------------------------- */

/// When a lower third is shown during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingRule {
    /// Shown for the first `timing_seconds` seconds.
    #[default]
    FirstOnly,
    /// Shown for the whole production.
    Entire,
}

impl TimingRule {
    pub fn as_str(self) -> &'static str {
        match self {
            TimingRule::FirstOnly => "first_only",
            TimingRule::Entire => "entire",
        }
    }

    /// Parse a stored or submitted rule. Empty input means `first_only`;
    /// legacy aliases are accepted.
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        let s = raw.unwrap_or_default().trim().to_ascii_lowercase();
        match s.as_str() {
            "" | "first_only" | "first_n" | "first" => Ok(TimingRule::FirstOnly),
            "entire" | "end" | "till_end" => Ok(TimingRule::Entire),
            _ => Err(CoreError::validation(
                "invalid_timing_rule",
                format!("Unknown timing rule '{s}'. Must be first_only or entire"),
            )),
        }
    }
}

impl fmt::Display for TimingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seconds on screen for `rule`. `entire` never carries a duration; a missing
/// value under `first_only` takes the default.
pub fn normalize_timing_seconds(rule: TimingRule, raw: Option<i32>) -> Result<Option<i32>, CoreError> {
    if rule == TimingRule::Entire {
        return Ok(None);
    }
    let Some(seconds) = raw else {
        return Ok(Some(DEFAULT_TIMING_SECONDS));
    };
    if TIMING_SECONDS_OPTIONS.contains(&seconds) {
        Ok(Some(seconds))
    } else {
        Err(CoreError::validation(
            "invalid_timing_seconds",
            format!(
                "Timing seconds must be one of {:?}, got {seconds}",
                TIMING_SECONDS_OPTIONS
            ),
        ))
    }
}

/* --------------------------------------------------------------------------
   Names, keys and versions
   -------------------------------------------------------------------------- */

/// Trimmed config name, non-empty and within [`MAX_CONFIG_NAME_LEN`].
pub fn normalize_config_name(raw: &str) -> Result<String, CoreError> {
    bounded_text(raw, MAX_CONFIG_NAME_LEN, "invalid_name", "Config name")
}

/// Trimmed template label, non-empty and within [`MAX_TEMPLATE_LABEL_LEN`].
pub fn normalize_template_label(raw: &str) -> Result<String, CoreError> {
    bounded_text(raw, MAX_TEMPLATE_LABEL_LEN, "invalid_label", "Template label")
}

/// Optional category; blank means none.
pub fn normalize_template_category(raw: Option<&str>) -> Result<Option<String>, CoreError> {
    let Some(category) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let len = category.chars().count();
    if len > MAX_TEMPLATE_CATEGORY_LEN {
        return Err(CoreError::validation(
            "invalid_category",
            format!("Template category too long: {len} chars (max {MAX_TEMPLATE_CATEGORY_LEN})"),
        ));
    }
    Ok(Some(category.to_string()))
}

/// Template slug: `[a-z0-9][a-z0-9_-]*` (any case), at most
/// [`MAX_TEMPLATE_KEY_LEN`] characters.
///
/// ```
/// use lowerthird_core::preset::normalize_template_key;
/// assert_eq!(normalize_template_key(" news_v2 ").unwrap(), "news_v2");
/// assert!(normalize_template_key("-news").is_err());
/// ```
pub fn normalize_template_key(raw: &str) -> Result<String, CoreError> {
    let key = raw.trim();
    let invalid = |detail: &str| {
        CoreError::validation("invalid_template_key", format!("Template key {detail}"))
    };
    if key.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if key.len() > MAX_TEMPLATE_KEY_LEN {
        return Err(invalid(&format!(
            "too long: {} chars (max {MAX_TEMPLATE_KEY_LEN})",
            key.len()
        )));
    }
    let mut chars = key.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !first_ok || !rest_ok {
        return Err(invalid(&format!(
            "'{key}' may only contain letters, digits, '_' and '-' and must start with a letter or digit"
        )));
    }
    Ok(key.to_string())
}

/// Template versions are positive integers.
pub fn normalize_template_version(raw: i64) -> Result<i32, CoreError> {
    match i32::try_from(raw) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(CoreError::validation(
            "invalid_template_version",
            format!("Template version must be a positive integer, got {raw}"),
        )),
    }
}

/// Clamp a requested listing size into `1..=MAX_CONFIG_LIST_LIMIT`.
pub fn clamp_list_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_CONFIG_LIST_LIMIT)
        .clamp(1, MAX_CONFIG_LIST_LIMIT)
}

fn bounded_text(raw: &str, max: usize, code: &'static str, what: &str) -> Result<String, CoreError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(CoreError::validation(code, format!("{what} must not be empty")));
    }
    let len = s.chars().count();
    if len > max {
        return Err(CoreError::validation(
            code,
            format!("{what} too long: {len} chars (max {max})"),
        ));
    }
    Ok(s.to_string())
}

/* --------------------------------------------------------------------------
   Tests
   -------------------------------------------------------------------------- */
