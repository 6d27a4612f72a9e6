//! Wire-facing shapes: request inputs and response DTOs (camelCase JSON).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::{normalize_descriptor, Descriptor};
use crate::error::CoreError;
use crate::params::{normalize_params, ParamValues};
use crate::preset::{normalize_timing_seconds, TimingRule, DEFAULT_TIMING_SECONDS};
use crate::store::{ConfigRecord, TemplateRecord};
use crate::types::{DbId, Timestamp};

/* --------------------------------------------------------------------------
   Inputs
   -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfigInput {
    pub name: String,
    pub template_key: String,
    pub template_version: i64,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub timing_rule: Option<String>,
    #[serde(default)]
    pub timing_seconds: Option<i32>,
}

/// Absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub timing_rule: Option<String>,
    #[serde(default)]
    pub timing_seconds: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTemplateInput {
    pub template_key: String,
    pub label: String,
    #[serde(default)]
    pub category: Option<String>,
    pub svg_markup: String,
    pub descriptor: Value,
}

/* --------------------------------------------------------------------------
   Responses
   -------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowerThirdTemplateDto {
    pub template_key: String,
    pub version: i32,
    pub label: String,
    pub category: Option<String>,
    pub descriptor: Descriptor,
    pub created_at: Timestamp,
    pub archived_at: Option<Timestamp>,
}

impl TryFrom<&TemplateRecord> for LowerThirdTemplateDto {
    type Error = CoreError;

    fn try_from(row: &TemplateRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            template_key: row.template_key.clone(),
            version: row.version,
            label: row.label.clone(),
            category: row.category.clone(),
            descriptor: normalize_descriptor(&row.descriptor_json)?,
            created_at: row.created_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowerThirdConfigDto {
    pub id: DbId,
    pub name: String,
    pub template_key: String,
    pub template_version: i32,
    pub params: ParamValues,
    pub timing_rule: TimingRule,
    pub timing_seconds: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub archived_at: Option<Timestamp>,
}

impl From<&ConfigRecord> for LowerThirdConfigDto {
    fn from(row: &ConfigRecord) -> Self {
        let (timing_rule, timing_seconds) = stored_timing(row);
        Self {
            id: row.id,
            name: row.name.clone(),
            template_key: row.template_key.clone(),
            template_version: row.template_version,
            params: normalize_params(&row.params_json).unwrap_or_default(),
            timing_rule,
            timing_seconds,
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived_at: row.archived_at,
        }
    }
}

/// Timing policy of a stored row. Values that no longer validate fall back
/// to `first_only` and the default duration.
pub fn stored_timing(row: &ConfigRecord) -> (TimingRule, Option<i32>) {
    let rule = TimingRule::parse(Some(row.timing_rule.as_str())).unwrap_or_default();
    let seconds =
        normalize_timing_seconds(rule, row.timing_seconds).unwrap_or(Some(DEFAULT_TIMING_SECONDS));
    (rule, seconds)
}

/// Output of every resolution path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLowerThird {
    pub svg: String,
    pub template_key: String,
    pub template_version: i32,
    pub params: ParamValues,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn config_row(timing_rule: &str, timing_seconds: Option<i32>) -> ConfigRecord {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ConfigRecord {
            id: 7,
            owner_user_id: 3,
            name: "Evening".into(),
            template_key: "news".into(),
            template_version: 2,
            params_json: json!({ "title": "Ada", "size": 3 }),
            timing_rule: timing_rule.into(),
            timing_seconds,
            created_at: at,
            updated_at: at,
            archived_at: None,
        }
    }

    #[test]
    fn config_dto_serializes_camel_case() {
        let dto = LowerThirdConfigDto::from(&config_row("first_only", Some(15)));
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["templateKey"], "news");
        assert_eq!(json["templateVersion"], 2);
        assert_eq!(json["timingRule"], "first_only");
        assert_eq!(json["timingSeconds"], 15);
        assert_eq!(json["params"], json!({ "title": "Ada", "size": "3" }));
        assert!(json["archivedAt"].is_null());
    }

    #[test]
    fn stored_timing_falls_back() {
        assert_eq!(stored_timing(&config_row("till_end", Some(5))), (TimingRule::Entire, None));
        assert_eq!(
            stored_timing(&config_row("garbage", None)),
            (TimingRule::FirstOnly, Some(DEFAULT_TIMING_SECONDS))
        );
        assert_eq!(
            stored_timing(&config_row("first_only", Some(7))),
            (TimingRule::FirstOnly, Some(DEFAULT_TIMING_SECONDS))
        );
    }

    #[test]
    fn update_input_defaults_to_no_changes() {
        let input: UpdateConfigInput = serde_json::from_value(json!({ "timingRule": "entire" })).unwrap();
        assert_eq!(input.timing_rule.as_deref(), Some("entire"));
        assert!(input.name.is_none() && input.params.is_none() && input.timing_seconds.is_none());
    }
}
