//! Lower-third template and configuration rows.

use lowerthird_core::store::{ConfigRecord, TemplateRecord};
use lowerthird_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `lower_third_templates` table.
#[derive(Debug, Clone, FromRow)]
pub struct LowerThirdTemplateRow {
    pub id: DbId,
    pub template_key: String,
    pub version: i32,
    pub label: String,
    pub category: Option<String>,
    pub svg_markup: String,
    pub descriptor_json: serde_json::Value,
    pub created_at: Timestamp,
    pub archived_at: Option<Timestamp>,
}

impl From<LowerThirdTemplateRow> for TemplateRecord {
    fn from(row: LowerThirdTemplateRow) -> Self {
        Self {
            template_key: row.template_key,
            version: row.version,
            label: row.label,
            category: row.category,
            svg_markup: row.svg_markup,
            descriptor_json: row.descriptor_json,
            created_at: row.created_at,
            archived_at: row.archived_at,
        }
    }
}

/// A row from the `lower_third_configurations` table.
#[derive(Debug, Clone, FromRow)]
pub struct LowerThirdConfigRow {
    pub id: DbId,
    pub owner_user_id: DbId,
    pub name: String,
    pub template_key: String,
    pub template_version: i32,
    pub params_json: serde_json::Value,
    pub timing_rule: String,
    pub timing_seconds: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub archived_at: Option<Timestamp>,
}

impl From<LowerThirdConfigRow> for ConfigRecord {
    fn from(row: LowerThirdConfigRow) -> Self {
        Self {
            id: row.id,
            owner_user_id: row.owner_user_id,
            name: row.name,
            template_key: row.template_key,
            template_version: row.template_version,
            params_json: row.params_json,
            timing_rule: row.timing_rule,
            timing_seconds: row.timing_seconds,
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived_at: row.archived_at,
        }
    }
}
