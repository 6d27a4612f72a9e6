//! Storage boundary for template and config rows.
//!
//! The service only talks to persistence through [`LowerThirdStore`]; the
//! PostgreSQL implementation lives in `lowerthird-db`. Implementations map
//! their own failures into [`CoreError::Internal`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;
use crate::preset::TimingRule;
use crate::types::{DbId, Timestamp};

/// One immutable template version.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRecord {
    pub template_key: String,
    pub version: i32,
    pub label: String,
    pub category: Option<String>,
    pub svg_markup: String,
    /// Raw descriptor as stored; normalized on every read.
    pub descriptor_json: Value,
    pub created_at: Timestamp,
    pub archived_at: Option<Timestamp>,
}

impl TemplateRecord {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// A user-owned config row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRecord {
    pub id: DbId,
    pub owner_user_id: DbId,
    pub name: String,
    pub template_key: String,
    pub template_version: i32,
    pub params_json: Value,
    /// Stored text; may predate the current rule names.
    pub timing_rule: String,
    pub timing_seconds: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub archived_at: Option<Timestamp>,
}

impl ConfigRecord {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    pub template_key: String,
    pub version: i32,
    pub label: String,
    pub category: Option<String>,
    pub svg_markup: String,
    pub descriptor_json: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConfig {
    pub owner_user_id: DbId,
    pub name: String,
    pub template_key: String,
    pub template_version: i32,
    pub params_json: Value,
    pub timing_rule: TimingRule,
    pub timing_seconds: Option<i32>,
}

/// Full replacement of a config's mutable columns. The template reference
/// is not part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChanges {
    pub name: String,
    pub params_json: Value,
    pub timing_rule: TimingRule,
    pub timing_seconds: Option<i32>,
}

#[async_trait]
pub trait LowerThirdStore: Send + Sync {
    /// Ordered by template key ascending, then version descending.
    async fn list_templates(&self, include_archived: bool) -> Result<Vec<TemplateRecord>, CoreError>;

    /// Archived rows are returned too; callers decide whether they may be used.
    async fn get_template(&self, key: &str, version: i32) -> Result<Option<TemplateRecord>, CoreError>;

    async fn latest_template_version(&self, key: &str) -> Result<Option<i32>, CoreError>;

    async fn insert_template(&self, input: &NewTemplate) -> Result<TemplateRecord, CoreError>;

    /// Returns `false` when no such version exists.
    async fn archive_template(&self, key: &str, version: i32) -> Result<bool, CoreError>;

    /// Newest first.
    async fn list_configs(
        &self,
        owner_user_id: DbId,
        include_archived: bool,
        limit: i64,
    ) -> Result<Vec<ConfigRecord>, CoreError>;

    async fn get_config(&self, id: DbId) -> Result<Option<ConfigRecord>, CoreError>;

    async fn create_config(&self, input: &NewConfig) -> Result<ConfigRecord, CoreError>;

    async fn update_config(
        &self,
        id: DbId,
        changes: &ConfigChanges,
    ) -> Result<Option<ConfigRecord>, CoreError>;

    /// Soft delete. Already-archived rows keep their original timestamp.
    async fn archive_config(&self, id: DbId) -> Result<bool, CoreError>;
}
