//! Shared fixtures for service integration tests: an in-memory
//! [`LowerThirdStore`] and a couple of ready-made templates.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use lowerthird_core::store::{
    ConfigChanges, ConfigRecord, LowerThirdStore, NewConfig, NewTemplate, TemplateRecord,
};
use lowerthird_core::types::DbId;
use lowerthird_core::{CoreError, LowerThirdService};

#[derive(Default)]
struct State {
    templates: Vec<TemplateRecord>,
    configs: Vec<ConfigRecord>,
    next_config_id: DbId,
}

/// Cloning shares the underlying rows, so a test can keep a handle for
/// assertions after moving one into the service.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn config_count(&self) -> usize {
        self.lock().configs.len()
    }

    pub fn template_count(&self) -> usize {
        self.lock().templates.len()
    }

    pub fn config(&self, id: DbId) -> Option<ConfigRecord> {
        self.lock().configs.iter().find(|c| c.id == id).cloned()
    }

    /// Insert a template row directly, bypassing publication checks.
    pub fn seed_template(&self, key: &str, version: i32, svg: &str, descriptor: Value) {
        self.lock().templates.push(TemplateRecord {
            template_key: key.to_string(),
            version,
            label: format!("{key} v{version}"),
            category: None,
            svg_markup: svg.to_string(),
            descriptor_json: descriptor,
            created_at: Utc::now(),
            archived_at: None,
        });
    }

    pub fn archive_template_now(&self, key: &str, version: i32) {
        let mut state = self.lock();
        if let Some(t) = state
            .templates
            .iter_mut()
            .find(|t| t.template_key == key && t.version == version)
        {
            t.archived_at = Some(Utc::now());
        }
    }

    /// Overwrite stored params, as if written by an older release.
    pub fn set_config_params(&self, id: DbId, params: Value) {
        let mut state = self.lock();
        if let Some(c) = state.configs.iter_mut().find(|c| c.id == id) {
            c.params_json = params;
        }
    }
}

#[async_trait]
impl LowerThirdStore for MemoryStore {
    async fn list_templates(&self, include_archived: bool) -> Result<Vec<TemplateRecord>, CoreError> {
        let mut rows: Vec<_> = self
            .lock()
            .templates
            .iter()
            .filter(|t| include_archived || !t.is_archived())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.template_key
                .cmp(&b.template_key)
                .then(b.version.cmp(&a.version))
        });
        Ok(rows)
    }

    async fn get_template(&self, key: &str, version: i32) -> Result<Option<TemplateRecord>, CoreError> {
        Ok(self
            .lock()
            .templates
            .iter()
            .find(|t| t.template_key == key && t.version == version)
            .cloned())
    }

    async fn latest_template_version(&self, key: &str) -> Result<Option<i32>, CoreError> {
        Ok(self
            .lock()
            .templates
            .iter()
            .filter(|t| t.template_key == key)
            .map(|t| t.version)
            .max())
    }

    async fn insert_template(&self, input: &NewTemplate) -> Result<TemplateRecord, CoreError> {
        let mut state = self.lock();
        if state
            .templates
            .iter()
            .any(|t| t.template_key == input.template_key && t.version == input.version)
        {
            return Err(CoreError::Internal("duplicate template version".into()));
        }
        let row = TemplateRecord {
            template_key: input.template_key.clone(),
            version: input.version,
            label: input.label.clone(),
            category: input.category.clone(),
            svg_markup: input.svg_markup.clone(),
            descriptor_json: input.descriptor_json.clone(),
            created_at: Utc::now(),
            archived_at: None,
        };
        state.templates.push(row.clone());
        Ok(row)
    }

    async fn archive_template(&self, key: &str, version: i32) -> Result<bool, CoreError> {
        let mut state = self.lock();
        match state
            .templates
            .iter_mut()
            .find(|t| t.template_key == key && t.version == version)
        {
            Some(t) => {
                t.archived_at.get_or_insert_with(Utc::now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_configs(
        &self,
        owner_user_id: DbId,
        include_archived: bool,
        limit: i64,
    ) -> Result<Vec<ConfigRecord>, CoreError> {
        let mut rows: Vec<_> = self
            .lock()
            .configs
            .iter()
            .filter(|c| c.owner_user_id == owner_user_id)
            .filter(|c| include_archived || !c.is_archived())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn get_config(&self, id: DbId) -> Result<Option<ConfigRecord>, CoreError> {
        Ok(self.config(id))
    }

    async fn create_config(&self, input: &NewConfig) -> Result<ConfigRecord, CoreError> {
        let mut state = self.lock();
        state.next_config_id += 1;
        let now = Utc::now();
        let row = ConfigRecord {
            id: state.next_config_id,
            owner_user_id: input.owner_user_id,
            name: input.name.clone(),
            template_key: input.template_key.clone(),
            template_version: input.template_version,
            params_json: input.params_json.clone(),
            timing_rule: input.timing_rule.as_str().to_string(),
            timing_seconds: input.timing_seconds,
            created_at: now,
            updated_at: now,
            archived_at: None,
        };
        state.configs.push(row.clone());
        Ok(row)
    }

    async fn update_config(
        &self,
        id: DbId,
        changes: &ConfigChanges,
    ) -> Result<Option<ConfigRecord>, CoreError> {
        let mut state = self.lock();
        let Some(row) = state.configs.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        row.name = changes.name.clone();
        row.params_json = changes.params_json.clone();
        row.timing_rule = changes.timing_rule.as_str().to_string();
        row.timing_seconds = changes.timing_seconds;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn archive_config(&self, id: DbId) -> Result<bool, CoreError> {
        let mut state = self.lock();
        match state.configs.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.archived_at.get_or_insert_with(Utc::now);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/* --------------------------------------------------------------------------
   Fixtures
   -------------------------------------------------------------------------- */

pub const NEWS_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1920 200">"##,
    r##"<rect class="bar" fill="#000000"/>"##,
    r##"<text id="label">placeholder</text>"##,
    "</svg>"
);

pub fn news_descriptor() -> Value {
    json!({
        "params": {
            "title": { "type": "text", "label": "Title", "default": "Name", "maxLength": 20 },
            "accent": { "type": "color", "label": "Accent", "default": "#336699" }
        },
        "bindings": [
            { "param": "title", "selector": "#label", "attributes": { "textContent": "{value}" } },
            { "param": "accent", "selector": "rect[class='bar']", "attributes": { "fill": "{value}" } }
        ]
    })
}

pub const LEGACY_SVG: &str = r##"<svg><text id="name">x</text><stop id="g1" offset="0"/></svg>"##;

pub fn legacy_descriptor() -> Value {
    json!({
        "fields": [{ "id": "name", "label": "Name", "maxLength": 10 }],
        "colors": [{ "id": "g1", "label": "Gradient" }],
        "defaults": { "name": "Host", "g1": "#101010" }
    })
}

/// A service over a store seeded with `news@1` and `legacy@1`.
pub fn seeded_service() -> (LowerThirdService<MemoryStore>, MemoryStore) {
    let store = MemoryStore::default();
    store.seed_template("news", 1, NEWS_SVG, news_descriptor());
    store.seed_template("legacy", 1, LEGACY_SVG, legacy_descriptor());
    (LowerThirdService::new(store.clone()), store)
}
