//! Repository-facing orchestration: config lifecycle, template publication
//! and the three resolution entry points.
//!
//! Every write runs the full resolution pipeline first, so a row is only
//! persisted if it can currently produce valid output.

use serde_json::Value;

use crate::descriptor::normalize_descriptor;
use crate::dto::{
    stored_timing, CreateConfigInput, LowerThirdConfigDto, LowerThirdTemplateDto,
    PublishTemplateInput, ResolvedLowerThird, UpdateConfigInput,
};
use crate::error::CoreError;
use crate::params::{normalize_params, params_to_json, resolve_params, ParamValues};
use crate::preset::{
    clamp_list_limit, normalize_config_name, normalize_template_category,
    normalize_template_key, normalize_template_label, normalize_template_version,
    normalize_timing_seconds, TimingRule,
};
use crate::resolve::{resolve_svg_markup, validate_template_draft};
use crate::store::{ConfigChanges, ConfigRecord, LowerThirdStore, NewConfig, NewTemplate, TemplateRecord};
use crate::types::DbId;

/// The authenticated user behind a request. Admin capability is decided by
/// the auth layer before the service is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: DbId,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(user_id: DbId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: DbId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    fn ensure_authenticated(&self) -> Result<(), CoreError> {
        if self.user_id <= 0 {
            return Err(CoreError::Forbidden("Not signed in".to_string()));
        }
        Ok(())
    }

    fn ensure_admin(&self) -> Result<(), CoreError> {
        self.ensure_authenticated()?;
        if !self.is_admin {
            tracing::warn!(user_id = self.user_id, "Non-admin attempted a template admin action");
            return Err(CoreError::Forbidden("Admin capability required".to_string()));
        }
        Ok(())
    }

    fn ensure_can_access(&self, row: &ConfigRecord) -> Result<(), CoreError> {
        if row.owner_user_id == self.user_id || self.is_admin {
            return Ok(());
        }
        tracing::warn!(
            user_id = self.user_id,
            config_id = row.id,
            owner_user_id = row.owner_user_id,
            "Forbidden lower-third config access"
        );
        Err(CoreError::Forbidden(format!(
            "Config {} belongs to another user",
            row.id
        )))
    }
}

/// Whether an archived template may be used on a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchivedTemplates {
    Allow,
    Reject,
}

pub struct LowerThirdService<S> {
    store: S,
}

impl<S: LowerThirdStore> LowerThirdService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /* ----------------------------------------------------------------------
       Templates
       ---------------------------------------------------------------------- */

    pub async fn list_templates(
        &self,
        caller: Caller,
        include_archived: bool,
    ) -> Result<Vec<LowerThirdTemplateDto>, CoreError> {
        caller.ensure_authenticated()?;
        let rows = self
            .store
            .list_templates(include_archived && caller.is_admin)
            .await?;
        rows.iter().map(LowerThirdTemplateDto::try_from).collect()
    }

    pub async fn publish_template(
        &self,
        input: &PublishTemplateInput,
        caller: Caller,
    ) -> Result<LowerThirdTemplateDto, CoreError> {
        caller.ensure_admin()?;
        let template_key = normalize_template_key(&input.template_key)?;
        let label = normalize_template_label(&input.label)?;
        let category = normalize_template_category(input.category.as_deref())?;
        let draft = validate_template_draft(&input.svg_markup, &input.descriptor)?;

        let version = match self.store.latest_template_version(&template_key).await? {
            Some(latest) => latest + 1,
            None => 1,
        };
        let row = self
            .store
            .insert_template(&NewTemplate {
                template_key,
                version,
                label,
                category,
                svg_markup: draft.svg_markup,
                descriptor_json: draft.descriptor.to_json(),
            })
            .await?;

        tracing::info!(
            template_key = %row.template_key,
            version = row.version,
            user_id = caller.user_id,
            "Lower-third template published"
        );
        LowerThirdTemplateDto::try_from(&row)
    }

    pub async fn archive_template(
        &self,
        template_key: &str,
        version: i64,
        caller: Caller,
    ) -> Result<(), CoreError> {
        caller.ensure_admin()?;
        let template_key = normalize_template_key(template_key)?;
        let version = normalize_template_version(version)?;
        if !self.store.archive_template(&template_key, version).await? {
            return Err(template_not_found(&template_key, version));
        }
        tracing::info!(template_key = %template_key, version, "Lower-third template archived");
        Ok(())
    }

    /* ----------------------------------------------------------------------
       Configs
       ---------------------------------------------------------------------- */

    pub async fn list_configs(
        &self,
        caller: Caller,
        include_archived: bool,
        limit: Option<i64>,
    ) -> Result<Vec<LowerThirdConfigDto>, CoreError> {
        caller.ensure_authenticated()?;
        let rows = self
            .store
            .list_configs(caller.user_id, include_archived, clamp_list_limit(limit))
            .await?;
        Ok(rows.iter().map(LowerThirdConfigDto::from).collect())
    }

    pub async fn get_config(&self, id: DbId, caller: Caller) -> Result<LowerThirdConfigDto, CoreError> {
        let row = self.load_config(id, caller).await?;
        Ok(LowerThirdConfigDto::from(&row))
    }

    pub async fn create_config(
        &self,
        input: &CreateConfigInput,
        caller: Caller,
    ) -> Result<LowerThirdConfigDto, CoreError> {
        caller.ensure_authenticated()?;
        let name = normalize_config_name(&input.name)?;
        let template_key = normalize_template_key(&input.template_key)?;
        let template_version = normalize_template_version(input.template_version)?;
        let timing_rule = TimingRule::parse(input.timing_rule.as_deref())?;
        let timing_seconds = normalize_timing_seconds(timing_rule, input.timing_seconds)?;
        let provided = normalize_params(&input.params)?;

        let template = self
            .load_template(&template_key, template_version, ArchivedTemplates::Reject)
            .await?;
        let params = validate_against(&template, &provided)?;

        let row = self
            .store
            .create_config(&NewConfig {
                owner_user_id: caller.user_id,
                name,
                template_key,
                template_version,
                params_json: params_to_json(&params),
                timing_rule,
                timing_seconds,
            })
            .await?;

        tracing::info!(
            config_id = row.id,
            user_id = caller.user_id,
            template_key = %row.template_key,
            template_version = row.template_version,
            "Lower-third config created"
        );
        Ok(LowerThirdConfigDto::from(&row))
    }

    pub async fn update_config(
        &self,
        id: DbId,
        patch: &UpdateConfigInput,
        caller: Caller,
    ) -> Result<LowerThirdConfigDto, CoreError> {
        let existing = self.load_config(id, caller).await?;
        if existing.is_archived() {
            return Err(CoreError::Archived {
                entity: "lower_third_config",
                key: id.to_string(),
            });
        }

        let name = match &patch.name {
            Some(name) => normalize_config_name(name)?,
            None => existing.name.clone(),
        };
        let provided = match &patch.params {
            Some(raw) => normalize_params(raw)?,
            None => normalize_params(&existing.params_json)?,
        };
        let (stored_rule, stored_seconds) = stored_timing(&existing);
        let timing_rule = match &patch.timing_rule {
            Some(raw) => TimingRule::parse(Some(raw.as_str()))?,
            None => stored_rule,
        };
        let timing_seconds = if patch.timing_rule.is_some() || patch.timing_seconds.is_some() {
            normalize_timing_seconds(timing_rule, patch.timing_seconds)?
        } else {
            stored_seconds
        };

        let template = self
            .load_template(
                &existing.template_key,
                existing.template_version,
                ArchivedTemplates::Reject,
            )
            .await?;
        let params = validate_against(&template, &provided)?;

        let row = self
            .store
            .update_config(
                id,
                &ConfigChanges {
                    name,
                    params_json: params_to_json(&params),
                    timing_rule,
                    timing_seconds,
                },
            )
            .await?
            .ok_or_else(|| config_not_found(id))?;

        tracing::info!(config_id = id, user_id = caller.user_id, "Lower-third config updated");
        Ok(LowerThirdConfigDto::from(&row))
    }

    /// Soft delete; archiving an archived config is a no-op.
    pub async fn archive_config(&self, id: DbId, caller: Caller) -> Result<(), CoreError> {
        self.load_config(id, caller).await?;
        if !self.store.archive_config(id).await? {
            return Err(config_not_found(id));
        }
        tracing::info!(config_id = id, user_id = caller.user_id, "Lower-third config archived");
        Ok(())
    }

    /* ----------------------------------------------------------------------
       Resolution
       ---------------------------------------------------------------------- */

    /// Resolve a saved config for its owner (or an admin).
    pub async fn resolve_for_saved_config(
        &self,
        config_id: DbId,
        caller: Caller,
    ) -> Result<ResolvedLowerThird, CoreError> {
        let config = self.load_config(config_id, caller).await?;
        if config.is_archived() {
            return Err(CoreError::Archived {
                entity: "lower_third_config",
                key: config_id.to_string(),
            });
        }
        let template = self
            .load_template(
                &config.template_key,
                config.template_version,
                ArchivedTemplates::Allow,
            )
            .await?;
        let provided = normalize_params(&config.params_json)?;
        resolve_template(&template, &provided)
    }

    /// Live preview of an explicit template version before a config exists.
    pub async fn resolve_for_explicit_template(
        &self,
        template_key: &str,
        template_version: i64,
        raw_params: &Value,
        caller: Caller,
    ) -> Result<ResolvedLowerThird, CoreError> {
        caller.ensure_authenticated()?;
        self.resolve_explicit(template_key, template_version, raw_params, ArchivedTemplates::Reject)
            .await
    }

    /// Render-pipeline path for a stored snapshot. No caller check; archived
    /// templates stay resolvable so historical renders are reproducible.
    pub async fn resolve_from_snapshot(
        &self,
        template_key: &str,
        template_version: i64,
        raw_params: &Value,
    ) -> Result<ResolvedLowerThird, CoreError> {
        self.resolve_explicit(template_key, template_version, raw_params, ArchivedTemplates::Allow)
            .await
    }

    async fn resolve_explicit(
        &self,
        template_key: &str,
        template_version: i64,
        raw_params: &Value,
        archived: ArchivedTemplates,
    ) -> Result<ResolvedLowerThird, CoreError> {
        let template_key = normalize_template_key(template_key)?;
        let template_version = normalize_template_version(template_version)?;
        let provided = normalize_params(raw_params)?;
        let template = self
            .load_template(&template_key, template_version, archived)
            .await?;
        resolve_template(&template, &provided)
    }

    /* ----------------------------------------------------------------------
       Loading
       ---------------------------------------------------------------------- */

    async fn load_config(&self, id: DbId, caller: Caller) -> Result<ConfigRecord, CoreError> {
        caller.ensure_authenticated()?;
        let row = self
            .store
            .get_config(id)
            .await?
            .ok_or_else(|| config_not_found(id))?;
        caller.ensure_can_access(&row)?;
        Ok(row)
    }

    async fn load_template(
        &self,
        key: &str,
        version: i32,
        archived: ArchivedTemplates,
    ) -> Result<TemplateRecord, CoreError> {
        match self.store.get_template(key, version).await? {
            Some(row) if archived == ArchivedTemplates::Allow || !row.is_archived() => Ok(row),
            _ => Err(template_not_found(key, version)),
        }
    }
}

/// Resolve `provided` against the template and prove the markup renders.
fn validate_against(template: &TemplateRecord, provided: &ParamValues) -> Result<ParamValues, CoreError> {
    let resolved = resolve_template(template, provided)?;
    Ok(resolved.params)
}

fn resolve_template(
    template: &TemplateRecord,
    provided: &ParamValues,
) -> Result<ResolvedLowerThird, CoreError> {
    let descriptor = normalize_descriptor(&template.descriptor_json)?;
    let params = resolve_params(&descriptor, provided)?;
    let svg = resolve_svg_markup(&template.svg_markup, &descriptor, &params)?;

    tracing::debug!(
        template_key = %template.template_key,
        template_version = template.version,
        bytes = svg.len(),
        "Lower-third resolved"
    );
    Ok(ResolvedLowerThird {
        svg,
        template_key: template.template_key.clone(),
        template_version: template.version,
        params,
    })
}

fn template_not_found(key: &str, version: i32) -> CoreError {
    CoreError::NotFound {
        entity: "lower_third_template",
        key: format!("{key}@{version}"),
    }
}

fn config_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "lower_third_config",
        key: id.to_string(),
    }
}
