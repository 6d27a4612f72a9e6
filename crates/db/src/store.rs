//! [`LowerThirdStore`] backed by PostgreSQL.

use async_trait::async_trait;
use lowerthird_core::error::CoreError;
use lowerthird_core::store::{
    ConfigChanges, ConfigRecord, LowerThirdStore, NewConfig, NewTemplate, TemplateRecord,
};
use lowerthird_core::types::DbId;

use crate::repositories::{LowerThirdConfigRepo, LowerThirdTemplateRepo};
use crate::DbPool;

#[derive(Debug, Clone)]
pub struct PgLowerThirdStore {
    pool: DbPool,
}

impl PgLowerThirdStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn internal(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Lower-third storage failure");
    CoreError::Internal(format!("Database error: {err}"))
}

#[async_trait]
impl LowerThirdStore for PgLowerThirdStore {
    async fn list_templates(&self, include_archived: bool) -> Result<Vec<TemplateRecord>, CoreError> {
        let rows = LowerThirdTemplateRepo::list(&self.pool, include_archived)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(TemplateRecord::from).collect())
    }

    async fn get_template(&self, key: &str, version: i32) -> Result<Option<TemplateRecord>, CoreError> {
        let row = LowerThirdTemplateRepo::find_by_key_version(&self.pool, key, version)
            .await
            .map_err(internal)?;
        Ok(row.map(TemplateRecord::from))
    }

    async fn latest_template_version(&self, key: &str) -> Result<Option<i32>, CoreError> {
        LowerThirdTemplateRepo::latest_version(&self.pool, key)
            .await
            .map_err(internal)
    }

    async fn insert_template(&self, input: &NewTemplate) -> Result<TemplateRecord, CoreError> {
        let row = LowerThirdTemplateRepo::create(&self.pool, input)
            .await
            .map_err(internal)?;
        Ok(row.into())
    }

    async fn archive_template(&self, key: &str, version: i32) -> Result<bool, CoreError> {
        LowerThirdTemplateRepo::archive(&self.pool, key, version)
            .await
            .map_err(internal)
    }

    async fn list_configs(
        &self,
        owner_user_id: DbId,
        include_archived: bool,
        limit: i64,
    ) -> Result<Vec<ConfigRecord>, CoreError> {
        let rows = LowerThirdConfigRepo::list_for_owner(&self.pool, owner_user_id, include_archived, limit)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(ConfigRecord::from).collect())
    }

    async fn get_config(&self, id: DbId) -> Result<Option<ConfigRecord>, CoreError> {
        let row = LowerThirdConfigRepo::find_by_id(&self.pool, id)
            .await
            .map_err(internal)?;
        Ok(row.map(ConfigRecord::from))
    }

    async fn create_config(&self, input: &NewConfig) -> Result<ConfigRecord, CoreError> {
        let row = LowerThirdConfigRepo::create(&self.pool, input)
            .await
            .map_err(internal)?;
        Ok(row.into())
    }

    async fn update_config(
        &self,
        id: DbId,
        changes: &ConfigChanges,
    ) -> Result<Option<ConfigRecord>, CoreError> {
        let row = LowerThirdConfigRepo::update(&self.pool, id, changes)
            .await
            .map_err(internal)?;
        Ok(row.map(ConfigRecord::from))
    }

    async fn archive_config(&self, id: DbId) -> Result<bool, CoreError> {
        LowerThirdConfigRepo::archive(&self.pool, id)
            .await
            .map_err(internal)
    }
}
