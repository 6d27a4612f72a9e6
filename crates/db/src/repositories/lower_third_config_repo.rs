//! Repository for the `lower_third_configurations` table.

use lowerthird_core::store::{ConfigChanges, NewConfig};
use lowerthird_core::types::DbId;
use sqlx::PgPool;

use crate::models::lower_third::LowerThirdConfigRow;

const COLUMNS: &str = "id, owner_user_id, name, template_key, template_version, \
     params_json, timing_rule, timing_seconds, created_at, updated_at, archived_at";

/// Provides CRUD operations for user-owned lower-third configs.
pub struct LowerThirdConfigRepo;

impl LowerThirdConfigRepo {
    /// Insert a new config, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &NewConfig,
    ) -> Result<LowerThirdConfigRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO lower_third_configurations \
                (owner_user_id, name, template_key, template_version, params_json, \
                 timing_rule, timing_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LowerThirdConfigRow>(&query)
            .bind(input.owner_user_id)
            .bind(&input.name)
            .bind(&input.template_key)
            .bind(input.template_version)
            .bind(&input.params_json)
            .bind(input.timing_rule.as_str())
            .bind(input.timing_seconds)
            .fetch_one(pool)
            .await
    }

    /// Find a config by ID, archived or not.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<LowerThirdConfigRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lower_third_configurations WHERE id = $1");
        sqlx::query_as::<_, LowerThirdConfigRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's configs, most recently updated first.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_user_id: DbId,
        include_archived: bool,
        limit: i64,
    ) -> Result<Vec<LowerThirdConfigRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM lower_third_configurations \
             WHERE owner_user_id = $1 AND ($2 OR archived_at IS NULL) \
             ORDER BY updated_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, LowerThirdConfigRow>(&query)
            .bind(owner_user_id)
            .bind(include_archived)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Replace the mutable columns. Returns `None` if the row does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        changes: &ConfigChanges,
    ) -> Result<Option<LowerThirdConfigRow>, sqlx::Error> {
        let query = format!(
            "UPDATE lower_third_configurations SET \
                name = $2, \
                params_json = $3, \
                timing_rule = $4, \
                timing_seconds = $5, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LowerThirdConfigRow>(&query)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.params_json)
            .bind(changes.timing_rule.as_str())
            .bind(changes.timing_seconds)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete. Keeps the first archive timestamp on repeated calls.
    pub async fn archive(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lower_third_configurations \
             SET archived_at = COALESCE(archived_at, NOW()), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
