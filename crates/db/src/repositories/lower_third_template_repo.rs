//! Repository for the `lower_third_templates` table.

use lowerthird_core::store::NewTemplate;
use sqlx::PgPool;

use crate::models::lower_third::LowerThirdTemplateRow;

const COLUMNS: &str = "id, template_key, version, label, category, svg_markup, \
     descriptor_json, created_at, archived_at";

/// Template versions are insert-only; the only update is archiving.
pub struct LowerThirdTemplateRepo;

impl LowerThirdTemplateRepo {
    /// List templates ordered by key, newest version first.
    pub async fn list(
        pool: &PgPool,
        include_archived: bool,
    ) -> Result<Vec<LowerThirdTemplateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM lower_third_templates \
             WHERE ($1 OR archived_at IS NULL) \
             ORDER BY template_key ASC, version DESC"
        );
        sqlx::query_as::<_, LowerThirdTemplateRow>(&query)
            .bind(include_archived)
            .fetch_all(pool)
            .await
    }

    /// Find one version, archived or not.
    pub async fn find_by_key_version(
        pool: &PgPool,
        template_key: &str,
        version: i32,
    ) -> Result<Option<LowerThirdTemplateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM lower_third_templates \
             WHERE template_key = $1 AND version = $2"
        );
        sqlx::query_as::<_, LowerThirdTemplateRow>(&query)
            .bind(template_key)
            .bind(version)
            .fetch_optional(pool)
            .await
    }

    /// Highest version minted for `template_key`, archived versions included.
    pub async fn latest_version(
        pool: &PgPool,
        template_key: &str,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(version) FROM lower_third_templates WHERE template_key = $1",
        )
        .bind(template_key)
        .fetch_one(pool)
        .await
    }

    /// Insert a new version, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &NewTemplate,
    ) -> Result<LowerThirdTemplateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO lower_third_templates \
                (template_key, version, label, category, svg_markup, descriptor_json) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LowerThirdTemplateRow>(&query)
            .bind(&input.template_key)
            .bind(input.version)
            .bind(&input.label)
            .bind(&input.category)
            .bind(&input.svg_markup)
            .bind(&input.descriptor_json)
            .fetch_one(pool)
            .await
    }

    /// Set `archived_at` if not already set. Returns `false` if no such row.
    pub async fn archive(
        pool: &PgPool,
        template_key: &str,
        version: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lower_third_templates \
             SET archived_at = COALESCE(archived_at, NOW()) \
             WHERE template_key = $1 AND version = $2",
        )
        .bind(template_key)
        .bind(version)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
