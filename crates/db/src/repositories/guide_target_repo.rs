//! Repository for the `guide_targets` table.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::models::guide_target::{GuideTarget, UpsertGuideTarget};

const COLUMNS: &str = "id, name, target_orders, target_revenue, target_conversion, chat_count, \
     created_at, updated_at";

/// Provides CRUD operations for guide targets, keyed by name
/// (case-insensitive).
pub struct GuideTargetRepo;

impl GuideTargetRepo {
    /// List all targets ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<GuideTarget>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM guide_targets ORDER BY name ASC");
        sqlx::query_as::<_, GuideTarget>(&query).fetch_all(pool).await
    }

    /// Find one target by name, case-insensitively.
    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<GuideTarget>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM guide_targets WHERE LOWER(name) = LOWER($1)");
        sqlx::query_as::<_, GuideTarget>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Insert or update a target by its lowered name. The stored spelling
    /// follows the most recent save.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertGuideTarget,
    ) -> Result<GuideTarget, sqlx::Error> {
        let query = format!(
            "INSERT INTO guide_targets \
                (name, target_orders, target_revenue, target_conversion, chat_count) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (LOWER(name)) DO UPDATE SET \
                name = EXCLUDED.name, \
                target_orders = EXCLUDED.target_orders, \
                target_revenue = EXCLUDED.target_revenue, \
                target_conversion = EXCLUDED.target_conversion, \
                chat_count = EXCLUDED.chat_count, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GuideTarget>(&query)
            .bind(&input.name)
            .bind(input.target_orders)
            .bind(input.target_revenue)
            .bind(input.target_conversion)
            .bind(input.chat_count)
            .fetch_one(pool)
            .await
    }

    /// Delete a target by name, case-insensitively. Returns `true` if a
    /// row was removed.
    pub async fn delete_by_name(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM guide_targets WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List just the stored names.
    pub async fn list_names(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM guide_targets ORDER BY name")
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Replace the stored roster with `targets`: delete every persisted row
    /// whose lowered name is absent from the new list, then upsert each
    /// record in order.
    ///
    /// Deletes and upserts run sequentially and are NOT wrapped in a
    /// transaction: a failure partway through aborts the remaining
    /// iterations without undoing completed ones. Callers must treat an
    /// error as "partially applied, state unknown" and re-fetch.
    pub async fn save_all(
        pool: &PgPool,
        targets: &[UpsertGuideTarget],
    ) -> Result<Vec<GuideTarget>, sqlx::Error> {
        let keep: HashSet<String> = targets.iter().map(|t| t.name.to_lowercase()).collect();

        for name in Self::list_names(pool).await? {
            if !keep.contains(&name.to_lowercase()) {
                Self::delete_by_name(pool, &name).await?;
            }
        }

        let mut saved = Vec::with_capacity(targets.len());
        for target in targets {
            saved.push(Self::upsert(pool, target).await?);
        }
        Ok(saved)
    }
}
