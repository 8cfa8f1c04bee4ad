//! Repository for the `formula_overrides` table.

use sqlx::PgPool;

use salespulse_core::formula::default_formulas;

use crate::models::formula_override::{FormulaOverride, UpsertFormulaOverride};

const COLUMNS: &str = "id, name, formula, enabled, updated_at";

/// Provides read/write operations for formula overrides, keyed by their
/// fixed enumerated id.
pub struct FormulaOverrideRepo;

impl FormulaOverrideRepo {
    /// List all overrides ordered by display name.
    pub async fn list(pool: &PgPool) -> Result<Vec<FormulaOverride>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM formula_overrides ORDER BY name ASC");
        sqlx::query_as::<_, FormulaOverride>(&query).fetch_all(pool).await
    }

    /// Insert or update an override by id.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertFormulaOverride,
    ) -> Result<FormulaOverride, sqlx::Error> {
        let query = format!(
            "INSERT INTO formula_overrides (id, name, formula, enabled) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
                name = EXCLUDED.name, \
                formula = EXCLUDED.formula, \
                enabled = EXCLUDED.enabled, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FormulaOverride>(&query)
            .bind(&input.id)
            .bind(&input.name)
            .bind(&input.formula)
            .bind(input.enabled)
            .fetch_one(pool)
            .await
    }

    /// Upsert each override in order.
    ///
    /// Sequential and non-transactional: a failure partway through leaves
    /// earlier upserts applied. Callers re-fetch to resynchronize.
    pub async fn save_all(
        pool: &PgPool,
        overrides: &[UpsertFormulaOverride],
    ) -> Result<Vec<FormulaOverride>, sqlx::Error> {
        let mut saved = Vec::with_capacity(overrides.len());
        for item in overrides {
            saved.push(Self::upsert(pool, item).await?);
        }
        Ok(saved)
    }

    /// Overwrite all four overrides with the seeded defaults.
    pub async fn reset(pool: &PgPool) -> Result<Vec<FormulaOverride>, sqlx::Error> {
        let defaults: Vec<UpsertFormulaOverride> =
            default_formulas().into_iter().map(Into::into).collect();
        Self::save_all(pool, &defaults).await
    }
}
