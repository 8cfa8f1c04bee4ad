//! Handlers for the `/formulas` resource (derived-metric overrides).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use salespulse_core::formula::{validate_formula, validate_formula_id};
use salespulse_db::models::formula_override::UpsertFormulaOverride;
use salespulse_db::repositories::FormulaOverrideRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /formulas
// ---------------------------------------------------------------------------

/// List the stored formula overrides.
pub async fn list_formulas(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let items = FormulaOverrideRepo::list(&state.pool).await?;
    tracing::debug!(count = items.len(), "Listed formula overrides");
    Ok(Json(DataResponse { data: items }))
}

// ---------------------------------------------------------------------------
// PUT /formulas
// ---------------------------------------------------------------------------

/// Upsert the submitted overrides by id.
///
/// Expressions must compile against the fixed variable set before anything
/// is written; a malformed formula rejects the whole batch up front.
pub async fn save_formulas(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<Vec<UpsertFormulaOverride>>,
) -> AppResult<impl IntoResponse> {
    for item in &input {
        validate_formula_id(&item.id)?;
        validate_formula(&item.formula)?;
    }

    let saved = FormulaOverrideRepo::save_all(&state.pool, &input).await?;
    tracing::info!(
        count = saved.len(),
        user_id = admin.user_id,
        "Formula overrides saved"
    );
    Ok(Json(DataResponse { data: saved }))
}

// ---------------------------------------------------------------------------
// POST /formulas/reset
// ---------------------------------------------------------------------------

/// Restore the four seeded default formulas.
pub async fn reset_formulas(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let restored = FormulaOverrideRepo::reset(&state.pool).await?;
    tracing::info!(user_id = admin.user_id, "Formula overrides reset to defaults");
    Ok(Json(DataResponse { data: restored }))
}
