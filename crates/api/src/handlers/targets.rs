//! Handlers for the `/targets` resource (the tracked-people roster).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use salespulse_core::error::CoreError;
use salespulse_core::roster;
use salespulse_db::models::guide_target::UpsertGuideTarget;
use salespulse_db::repositories::GuideTargetRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /targets
// ---------------------------------------------------------------------------

/// List the configured roster, ordered by name.
pub async fn list_targets(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let items = GuideTargetRepo::list(&state.pool).await?;
    tracing::debug!(count = items.len(), "Listed guide targets");
    Ok(Json(DataResponse { data: items }))
}

// ---------------------------------------------------------------------------
// PUT /targets
// ---------------------------------------------------------------------------

/// Replace the stored roster with the submitted list.
///
/// Full-replace-by-diff semantics: stored names absent from the list are
/// deleted, every submitted record is upserted by name. Writes are
/// sequential and non-transactional; on failure the caller re-fetches.
pub async fn save_targets(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<Vec<UpsertGuideTarget>>,
) -> AppResult<impl IntoResponse> {
    let domain: Vec<roster::GuideTarget> = input.iter().map(Into::into).collect();
    for target in &domain {
        roster::validate_target(target)?;
    }
    if let Some(dup) = roster::find_duplicate_name(&domain) {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Duplicate guide name '{dup}' in save batch"
        ))));
    }

    let saved = GuideTargetRepo::save_all(&state.pool, &input).await?;
    tracing::info!(
        count = saved.len(),
        user_id = admin.user_id,
        "Guide targets saved"
    );
    Ok(Json(DataResponse { data: saved }))
}
