//! Handlers for report upload/parse and the merged dashboard view.
//!
//! Parsing is stateless: records live only inside the request that
//! uploaded them. Each upload replaces nothing server-side; the merged
//! rows are computed on the fly from the parsed records plus the stored
//! targets and formula overrides.

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use salespulse_core::formula::FormulaOverride;
use salespulse_core::metrics::{self, DisplayRow};
use salespulse_core::report::{self, ReportSummary, SalesRecord};
use salespulse_core::roster::GuideTarget;
use salespulse_db::repositories::{FormulaOverrideRepo, GuideTargetRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Upload size cap for report files. Archived reports are normally well
/// under a megabyte; anything near this limit is not a sales report.
pub const MAX_REPORT_BYTES: usize = 25 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// The parsed-and-merged view returned by `POST /reports/parse`.
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub summary: ReportSummary,
    pub date_range: String,
    pub supervisor: String,
    /// Number of configured roster entries.
    pub team_size: usize,
    /// Number of per-person records recovered from the uploaded file.
    pub records_found: usize,
    pub rows: Vec<DisplayRow>,
}

// ---------------------------------------------------------------------------
// POST /reports/parse
// ---------------------------------------------------------------------------

/// Parse an uploaded `.mhtml`/`.mht` report and merge it with the stored
/// roster.
pub async fn parse_report(
    _auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let (filename, data) = read_report_file(&mut multipart).await?;

    if !report::has_report_extension(&filename) {
        return Err(AppError::BadRequest(
            "Report must be a .mhtml or .mht file".to_string(),
        ));
    }

    let content = String::from_utf8_lossy(&data);
    let parsed = report::parse_report(&content)?;
    tracing::info!(
        file = %filename,
        records = parsed.records.len(),
        strategy = parsed.strategy.unwrap_or("none"),
        "Report parsed"
    );

    let (rows, team_size) = merged_rows(&state, &parsed.records).await?;

    Ok(Json(DataResponse {
        data: ReportView {
            summary: parsed.summary,
            date_range: parsed.date_range,
            supervisor: parsed.supervisor,
            team_size,
            records_found: parsed.records.len(),
            rows,
        },
    }))
}

// ---------------------------------------------------------------------------
// GET /dashboard
// ---------------------------------------------------------------------------

/// The merged table computed from the stored roster alone, for rendering
/// before any file has been uploaded.
pub async fn dashboard(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let (rows, _) = merged_rows(&state, &[]).await?;
    Ok(Json(DataResponse { data: rows }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull the first file field out of the multipart body.
async fn read_report_file(
    multipart: &mut Multipart,
) -> AppResult<(String, axum::body::Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok((filename, data));
    }
    Err(AppError::BadRequest(
        "No report file in multipart upload".to_string(),
    ))
}

/// Load targets and formula overrides, then merge with the given records.
/// Returns the sorted rows plus the roster size.
async fn merged_rows(
    state: &AppState,
    records: &[SalesRecord],
) -> AppResult<(Vec<DisplayRow>, usize)> {
    let target_rows = GuideTargetRepo::list(&state.pool).await?;
    let formula_rows = FormulaOverrideRepo::list(&state.pool).await?;

    let targets: Vec<GuideTarget> = target_rows.iter().map(Into::into).collect();
    let overrides: Vec<FormulaOverride> = formula_rows.iter().map(Into::into).collect();

    let rows = metrics::merge_rows_with_formulas(records, &targets, &overrides);
    Ok((rows, targets.len()))
}
