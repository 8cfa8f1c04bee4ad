//! Route definitions for report uploads.
//!
//! ```text
//! POST /parse    parse_report (multipart)
//! ```

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::reports;
use crate::state::AppState;

/// Report routes — mounted at `/reports`. Carries its own body-size limit
/// since report archives exceed the default multipart cap.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parse", post(reports::parse_report))
        .layer(DefaultBodyLimit::max(reports::MAX_REPORT_BYTES))
}
