//! Route definitions for the roster.
//!
//! ```text
//! GET /     list_targets
//! PUT /     save_targets (admin)
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::targets;
use crate::state::AppState;

/// Target routes — mounted at `/targets`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(targets::list_targets).put(targets::save_targets))
}
