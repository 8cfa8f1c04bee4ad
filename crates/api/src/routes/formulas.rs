//! Route definitions for formula overrides.
//!
//! ```text
//! GET  /         list_formulas
//! PUT  /         save_formulas (admin)
//! POST /reset    reset_formulas (admin)
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::formulas;
use crate::state::AppState;

/// Formula routes — mounted at `/formulas`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(formulas::list_formulas).put(formulas::save_formulas),
        )
        .route("/reset", post(formulas::reset_formulas))
}
