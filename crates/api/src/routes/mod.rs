pub mod auth;
pub mod formulas;
pub mod health;
pub mod reports;
pub mod targets;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                 login (public)
/// /auth/refresh               refresh (public)
/// /auth/logout                logout (requires auth)
///
/// /targets                    GET list, PUT replace-by-diff save (admin)
///
/// /formulas                   GET list, PUT upsert by id (admin)
/// /formulas/reset             POST restore seeded defaults (admin)
///
/// /reports/parse              POST multipart report upload -> parsed + merged view
///
/// /dashboard                  GET merged rows from the stored roster alone
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/targets", targets::router())
        .nest("/formulas", formulas::router())
        .nest("/reports", reports::router())
        .route("/dashboard", get(handlers::reports::dashboard))
}
