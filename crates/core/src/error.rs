//! Domain-level error type shared across crates.

/// Errors produced by domain logic and surfaced through the API layer.
///
/// The API crate maps each variant to an HTTP status code; keep variants
/// coarse and human-readable.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation conflicts with existing state (e.g. duplicate names).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or invalid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not permitted.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}
