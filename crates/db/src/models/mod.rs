//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` DTO for writes

pub mod formula_override;
pub mod guide_target;
pub mod session;
pub mod user;
