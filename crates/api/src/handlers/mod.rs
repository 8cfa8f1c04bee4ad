//! HTTP handlers, one module per resource.

pub mod auth;
pub mod formulas;
pub mod reports;
pub mod targets;
