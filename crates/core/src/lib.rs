//! Pure domain logic for the SalesPulse dashboard backend.
//!
//! This crate has no database, async, or I/O dependencies. It provides:
//!
//! - The archived-HTML report parser ([`report`])
//! - The metric deriver that merges parsed records with targets ([`metrics`])
//! - Formula overrides and their expression evaluator ([`formula`])
//! - Roster target types and validation ([`roster`])
//!
//! The `db` and `api` crates layer persistence and HTTP on top.

pub mod error;
pub mod formula;
pub mod metrics;
pub mod report;
pub mod roster;
pub mod types;
