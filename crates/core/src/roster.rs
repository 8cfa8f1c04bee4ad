//! Roster target types and validation.
//!
//! A guide target is the operator-configured goal set for one tracked
//! person. Names are the join key against uploaded report records and are
//! compared case-insensitively.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length of a guide name in characters.
pub const MAX_GUIDE_NAME_LENGTH: usize = 200;

/// Goal values for one tracked person, as consumed by the metric deriver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideTarget {
    /// Case-insensitively unique join key, usually "Last, First".
    pub name: String,
    pub target_orders: i64,
    pub target_revenue: f64,
    /// Percentage; nominally 0-100 but deliberately unconstrained.
    pub target_conversion: f64,
    /// Contact volume used as the conversion denominator.
    pub chat_count: i64,
}

/// Validate a guide name: non-empty after trimming, within length limits.
pub fn validate_guide_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Guide name cannot be empty".to_string()));
    }
    if name.len() > MAX_GUIDE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Guide name exceeds maximum length of {MAX_GUIDE_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate one target record's name and numeric fields.
pub fn validate_target(target: &GuideTarget) -> Result<(), CoreError> {
    validate_guide_name(&target.name)?;

    if target.target_orders < 0 {
        return Err(CoreError::Validation(format!(
            "Target orders for '{}' cannot be negative",
            target.name
        )));
    }
    if !target.target_revenue.is_finite() || target.target_revenue < 0.0 {
        return Err(CoreError::Validation(format!(
            "Target revenue for '{}' must be a non-negative number",
            target.name
        )));
    }
    if !target.target_conversion.is_finite() {
        return Err(CoreError::Validation(format!(
            "Target conversion for '{}' must be a number",
            target.name
        )));
    }
    if target.chat_count < 0 {
        return Err(CoreError::Validation(format!(
            "Chat count for '{}' cannot be negative",
            target.name
        )));
    }
    Ok(())
}

/// Find the first name that appears more than once (case-insensitively).
pub fn find_duplicate_name(targets: &[GuideTarget]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    targets
        .iter()
        .find(|t| !seen.insert(t.name.to_lowercase()))
        .map(|t| t.name.as_str())
}
