//! Guide target models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use salespulse_core::roster;
use salespulse_core::types::{DbId, Timestamp};

/// A row from the `guide_targets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GuideTarget {
    pub id: DbId,
    /// Case-insensitively unique join key.
    pub name: String,
    pub target_orders: i64,
    pub target_revenue: f64,
    pub target_conversion: f64,
    pub chat_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating or updating a target. Targets are keyed by name, so
/// one DTO serves both inserts and updates (upsert-by-name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertGuideTarget {
    pub name: String,
    pub target_orders: i64,
    pub target_revenue: f64,
    pub target_conversion: f64,
    pub chat_count: i64,
}

impl From<&GuideTarget> for roster::GuideTarget {
    fn from(row: &GuideTarget) -> Self {
        roster::GuideTarget {
            name: row.name.clone(),
            target_orders: row.target_orders,
            target_revenue: row.target_revenue,
            target_conversion: row.target_conversion,
            chat_count: row.chat_count,
        }
    }
}

impl From<&UpsertGuideTarget> for roster::GuideTarget {
    fn from(input: &UpsertGuideTarget) -> Self {
        roster::GuideTarget {
            name: input.name.clone(),
            target_orders: input.target_orders,
            target_revenue: input.target_revenue,
            target_conversion: input.target_conversion,
            chat_count: input.chat_count,
        }
    }
}
