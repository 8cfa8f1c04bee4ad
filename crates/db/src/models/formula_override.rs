//! Formula override models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use salespulse_core::formula;
use salespulse_core::types::Timestamp;

/// A row from the `formula_overrides` table. The primary key is one of the
/// fixed identifiers in [`formula::FormulaId::ALL`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormulaOverride {
    pub id: String,
    pub name: String,
    pub formula: String,
    pub enabled: bool,
    pub updated_at: Timestamp,
}

/// DTO for saving a formula override (upsert-by-id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertFormulaOverride {
    pub id: String,
    pub name: String,
    pub formula: String,
    pub enabled: bool,
}

impl From<&FormulaOverride> for formula::FormulaOverride {
    fn from(row: &FormulaOverride) -> Self {
        formula::FormulaOverride {
            id: row.id.clone(),
            name: row.name.clone(),
            formula: row.formula.clone(),
            enabled: row.enabled,
        }
    }
}

impl From<formula::FormulaOverride> for UpsertFormulaOverride {
    fn from(value: formula::FormulaOverride) -> Self {
        UpsertFormulaOverride {
            id: value.id,
            name: value.name,
            formula: value.formula,
            enabled: value.enabled,
        }
    }
}
