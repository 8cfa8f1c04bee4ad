//! The metric deriver: merges parsed sales records with configured targets
//! into display-ready rows.
//!
//! Merging is total over the case-insensitive name key: every name present
//! in either input appears exactly once in the output. All divisions are
//! guarded by the `has_chat_data` flag, so no row ever carries a non-finite
//! value, and `orders_to_target` is clamped to be non-negative.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::formula::{Formula, FormulaId, FormulaOverride, Scope};
use crate::report::SalesRecord;
use crate::roster::GuideTarget;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One merged, fully derived row of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub name: String,
    pub orders: i64,
    pub avg_order_size: f64,
    pub total: f64,
    pub new_revenue: f64,
    pub target_revenue: f64,
    /// `target_revenue - new_revenue`; negative means ahead of target.
    pub revenue_deficit: f64,
    pub target_orders: i64,
    /// `target_orders - orders`; negative means ahead of target.
    pub order_deficit: f64,
    pub chat_count: i64,
    /// `chat_count > 0`. Guards every chat-denominated metric below.
    pub has_chat_data: bool,
    /// `orders / chat_count * 100`, or 0 without chat data.
    pub current_conversion: f64,
    pub target_conversion: f64,
    /// Orders still needed to reach the target conversion; never negative,
    /// and exactly 0 without chat data.
    pub orders_to_target: i64,
    /// Net revenue per chat, or 0 without chat data.
    pub nrpc: f64,
    /// Whether a parsed sales record existed for this name.
    pub is_from_file: bool,
}

/// Sign classification for deficit cells: a non-positive deficit means the
/// person is at or ahead of target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficitStatus {
    Ahead,
    OnTarget,
    Behind,
}

/// Classify a deficit value for display.
pub fn deficit_status(value: f64) -> DeficitStatus {
    if value > 0.0 {
        DeficitStatus::Behind
    } else if value < 0.0 {
        DeficitStatus::Ahead
    } else {
        DeficitStatus::OnTarget
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge records and targets into display rows using the built-in
/// arithmetic, ordered by `new_revenue` descending (stable on ties:
/// targets first in configuration order, then unmatched file records in
/// document order).
pub fn merge_rows(records: &[SalesRecord], targets: &[GuideTarget]) -> Vec<DisplayRow> {
    // Last record wins if a report repeats a name.
    let mut by_name: HashMap<String, &SalesRecord> = HashMap::new();
    for record in records {
        by_name.insert(record.name.to_lowercase(), record);
    }

    let mut rows = Vec::with_capacity(targets.len() + records.len());
    let mut processed: HashSet<String> = HashSet::new();

    for target in targets {
        let key = target.name.to_lowercase();
        if !processed.insert(key.clone()) {
            continue;
        }
        let sales = by_name.get(&key).copied();

        let orders = sales.map_or(0, |s| s.orders);
        let new_revenue = sales.map_or(0.0, |s| s.new_revenue);
        let chat_count = target.chat_count;
        let has_chat_data = chat_count > 0;

        let current_conversion = if has_chat_data {
            orders as f64 / chat_count as f64 * 100.0
        } else {
            0.0
        };
        let orders_to_target = if has_chat_data {
            let needed =
                (target.target_conversion / 100.0 * chat_count as f64 - orders as f64).ceil();
            (needed as i64).max(0)
        } else {
            0
        };
        let nrpc = if has_chat_data {
            new_revenue / chat_count as f64
        } else {
            0.0
        };

        rows.push(DisplayRow {
            name: target.name.clone(),
            orders,
            avg_order_size: sales.map_or(0.0, |s| s.avg_order_size),
            total: sales.map_or(0.0, |s| s.total),
            new_revenue,
            target_revenue: target.target_revenue,
            revenue_deficit: target.target_revenue - new_revenue,
            target_orders: target.target_orders,
            order_deficit: target.target_orders as f64 - orders as f64,
            chat_count,
            has_chat_data,
            current_conversion,
            target_conversion: target.target_conversion,
            orders_to_target,
            nrpc,
            is_from_file: sales.is_some(),
        });
    }

    // File records with no configured target.
    for record in records {
        let key = record.name.to_lowercase();
        if !processed.insert(key) {
            continue;
        }
        rows.push(DisplayRow {
            name: record.name.clone(),
            orders: record.orders,
            avg_order_size: record.avg_order_size,
            total: record.total,
            new_revenue: record.new_revenue,
            target_revenue: 0.0,
            revenue_deficit: -record.new_revenue,
            target_orders: 0,
            order_deficit: -(record.orders as f64),
            chat_count: 0,
            has_chat_data: false,
            current_conversion: 0.0,
            target_conversion: 0.0,
            orders_to_target: 0,
            nrpc: 0.0,
            is_from_file: true,
        });
    }

    rows.sort_by(|a, b| {
        b.new_revenue
            .partial_cmp(&a.new_revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

/// Merge as [`merge_rows`], then re-derive metrics whose overrides are
/// enabled and compile.
///
/// An override that is disabled or fails to compile or evaluate leaves the
/// built-in value in place. The chat-data guard and the non-negative clamp
/// on `orders_to_target` are enforced outside the formula, so no override
/// can produce a division by zero or a negative orders-to-target.
pub fn merge_rows_with_formulas(
    records: &[SalesRecord],
    targets: &[GuideTarget],
    overrides: &[FormulaOverride],
) -> Vec<DisplayRow> {
    let mut rows = merge_rows(records, targets);

    let compiled: Vec<(FormulaId, Formula)> = overrides
        .iter()
        .filter(|o| o.enabled)
        .filter_map(|o| {
            let id = FormulaId::from_str(&o.id)?;
            let formula = Formula::compile(&o.formula).ok()?;
            Some((id, formula))
        })
        .collect();
    if compiled.is_empty() {
        return rows;
    }

    for row in &mut rows {
        let scope = Scope {
            orders: row.orders as f64,
            new_revenue: row.new_revenue,
            target_orders: row.target_orders as f64,
            target_revenue: row.target_revenue,
            chat_count: row.chat_count as f64,
            target_conversion: row.target_conversion,
        };

        for (id, formula) in &compiled {
            match id {
                FormulaId::RevenueDeficit => {
                    if let Ok(value) = formula.eval(&scope) {
                        row.revenue_deficit = value;
                    }
                }
                FormulaId::OrderDeficit => {
                    if let Ok(value) = formula.eval(&scope) {
                        row.order_deficit = value;
                    }
                }
                FormulaId::CurrentConversion => {
                    if row.has_chat_data {
                        if let Ok(value) = formula.eval(&scope) {
                            row.current_conversion = value;
                        }
                    }
                }
                FormulaId::OrdersToTarget => {
                    if row.has_chat_data {
                        if let Ok(value) = formula.eval(&scope) {
                            row.orders_to_target = (value.ceil() as i64).max(0);
                        }
                    }
                }
            }
        }
    }

    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
