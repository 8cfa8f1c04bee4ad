//! Integration tests for the guide-target and formula-override stores.

use sqlx::PgPool;

use salespulse_core::formula::FormulaId;
use salespulse_db::models::formula_override::UpsertFormulaOverride;
use salespulse_db::models::guide_target::UpsertGuideTarget;
use salespulse_db::repositories::{FormulaOverrideRepo, GuideTargetRepo};

fn target(name: &str, orders: i64) -> UpsertGuideTarget {
    UpsertGuideTarget {
        name: name.to_string(),
        target_orders: orders,
        target_revenue: 1000.0,
        target_conversion: 20.0,
        chat_count: 50,
    }
}

// ---------------------------------------------------------------------------
// Guide targets
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn upsert_is_keyed_case_insensitively(pool: PgPool) {
    GuideTargetRepo::upsert(&pool, &target("Doe, John", 10))
        .await
        .unwrap();
    let updated = GuideTargetRepo::upsert(&pool, &target("DOE, JOHN", 25))
        .await
        .unwrap();

    // Still one row, spelling follows the latest save.
    let all = GuideTargetRepo::list(&pool).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "DOE, JOHN");
    assert_eq!(all[0].target_orders, 25);
    assert_eq!(all[0].id, updated.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_by_name_ignores_case(pool: PgPool) {
    GuideTargetRepo::upsert(&pool, &target("Doe, John", 10))
        .await
        .unwrap();

    let found = GuideTargetRepo::find_by_name(&pool, "doe, john")
        .await
        .unwrap();
    assert!(found.is_some());
    assert_eq!(found.unwrap().target_orders, 10);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn save_all_deletes_absent_names(pool: PgPool) {
    GuideTargetRepo::save_all(&pool, &[target("Doe, John", 10), target("Roe, Jane", 5)])
        .await
        .unwrap();

    // Re-save without Roe: she must be removed.
    GuideTargetRepo::save_all(&pool, &[target("Doe, John", 12)])
        .await
        .unwrap();

    let all = GuideTargetRepo::list(&pool).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Doe, John");
    assert_eq!(all[0].target_orders, 12);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn save_all_of_fetched_state_is_idempotent(pool: PgPool) {
    GuideTargetRepo::save_all(&pool, &[target("Doe, John", 10), target("Roe, Jane", 5)])
        .await
        .unwrap();

    let before = GuideTargetRepo::list(&pool).await.unwrap();
    let echo: Vec<UpsertGuideTarget> = before
        .iter()
        .map(|row| UpsertGuideTarget {
            name: row.name.clone(),
            target_orders: row.target_orders,
            target_revenue: row.target_revenue,
            target_conversion: row.target_conversion,
            chat_count: row.chat_count,
        })
        .collect();

    GuideTargetRepo::save_all(&pool, &echo).await.unwrap();
    let after = GuideTargetRepo::list(&pool).await.unwrap();

    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, b.name);
        assert_eq!(a.target_orders, b.target_orders);
        assert_eq!(a.target_revenue, b.target_revenue);
        assert_eq!(a.target_conversion, b.target_conversion);
        assert_eq!(a.chat_count, b.chat_count);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn save_all_with_empty_list_clears_roster(pool: PgPool) {
    GuideTargetRepo::save_all(&pool, &[target("Doe, John", 10)])
        .await
        .unwrap();
    GuideTargetRepo::save_all(&pool, &[]).await.unwrap();

    assert!(GuideTargetRepo::list(&pool).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Formula overrides
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn formula_defaults_are_seeded(pool: PgPool) {
    let all = FormulaOverrideRepo::list(&pool).await.unwrap();

    assert_eq!(all.len(), FormulaId::ALL.len());
    for row in &all {
        assert!(FormulaId::from_str(&row.id).is_some(), "unknown id {}", row.id);
        assert!(row.enabled);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reset_restores_seeded_formula_text(pool: PgPool) {
    FormulaOverrideRepo::upsert(
        &pool,
        &UpsertFormulaOverride {
            id: "revenue_deficit".to_string(),
            name: "Revenue Deficit".to_string(),
            formula: "targetRevenue - newRevenue - 100".to_string(),
            enabled: false,
        },
    )
    .await
    .unwrap();

    FormulaOverrideRepo::reset(&pool).await.unwrap();

    let all = FormulaOverrideRepo::list(&pool).await.unwrap();
    let deficit = all.iter().find(|f| f.id == "revenue_deficit").unwrap();
    assert_eq!(deficit.formula, "targetRevenue - newRevenue");
    assert!(deficit.enabled);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_formula_id_rejected_by_schema(pool: PgPool) {
    let result = FormulaOverrideRepo::upsert(
        &pool,
        &UpsertFormulaOverride {
            id: "nrpc".to_string(),
            name: "NRPC".to_string(),
            formula: "newRevenue / chatCount".to_string(),
            enabled: true,
        },
    )
    .await;

    assert!(result.is_err(), "check constraint must reject unknown ids");
}
