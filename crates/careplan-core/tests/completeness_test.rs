//! Plan completeness over the in-memory store.
//!
//! The seeded demo data has 鈴木 and 田中 with March 2025 plans and 佐藤
//! with only a February 2025 plan.

use std::sync::Arc;

use chrono::NaiveDate;

use careplan_core::completeness::{
    DashboardSummary, build_plan_index, needs_monthly_plan, plan_statuses,
};
use careplan_core::fixtures;
use careplan_core::plans::PlanStore;
use careplan_core::store::MemoryStore;
use careplan_db::models::Period;

fn march() -> Period {
    Period::new(3, 2025).unwrap()
}

#[tokio::test]
async fn patient_without_plans_needs_one() {
    let store = PlanStore::new(Arc::new(MemoryStore::with_rows(fixtures::patients(), vec![])));
    let patients = fixtures::patients();
    let index = build_plan_index(&store, &patients, march()).await;

    assert!(index.is_empty());
    for patient in &patients {
        assert!(needs_monthly_plan(patient.id, march(), &index));
    }
}

#[tokio::test]
async fn plan_for_current_month_satisfies_patient() {
    let store = PlanStore::new(Arc::new(MemoryStore::seeded()));
    let patients = fixtures::patients();
    let index = build_plan_index(&store, &patients, march()).await;

    assert!(!needs_monthly_plan(fixtures::patient_id(1), march(), &index));
    assert!(!needs_monthly_plan(fixtures::patient_id(2), march(), &index));
}

#[tokio::test]
async fn only_past_plan_still_needs_one_and_surfaces_last_month() {
    let store = PlanStore::new(Arc::new(MemoryStore::seeded()));
    let patients = fixtures::patients();
    let index = build_plan_index(&store, &patients, march()).await;

    let sato = fixtures::patient_id(3);
    assert!(needs_monthly_plan(sato, march(), &index));

    let statuses = plan_statuses(&patients, &index, march());
    let row = statuses.iter().find(|s| s.patient_id == sato).unwrap();
    assert!(row.needs_plan);
    assert_eq!(row.last_plan.map(|p| p.month), Some(2));
}

#[tokio::test]
async fn dashboard_counts_seeded_data() {
    let store = PlanStore::new(Arc::new(MemoryStore::seeded()));
    let patients = fixtures::patients();
    let today = NaiveDate::from_ymd_opt(2025, 3, 27).unwrap();
    let index = build_plan_index(&store, &patients, Period::from_date(today)).await;

    let summary = DashboardSummary::compute(&patients, &index, today);
    assert_eq!(summary.patient_count, 3);
    assert_eq!(summary.completed_count, 2);
    assert_eq!(summary.needing_plan_count, 1);
    assert_eq!(summary.days_left, 4);
    assert!(summary.deadline_near());
    assert_eq!(summary.recent_plans.len(), 3);
    assert_eq!(summary.recent_plans[0].patient_id, fixtures::patient_id(2));
}
