//! Plan completeness: which patients still need a plan for the current month.
//!
//! [`build_plan_index`] queries the [`PlanStore`] once per patient and keeps
//! the newest known plan of each. Everything after that is pure and works on
//! the resulting [`PlanIndex`].

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use careplan_db::models::{CareLevel, CarePlan, Patient, Period, PlanStatus};

use crate::plans::PlanStore;

/// Number of recently updated plans shown on the dashboard.
pub const RECENT_PLAN_LIMIT: usize = 3;

/// Days before month end at which the deadline warning is shown.
pub const DEADLINE_WARNING_DAYS: u32 = 7;

/// Newest known plan of one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanIndexEntry {
    pub plan_id: Uuid,
    pub last_updated: DateTime<Utc>,
    pub period: Period,
    pub status: PlanStatus,
}

impl PlanIndexEntry {
    fn from_plan(plan: &CarePlan) -> Self {
        Self {
            plan_id: plan.id,
            last_updated: plan.updated_at,
            period: plan.period(),
            status: plan.status,
        }
    }
}

/// Patient id to newest known plan. Patients without any plan are absent.
pub type PlanIndex = HashMap<Uuid, PlanIndexEntry>;

/// True when the patient has no plan for `current`.
pub fn needs_monthly_plan(patient_id: Uuid, current: Period, index: &PlanIndex) -> bool {
    index
        .get(&patient_id)
        .is_none_or(|entry| entry.period != current)
}

/// Look up every patient's plan for `current`, falling back to their newest
/// plan of any period. Lookups run concurrently.
pub async fn build_plan_index(store: &PlanStore, patients: &[Patient], current: Period) -> PlanIndex {
    let lookups = patients.iter().map(|patient| async move {
        let entry = match store.find_by_period(patient.id, current).await.value {
            Some(plan) => Some(PlanIndexEntry::from_plan(&plan)),
            None => store
                .list_by_patient(patient.id)
                .await
                .value
                .first()
                .map(PlanIndexEntry::from_plan),
        };
        (patient.id, entry)
    });

    join_all(lookups)
        .await
        .into_iter()
        .filter_map(|(id, entry)| entry.map(|e| (id, e)))
        .collect()
}

/// One row of the "needs plan" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientPlanStatus {
    pub patient_id: Uuid,
    pub name: String,
    pub care_level: CareLevel,
    pub needs_plan: bool,
    /// Period of the newest known plan.
    pub last_plan: Option<Period>,
    pub last_status: Option<PlanStatus>,
}

pub fn plan_statuses(patients: &[Patient], index: &PlanIndex, current: Period) -> Vec<PatientPlanStatus> {
    patients
        .iter()
        .map(|patient| {
            let entry = index.get(&patient.id);
            PatientPlanStatus {
                patient_id: patient.id,
                name: patient.name.clone(),
                care_level: patient.care_level,
                needs_plan: needs_monthly_plan(patient.id, current, index),
                last_plan: entry.map(|e| e.period),
                last_status: entry.map(|e| e.status),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentPlan {
    pub plan_id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub period: Period,
    pub status: PlanStatus,
    pub last_updated: DateTime<Utc>,
}

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub current: Period,
    pub patient_count: usize,
    /// Patients whose plan for the current month is completed.
    pub completed_count: usize,
    pub needing_plan_count: usize,
    pub days_left: u32,
    pub recent_plans: Vec<RecentPlan>,
}

impl DashboardSummary {
    pub fn compute(patients: &[Patient], index: &PlanIndex, today: NaiveDate) -> Self {
        let current = Period::from_date(today);

        let completed_count = patients
            .iter()
            .filter_map(|p| index.get(&p.id))
            .filter(|e| e.period == current && e.status == PlanStatus::Completed)
            .count();
        let needing_plan_count = patients
            .iter()
            .filter(|p| needs_monthly_plan(p.id, current, index))
            .count();

        let mut recent_plans: Vec<RecentPlan> = patients
            .iter()
            .filter_map(|p| {
                index.get(&p.id).map(|e| RecentPlan {
                    plan_id: e.plan_id,
                    patient_id: p.id,
                    patient_name: p.name.clone(),
                    period: e.period,
                    status: e.status,
                    last_updated: e.last_updated,
                })
            })
            .collect();
        recent_plans.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        recent_plans.truncate(RECENT_PLAN_LIMIT);

        Self {
            current,
            patient_count: patients.len(),
            completed_count,
            needing_plan_count,
            days_left: current.days_in_month().saturating_sub(today.day()),
            recent_plans,
        }
    }

    pub fn deadline_near(&self) -> bool {
        self.days_left <= DEADLINE_WARNING_DAYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn march() -> Period {
        Period::new(3, 2025).unwrap()
    }

    fn index_from_fixtures() -> PlanIndex {
        fixtures::care_plans()
            .iter()
            .map(|p| (p.patient_id, PlanIndexEntry::from_plan(p)))
            .collect()
    }

    #[test]
    fn statuses_surface_last_plan_period() {
        let index = index_from_fixtures();
        let statuses = plan_statuses(&fixtures::patients(), &index, march());

        let sato = statuses
            .iter()
            .find(|s| s.patient_id == fixtures::patient_id(3))
            .unwrap();
        assert!(sato.needs_plan);
        assert_eq!(sato.last_plan.map(|p| p.month), Some(2));

        let suzuki = statuses
            .iter()
            .find(|s| s.patient_id == fixtures::patient_id(1))
            .unwrap();
        assert!(!suzuki.needs_plan);
    }

    #[test]
    fn dashboard_counts() {
        let index = index_from_fixtures();
        let today = NaiveDate::from_ymd_opt(2025, 3, 26).unwrap();
        let summary = DashboardSummary::compute(&fixtures::patients(), &index, today);

        assert_eq!(summary.patient_count, 3);
        assert_eq!(summary.completed_count, 2);
        assert_eq!(summary.needing_plan_count, 1);
        assert_eq!(summary.days_left, 5);
        assert!(summary.deadline_near());
        assert_eq!(summary.recent_plans.len(), 3);
        assert_eq!(summary.recent_plans[0].plan_id, fixtures::plan_id(102));
    }

    #[test]
    fn draft_plan_counts_as_present_but_not_completed() {
        let mut index = index_from_fixtures();
        if let Some(entry) = index.get_mut(&fixtures::patient_id(1)) {
            entry.status = PlanStatus::Draft;
        }
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let summary = DashboardSummary::compute(&fixtures::patients(), &index, today);
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.needing_plan_count, 1);
        assert!(!summary.deadline_near());
    }
}
