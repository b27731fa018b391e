//! Plan Store: monthly care plan documents per patient.
//!
//! Wraps a [`CarePlanRepository`]. Every operation returns a value even when
//! the backend fails: the error is logged and fixture data (or, for
//! [`PlanStore::create`], the locally built record) is returned tagged
//! [`Source::Fallback`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

use careplan_db::models::{CarePlan, CarePlanUpdate, NewCarePlan, Period};

use crate::fixtures;
use crate::store::{CarePlanRepository, Fetched};

#[derive(Clone)]
pub struct PlanStore {
    repo: Arc<dyn CarePlanRepository>,
}

impl PlanStore {
    pub fn new(repo: Arc<dyn CarePlanRepository>) -> Self {
        Self { repo }
    }

    /// Create a plan. Never overwrites: a second plan for the same period
    /// becomes a separate row.
    pub async fn create(&self, new: NewCarePlan) -> Fetched<CarePlan> {
        match self.repo.insert_plan(&new).await {
            Ok(plan) => {
                debug!(plan_id = %plan.id, patient_id = %plan.patient_id, period = %plan.period(), "care plan created");
                Fetched::backend(plan)
            }
            Err(e) => {
                error!(patient_id = %new.patient_id, error = %e, "failed to create care plan; keeping local copy");
                let now = Utc::now();
                Fetched::fallback(new.into_plan(Uuid::new_v4(), now))
            }
        }
    }

    /// Merge `update` into plan `id`. `None` means no such plan.
    pub async fn update(&self, id: Uuid, update: &CarePlanUpdate) -> Fetched<Option<CarePlan>> {
        match self.repo.update_plan(id, update).await {
            Ok(plan) => Fetched::backend(plan),
            Err(e) => {
                error!(plan_id = %id, error = %e, "failed to update care plan; applying to demo data");
                Fetched::fallback(fixtures::care_plan(id).map(|mut plan| {
                    update.apply_to(&mut plan, Utc::now());
                    plan
                }))
            }
        }
    }

    /// A patient's plans, newest period first.
    pub async fn list_by_patient(&self, patient_id: Uuid) -> Fetched<Vec<CarePlan>> {
        match self.repo.list_plans_for_patient(patient_id).await {
            Ok(plans) => Fetched::backend(plans),
            Err(e) => {
                error!(patient_id = %patient_id, error = %e, "failed to list care plans; using demo data");
                Fetched::fallback(fixtures::plans_for_patient(patient_id))
            }
        }
    }

    /// The plan covering `period`, or `None`. With duplicates the most
    /// recently updated one is returned.
    pub async fn find_by_period(&self, patient_id: Uuid, period: Period) -> Fetched<Option<CarePlan>> {
        match self.repo.find_plan_by_period(patient_id, period).await {
            Ok(plan) => Fetched::backend(plan),
            Err(e) => {
                error!(patient_id = %patient_id, %period, error = %e, "failed to fetch care plan by period; using demo data");
                Fetched::fallback(fixtures::plan_for_period(patient_id, period))
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Fetched<Option<CarePlan>> {
        match self.repo.get_plan(id).await {
            Ok(plan) => Fetched::backend(plan),
            Err(e) => {
                error!(plan_id = %id, error = %e, "failed to fetch care plan; using demo data");
                Fetched::fallback(fixtures::care_plan(id))
            }
        }
    }

    /// Delete plan `id`. A backend failure reports `false`.
    pub async fn delete(&self, id: Uuid) -> Fetched<bool> {
        match self.repo.delete_plan(id).await {
            Ok(removed) => Fetched::backend(removed),
            Err(e) => {
                error!(plan_id = %id, error = %e, "failed to delete care plan");
                Fetched::fallback(false)
            }
        }
    }
}
