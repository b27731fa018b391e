//! Storage seam for patients and care plans.
//!
//! The repository traits return `Result<_, StoreError>` and never degrade on
//! their own. Callers ([`crate::directory::PatientDirectory`],
//! [`crate::plans::PlanStore`]) decide what to substitute on failure and tag
//! the result with a [`Source`].

pub mod memory;
pub mod postgres;

use std::cmp::Ordering;

use async_trait::async_trait;
use uuid::Uuid;

use careplan_db::models::{
    CarePlan, CarePlanUpdate, NewCarePlan, NewPatient, Patient, PatientUpdate, Period,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Failure reaching the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage backend unavailable")]
    Unavailable,
}

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Read from or written to the storage backend.
    Backend,
    /// Substituted after a backend failure (fixture data or a locally built
    /// record that was never persisted).
    Fallback,
}

/// A value paired with its [`Source`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Fetched<T> {
    pub fn backend(value: T) -> Self {
        Self {
            value,
            source: Source::Backend,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            source: Source::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == Source::Fallback
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            value: f(self.value),
            source: self.source,
        }
    }
}

/// Row storage for patients.
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// All patients, ordered by name.
    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError>;

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError>;

    async fn insert_patient(&self, new: &NewPatient) -> Result<Patient, StoreError>;

    /// `Ok(None)` when no patient has `id`.
    async fn update_patient(
        &self,
        id: Uuid,
        update: &PatientUpdate,
    ) -> Result<Option<Patient>, StoreError>;

    /// Whether a row was removed. Plans of the patient go with it.
    async fn delete_patient(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Row storage for care plans.
#[async_trait]
pub trait CarePlanRepository: Send + Sync {
    /// Insert unconditionally; an existing plan for the same period is kept.
    async fn insert_plan(&self, new: &NewCarePlan) -> Result<CarePlan, StoreError>;

    async fn get_plan(&self, id: Uuid) -> Result<Option<CarePlan>, StoreError>;

    /// Merge `update` into the stored plan and bump `updated_at`.
    async fn update_plan(
        &self,
        id: Uuid,
        update: &CarePlanUpdate,
    ) -> Result<Option<CarePlan>, StoreError>;

    /// A patient's plans in [`newest_first`] order.
    async fn list_plans_for_patient(&self, patient_id: Uuid) -> Result<Vec<CarePlan>, StoreError>;

    /// The most recently updated plan for `period`, if any.
    async fn find_plan_by_period(
        &self,
        patient_id: Uuid,
        period: Period,
    ) -> Result<Option<CarePlan>, StoreError>;

    async fn delete_plan(&self, id: Uuid) -> Result<bool, StoreError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PatientRepository, _: &dyn CarePlanRepository) {}
};

/// Listing order for plans: year desc, month desc, then most recently
/// updated, then most recently created.
pub fn newest_first(a: &CarePlan, b: &CarePlan) -> Ordering {
    b.year
        .cmp(&a.year)
        .then(b.month.cmp(&a.month))
        .then(b.updated_at.cmp(&a.updated_at))
        .then(b.created_at.cmp(&a.created_at))
}

/// Pick the plan covering `period` out of `plans`, preferring the most
/// recently updated when several match.
pub fn latest_in_period<'a>(
    plans: impl IntoIterator<Item = &'a CarePlan>,
    patient_id: Uuid,
    period: Period,
) -> Option<&'a CarePlan> {
    plans
        .into_iter()
        .filter(|p| p.patient_id == patient_id && p.period() == period)
        .max_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then(a.created_at.cmp(&b.created_at))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn newest_first_orders_by_period_then_update() {
        let mut plans = fixtures::care_plans();
        let mut dup = plans[0].clone();
        dup.id = Uuid::new_v4();
        dup.updated_at = dup.updated_at + chrono::Duration::hours(1);
        plans.push(dup.clone());
        plans.sort_by(newest_first);

        assert_eq!(plans[0].id, dup.id);
        assert_eq!(plans.last().map(|p| p.period()), Some(Period::new(2, 2025).unwrap()));
    }

    #[test]
    fn latest_in_period_prefers_updated_timestamp() {
        let plans = fixtures::care_plans();
        let base = &plans[0];
        let mut older = base.clone();
        older.id = Uuid::new_v4();
        older.updated_at = base.updated_at - chrono::Duration::days(1);
        let all = vec![older, base.clone()];

        let found = latest_in_period(&all, base.patient_id, base.period()).unwrap();
        assert_eq!(found.id, base.id);
        assert!(latest_in_period(&all, base.patient_id, Period::new(1, 2020).unwrap()).is_none());
    }

    #[test]
    fn fetched_map_keeps_source() {
        let fetched = Fetched::fallback(vec![1, 2, 3]).map(|v| v.len());
        assert!(fetched.is_fallback());
        assert_eq!(fetched.value, 3);
    }
}
