//! In-process repositories used in offline and partial-demo modes.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use careplan_db::models::{
    CarePlan, CarePlanUpdate, NewCarePlan, NewPatient, Patient, PatientUpdate, Period,
};

use super::{CarePlanRepository, PatientRepository, StoreError, latest_in_period, newest_first};
use crate::fixtures;

/// Patients and plans held in memory. Writes last for the life of the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    patients: RwLock<Vec<Patient>>,
    plans: RwLock<Vec<CarePlan>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with the demo patients and plans.
    pub fn seeded() -> Self {
        Self::with_rows(fixtures::patients(), fixtures::care_plans())
    }

    pub fn with_rows(patients: Vec<Patient>, plans: Vec<CarePlan>) -> Self {
        Self {
            patients: RwLock::new(patients),
            plans: RwLock::new(plans),
        }
    }
}

#[async_trait]
impl PatientRepository for MemoryStore {
    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        let mut patients = self.patients.read().await.clone();
        patients.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(patients)
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        let patients = self.patients.read().await;
        Ok(patients.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_patient(&self, new: &NewPatient) -> Result<Patient, StoreError> {
        let patient = new.clone().into_patient(Uuid::new_v4(), Utc::now());
        self.patients.write().await.push(patient.clone());
        Ok(patient)
    }

    async fn update_patient(
        &self,
        id: Uuid,
        update: &PatientUpdate,
    ) -> Result<Option<Patient>, StoreError> {
        let mut patients = self.patients.write().await;
        Ok(patients.iter_mut().find(|p| p.id == id).map(|patient| {
            update.apply_to(patient);
            patient.clone()
        }))
    }

    async fn delete_patient(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut patients = self.patients.write().await;
        let before = patients.len();
        patients.retain(|p| p.id != id);
        let removed = patients.len() != before;
        drop(patients);

        if removed {
            self.plans.write().await.retain(|p| p.patient_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CarePlanRepository for MemoryStore {
    async fn insert_plan(&self, new: &NewCarePlan) -> Result<CarePlan, StoreError> {
        let plan = new.clone().into_plan(Uuid::new_v4(), Utc::now());
        self.plans.write().await.push(plan.clone());
        Ok(plan)
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<CarePlan>, StoreError> {
        let plans = self.plans.read().await;
        Ok(plans.iter().find(|p| p.id == id).cloned())
    }

    async fn update_plan(
        &self,
        id: Uuid,
        update: &CarePlanUpdate,
    ) -> Result<Option<CarePlan>, StoreError> {
        let mut plans = self.plans.write().await;
        Ok(plans.iter_mut().find(|p| p.id == id).map(|plan| {
            update.apply_to(plan, Utc::now());
            plan.clone()
        }))
    }

    async fn list_plans_for_patient(&self, patient_id: Uuid) -> Result<Vec<CarePlan>, StoreError> {
        let mut plans: Vec<CarePlan> = self
            .plans
            .read()
            .await
            .iter()
            .filter(|p| p.patient_id == patient_id)
            .cloned()
            .collect();
        plans.sort_by(newest_first);
        Ok(plans)
    }

    async fn find_plan_by_period(
        &self,
        patient_id: Uuid,
        period: Period,
    ) -> Result<Option<CarePlan>, StoreError> {
        let plans = self.plans.read().await;
        Ok(latest_in_period(plans.iter(), patient_id, period).cloned())
    }

    async fn delete_plan(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut plans = self.plans.write().await;
        let before = plans.len();
        plans.retain(|p| p.id != id);
        Ok(plans.len() != before)
    }
}
