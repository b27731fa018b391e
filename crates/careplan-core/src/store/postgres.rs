//! PostgreSQL-backed repositories, delegating to `careplan_db::queries`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use careplan_db::models::{
    CarePlan, CarePlanUpdate, NewCarePlan, NewPatient, Patient, PatientUpdate, Period,
};
use careplan_db::queries::{care_plans, patients};

use super::{CarePlanRepository, PatientRepository, StoreError};

/// Repository over a connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Connection-level failures become [`StoreError::Unavailable`]; anything
/// the server answered with stays [`StoreError::Backend`].
fn backend(err: anyhow::Error) -> StoreError {
    match err.downcast_ref::<sqlx::Error>() {
        Some(
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_),
        ) => StoreError::Unavailable,
        _ => StoreError::Backend(format!("{err:#}")),
    }
}

#[async_trait]
impl PatientRepository for PgStore {
    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        patients::list_patients(&self.pool).await.map_err(backend)
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        patients::get_patient(&self.pool, id).await.map_err(backend)
    }

    async fn insert_patient(&self, new: &NewPatient) -> Result<Patient, StoreError> {
        patients::insert_patient(&self.pool, new)
            .await
            .map_err(backend)
    }

    async fn update_patient(
        &self,
        id: Uuid,
        update: &PatientUpdate,
    ) -> Result<Option<Patient>, StoreError> {
        patients::update_patient(&self.pool, id, update)
            .await
            .map_err(backend)
    }

    async fn delete_patient(&self, id: Uuid) -> Result<bool, StoreError> {
        patients::delete_patient(&self.pool, id)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl CarePlanRepository for PgStore {
    async fn insert_plan(&self, new: &NewCarePlan) -> Result<CarePlan, StoreError> {
        care_plans::insert_care_plan(&self.pool, new)
            .await
            .map_err(backend)
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<CarePlan>, StoreError> {
        care_plans::get_care_plan(&self.pool, id)
            .await
            .map_err(backend)
    }

    async fn update_plan(
        &self,
        id: Uuid,
        update: &CarePlanUpdate,
    ) -> Result<Option<CarePlan>, StoreError> {
        care_plans::update_care_plan(&self.pool, id, update)
            .await
            .map_err(backend)
    }

    async fn list_plans_for_patient(&self, patient_id: Uuid) -> Result<Vec<CarePlan>, StoreError> {
        care_plans::list_care_plans_for_patient(&self.pool, patient_id)
            .await
            .map_err(backend)
    }

    async fn find_plan_by_period(
        &self,
        patient_id: Uuid,
        period: Period,
    ) -> Result<Option<CarePlan>, StoreError> {
        care_plans::find_care_plan_by_period(&self.pool, patient_id, period)
            .await
            .map_err(backend)
    }

    async fn delete_plan(&self, id: Uuid) -> Result<bool, StoreError> {
        care_plans::delete_care_plan(&self.pool, id)
            .await
            .map_err(backend)
    }
}
