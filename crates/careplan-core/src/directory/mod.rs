//! Patient Directory: patient CRUD plus search, filter, sort and paging.

pub mod query;
pub mod validation;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error};
use uuid::Uuid;

use careplan_db::models::{NewPatient, Patient, PatientUpdate};

pub use query::{Page, PatientQuery, PlanFilter, SortKey, apply_query};
pub use validation::{ValidationErrors, validate_new_patient, validate_patient_update};

use crate::fixtures;
use crate::store::{Fetched, PatientRepository};

/// Patient CRUD over a [`PatientRepository`]. Backend failures are logged
/// and answered from demo data, tagged [`crate::store::Source::Fallback`].
#[derive(Clone)]
pub struct PatientDirectory {
    repo: Arc<dyn PatientRepository>,
}

impl PatientDirectory {
    pub fn new(repo: Arc<dyn PatientRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Fetched<Vec<Patient>> {
        match self.repo.list_patients().await {
            Ok(patients) => Fetched::backend(patients),
            Err(e) => {
                error!(error = %e, "failed to list patients; using demo data");
                let mut patients = fixtures::patients();
                patients.sort_by(|a, b| a.name.cmp(&b.name));
                Fetched::fallback(patients)
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Fetched<Option<Patient>> {
        match self.repo.get_patient(id).await {
            Ok(patient) => Fetched::backend(patient),
            Err(e) => {
                error!(patient_id = %id, error = %e, "failed to fetch patient; using demo data");
                Fetched::fallback(fixtures::patient(id))
            }
        }
    }

    /// Validate and register a patient.
    pub async fn create(&self, new: NewPatient) -> Result<Fetched<Patient>, ValidationErrors> {
        self.create_as_of(new, today()).await
    }

    /// [`Self::create`] with an explicit date for the birthdate check.
    pub async fn create_as_of(
        &self,
        new: NewPatient,
        today: NaiveDate,
    ) -> Result<Fetched<Patient>, ValidationErrors> {
        validate_new_patient(&new, today)?;
        Ok(match self.repo.insert_patient(&new).await {
            Ok(patient) => {
                debug!(patient_id = %patient.id, "patient registered");
                Fetched::backend(patient)
            }
            Err(e) => {
                error!(error = %e, "failed to register patient; keeping local copy");
                Fetched::fallback(new.into_patient(Uuid::new_v4(), Utc::now()))
            }
        })
    }

    /// Validate and apply a partial update. `None` means no such patient.
    pub async fn update(
        &self,
        id: Uuid,
        update: &PatientUpdate,
    ) -> Result<Fetched<Option<Patient>>, ValidationErrors> {
        validate_patient_update(update, today())?;
        Ok(match self.repo.update_patient(id, update).await {
            Ok(patient) => Fetched::backend(patient),
            Err(e) => {
                error!(patient_id = %id, error = %e, "failed to update patient; applying to demo data");
                Fetched::fallback(fixtures::patient(id).map(|mut patient| {
                    update.apply_to(&mut patient);
                    patient
                }))
            }
        })
    }

    /// Hard delete. A backend failure reports `false`.
    pub async fn delete(&self, id: Uuid) -> Fetched<bool> {
        match self.repo.delete_patient(id).await {
            Ok(removed) => Fetched::backend(removed),
            Err(e) => {
                error!(patient_id = %id, error = %e, "failed to delete patient");
                Fetched::fallback(false)
            }
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use careplan_db::models::{CareLevel, Gender, InsuranceType};

    fn directory() -> PatientDirectory {
        PatientDirectory::new(Arc::new(MemoryStore::seeded()))
    }

    fn form(name: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            gender: Gender::Female,
            birthdate: NaiveDate::from_ymd_opt(1938, 1, 2).unwrap(),
            address: "東京都目黒区".into(),
            phone: None,
            emergency_contact: None,
            medical_history: None,
            primary_doctor: None,
            insurance_type: InsuranceType::Medical,
            care_level: CareLevel::Support1,
            user_id: fixtures::DEMO_USER_ID.into(),
        }
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_before_storage() {
        let dir = directory();
        let errs = dir.create(form("")).await.unwrap_err();
        assert!(errs.get("name").is_some());
        assert_eq!(dir.list().await.value.len(), 3);
    }

    #[tokio::test]
    async fn create_update_delete() {
        let dir = directory();
        let created = dir.create(form("高橋 和子")).await.unwrap();
        assert!(!created.is_fallback());
        let id = created.value.id;

        let updated = dir
            .update(
                id,
                &PatientUpdate {
                    care_level: Some(CareLevel::Care1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.value.map(|p| p.care_level), Some(CareLevel::Care1));

        assert!(dir.delete(id).await.value);
        assert!(dir.get(id).await.value.is_none());
    }

    #[tokio::test]
    async fn update_unknown_patient_is_none() {
        let dir = directory();
        let result = dir.update(Uuid::new_v4(), &PatientUpdate::default()).await.unwrap();
        assert!(result.value.is_none());
    }
}
