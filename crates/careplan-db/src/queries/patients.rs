//! Database query functions for the `patients` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewPatient, Patient, PatientUpdate};

/// Insert a new patient row. Returns the row with server-generated defaults
/// (id, created_at).
pub async fn insert_patient(pool: &PgPool, new: &NewPatient) -> Result<Patient> {
    let local = new.clone().into_patient(Uuid::nil(), chrono::Utc::now());

    let patient = sqlx::query_as::<_, Patient>(
        "INSERT INTO patients (name, gender, birthdate, address, phone, emergency_contact, \
                               medical_history, primary_doctor, insurance_type, care_level, user_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING *",
    )
    .bind(&local.name)
    .bind(local.gender)
    .bind(local.birthdate)
    .bind(&local.address)
    .bind(&local.phone)
    .bind(&local.emergency_contact)
    .bind(&local.medical_history)
    .bind(&local.primary_doctor)
    .bind(local.insurance_type)
    .bind(local.care_level)
    .bind(&local.user_id)
    .fetch_one(pool)
    .await
    .context("failed to insert patient")?;

    Ok(patient)
}

/// Fetch a patient by ID.
pub async fn get_patient(pool: &PgPool, id: Uuid) -> Result<Option<Patient>> {
    let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch patient")?;

    Ok(patient)
}

/// List all patients ordered by name.
pub async fn list_patients(pool: &PgPool) -> Result<Vec<Patient>> {
    let patients =
        sqlx::query_as::<_, Patient>("SELECT * FROM patients ORDER BY name ASC, created_at ASC")
            .fetch_all(pool)
            .await
            .context("failed to list patients")?;

    Ok(patients)
}

/// Apply a partial update. Returns `None` when the patient does not exist.
///
/// Read-merge-write without locking: concurrent edits are last-write-wins.
pub async fn update_patient(
    pool: &PgPool,
    id: Uuid,
    update: &PatientUpdate,
) -> Result<Option<Patient>> {
    let Some(mut patient) = get_patient(pool, id).await? else {
        return Ok(None);
    };
    update.apply_to(&mut patient);

    let updated = sqlx::query_as::<_, Patient>(
        "UPDATE patients \
         SET name = $2, gender = $3, birthdate = $4, address = $5, phone = $6, \
             emergency_contact = $7, medical_history = $8, primary_doctor = $9, \
             insurance_type = $10, care_level = $11 \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(&patient.name)
    .bind(patient.gender)
    .bind(patient.birthdate)
    .bind(&patient.address)
    .bind(&patient.phone)
    .bind(&patient.emergency_contact)
    .bind(&patient.medical_history)
    .bind(&patient.primary_doctor)
    .bind(patient.insurance_type)
    .bind(patient.care_level)
    .fetch_optional(pool)
    .await
    .context("failed to update patient")?;

    Ok(updated)
}

/// Hard-delete a patient (and, by cascade, their plans). Returns whether a
/// row was removed.
pub async fn delete_patient(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM patients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete patient")?;

    Ok(result.rows_affected() > 0)
}
