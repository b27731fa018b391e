//! Database query functions for the `care_plans` table.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CarePlan, CarePlanUpdate, NewCarePlan, Period};

/// Insert a new care plan row. Returns the row with server-generated
/// defaults (id, created_at, updated_at).
///
/// No uniqueness check on the period: inserting the same
/// (patient, month, year) twice yields two rows.
pub async fn insert_care_plan(pool: &PgPool, new: &NewCarePlan) -> Result<CarePlan> {
    let local = new.clone().into_plan(Uuid::nil(), Utc::now());

    let plan = sqlx::query_as::<_, CarePlan>(
        "INSERT INTO care_plans (patient_id, user_id, visit_type, health_status, \
                                 adl_mobility, adl_eating, adl_toilet, adl_bathing, \
                                 patient_family_request, doctor_instructions, staff_notes, \
                                 goals, issues, supports, status, month, year) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
         RETURNING *",
    )
    .bind(local.patient_id)
    .bind(&local.user_id)
    .bind(local.visit_type)
    .bind(&local.health_status)
    .bind(local.adl_mobility)
    .bind(local.adl_eating)
    .bind(local.adl_toilet)
    .bind(local.adl_bathing)
    .bind(&local.patient_family_request)
    .bind(&local.doctor_instructions)
    .bind(&local.staff_notes)
    .bind(&local.goals)
    .bind(&local.issues)
    .bind(&local.supports)
    .bind(local.status)
    .bind(local.month)
    .bind(local.year)
    .fetch_one(pool)
    .await
    .context("failed to insert care plan")?;

    Ok(plan)
}

/// Fetch a care plan by its ID.
pub async fn get_care_plan(pool: &PgPool, id: Uuid) -> Result<Option<CarePlan>> {
    let plan = sqlx::query_as::<_, CarePlan>("SELECT * FROM care_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch care plan")?;

    Ok(plan)
}

/// List a patient's plans, newest period first. Rows sharing a period are
/// ordered by most recent update, then most recent creation.
pub async fn list_care_plans_for_patient(pool: &PgPool, patient_id: Uuid) -> Result<Vec<CarePlan>> {
    let plans = sqlx::query_as::<_, CarePlan>(
        "SELECT * FROM care_plans \
         WHERE patient_id = $1 \
         ORDER BY year DESC, month DESC, updated_at DESC, created_at DESC",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await
    .context("failed to list care plans for patient")?;

    Ok(plans)
}

/// Fetch the plan covering `period` for a patient.
///
/// When duplicates exist the most recently updated row wins.
pub async fn find_care_plan_by_period(
    pool: &PgPool,
    patient_id: Uuid,
    period: Period,
) -> Result<Option<CarePlan>> {
    let plan = sqlx::query_as::<_, CarePlan>(
        "SELECT * FROM care_plans \
         WHERE patient_id = $1 AND month = $2 AND year = $3 \
         ORDER BY updated_at DESC, created_at DESC \
         LIMIT 1",
    )
    .bind(patient_id)
    .bind(period.month as i32)
    .bind(period.year)
    .fetch_optional(pool)
    .await
    .context("failed to fetch care plan by period")?;

    Ok(plan)
}

/// Apply a partial update and bump `updated_at`. Returns `None` when the
/// plan does not exist.
pub async fn update_care_plan(
    pool: &PgPool,
    id: Uuid,
    update: &CarePlanUpdate,
) -> Result<Option<CarePlan>> {
    let Some(mut plan) = get_care_plan(pool, id).await? else {
        return Ok(None);
    };
    update.apply_to(&mut plan, Utc::now());

    let updated = sqlx::query_as::<_, CarePlan>(
        "UPDATE care_plans \
         SET visit_type = $2, health_status = $3, adl_mobility = $4, adl_eating = $5, \
             adl_toilet = $6, adl_bathing = $7, patient_family_request = $8, \
             doctor_instructions = $9, staff_notes = $10, goals = $11, issues = $12, \
             supports = $13, status = $14, updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(plan.visit_type)
    .bind(&plan.health_status)
    .bind(plan.adl_mobility)
    .bind(plan.adl_eating)
    .bind(plan.adl_toilet)
    .bind(plan.adl_bathing)
    .bind(&plan.patient_family_request)
    .bind(&plan.doctor_instructions)
    .bind(&plan.staff_notes)
    .bind(&plan.goals)
    .bind(&plan.issues)
    .bind(&plan.supports)
    .bind(plan.status)
    .fetch_optional(pool)
    .await
    .context("failed to update care plan")?;

    Ok(updated)
}

/// Delete a care plan. Returns whether a row was removed.
pub async fn delete_care_plan(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM care_plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete care plan")?;

    Ok(result.rows_affected() > 0)
}
