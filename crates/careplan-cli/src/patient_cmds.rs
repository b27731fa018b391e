//! CLI handlers for `careplan patient` subcommands.

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use careplan_core::completeness::{build_plan_index, needs_monthly_plan};
use careplan_core::directory::{PatientQuery, ValidationErrors, apply_query};
use careplan_db::models::{CareLevel, Gender, InsuranceType, NewPatient, Patient, PatientUpdate, Period};

use crate::context::{AppContext, today};
use crate::resolve::match_patient;
use crate::{PatientCommands, PatientFields};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

pub async fn run_patient_command(command: PatientCommands, ctx: &AppContext) -> Result<()> {
    ctx.require_session()?;
    match command {
        PatientCommands::List {
            search,
            filter,
            sort,
            desc,
            page,
            per_page,
        } => {
            let query = PatientQuery {
                search,
                filter,
                sort,
                descending: desc,
                page,
                per_page,
            };
            cmd_list(ctx, &query).await
        }
        PatientCommands::Show { patient } => cmd_show(ctx, &patient).await,
        PatientCommands::Add { fields } => cmd_add(ctx, fields).await,
        PatientCommands::Update { patient, fields } => cmd_update(ctx, &patient, fields).await,
        PatientCommands::Delete { patient, yes } => cmd_delete(ctx, &patient, yes).await,
    }
}

/// Look a patient up by ID, ID prefix or exact name.
pub async fn find_patient(ctx: &AppContext, input: &str) -> Result<Patient> {
    if let Ok(id) = Uuid::parse_str(input.trim()) {
        let fetched = ctx.services.directory.get(id).await;
        ctx.note_fallback(&fetched);
        return fetched
            .into_value()
            .with_context(|| format!("patient {id} not found"));
    }
    let fetched = ctx.services.directory.list().await;
    ctx.note_fallback(&fetched);
    match_patient(fetched.into_value(), input)
}

fn report_validation(errors: ValidationErrors) -> anyhow::Error {
    for (field, message) in errors.iter() {
        eprintln!("  {field}: {message}");
    }
    anyhow::anyhow!("patient not saved: {} invalid field(s)", errors.iter().count())
}

// -----------------------------------------------------------------------
// careplan patient list
// -----------------------------------------------------------------------

async fn cmd_list(ctx: &AppContext, query: &PatientQuery) -> Result<()> {
    let today = today();
    let current = Period::from_date(today);

    let fetched = ctx.services.directory.list().await;
    ctx.note_fallback(&fetched);
    let patients = fetched.into_value();
    let index = build_plan_index(&ctx.services.plans, &patients, current).await;
    let page = apply_query(patients, query, &index, current, today);

    if page.total == 0 {
        println!("No patients found.");
        return Ok(());
    }

    let name_w = page
        .items
        .iter()
        .map(|p| p.name.chars().count() * 2)
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<8}  {:<name_w$}  {:>3}  {:<10}  {}",
        "ID", "NAME", "AGE", "CARE", current
    );
    for patient in &page.items {
        let mark = if needs_monthly_plan(patient.id, current, &index) {
            "未作成"
        } else {
            "作成済み"
        };
        let short_id = &patient.id.simple().to_string()[..8];
        println!(
            "{:<8}  {}  {:>3}  {:<10}  {}",
            short_id,
            pad_wide(&patient.name, name_w),
            patient.age_on(today),
            patient.care_level.label(),
            mark,
        );
    }
    println!();
    println!(
        "Page {}/{} ({} patients)",
        page.page,
        page.total_pages().max(1),
        page.total
    );
    Ok(())
}

/// Left-align text whose characters are mostly double width.
fn pad_wide(text: &str, width: usize) -> String {
    let used: usize = text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum();
    format!("{text}{}", " ".repeat(width.saturating_sub(used)))
}

// -----------------------------------------------------------------------
// careplan patient show
// -----------------------------------------------------------------------

async fn cmd_show(ctx: &AppContext, input: &str) -> Result<()> {
    let patient = find_patient(ctx, input).await?;
    let today = today();
    let none = "-";

    println!("Patient: {}", patient.name);
    println!("  ID:                {}", patient.id);
    println!("  Gender:            {}", patient.gender.label());
    println!(
        "  Birthdate:         {} ({}歳)",
        patient.birthdate,
        patient.age_on(today)
    );
    println!("  Address:           {}", patient.address);
    println!("  Phone:             {}", patient.phone.as_deref().unwrap_or(none));
    println!(
        "  Emergency contact: {}",
        patient.emergency_contact.as_deref().unwrap_or(none)
    );
    println!(
        "  Medical history:   {}",
        patient.medical_history.as_deref().unwrap_or(none)
    );
    println!(
        "  Primary doctor:    {}",
        patient.primary_doctor.as_deref().unwrap_or(none)
    );
    println!("  Insurance:         {}", patient.insurance_type.label());
    println!("  Care level:        {}", patient.care_level.label());
    println!(
        "  Registered:        {}",
        patient.created_at.format("%Y-%m-%d")
    );

    let plans = ctx.services.plans.list_by_patient(patient.id).await;
    ctx.note_fallback(&plans);
    let plans = plans.into_value();
    println!();
    if plans.is_empty() {
        println!("No care plans yet.");
    } else {
        println!("Care plans:");
        for plan in &plans {
            println!(
                "  {}  {}  {}  {}",
                plan.id,
                plan.period(),
                plan.visit_type.label(),
                plan.status.label()
            );
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// careplan patient add / update / delete
// -----------------------------------------------------------------------

fn new_patient(fields: PatientFields, user_id: &str) -> Result<NewPatient> {
    Ok(NewPatient {
        name: fields.name.unwrap_or_default(),
        gender: fields.gender.unwrap_or(Gender::Other),
        birthdate: fields.birthdate.context("--birthdate is required")?,
        address: fields.address.unwrap_or_default(),
        phone: fields.phone,
        emergency_contact: fields.emergency_contact,
        medical_history: fields.medical_history,
        primary_doctor: fields.primary_doctor,
        insurance_type: fields.insurance_type.unwrap_or(InsuranceType::LongTermCare),
        care_level: fields.care_level.unwrap_or(CareLevel::NotApplied),
        user_id: user_id.to_owned(),
    })
}

fn patient_update(fields: PatientFields) -> PatientUpdate {
    PatientUpdate {
        name: fields.name,
        gender: fields.gender,
        birthdate: fields.birthdate,
        address: fields.address,
        phone: fields.phone,
        emergency_contact: fields.emergency_contact,
        medical_history: fields.medical_history,
        primary_doctor: fields.primary_doctor,
        insurance_type: fields.insurance_type,
        care_level: fields.care_level,
    }
}

async fn cmd_add(ctx: &AppContext, fields: PatientFields) -> Result<()> {
    let user_id = ctx.require_session()?.user_id.clone();
    let new = new_patient(fields, &user_id)?;
    let created = ctx
        .services
        .directory
        .create(new)
        .await
        .map_err(report_validation)?;
    ctx.note_write(&created);

    let patient = created.value;
    println!("Patient registered.");
    println!("  ID:   {}", patient.id);
    println!("  Name: {}", patient.name);
    Ok(())
}

async fn cmd_update(ctx: &AppContext, input: &str, fields: PatientFields) -> Result<()> {
    let update = patient_update(fields);
    if update.is_empty() {
        bail!("nothing to update; pass at least one field flag");
    }
    let patient = find_patient(ctx, input).await?;
    let updated = ctx
        .services
        .directory
        .update(patient.id, &update)
        .await
        .map_err(report_validation)?;
    ctx.note_write(&updated);

    match updated.value {
        Some(p) => println!("Patient {} updated.", p.name),
        None => bail!("patient {} not found", patient.id),
    }
    Ok(())
}

async fn cmd_delete(ctx: &AppContext, input: &str, yes: bool) -> Result<()> {
    let patient = find_patient(ctx, input).await?;
    if !yes {
        bail!(
            "this deletes {} and all of their care plans; re-run with --yes to confirm",
            patient.name
        );
    }
    let deleted = ctx.services.directory.delete(patient.id).await;
    ctx.note_write(&deleted);
    if !deleted.value {
        bail!("patient {} was not deleted", patient.name);
    }
    println!("Patient {} deleted.", patient.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn add_requires_birthdate() {
        let fields = PatientFields {
            name: Some("山本 太郎".into()),
            ..Default::default()
        };
        let err = new_patient(fields, "12345").unwrap_err();
        assert!(err.to_string().contains("--birthdate"));
    }

    #[test]
    fn add_defaults_enums() {
        let fields = PatientFields {
            name: Some("山本 太郎".into()),
            birthdate: NaiveDate::from_ymd_opt(1948, 6, 1),
            address: Some("東京都".into()),
            ..Default::default()
        };
        let new = new_patient(fields, "12345").unwrap();
        assert_eq!(new.care_level, CareLevel::NotApplied);
        assert_eq!(new.insurance_type, InsuranceType::LongTermCare);
        assert_eq!(new.user_id, "12345");
    }

    #[test]
    fn update_without_flags_is_empty() {
        assert!(patient_update(PatientFields::default()).is_empty());
        let update = patient_update(PatientFields {
            phone: Some(String::new()),
            ..Default::default()
        });
        assert!(!update.is_empty());
    }

    #[test]
    fn wide_padding() {
        assert_eq!(pad_wide("鈴木", 6), "鈴木  ");
        assert_eq!(pad_wide("abc", 2), "abc");
    }
}
