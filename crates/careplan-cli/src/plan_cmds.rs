//! CLI handlers for `careplan plan` subcommands.
//!
//! `plan create` drives the plan-creation wizard non-interactively: the
//! assessment comes from flags, the draft from the generation service (or
//! the fallback), and `--edit` / `--append` stand in for the review screen.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use uuid::Uuid;

use careplan_core::draft::{Assessment, DraftContent, DraftOrigin, DraftSection};
use careplan_core::store::Source;
use careplan_core::wizard::PlanWizard;
use careplan_db::models::{CarePlan, CarePlanUpdate, PlanStatus, VisitType};

use crate::context::{AppContext, today};
use crate::patient_cmds::find_patient;
use crate::resolve::resolve_plan_id;
use crate::{AssessmentFields, ItemAppend, ItemEdit, PlanCommands};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

pub async fn run_plan_command(command: PlanCommands, ctx: &AppContext) -> Result<()> {
    ctx.require_session()?;
    match command {
        PlanCommands::List { patient } => cmd_list(ctx, &patient).await,
        PlanCommands::Show { plan } => cmd_show(ctx, &plan).await,
        PlanCommands::Create {
            patient,
            visit_type,
            date,
            assessment,
            edits,
            appends,
            dry_run,
        } => {
            let request = CreateRequest {
                visit_type,
                date,
                assessment,
                edits,
                appends,
                dry_run,
            };
            cmd_create(ctx, &patient, request).await
        }
        PlanCommands::Update {
            plan,
            visit_type,
            status,
            assessment,
            goals,
            issues,
            supports,
        } => {
            let update = plan_update(visit_type, status, assessment, goals, issues, supports);
            cmd_update(ctx, &plan, &update).await
        }
        PlanCommands::Export { plan, output } => cmd_export(ctx, &plan, output.as_deref()).await,
        PlanCommands::Delete { plan, yes } => cmd_delete(ctx, &plan, yes).await,
    }
}

async fn fetch_plan(ctx: &AppContext, input: &str) -> Result<CarePlan> {
    let id = resolve_plan_id(input)?;
    let fetched = ctx.services.plans.get(id).await;
    ctx.note_fallback(&fetched);
    fetched
        .into_value()
        .with_context(|| format!("care plan {id} not found"))
}

fn print_items(label: &str, items: &[String]) {
    println!("{label}:");
    if items.is_empty() {
        println!("  (none)");
    }
    for (i, item) in items.iter().enumerate() {
        println!("  {i}. {item}");
    }
}

fn print_draft(content: &DraftContent) {
    for section in DraftSection::ALL {
        print_items(section.label(), content.section(section));
    }
}

// -----------------------------------------------------------------------
// careplan plan list
// -----------------------------------------------------------------------

async fn cmd_list(ctx: &AppContext, input: &str) -> Result<()> {
    let patient = find_patient(ctx, input).await?;
    let fetched = ctx.services.plans.list_by_patient(patient.id).await;
    ctx.note_fallback(&fetched);
    let plans = fetched.into_value();

    if plans.is_empty() {
        println!(
            "No care plans for {}. Use `careplan plan create --patient ...` to create one.",
            patient.name
        );
        return Ok(());
    }

    println!("Care plans for {}:", patient.name);
    println!(
        "{:<36}  {:<10}  {:<8}  {:<9}  UPDATED",
        "ID", "PERIOD", "VISIT", "STATUS"
    );
    for plan in &plans {
        println!(
            "{:<36}  {:<10}  {:<8}  {:<9}  {}",
            plan.id,
            format!("{}-{:02}", plan.year, plan.month),
            plan.visit_type,
            plan.status,
            plan.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// careplan plan show
// -----------------------------------------------------------------------

async fn cmd_show(ctx: &AppContext, input: &str) -> Result<()> {
    let plan = fetch_plan(ctx, input).await?;
    let patient_name = ctx
        .services
        .directory
        .get(plan.patient_id)
        .await
        .into_value()
        .map(|p| p.name)
        .unwrap_or_else(|| plan.patient_id.to_string());
    let none = "-";
    let adl = plan.adl();

    println!("Care plan: {} {}", patient_name, plan.period());
    println!("  ID:         {}", plan.id);
    println!("  Status:     {}", plan.status.label());
    println!("  Visit type: {}", plan.visit_type.label());
    println!("  Staff:      {}", plan.user_id);
    println!(
        "  Updated:    {}",
        plan.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    println!("Assessment:");
    println!(
        "  Health status:       {}",
        plan.health_status.as_deref().unwrap_or(none)
    );
    println!(
        "  ADL:                 移動 {} / 食事 {} / 排泄 {} / 入浴 {}",
        adl.mobility.label(),
        adl.eating.label(),
        adl.toilet.label(),
        adl.bathing.label()
    );
    println!(
        "  Patient/family:      {}",
        plan.patient_family_request.as_deref().unwrap_or(none)
    );
    println!(
        "  Doctor instructions: {}",
        plan.doctor_instructions.as_deref().unwrap_or(none)
    );
    println!(
        "  Staff notes:         {}",
        plan.staff_notes.as_deref().unwrap_or(none)
    );
    println!();
    print_items(DraftSection::Goals.label(), &plan.goals);
    print_items(DraftSection::Issues.label(), &plan.issues);
    print_items(DraftSection::Supports.label(), &plan.supports);
    Ok(())
}

// -----------------------------------------------------------------------
// careplan plan create
// -----------------------------------------------------------------------

struct CreateRequest {
    visit_type: VisitType,
    date: Option<NaiveDate>,
    assessment: AssessmentFields,
    edits: Vec<ItemEdit>,
    appends: Vec<ItemAppend>,
    dry_run: bool,
}

/// Overlay the flags onto the (pre-filled) assessment.
fn apply_assessment(target: &mut Assessment, fields: AssessmentFields) {
    if let Some(v) = fields.health_status {
        target.health_status = Some(v);
    }
    if let Some(v) = fields.mobility {
        target.adl.mobility = v;
    }
    if let Some(v) = fields.eating {
        target.adl.eating = v;
    }
    if let Some(v) = fields.toilet {
        target.adl.toilet = v;
    }
    if let Some(v) = fields.bathing {
        target.adl.bathing = v;
    }
    if let Some(v) = fields.family_request {
        target.patient_family_request = Some(v);
    }
    if let Some(v) = fields.doctor_instructions {
        target.doctor_instructions = Some(v);
    }
    if let Some(v) = fields.notes {
        target.staff_notes = Some(v);
    }
}

async fn cmd_create(ctx: &AppContext, input: &str, request: CreateRequest) -> Result<()> {
    let user_id = ctx.require_session()?.user_id.clone();
    let patient = find_patient(ctx, input).await?;

    let mut wizard = PlanWizard::new(user_id, request.date.unwrap_or_else(today));
    wizard.select_patient(patient.clone())?;
    wizard.set_visit_type(request.visit_type)?;
    wizard.advance()?;
    apply_assessment(wizard.assessment_mut()?, request.assessment);

    println!("Generating draft for {} ({})...", patient.name, wizard.period());
    let origin = wizard.generate(&ctx.generator).await?;
    if origin == DraftOrigin::Fallback {
        eprintln!("warning: draft generation failed; starting from the standard template");
    }

    for edit in request.edits {
        wizard.edit_item(edit.section, edit.index, edit.text)?;
    }
    for append in request.appends {
        wizard.append_item(append.section, append.text)?;
    }

    if request.dry_run {
        if let Some(draft) = wizard.draft() {
            print_draft(draft);
        }
        wizard.abandon();
        println!();
        println!("Dry run: nothing saved.");
        return Ok(());
    }

    let saved = wizard.commit(&ctx.services.plans).await?.clone();
    if wizard.saved_source() == Some(Source::Fallback) {
        eprintln!("warning: backend unavailable; the plan below was NOT stored");
    } else if ctx.mode().uses_demo_data() {
        eprintln!("note: {} mode; changes last only for this run", ctx.mode());
    }

    println!("Care plan saved.");
    println!();
    println!("  Plan ID: {}", saved.id);
    println!("  Patient: {}", patient.name);
    println!("  Period:  {}", saved.period());
    println!("  Status:  {}", saved.status.label());
    println!();
    print_items(DraftSection::Goals.label(), &saved.goals);
    print_items(DraftSection::Issues.label(), &saved.issues);
    print_items(DraftSection::Supports.label(), &saved.supports);
    Ok(())
}

// -----------------------------------------------------------------------
// careplan plan update / export / delete
// -----------------------------------------------------------------------

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    (!items.is_empty()).then_some(items)
}

fn plan_update(
    visit_type: Option<VisitType>,
    status: Option<PlanStatus>,
    assessment: AssessmentFields,
    goals: Vec<String>,
    issues: Vec<String>,
    supports: Vec<String>,
) -> CarePlanUpdate {
    CarePlanUpdate {
        visit_type,
        health_status: assessment.health_status,
        adl_mobility: assessment.mobility,
        adl_eating: assessment.eating,
        adl_toilet: assessment.toilet,
        adl_bathing: assessment.bathing,
        patient_family_request: assessment.family_request,
        doctor_instructions: assessment.doctor_instructions,
        staff_notes: assessment.notes,
        goals: non_empty(goals),
        issues: non_empty(issues),
        supports: non_empty(supports),
        status,
    }
}

async fn cmd_update(ctx: &AppContext, input: &str, update: &CarePlanUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("nothing to update; pass at least one field flag");
    }
    let id = resolve_plan_id(input)?;
    let updated = ctx.services.plans.update(id, update).await;
    ctx.note_write(&updated);
    let plan = updated
        .into_value()
        .with_context(|| format!("care plan {id} not found"))?;
    println!("Care plan {} ({}) updated.", plan.id, plan.period());
    Ok(())
}

async fn cmd_export(ctx: &AppContext, input: &str, output: Option<&str>) -> Result<()> {
    let plan = fetch_plan(ctx, input).await?;
    let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;

    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("cannot create output file: {path}"))?;
            writeln!(file, "{json}")?;
            println!("Exported plan {} to {path}", plan.id);
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_delete(ctx: &AppContext, input: &str, yes: bool) -> Result<()> {
    let id: Uuid = resolve_plan_id(input)?;
    if !yes {
        bail!("re-run with --yes to delete care plan {id}");
    }
    let deleted = ctx.services.plans.delete(id).await;
    ctx.note_write(&deleted);
    if !deleted.value {
        bail!("care plan {id} was not deleted");
    }
    println!("Care plan {id} deleted.");
    Ok(())
}
