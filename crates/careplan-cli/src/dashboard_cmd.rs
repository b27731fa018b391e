//! `careplan dashboard`: this month's progress and the patients still
//! needing a plan.

use anyhow::Result;
use chrono::NaiveDate;

use careplan_core::completeness::{DashboardSummary, build_plan_index, plan_statuses};
use careplan_db::models::Period;

use crate::context::{AppContext, today};

pub async fn run_dashboard(ctx: &AppContext, date: Option<NaiveDate>) -> Result<()> {
    let session = ctx.require_session()?;
    let today = date.unwrap_or_else(today);
    let current = Period::from_date(today);

    let fetched = ctx.services.directory.list().await;
    ctx.note_fallback(&fetched);
    let patients = fetched.into_value();
    let index = build_plan_index(&ctx.services.plans, &patients, current).await;
    let summary = DashboardSummary::compute(&patients, &index, today);

    println!("{}さん ({})  {}", session.profile.full_name, session.profile.role, today);
    println!();
    println!("{} care plans", summary.current);
    println!("  Patients:          {}", summary.patient_count);
    println!("  Completed:         {}", summary.completed_count);
    println!("  Needing a plan:    {}", summary.needing_plan_count);
    println!("  Days left:         {}", summary.days_left);
    if summary.deadline_near() && summary.needing_plan_count > 0 {
        println!();
        println!(
            "!! 今月の計画書作成期限まであと{}日です。{}名の計画書が未作成です。",
            summary.days_left, summary.needing_plan_count
        );
    }

    let needing: Vec<_> = plan_statuses(&patients, &index, current)
        .into_iter()
        .filter(|s| s.needs_plan)
        .collect();
    if !needing.is_empty() {
        println!();
        println!("Needing a plan:");
        for status in &needing {
            let last = status
                .last_plan
                .map(|p| format!("last plan {p}"))
                .unwrap_or_else(|| "no plans yet".to_owned());
            println!(
                "  {}  {}  ({last})",
                status.name,
                status.care_level.label()
            );
        }
    }

    if !summary.recent_plans.is_empty() {
        println!();
        println!("Recently updated:");
        for recent in &summary.recent_plans {
            println!(
                "  {}  {}  {}  {}",
                recent.last_updated.format("%Y-%m-%d"),
                recent.patient_name,
                recent.period,
                recent.status.label()
            );
        }
    }
    Ok(())
}
