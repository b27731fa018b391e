//! Integration tests for the `careplan` binary and the plan flow it drives.
//!
//! The binary tests run in offline demo mode against a temporary config
//! directory. The database-backed test runs the same plan-creation flow over
//! PostgreSQL and needs Docker (or `CAREPLAN_TEST_PG_URL`).

use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use chrono::NaiveDate;

use careplan_core::draft::{DraftGenerator, DraftSection, UnavailableGenerator};
use careplan_core::plans::PlanStore;
use careplan_core::store::{PgStore, Source};
use careplan_core::wizard::PlanWizard;
use careplan_db::models::{Period, PlanStatus};
use careplan_test_utils::{TEST_USER_ID, create_test_db, drop_test_db, insert_patient, new_patient};

// -----------------------------------------------------------------------
// Binary helpers
// -----------------------------------------------------------------------

const SCRUBBED_ENV: &[&str] = &[
    "CAREPLAN_DATABASE_URL",
    "CAREPLAN_AUTH_URL",
    "CAREPLAN_ANON_KEY",
    "CAREPLAN_GEMINI_API_KEY",
    "CAREPLAN_PASSWORD",
    "RUST_LOG",
];

fn careplan(config_home: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_careplan"));
    for key in SCRUBBED_ENV {
        cmd.env_remove(key);
    }
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("CAREPLAN_DEMO_MODE", "true")
        .args(args)
        .output()
        .expect("failed to run careplan binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn login(config_home: &Path) {
    let out = careplan(
        config_home,
        &["login", "--email", "test@example.com", "--password", "password123"],
    );
    assert!(out.status.success(), "login failed: {}", stderr(&out));
    assert!(stdout(&out).contains("山田 花子"));
}

// -----------------------------------------------------------------------
// Tests: session
// -----------------------------------------------------------------------

#[test]
fn commands_require_login() {
    let home = tempfile::TempDir::new().unwrap();
    let out = careplan(home.path(), &["patient", "list"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("not signed in"));
}

#[test]
fn non_demo_credentials_are_rejected_offline() {
    let home = tempfile::TempDir::new().unwrap();
    let out = careplan(
        home.path(),
        &["login", "--email", "nurse@example.com", "--password", "secret"],
    );
    assert!(!out.status.success());
    assert!(stderr(&out).contains("テスト用アカウントを使用してください"));
}

#[test]
fn signup_is_refused_in_demo_mode() {
    let home = tempfile::TempDir::new().unwrap();
    let out = careplan(
        home.path(),
        &[
            "signup",
            "--email",
            "nurse@example.com",
            "--full-name",
            "佐藤 美咲",
            "--password",
            "secret1",
        ],
    );
    assert!(!out.status.success());
    assert!(stderr(&out).contains("デモモードではアカウントを作成できません"));
    assert!(!home.path().join("careplan/session.json").exists());
}

#[test]
fn login_persists_until_logout() {
    let home = tempfile::TempDir::new().unwrap();
    login(home.path());

    let out = careplan(home.path(), &["whoami"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("看護師"));
    assert!(text.contains("offline"));

    let out = careplan(home.path(), &["logout"]);
    assert!(out.status.success());
    assert!(!careplan(home.path(), &["whoami"]).status.success());
}

// -----------------------------------------------------------------------
// Tests: patients, plans, dashboard
// -----------------------------------------------------------------------

#[test]
fn patient_list_and_filter() {
    let home = tempfile::TempDir::new().unwrap();
    login(home.path());

    let out = careplan(home.path(), &["patient", "list"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("鈴木 一郎"));
    assert!(text.contains("田中 花子"));
    assert!(text.contains("(3 patients)"));

    let out = careplan(home.path(), &["patient", "list", "--search", "渋谷"]);
    let text = stdout(&out);
    assert!(text.contains("田中 花子"));
    assert!(!text.contains("鈴木 一郎"));
}

#[test]
fn plan_create_uses_fallback_and_applies_edits() {
    let home = tempfile::TempDir::new().unwrap();
    login(home.path());

    let out = careplan(
        home.path(),
        &[
            "plan",
            "create",
            "--patient",
            "鈴木 一郎",
            "--visit-type",
            "both",
            "--date",
            "2025-04-10",
            "--health-status",
            "血圧不安定",
            "--edit",
            "goals.0=custom goal",
        ],
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).contains("draft generation failed"));
    let text = stdout(&out);
    assert!(text.contains("Care plan saved."));
    assert!(text.contains("2025年4月"));
    assert!(text.contains("作成済み"));
    assert!(text.contains("0. custom goal"));
}

#[test]
fn plan_create_rejects_out_of_range_edit() {
    let home = tempfile::TempDir::new().unwrap();
    login(home.path());

    let out = careplan(
        home.path(),
        &["plan", "create", "--patient", "田中 花子", "--edit", "issues.7=x"],
    );
    assert!(!out.status.success());
    assert!(stderr(&out).contains("does not exist"));
}

#[test]
fn plan_export_writes_json() {
    let home = tempfile::TempDir::new().unwrap();
    login(home.path());

    let id = "00000000-0000-0000-0000-000000000065";
    let out = careplan(home.path(), &["plan", "export", id]);
    assert!(out.status.success(), "{}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["id"], id);
    assert_eq!(json["status"], "completed");
    assert_eq!(json["month"], 3);

    let file = home.path().join("plan.json");
    let out = careplan(
        home.path(),
        &["plan", "export", id, "--output", file.to_str().unwrap()],
    );
    assert!(out.status.success());
    let out = careplan(home.path(), &["plan", "show", file.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("血圧を安定させる"));
}

#[test]
fn dashboard_lists_patients_needing_a_plan() {
    let home = tempfile::TempDir::new().unwrap();
    login(home.path());

    let out = careplan(home.path(), &["dashboard", "--date", "2025-03-27"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("2025年3月"));
    assert!(text.contains("Needing a plan:    1"));
    assert!(text.contains("佐藤 健太"));
    assert!(text.contains("last plan 2025年2月"));
    assert!(text.contains("あと4日"));
}

// -----------------------------------------------------------------------
// Tests: settings, completions
// -----------------------------------------------------------------------

#[test]
fn settings_persist() {
    let home = tempfile::TempDir::new().unwrap();

    let out = careplan(home.path(), &["settings", "show"]);
    assert!(stdout(&out).contains("theme    = light"));

    let out = careplan(home.path(), &["settings", "set", "theme", "dark"]);
    assert!(out.status.success());
    let out = careplan(home.path(), &["settings", "set", "fontSize", "huge"]);
    assert!(!out.status.success());

    let out = careplan(home.path(), &["settings", "show"]);
    let text = stdout(&out);
    assert!(text.contains("theme    = dark"));
    assert!(text.contains("fontSize = medium"));
    assert!(home.path().join("careplan/settings.json").is_file());
}

#[test]
fn completions_are_generated() {
    let home = tempfile::TempDir::new().unwrap();
    let out = careplan(home.path(), &["completions", "bash"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("careplan"));
}

// -----------------------------------------------------------------------
// Tests: database-backed plan flow
// -----------------------------------------------------------------------

#[tokio::test]
#[ignore = "requires docker"]
async fn wizard_commits_to_postgres() {
    let (pool, db_name) = create_test_db().await;

    let mut new = new_patient("鈴木 一郎");
    new.medical_history = Some("高血圧".into());
    let patient = insert_patient(&pool, &new).await;

    let store = PlanStore::new(Arc::new(PgStore::new(pool.clone())));
    let generator = DraftGenerator::new(Arc::new(UnavailableGenerator));

    let mut wizard = PlanWizard::new(TEST_USER_ID, NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
    wizard.select_patient(patient.clone()).unwrap();
    wizard.advance().unwrap();
    wizard.assessment_mut().unwrap().health_status = Some("血圧不安定".into());
    wizard.generate(&generator).await.unwrap();
    wizard
        .edit_item(DraftSection::Goals, 0, "custom goal")
        .unwrap();
    let saved = wizard.commit(&store).await.unwrap().clone();
    assert_eq!(wizard.saved_source(), Some(Source::Backend));

    let april = Period::new(4, 2025).unwrap();
    let stored = store
        .find_by_period(patient.id, april)
        .await
        .into_value()
        .expect("plan should be stored");
    assert_eq!(stored.id, saved.id);
    assert_eq!(stored.status, PlanStatus::Completed);
    assert_eq!(stored.goals[0], "custom goal");
    assert_eq!(stored.health_status.as_deref(), Some("血圧不安定"));

    pool.close().await;
    drop_test_db(&db_name).await;
}
