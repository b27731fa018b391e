mod auth_cmds;
mod config;
mod context;
mod dashboard_cmd;
mod patient_cmds;
mod plan_cmds;
mod resolve;
mod session;
mod settings_cmd;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use careplan_core::directory::{PlanFilter, SortKey};
use careplan_core::draft::DraftSection;
use careplan_db::config::DbConfig;
use careplan_db::models::{AdlLevel, CareLevel, Gender, InsuranceType, PlanStatus, VisitType};
use careplan_db::pool;

use context::AppContext;

#[derive(Parser)]
#[command(name = "careplan", about = "Monthly care plans for home-visit nursing")]
pub struct Cli {
    /// Database URL (overrides CAREPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a careplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long)]
        db_url: Option<String>,
        /// Auth service base URL
        #[arg(long, requires = "anon_key")]
        auth_url: Option<String>,
        /// Public API key for the auth service
        #[arg(long, requires = "auth_url")]
        anon_key: Option<String>,
        /// Gemini API key for draft generation
        #[arg(long)]
        gemini_api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the care-plan database and run migrations
    DbInit,
    /// Sign in as a staff member
    Login {
        #[arg(long)]
        email: String,
        /// Password (falls back to CAREPLAN_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
    /// Register a new staff account (does not sign in)
    Signup {
        #[arg(long)]
        email: String,
        /// Name shown for the account
        #[arg(long)]
        full_name: String,
        #[arg(long, default_value = careplan_core::auth::DEFAULT_SIGNUP_ROLE)]
        role: String,
        /// Password, at least 6 characters (falls back to CAREPLAN_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the saved session
    Logout,
    /// Show the signed-in staff member and operating mode
    Whoami,
    /// Patient directory
    Patient {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Monthly care plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Show this month's progress and the patients still needing a plan
    Dashboard {
        /// Evaluate as of this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Display settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

/// Patient fields shared by `patient add` and `patient update`.
#[derive(clap::Args, Debug, Default)]
pub struct PatientFields {
    #[arg(long)]
    pub name: Option<String>,
    /// male, female, other (or 男性, 女性, その他)
    #[arg(long)]
    pub gender: Option<Gender>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub birthdate: Option<NaiveDate>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub emergency_contact: Option<String>,
    #[arg(long)]
    pub medical_history: Option<String>,
    #[arg(long)]
    pub primary_doctor: Option<String>,
    /// long_term_care, medical, self_pay, other
    #[arg(long)]
    pub insurance_type: Option<InsuranceType>,
    /// not_applied, independent, support_1..2, care_1..5
    #[arg(long)]
    pub care_level: Option<CareLevel>,
}

#[derive(Subcommand)]
pub enum PatientCommands {
    /// List patients with search, filter, sort and paging
    List {
        /// Case-insensitive match on name or address
        #[arg(long)]
        search: Option<String>,
        /// all, needs-plan, has-plan
        #[arg(long, default_value = "all")]
        filter: PlanFilter,
        /// name, age, care-level, created
        #[arg(long, default_value = "name")]
        sort: SortKey,
        /// Reverse the sort order
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = careplan_core::directory::query::DEFAULT_PER_PAGE)]
        per_page: usize,
    },
    /// Show one patient and their plans
    Show {
        /// Patient ID, ID prefix or exact name
        patient: String,
    },
    /// Register a patient
    Add {
        #[command(flatten)]
        fields: PatientFields,
    },
    /// Change fields of a patient (an empty value clears an optional field)
    Update {
        patient: String,
        #[command(flatten)]
        fields: PatientFields,
    },
    /// Delete a patient and all of their plans
    Delete {
        patient: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Assessment fields shared by `plan create` and `plan update`.
#[derive(clap::Args, Debug, Default)]
pub struct AssessmentFields {
    #[arg(long)]
    pub health_status: Option<String>,
    /// independent, supervision, partial, complete
    #[arg(long)]
    pub mobility: Option<AdlLevel>,
    #[arg(long)]
    pub eating: Option<AdlLevel>,
    #[arg(long)]
    pub toilet: Option<AdlLevel>,
    #[arg(long)]
    pub bathing: Option<AdlLevel>,
    #[arg(long)]
    pub family_request: Option<String>,
    #[arg(long)]
    pub doctor_instructions: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// List a patient's plans, newest first
    List {
        #[arg(long)]
        patient: String,
    },
    /// Show plan details
    Show {
        /// Plan ID or path to an exported plan
        plan: String,
    },
    /// Create this month's plan: assess, generate a draft, edit, save
    Create {
        #[arg(long)]
        patient: String,
        /// nurse, rehab, both
        #[arg(long, default_value = "both")]
        visit_type: VisitType,
        /// Plan date (YYYY-MM-DD); the plan's month comes from it
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        assessment: AssessmentFields,
        /// Replace a draft item: SECTION.INDEX=TEXT (e.g. goals.0=...)
        #[arg(long = "edit", value_parser = parse_item_edit)]
        edits: Vec<ItemEdit>,
        /// Append a draft item: SECTION=TEXT
        #[arg(long = "append", value_parser = parse_item_append)]
        appends: Vec<ItemAppend>,
        /// Print the draft without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Change fields of a saved plan
    Update {
        plan: String,
        #[arg(long)]
        visit_type: Option<VisitType>,
        #[arg(long)]
        status: Option<PlanStatus>,
        #[command(flatten)]
        assessment: AssessmentFields,
        /// Replace the goals (repeatable)
        #[arg(long = "goal")]
        goals: Vec<String>,
        /// Replace the issues (repeatable)
        #[arg(long = "issue")]
        issues: Vec<String>,
        /// Replace the supports (repeatable)
        #[arg(long = "support")]
        supports: Vec<String>,
    },
    /// Write a plan as JSON
    Export {
        plan: String,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<String>,
    },
    /// Delete a plan
    Delete {
        plan: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show the current display settings
    Show,
    /// Change a setting: theme (light|dark|system) or fontSize (small|medium|large)
    Set { key: String, value: String },
}

/// One `--edit` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEdit {
    pub section: DraftSection,
    pub index: usize,
    pub text: String,
}

/// One `--append` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAppend {
    pub section: DraftSection,
    pub text: String,
}

fn parse_item_edit(raw: &str) -> Result<ItemEdit, String> {
    let (target, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SECTION.INDEX=TEXT, got {raw:?}"))?;
    let (section, index) = target
        .split_once('.')
        .ok_or_else(|| format!("expected SECTION.INDEX before '=', got {target:?}"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid item index {index:?}"))?;
    Ok(ItemEdit {
        section: section.parse()?,
        index,
        text: text.to_owned(),
    })
}

fn parse_item_append(raw: &str) -> Result<ItemAppend, String> {
    let (section, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SECTION=TEXT, got {raw:?}"))?;
    Ok(ItemAppend {
        section: section.parse()?,
        text: text.to_owned(),
    })
}

/// Execute the `careplan init` command: write config file.
fn cmd_init(
    db_url: Option<String>,
    auth: Option<(String, String)>,
    gemini_api_key: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: db_url.map(|url| config::DatabaseSection { url }),
        auth: auth.map(|(url, anon_key)| config::AuthSection { url, anon_key }),
        generation: gemini_api_key.map(|key| config::GenerationSection {
            api_key: Some(key),
            ..Default::default()
        }),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    match &cfg.database {
        Some(db) => println!("  database.url = {}", db.url),
        None => println!("  no database configured: offline demo mode"),
    }
    if let Some(auth) = &cfg.auth {
        println!("  auth.url = {}", auth.url);
    }
    if cfg.generation.is_some() {
        println!("  generation.api_key = (set)");
    }
    println!();
    if cfg.database.is_some() {
        println!("Next: run `careplan db-init` to create and migrate the database.");
    } else {
        println!("Next: run `careplan login` to sign in.");
    }

    Ok(())
}

/// Execute the `careplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = config::CareplanConfig::resolve(cli_db_url)?;
    let db_config: DbConfig = match resolved.backend.db {
        Some(db) => db,
        None => anyhow::bail!(
            "no database configured; pass --database-url, set CAREPLAN_DATABASE_URL, or run `careplan init --db-url ...`"
        ),
    };

    println!("Initializing care-plan database...");

    pool::ensure_database_exists(&db_config).await?;
    let db_pool = pool::create_pool(&db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("careplan db-init complete.");
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_url = cli.database_url.as_deref();
    match cli.command {
        Commands::Init {
            db_url,
            auth_url,
            anon_key,
            gemini_api_key,
            force,
        } => cmd_init(db_url, auth_url.zip(anon_key), gemini_api_key, force),
        Commands::DbInit => cmd_db_init(db_url).await,
        Commands::Login { email, password } => {
            let mut ctx = AppContext::open(db_url)?;
            auth_cmds::cmd_login(&mut ctx, &email, password).await
        }
        Commands::Signup {
            email,
            full_name,
            role,
            password,
        } => {
            let ctx = AppContext::open(db_url)?;
            auth_cmds::cmd_signup(&ctx, email, full_name, role, password).await
        }
        Commands::Logout => {
            let mut ctx = AppContext::open(db_url)?;
            auth_cmds::cmd_logout(&mut ctx).await
        }
        Commands::Whoami => {
            let ctx = AppContext::open(db_url)?;
            auth_cmds::cmd_whoami(&ctx)
        }
        Commands::Patient { command } => {
            let ctx = AppContext::open(db_url)?;
            patient_cmds::run_patient_command(command, &ctx).await
        }
        Commands::Plan { command } => {
            let ctx = AppContext::open(db_url)?;
            plan_cmds::run_plan_command(command, &ctx).await
        }
        Commands::Dashboard { date } => {
            let ctx = AppContext::open(db_url)?;
            dashboard_cmd::run_dashboard(&ctx, date).await
        }
        Commands::Settings { command } => settings_cmd::run_settings_command(command),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "careplan", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn item_edit_parsing() {
        assert_eq!(
            parse_item_edit("goals.0=custom goal").unwrap(),
            ItemEdit {
                section: DraftSection::Goals,
                index: 0,
                text: "custom goal".into(),
            }
        );
        assert_eq!(
            parse_item_edit("支援内容.2=a=b").unwrap().text,
            "a=b"
        );
        assert!(parse_item_edit("goals=missing index").is_err());
        assert!(parse_item_edit("plans.0=x").is_err());
        assert!(parse_item_edit("goals.x=y").is_err());
    }

    #[test]
    fn item_append_parsing() {
        assert_eq!(
            parse_item_append("issues=転倒リスク").unwrap(),
            ItemAppend {
                section: DraftSection::Issues,
                text: "転倒リスク".into(),
            }
        );
        assert!(parse_item_append("issues").is_err());
    }

    #[test]
    fn plan_create_arguments() {
        let cli = Cli::try_parse_from([
            "careplan",
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
            "--append",
            "supports=家族への指導",
        ])
        .unwrap();
        let Commands::Plan {
            command:
                PlanCommands::Create {
                    visit_type,
                    date,
                    assessment,
                    edits,
                    appends,
                    dry_run,
                    ..
                },
        } = cli.command
        else {
            panic!("expected plan create");
        };
        assert_eq!(visit_type, VisitType::Both);
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 4, 10));
        assert_eq!(assessment.health_status.as_deref(), Some("血圧不安定"));
        assert_eq!(edits.len(), 1);
        assert_eq!(appends[0].section, DraftSection::Supports);
        assert!(!dry_run);
    }

    #[test]
    fn signup_defaults_role() {
        let cli = Cli::try_parse_from([
            "careplan",
            "signup",
            "--email",
            "nurse@example.com",
            "--full-name",
            "佐藤 美咲",
        ])
        .unwrap();
        let Commands::Signup { role, password, .. } = cli.command else {
            panic!("expected signup");
        };
        assert_eq!(role, "user");
        assert!(password.is_none());
    }

    #[test]
    fn patient_list_rejects_unknown_filter() {
        assert!(
            Cli::try_parse_from(["careplan", "patient", "list", "--filter", "recent"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["careplan", "patient", "list", "--filter", "needs-plan"]).is_ok()
        );
    }
}
