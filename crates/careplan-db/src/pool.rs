//! Connection pools, embedded migrations and database bootstrap.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Schema for `patients` and `care_plans`, from `crates/careplan-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const MAX_CONNECTIONS: u32 = 5;

/// Tables reported by [`table_counts`], parent first.
pub const TABLES: [&str; 2] = ["patients", "care_plans"];

fn options(max_connections: u32, acquire_secs: u64) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(acquire_secs))
}

/// Connect eagerly; fails if the server cannot be reached.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    options(MAX_CONNECTIONS, 10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the care-plan database")
}

/// Pool that opens connections on first use.
///
/// Construction only validates the URL. An unreachable server shows up as a
/// per-query error after a short acquire timeout.
pub fn create_lazy_pool(config: &DbConfig) -> Result<PgPool> {
    options(MAX_CONNECTIONS, 5)
        .connect_lazy(&config.database_url)
        .context("invalid care-plan database URL")
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to apply care-plan migrations")?;
    info!("care-plan schema is up to date");
    Ok(())
}

/// Create the configured database through the `postgres` maintenance
/// database unless it already exists.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let name = config
        .database_name()
        .context("database URL names no database")?;
    // CREATE DATABASE cannot take a bind parameter.
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("refusing to create database {name:?}: use letters, digits and underscores");
    }

    let admin = options(1, 10)
        .connect(&config.maintenance_url())
        .await
        .context("failed to connect to the maintenance database")?;

    let present: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&admin)
            .await
            .context("failed to look up pg_database")?;

    if present {
        info!(db = name, "care-plan database already present");
    } else {
        admin
            .execute(format!("CREATE DATABASE {name}").as_str())
            .await
            .with_context(|| format!("failed to create database {name}"))?;
        info!(db = name, "care-plan database created");
    }

    admin.close().await;
    Ok(())
}

/// Row count per table in [`TABLES`].
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table.to_owned(), count));
    }
    Ok(counts)
}
