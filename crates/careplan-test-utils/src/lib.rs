//! PostgreSQL harness for care-plan integration tests.
//!
//! A test binary shares one server. Each test gets a throwaway database
//! named `careplan_test_<uuid>` with the care-plan schema migrated in.
//!
//! Set `CAREPLAN_TEST_PG_URL` (server root, no database name) to reuse an
//! existing server; otherwise a `postgres:16` container is started the
//! first time a test asks for a database.

use std::time::Duration;

use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use careplan_db::models::{CareLevel, Gender, InsuranceType, NewPatient, Patient};
use careplan_db::{pool, queries};

pub const TEST_PG_URL_ENV: &str = "CAREPLAN_TEST_PG_URL";

/// Staff id stamped on rows created through these helpers.
pub const TEST_USER_ID: &str = "test-staff";

enum Server {
    External(String),
    Container {
        root_url: String,
        _handle: ContainerAsync<Postgres>,
    },
}

impl Server {
    fn root_url(&self) -> &str {
        match self {
            Self::External(url) => url,
            Self::Container { root_url, .. } => root_url,
        }
    }
}

static SERVER: OnceCell<Server> = OnceCell::const_new();

async fn start_server() -> Server {
    if let Ok(url) = std::env::var(TEST_PG_URL_ENV) {
        return Server::External(url.trim_end_matches('/').to_owned());
    }

    let handle = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("postgres container should start (is docker running?)");
    let host = handle.get_host().await.expect("container host");
    let port = handle
        .get_host_port_ipv4(5432)
        .await
        .expect("container port 5432 should be mapped");

    Server::Container {
        root_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _handle: handle,
    }
}

/// Root URL of the shared server, without a database name.
pub async fn pg_url() -> &'static str {
    SERVER.get_or_init(start_server).await.root_url()
}

async fn connect(database: &str, max_connections: u32) -> PgPool {
    let url = format!("{}/{database}", pg_url().await);
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .unwrap_or_else(|e| panic!("cannot connect to {database}: {e}"))
}

/// Create a migrated throwaway database.
///
/// Returns `(pool, db_name)`; hand `db_name` to [`drop_test_db`] when done.
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("careplan_test_{}", Uuid::new_v4().simple());

    let admin = connect("postgres", 1).await;
    admin
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("cannot create {db_name}: {e}"));
    admin.close().await;

    let pool = connect(&db_name, 5).await;
    pool::run_migrations(&pool)
        .await
        .expect("care-plan migrations should apply to a fresh database");
    (pool, db_name)
}

/// Drop a throwaway database, kicking out connections still attached to it.
pub async fn drop_test_db(db_name: &str) {
    let admin = connect("postgres", 1).await;
    let _ = sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(db_name)
    .execute(&admin)
    .await;
    let _ = admin
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    admin.close().await;
}

/// A valid registration for `name`, owned by [`TEST_USER_ID`].
pub fn new_patient(name: &str) -> NewPatient {
    NewPatient {
        name: name.to_owned(),
        gender: Gender::Other,
        birthdate: NaiveDate::from_ymd_opt(1940, 1, 1).expect("valid date"),
        address: "東京都千代田区1-1".into(),
        phone: None,
        emergency_contact: None,
        medical_history: None,
        primary_doctor: None,
        insurance_type: InsuranceType::LongTermCare,
        care_level: CareLevel::Care1,
        user_id: TEST_USER_ID.into(),
    }
}

/// Insert `new` and return the stored row.
pub async fn insert_patient(pool: &PgPool, new: &NewPatient) -> Patient {
    queries::patients::insert_patient(pool, new)
        .await
        .expect("test patient insert should succeed")
}
