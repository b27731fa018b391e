//! Per-invocation application state: resolved config, services and session.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};

use careplan_core::auth::{AuthContext, Session};
use careplan_core::draft::DraftGenerator;
use careplan_core::mode::OperatingMode;
use careplan_core::services::Services;
use careplan_core::store::Fetched;

use crate::config::{self, CareplanConfig};
use crate::session;

pub struct AppContext {
    pub config: CareplanConfig,
    pub services: Services,
    pub auth: AuthContext,
    pub generator: DraftGenerator,
    session_path: PathBuf,
}

impl AppContext {
    pub fn open(cli_db_url: Option<&str>) -> Result<Self> {
        let config = CareplanConfig::resolve(cli_db_url)?;
        let services = Services::connect(config.mode, &config.backend)?;
        let session_path = config::session_path();
        let auth = AuthContext::new(config.mode, config.backend.auth.clone())
            .restore(session::load_session(&session_path));
        let generator = DraftGenerator::from_config(&config.generator);
        Ok(Self {
            config,
            services,
            auth,
            generator,
            session_path,
        })
    }

    pub fn mode(&self) -> OperatingMode {
        self.config.mode
    }

    /// The signed-in session, or an error asking the user to log in.
    pub fn require_session(&self) -> Result<&Session> {
        self.auth
            .session()
            .context("not signed in; run `careplan login` first")
    }

    pub fn persist_session(&self) -> Result<()> {
        match self.auth.session() {
            Some(s) => session::save_session(&self.session_path, s),
            None => session::clear_session(&self.session_path),
        }
    }

    /// Print a notice on stderr when a result came from demo data.
    pub fn note_fallback<T>(&self, fetched: &Fetched<T>) {
        if fetched.is_fallback() {
            eprintln!("warning: backend unavailable; result is demo data or a local copy");
        }
    }

    /// After a write: demo modes keep rows in memory only.
    pub fn note_write<T>(&self, fetched: &Fetched<T>) {
        self.note_fallback(fetched);
        if !fetched.is_fallback() && self.mode().uses_demo_data() {
            eprintln!("note: {} mode; changes last only for this run", self.mode());
        }
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
