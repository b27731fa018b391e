//! Operating mode: how much of the hosted backend is used.

use std::env;
use std::fmt;

use tracing::info;

use careplan_db::config::BackendConfig;

pub const DEMO_MODE_ENV: &str = "CAREPLAN_DEMO_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Backend auth and backend data.
    Live,
    /// Backend auth, demo data.
    PartialDemo,
    /// No backend at all. Only the demo credential signs in.
    Offline,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::PartialDemo => "partial-demo",
            Self::Offline => "offline",
        })
    }
}

impl OperatingMode {
    /// Decide the mode from the demo flag value and what is configured.
    ///
    /// `"true"` forces offline. `"partial"` selects partial demo when an
    /// auth endpoint is configured. Otherwise the mode is live when a
    /// database is configured and offline when not.
    pub fn resolve(demo_flag: Option<&str>, backend: &BackendConfig) -> Self {
        match demo_flag.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("true") => Self::Offline,
            Some("partial") if backend.auth.is_some() => Self::PartialDemo,
            Some("partial") => Self::Offline,
            _ if backend.has_database() => Self::Live,
            _ => Self::Offline,
        }
    }

    /// [`Self::resolve`] with the flag read from `CAREPLAN_DEMO_MODE`.
    pub fn from_env(backend: &BackendConfig) -> Self {
        let flag = env::var(DEMO_MODE_ENV).ok();
        let mode = Self::resolve(flag.as_deref(), backend);
        match mode {
            Self::Offline => info!("running in offline demo mode; backend access disabled"),
            Self::PartialDemo => info!("running in partial demo mode; backend auth with demo data"),
            Self::Live => {}
        }
        mode
    }

    pub fn uses_demo_data(self) -> bool {
        self != Self::Live
    }

    pub fn uses_remote_auth(self) -> bool {
        self != Self::Offline
    }
}
