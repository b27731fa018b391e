//! Wires the directory and plan store to the storage the mode calls for.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use careplan_db::config::BackendConfig;
use careplan_db::pool;

use crate::directory::PatientDirectory;
use crate::mode::OperatingMode;
use crate::plans::PlanStore;
use crate::store::{CarePlanRepository, MemoryStore, PatientRepository, PgStore};

#[derive(Clone)]
pub struct Services {
    pub directory: PatientDirectory,
    pub plans: PlanStore,
    pub mode: OperatingMode,
}

impl Services {
    /// Live mode uses the configured database through a lazily connecting
    /// pool, so an unreachable server degrades per call. Every other mode
    /// serves the seeded demo rows from memory.
    pub fn connect(mode: OperatingMode, backend: &BackendConfig) -> Result<Self> {
        match (mode, &backend.db) {
            (OperatingMode::Live, Some(db)) => {
                let pool = pool::create_lazy_pool(db).context("failed to set up database pool")?;
                info!(db = db.database_name().unwrap_or("?"), "using backend storage");
                Ok(Self::with_store(mode, Arc::new(PgStore::new(pool))))
            }
            (OperatingMode::Live, None) => {
                anyhow::bail!("live mode requires a database URL (set CAREPLAN_DATABASE_URL)")
            }
            _ => Ok(Self::in_memory(mode, MemoryStore::seeded())),
        }
    }

    pub fn in_memory(mode: OperatingMode, store: MemoryStore) -> Self {
        Self::with_store(mode, Arc::new(store))
    }

    fn with_store<S>(mode: OperatingMode, store: Arc<S>) -> Self
    where
        S: PatientRepository + CarePlanRepository + 'static,
    {
        Self {
            directory: PatientDirectory::new(store.clone()),
            plans: PlanStore::new(store),
            mode,
        }
    }
}
