//! Domain logic for the monthly care-plan workflow.
//!
//! Storage is reached through the traits in [`store`]; the services built on
//! top of them ([`directory::PatientDirectory`], [`plans::PlanStore`]) decide
//! how to degrade when the backend fails.

pub mod auth;
pub mod completeness;
pub mod directory;
pub mod draft;
pub mod fixtures;
pub mod mode;
pub mod plans;
pub mod services;
pub mod settings;
pub mod store;
pub mod wizard;
