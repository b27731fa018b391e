//! careplan-db
//!
//! Row types, enumerations, backend configuration, connection pooling and
//! SQL query functions for the `patients` and `care_plans` tables.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
