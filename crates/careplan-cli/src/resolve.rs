//! Patient and plan ID resolution.
//!
//! - [`resolve_plan_id`] accepts either a UUID string or a path to a plan
//!   exported with `careplan plan export`, whose `id` field is used.
//! - [`match_patient`] accepts a UUID, a unique UUID prefix or an exact name.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use uuid::Uuid;

use careplan_db::models::Patient;

/// Determine whether `input` refers to an export file or a bare UUID, and
/// return the resolved plan UUID.
pub fn resolve_plan_id(input: &str) -> Result<Uuid> {
    if looks_like_file_path(input) {
        return read_plan_id_from_file(input);
    }
    match Uuid::parse_str(input) {
        Ok(uuid) => Ok(uuid),
        Err(_) if Path::new(input).is_file() => read_plan_id_from_file(input),
        Err(uuid_err) => Err(uuid_err).with_context(|| {
            format!("invalid plan ID: {input:?} (not a valid UUID and not a file)")
        }),
    }
}

fn looks_like_file_path(input: &str) -> bool {
    input.ends_with(".json") || input.contains('/')
}

#[derive(Deserialize)]
struct ExportedId {
    id: Option<Uuid>,
}

fn read_plan_id_from_file(path: &str) -> Result<Uuid> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file: {path}"))?;
    let exported: ExportedId =
        serde_json::from_str(&content).with_context(|| format!("failed to parse JSON from {path}"))?;
    match exported.id {
        Some(id) => Ok(id),
        None => bail!("plan file {path:?} has no id field"),
    }
}

/// Pick one patient out of `patients` by UUID, unique UUID prefix (at least
/// four characters) or exact name.
pub fn match_patient(patients: Vec<Patient>, input: &str) -> Result<Patient> {
    let input = input.trim();
    if let Ok(id) = Uuid::parse_str(input) {
        return patients
            .into_iter()
            .find(|p| p.id == id)
            .with_context(|| format!("patient {id} not found"));
    }

    let by_name: Vec<&Patient> = patients.iter().filter(|p| p.name == input).collect();
    if by_name.len() == 1 {
        return Ok(by_name[0].clone());
    }
    if by_name.len() > 1 {
        bail!("{} patients are named {input:?}; use the ID instead", by_name.len());
    }

    if input.len() >= 4 {
        let prefix = input.to_ascii_lowercase();
        let mut hits = patients
            .into_iter()
            .filter(|p| p.id.to_string().starts_with(&prefix));
        match (hits.next(), hits.next()) {
            (Some(p), None) => return Ok(p),
            (Some(_), Some(_)) => bail!("patient ID prefix {input:?} is ambiguous"),
            _ => {}
        }
    }
    bail!("no patient matches {input:?}")
}
