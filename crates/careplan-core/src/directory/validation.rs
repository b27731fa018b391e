//! Patient form validation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use careplan_db::models::{NewPatient, PatientUpdate};

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2,4}-?\d{2,4}-?\d{3,4}$").expect("phone pattern is valid")
});

pub const NAME_REQUIRED: &str = "患者名を入力してください";
pub const BIRTHDATE_IN_FUTURE: &str = "生年月日に未来の日付は指定できません";
pub const ADDRESS_REQUIRED: &str = "住所を入力してください";
pub const PHONE_INVALID: &str = "正しい電話番号の形式で入力してください";

/// Field name to message, one message per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, &'static str>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.fields.get(field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, *v))
    }

    fn add(&mut self, field: &'static str, message: &'static str) {
        self.fields.entry(field).or_insert(message);
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        write!(f, "validation failed ({})", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn check_phone(errors: &mut ValidationErrors, phone: Option<&str>) {
    if let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) {
        if !PHONE_RE.is_match(phone) {
            errors.add("phone", PHONE_INVALID);
        }
    }
}

fn check_birthdate(errors: &mut ValidationErrors, birthdate: NaiveDate, today: NaiveDate) {
    if birthdate > today {
        errors.add("birthdate", BIRTHDATE_IN_FUTURE);
    }
}

/// Validate a registration form as of `today`.
pub fn validate_new_patient(new: &NewPatient, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if new.name.trim().is_empty() {
        errors.add("name", NAME_REQUIRED);
    }
    check_birthdate(&mut errors, new.birthdate, today);
    if new.address.trim().is_empty() {
        errors.add("address", ADDRESS_REQUIRED);
    }
    check_phone(&mut errors, new.phone.as_deref());
    errors.into_result()
}

/// Validate the fields an update touches. Required fields may not be
/// cleared.
pub fn validate_patient_update(update: &PatientUpdate, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        errors.add("name", NAME_REQUIRED);
    }
    if let Some(birthdate) = update.birthdate {
        check_birthdate(&mut errors, birthdate, today);
    }
    if update.address.as_deref().is_some_and(|a| a.trim().is_empty()) {
        errors.add("address", ADDRESS_REQUIRED);
    }
    check_phone(&mut errors, update.phone.as_deref());
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use careplan_db::models::{CareLevel, Gender, InsuranceType};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    fn form() -> NewPatient {
        NewPatient {
            name: "鈴木 一郎".into(),
            gender: Gender::Male,
            birthdate: NaiveDate::from_ymd_opt(1945, 5, 15).unwrap(),
            address: "東京都新宿区西新宿1-1-1".into(),
            phone: Some("03-1234-5678".into()),
            emergency_contact: None,
            medical_history: None,
            primary_doctor: None,
            insurance_type: InsuranceType::LongTermCare,
            care_level: CareLevel::Care2,
            user_id: "12345".into(),
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(validate_new_patient(&form(), today()).is_ok());
    }

    #[test]
    fn phone_formats() {
        for ok in ["03-1234-5678", "0312345678", "090-1234-5678", "045-123-4567"] {
            let mut f = form();
            f.phone = Some(ok.into());
            assert!(validate_new_patient(&f, today()).is_ok(), "{ok} should pass");
        }
        for bad in ["03-12-34", "phone", "03-1234-5678-9"] {
            let mut f = form();
            f.phone = Some(bad.into());
            let errs = validate_new_patient(&f, today()).unwrap_err();
            assert_eq!(errs.get("phone"), Some(PHONE_INVALID), "{bad} should fail");
        }
    }

    #[test]
    fn required_fields_and_future_birthdate() {
        let mut f = form();
        f.name = "  ".into();
        f.address = String::new();
        f.birthdate = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let errs = validate_new_patient(&f, today()).unwrap_err();
        assert_eq!(errs.get("name"), Some(NAME_REQUIRED));
        assert_eq!(errs.get("address"), Some(ADDRESS_REQUIRED));
        assert_eq!(errs.get("birthdate"), Some(BIRTHDATE_IN_FUTURE));
        assert!(errs.to_string().contains("患者名を入力してください"));
    }

    #[test]
    fn update_cannot_clear_required_fields() {
        let update = PatientUpdate {
            name: Some(String::new()),
            phone: Some(String::new()),
            ..Default::default()
        };
        let errs = validate_patient_update(&update, today()).unwrap_err();
        assert_eq!(errs.get("name"), Some(NAME_REQUIRED));
        assert_eq!(errs.get("phone"), None);
    }
}
