use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Error returned when a string names no variant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

/// Declares a closed enumeration stored as snake_case text, with a Japanese
/// display label. `FromStr` and serde accept either form.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $kind:literal {
            $( $variant:ident => ($wire:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize, sqlx::Type,
        )]
        #[sqlx(type_name = "text")]
        pub enum $name {
            $(
                #[serde(rename = $wire, alias = $label)]
                #[sqlx(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in ordinal order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable wire / database form.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            /// Japanese display label.
            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s || v.label() == s)
                    .ok_or_else(|| EnumParseError {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }
    };
}

labeled_enum! {
    /// Patient gender as recorded on the intake form.
    pub enum Gender as "gender" {
        Male => ("male", "男性"),
        Female => ("female", "女性"),
        Other => ("other", "その他"),
    }
}

labeled_enum! {
    /// Insurance category that funds the visits.
    pub enum InsuranceType as "insurance type" {
        LongTermCare => ("long_term_care", "介護保険"),
        Medical => ("medical", "医療保険"),
        SelfPay => ("self_pay", "自費"),
        Other => ("other", "その他"),
    }
}

labeled_enum! {
    /// Certified care level, ordered from least to most support required.
    pub enum CareLevel as "care level" {
        NotApplied => ("not_applied", "未申請"),
        Independent => ("independent", "自立"),
        Support1 => ("support_1", "要支援1"),
        Support2 => ("support_2", "要支援2"),
        Care1 => ("care_1", "要介護1"),
        Care2 => ("care_2", "要介護2"),
        Care3 => ("care_3", "要介護3"),
        Care4 => ("care_4", "要介護4"),
        Care5 => ("care_5", "要介護5"),
    }
}

impl CareLevel {
    /// True for the 要介護 grades (care 1 through 5).
    pub fn requires_care(self) -> bool {
        self >= Self::Care1
    }
}

labeled_enum! {
    /// Which staff disciplines visit the patient.
    pub enum VisitType as "visit type" {
        Nurse => ("nurse", "看護師のみ"),
        Rehab => ("rehab", "リハビリ職員のみ"),
        Both => ("both", "両方"),
    }
}

labeled_enum! {
    /// Self-sufficiency rating for one activity of daily living.
    pub enum AdlLevel as "ADL level" {
        Independent => ("independent", "自立"),
        Supervision => ("supervision", "見守り"),
        Partial => ("partial", "部分介助"),
        Complete => ("complete", "全介助"),
    }
}

labeled_enum! {
    /// Lifecycle status of a care plan document.
    pub enum PlanStatus as "plan status" {
        Draft => ("draft", "下書き"),
        Completed => ("completed", "作成済み"),
    }
}

impl Default for VisitType {
    fn default() -> Self {
        Self::Both
    }
}

impl Default for AdlLevel {
    fn default() -> Self {
        Self::Independent
    }
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// Error returned for an out-of-range month.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month {month} (expected 1-12)")]
pub struct PeriodError {
    pub month: u32,
}

/// The (month, year) a care plan covers.
///
/// Field order makes the derived ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError { month });
        }
        Ok(Self { year, month })
    }

    /// The period containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the period.
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Number of days in the period's month.
    pub fn days_in_month(self) -> u32 {
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        match next {
            Some(next) => (next - self.first_day()).num_days() as u32,
            None => 31,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}年{}月", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A patient receiving home visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub gender: Gender,
    pub birthdate: NaiveDate,
    pub address: String,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<String>,
    pub primary_doctor: Option<String>,
    pub insurance_type: InsuranceType,
    pub care_level: CareLevel,
    /// Staff account that registered the patient.
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Age in whole years on `today`.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        age_between(self.birthdate, today)
    }
}

/// Whole years elapsed from `birthdate` to `today`; zero for future dates.
pub fn age_between(birthdate: NaiveDate, today: NaiveDate) -> u32 {
    today.years_since(birthdate).unwrap_or(0)
}

/// The four ADL ratings recorded in an assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdlRatings {
    pub mobility: AdlLevel,
    pub eating: AdlLevel,
    pub toilet: AdlLevel,
    pub bathing: AdlLevel,
}

/// A monthly care plan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CarePlan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub user_id: String,
    pub visit_type: VisitType,
    pub health_status: Option<String>,
    pub adl_mobility: AdlLevel,
    pub adl_eating: AdlLevel,
    pub adl_toilet: AdlLevel,
    pub adl_bathing: AdlLevel,
    pub patient_family_request: Option<String>,
    pub doctor_instructions: Option<String>,
    pub staff_notes: Option<String>,
    pub goals: Vec<String>,
    pub issues: Vec<String>,
    pub supports: Vec<String>,
    pub status: PlanStatus,
    pub month: i32,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CarePlan {
    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month as u32,
        }
    }

    pub fn adl(&self) -> AdlRatings {
        AdlRatings {
            mobility: self.adl_mobility,
            eating: self.adl_eating,
            toilet: self.adl_toilet,
            bathing: self.adl_bathing,
        }
    }
}

// ---------------------------------------------------------------------------
// Insert / update payloads
// ---------------------------------------------------------------------------

/// Fields supplied when registering a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub gender: Gender,
    pub birthdate: NaiveDate,
    pub address: String,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<String>,
    pub primary_doctor: Option<String>,
    pub insurance_type: InsuranceType,
    pub care_level: CareLevel,
    pub user_id: String,
}

impl NewPatient {
    /// Materialize the row locally (in-memory store, degraded writes).
    pub fn into_patient(self, id: Uuid, now: DateTime<Utc>) -> Patient {
        Patient {
            id,
            name: self.name.trim().to_owned(),
            gender: self.gender,
            birthdate: self.birthdate,
            address: self.address.trim().to_owned(),
            phone: non_blank(self.phone),
            emergency_contact: non_blank(self.emergency_contact),
            medical_history: non_blank(self.medical_history),
            primary_doctor: non_blank(self.primary_doctor),
            insurance_type: self.insurance_type,
            care_level: self.care_level,
            user_id: self.user_id,
            created_at: now,
        }
    }
}

/// Partial patient update. `None` leaves a field untouched; for optional
/// text fields an empty string clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub birthdate: Option<NaiveDate>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<String>,
    pub primary_doctor: Option<String>,
    pub insurance_type: Option<InsuranceType>,
    pub care_level: Option<CareLevel>,
}

impl PatientUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, patient: &mut Patient) {
        if let Some(name) = &self.name {
            patient.name = name.trim().to_owned();
        }
        if let Some(gender) = self.gender {
            patient.gender = gender;
        }
        if let Some(birthdate) = self.birthdate {
            patient.birthdate = birthdate;
        }
        if let Some(address) = &self.address {
            patient.address = address.trim().to_owned();
        }
        merge_optional(&mut patient.phone, &self.phone);
        merge_optional(&mut patient.emergency_contact, &self.emergency_contact);
        merge_optional(&mut patient.medical_history, &self.medical_history);
        merge_optional(&mut patient.primary_doctor, &self.primary_doctor);
        if let Some(insurance_type) = self.insurance_type {
            patient.insurance_type = insurance_type;
        }
        if let Some(care_level) = self.care_level {
            patient.care_level = care_level;
        }
    }
}

/// Fields supplied when creating a care plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCarePlan {
    pub patient_id: Uuid,
    pub user_id: String,
    pub visit_type: VisitType,
    pub health_status: Option<String>,
    pub adl: AdlRatings,
    pub patient_family_request: Option<String>,
    pub doctor_instructions: Option<String>,
    pub staff_notes: Option<String>,
    pub goals: Vec<String>,
    pub issues: Vec<String>,
    pub supports: Vec<String>,
    pub status: PlanStatus,
    pub period: Period,
}

impl NewCarePlan {
    /// Materialize the row locally with `created_at == updated_at == now`.
    pub fn into_plan(self, id: Uuid, now: DateTime<Utc>) -> CarePlan {
        CarePlan {
            id,
            patient_id: self.patient_id,
            user_id: self.user_id,
            visit_type: self.visit_type,
            health_status: non_blank(self.health_status),
            adl_mobility: self.adl.mobility,
            adl_eating: self.adl.eating,
            adl_toilet: self.adl.toilet,
            adl_bathing: self.adl.bathing,
            patient_family_request: non_blank(self.patient_family_request),
            doctor_instructions: non_blank(self.doctor_instructions),
            staff_notes: non_blank(self.staff_notes),
            goals: self.goals,
            issues: self.issues,
            supports: self.supports,
            status: self.status,
            month: self.period.month as i32,
            year: self.period.year,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial care plan update. The period key is not editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarePlanUpdate {
    pub visit_type: Option<VisitType>,
    pub health_status: Option<String>,
    pub adl_mobility: Option<AdlLevel>,
    pub adl_eating: Option<AdlLevel>,
    pub adl_toilet: Option<AdlLevel>,
    pub adl_bathing: Option<AdlLevel>,
    pub patient_family_request: Option<String>,
    pub doctor_instructions: Option<String>,
    pub staff_notes: Option<String>,
    pub goals: Option<Vec<String>>,
    pub issues: Option<Vec<String>>,
    pub supports: Option<Vec<String>>,
    pub status: Option<PlanStatus>,
}

impl CarePlanUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the present fields into `plan` and bump `updated_at`.
    pub fn apply_to(&self, plan: &mut CarePlan, now: DateTime<Utc>) {
        if let Some(visit_type) = self.visit_type {
            plan.visit_type = visit_type;
        }
        merge_optional(&mut plan.health_status, &self.health_status);
        if let Some(level) = self.adl_mobility {
            plan.adl_mobility = level;
        }
        if let Some(level) = self.adl_eating {
            plan.adl_eating = level;
        }
        if let Some(level) = self.adl_toilet {
            plan.adl_toilet = level;
        }
        if let Some(level) = self.adl_bathing {
            plan.adl_bathing = level;
        }
        merge_optional(&mut plan.patient_family_request, &self.patient_family_request);
        merge_optional(&mut plan.doctor_instructions, &self.doctor_instructions);
        merge_optional(&mut plan.staff_notes, &self.staff_notes);
        if let Some(goals) = &self.goals {
            plan.goals = goals.clone();
        }
        if let Some(issues) = &self.issues {
            plan.issues = issues.clone();
        }
        if let Some(supports) = &self.supports {
            plan.supports = supports.clone();
        }
        if let Some(status) = self.status {
            plan.status = status;
        }
        plan.updated_at = now;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn merge_optional(target: &mut Option<String>, update: &Option<String>) {
    if let Some(value) = update {
        *target = non_blank(Some(value.clone()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
