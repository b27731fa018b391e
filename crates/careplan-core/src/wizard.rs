//! Plan Creation Wizard.
//!
//! A finite-state workflow that walks staff through one monthly plan:
//!
//! ```text
//! PatientAndVisitSelection -> Assessment -> Generating -> ReviewAndEdit -> Saved
//! ```
//!
//! Steps are never skipped. [`PlanWizard::back`] steps from Assessment to
//! selection and from ReviewAndEdit to Assessment, keeping entered data.
//! Dropping the wizard (or [`PlanWizard::abandon`]) persists nothing.

use std::fmt;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use careplan_db::models::{
    AdlLevel, CarePlan, NewCarePlan, Patient, Period, PlanStatus, VisitType,
};

use crate::draft::{Assessment, DraftContent, DraftGenerator, DraftOrigin, DraftSection};
use crate::plans::PlanStore;
use crate::store::{Fetched, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    PatientAndVisitSelection,
    Assessment,
    /// A generation call is in flight.
    Generating,
    ReviewAndEdit,
    Saved,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PatientAndVisitSelection => "patient and visit selection",
            Self::Assessment => "assessment",
            Self::Generating => "generating",
            Self::ReviewAndEdit => "review and edit",
            Self::Saved => "saved",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("no patient selected")]
    NoPatientSelected,

    #[error("not allowed in step {actual} (requires {expected})")]
    WrongStep { expected: WizardStep, actual: WizardStep },

    #[error("cannot go back from step {0}")]
    CannotGoBack(WizardStep),

    #[error("{section} item {index} does not exist ({len} items)")]
    ItemOutOfRange {
        section: DraftSection,
        index: usize,
        len: usize,
    },
}

/// State of one plan-creation session.
#[derive(Debug, Clone)]
pub struct PlanWizard {
    step: WizardStep,
    user_id: String,
    patient: Option<Patient>,
    visit_type: VisitType,
    plan_date: NaiveDate,
    assessment: Assessment,
    draft: Option<DraftContent>,
    draft_origin: Option<DraftOrigin>,
    saved: Option<CarePlan>,
    saved_source: Option<Source>,
}

impl PlanWizard {
    /// Start a session for staff member `user_id` with the plan dated
    /// `plan_date`.
    pub fn new(user_id: impl Into<String>, plan_date: NaiveDate) -> Self {
        Self {
            step: WizardStep::PatientAndVisitSelection,
            user_id: user_id.into(),
            patient: None,
            visit_type: VisitType::default(),
            plan_date,
            assessment: Assessment::default(),
            draft: None,
            draft_origin: None,
            saved: None,
            saved_source: None,
        }
    }

    /// Start a session dated today.
    pub fn start(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Utc::now().date_naive())
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn is_busy(&self) -> bool {
        self.step == WizardStep::Generating
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    pub fn visit_type(&self) -> VisitType {
        self.visit_type
    }

    pub fn plan_date(&self) -> NaiveDate {
        self.plan_date
    }

    pub fn period(&self) -> Period {
        Period::from_date(self.plan_date)
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn draft(&self) -> Option<&DraftContent> {
        self.draft.as_ref()
    }

    pub fn draft_origin(&self) -> Option<DraftOrigin> {
        self.draft_origin
    }

    fn require(&self, expected: WizardStep) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Patient and visit selection
    // -----------------------------------------------------------------------

    /// Choose the patient. Empty assessment fields are pre-filled from the
    /// patient record; switching to another patient starts a fresh
    /// assessment.
    pub fn select_patient(&mut self, patient: Patient) -> Result<(), WizardError> {
        self.require(WizardStep::PatientAndVisitSelection)?;
        if self.patient.as_ref().is_some_and(|p| p.id != patient.id) {
            self.assessment = Assessment::default();
            self.draft = None;
            self.draft_origin = None;
        }
        self.prefill_from(&patient);
        debug!(patient_id = %patient.id, "wizard patient selected");
        self.patient = Some(patient);
        Ok(())
    }

    fn prefill_from(&mut self, patient: &Patient) {
        let a = &mut self.assessment;
        if a.health_status.is_none() {
            a.health_status = patient.medical_history.clone();
        }
        if a.doctor_instructions.is_none() {
            a.doctor_instructions = patient
                .primary_doctor
                .as_ref()
                .map(|doctor| format!("{doctor}からの指示"));
        }
        if patient.care_level.requires_care() {
            if a.adl.mobility == AdlLevel::Independent {
                a.adl.mobility = AdlLevel::Partial;
            }
            if a.adl.bathing == AdlLevel::Independent {
                a.adl.bathing = AdlLevel::Complete;
            }
        }
    }

    pub fn set_visit_type(&mut self, visit_type: VisitType) -> Result<(), WizardError> {
        self.require(WizardStep::PatientAndVisitSelection)?;
        self.visit_type = visit_type;
        Ok(())
    }

    /// The plan's period is taken from this date.
    pub fn set_plan_date(&mut self, date: NaiveDate) -> Result<(), WizardError> {
        self.require(WizardStep::PatientAndVisitSelection)?;
        self.plan_date = date;
        Ok(())
    }

    /// Whether [`Self::advance`] would succeed.
    pub fn can_advance(&self) -> bool {
        self.step == WizardStep::PatientAndVisitSelection && self.patient.is_some()
    }

    /// Move from selection to Assessment.
    pub fn advance(&mut self) -> Result<(), WizardError> {
        self.require(WizardStep::PatientAndVisitSelection)?;
        if self.patient.is_none() {
            return Err(WizardError::NoPatientSelected);
        }
        self.step = WizardStep::Assessment;
        Ok(())
    }

    /// Step back one screen, keeping entered data.
    pub fn back(&mut self) -> Result<(), WizardError> {
        self.step = match self.step {
            WizardStep::Assessment => WizardStep::PatientAndVisitSelection,
            WizardStep::ReviewAndEdit => WizardStep::Assessment,
            other => return Err(WizardError::CannotGoBack(other)),
        };
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Assessment
    // -----------------------------------------------------------------------

    /// Mutable access to the assessment while in the Assessment step.
    pub fn assessment_mut(&mut self) -> Result<&mut Assessment, WizardError> {
        self.require(WizardStep::Assessment)?;
        Ok(&mut self.assessment)
    }

    /// Request a draft and move to ReviewAndEdit. A failed generation still
    /// advances, with the fallback content.
    pub async fn generate(&mut self, generator: &DraftGenerator) -> Result<DraftOrigin, WizardError> {
        self.require(WizardStep::Assessment)?;
        let patient = self.patient.clone().ok_or(WizardError::NoPatientSelected)?;

        self.step = WizardStep::Generating;
        let outcome = generator.generate(&patient, &self.assessment).await;

        self.draft = Some(outcome.content);
        self.draft_origin = Some(outcome.origin);
        self.step = WizardStep::ReviewAndEdit;
        Ok(outcome.origin)
    }

    // -----------------------------------------------------------------------
    // Review and edit
    // -----------------------------------------------------------------------

    fn draft_section_mut(&mut self, section: DraftSection) -> Result<&mut Vec<String>, WizardError> {
        self.require(WizardStep::ReviewAndEdit)?;
        Ok(self.draft.get_or_insert_with(DraftContent::default).section_mut(section))
    }

    /// Replace item `index` of `section`.
    pub fn edit_item(
        &mut self,
        section: DraftSection,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), WizardError> {
        let items = self.draft_section_mut(section)?;
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(WizardError::ItemOutOfRange { section, index, len })?;
        *slot = text.into();
        Ok(())
    }

    /// Add an item to the end of `section`.
    pub fn append_item(&mut self, section: DraftSection, text: impl Into<String>) -> Result<(), WizardError> {
        self.draft_section_mut(section)?.push(text.into());
        Ok(())
    }

    fn build_plan(&self) -> Result<NewCarePlan, WizardError> {
        let patient = self.patient.as_ref().ok_or(WizardError::NoPatientSelected)?;
        let draft = self.draft.clone().unwrap_or_default();
        let a = &self.assessment;
        Ok(NewCarePlan {
            patient_id: patient.id,
            user_id: self.user_id.clone(),
            visit_type: self.visit_type,
            health_status: a.health_status.clone(),
            adl: a.adl,
            patient_family_request: a.patient_family_request.clone(),
            doctor_instructions: a.doctor_instructions.clone(),
            staff_notes: a.staff_notes.clone(),
            goals: draft.goals,
            issues: draft.issues,
            supports: draft.supports,
            status: PlanStatus::Completed,
            period: self.period(),
        })
    }

    /// Persist the plan as completed and move to Saved. Reaches Saved even
    /// when the store could not persist; see [`Self::saved_source`].
    pub async fn commit(&mut self, store: &PlanStore) -> Result<&CarePlan, WizardError> {
        self.require(WizardStep::ReviewAndEdit)?;
        let new = self.build_plan()?;

        let Fetched { value, source } = store.create(new).await;
        info!(
            plan_id = %value.id,
            patient_id = %value.patient_id,
            period = %value.period(),
            ?source,
            "care plan saved"
        );
        self.saved_source = Some(source);
        self.step = WizardStep::Saved;
        Ok(&*self.saved.insert(value))
    }

    // -----------------------------------------------------------------------
    // Saved
    // -----------------------------------------------------------------------

    /// The committed plan, for viewing or export.
    pub fn saved_plan(&self) -> Option<&CarePlan> {
        self.saved.as_ref()
    }

    pub fn saved_source(&self) -> Option<Source> {
        self.saved_source
    }

    /// Cancel the session. Nothing is persisted.
    pub fn abandon(self) {
        debug!(step = %self.step, "wizard abandoned");
    }
}
