//! Chronic-disease control record.

use crate::validation::{fold_tag, validate_positive, validate_tag};
use crate::{CareError, CareResult};
use care_types::{BloodPressure, NonEmptyText};
use care_uuid::RecordId;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Body of a chronic-disease episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChronicRecord {
    diagnoses: Vec<String>,
    #[serde(default)]
    goals: TherapeuticGoals,
    #[serde(default)]
    baseline_blood_pressure: Option<BloodPressure>,
    #[serde(default)]
    current_medications: Vec<Medication>,
    #[serde(default)]
    annual_checkups: AnnualCheckups,
}

impl ChronicRecord {
    pub(crate) fn from_new(new: NewChronicEpisode) -> CareResult<Self> {
        let mut record = Self {
            diagnoses: Vec::new(),
            goals: TherapeuticGoals::default(),
            baseline_blood_pressure: new.baseline_blood_pressure,
            current_medications: Vec::new(),
            annual_checkups: AnnualCheckups::default(),
        };

        for diagnosis in &new.diagnoses {
            record.add_diagnosis(diagnosis)?;
        }
        if record.diagnoses.is_empty() {
            return Err(CareError::MissingDiagnosis);
        }

        record.set_goals(new.goals)?;
        for medication in new.medications {
            record.add_medication(medication)?;
        }

        Ok(record)
    }

    /// Diagnosis tags in the order they were first recorded.
    pub fn diagnoses(&self) -> &[String] {
        &self.diagnoses
    }

    pub fn goals(&self) -> &TherapeuticGoals {
        &self.goals
    }

    pub fn baseline_blood_pressure(&self) -> Option<BloodPressure> {
        self.baseline_blood_pressure
    }

    pub fn current_medications(&self) -> &[Medication] {
        &self.current_medications
    }

    pub fn active_medications(&self) -> impl Iterator<Item = &Medication> {
        self.current_medications.iter().filter(|m| m.active)
    }

    pub fn annual_checkups(&self) -> &AnnualCheckups {
        &self.annual_checkups
    }

    /// Adds a diagnosis tag. Adding a tag already present (ignoring case/accents) is a no-op.
    ///
    /// Returns whether the list changed.
    pub(crate) fn add_diagnosis(&mut self, tag: &str) -> CareResult<bool> {
        let tag = validate_tag(tag)?;
        let folded = fold_tag(&tag);
        if self.diagnoses.iter().any(|d| fold_tag(d) == folded) {
            return Ok(false);
        }
        self.diagnoses.push(tag);
        Ok(true)
    }

    /// Removes a diagnosis tag. Removing a tag that is not present is a no-op.
    pub(crate) fn remove_diagnosis(&mut self, tag: &str) -> bool {
        let folded = fold_tag(tag);
        let before = self.diagnoses.len();
        self.diagnoses.retain(|d| fold_tag(d) != folded);
        self.diagnoses.len() != before
    }

    pub(crate) fn set_goals(&mut self, goals: TherapeuticGoals) -> CareResult<()> {
        goals.validate()?;
        self.goals = goals;
        Ok(())
    }

    pub(crate) fn set_baseline_blood_pressure(&mut self, bp: Option<BloodPressure>) {
        self.baseline_blood_pressure = bp;
    }

    pub(crate) fn add_medication(&mut self, new: NewMedication) -> CareResult<RecordId> {
        let medication = Medication {
            id: RecordId::new(),
            drug: NonEmptyText::new(&new.drug)?,
            dose: new.dose.trim().to_string(),
            frequency: new.frequency.trim().to_string(),
            active: new.active,
        };
        let id = medication.id;
        self.current_medications.push(medication);
        Ok(id)
    }

    pub(crate) fn set_medication_active(
        &mut self,
        medication_id: RecordId,
        active: bool,
    ) -> CareResult<()> {
        let medication = self
            .current_medications
            .iter_mut()
            .find(|m| m.id == medication_id)
            .ok_or(CareError::MedicationNotFound(medication_id))?;
        medication.active = active;
        Ok(())
    }

    pub(crate) fn annual_checkups_mut(&mut self) -> &mut AnnualCheckups {
        &mut self.annual_checkups
    }
}

/// Data required to start a chronic-disease episode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewChronicEpisode {
    pub start_date: NaiveDate,
    pub diagnoses: Vec<String>,
    #[serde(default)]
    pub goals: TherapeuticGoals,
    #[serde(default)]
    pub baseline_blood_pressure: Option<BloodPressure>,
    #[serde(default)]
    pub medications: Vec<NewMedication>,
}

/// Numeric therapeutic targets agreed for the episode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TherapeuticGoals {
    #[serde(default)]
    pub systolic_bp: Option<u16>,
    #[serde(default)]
    pub diastolic_bp: Option<u16>,
    #[serde(default)]
    pub hba1c_percent: Option<f64>,
    #[serde(default)]
    pub fasting_glucose_mg_dl: Option<f64>,
    #[serde(default)]
    pub ldl_mg_dl: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
}

impl TherapeuticGoals {
    fn validate(&self) -> CareResult<()> {
        if let (Some(sys), Some(dia)) = (self.systolic_bp, self.diastolic_bp) {
            BloodPressure::new(sys, dia)?;
        }
        validate_positive("HbA1c goal", self.hba1c_percent)?;
        validate_positive("fasting glucose goal", self.fasting_glucose_mg_dl)?;
        validate_positive("LDL goal", self.ldl_mg_dl)?;
        validate_positive("weight goal", self.weight_kg)
    }
}

/// A medication on the episode's current list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub id: RecordId,
    pub drug: NonEmptyText,
    pub dose: String,
    pub frequency: String,
    pub active: bool,
}

impl Medication {
    /// Renders the medication as `"{drug} {dose} {frequency}"`, skipping empty parts.
    pub fn display_line(&self) -> String {
        [self.drug.as_str(), self.dose.as_str(), self.frequency.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMedication {
    pub drug: String,
    #[serde(default)]
    pub dose: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Checkups expected once a year in chronic-disease control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckupKind {
    FootExam,
    Fundoscopy,
    Electrocardiogram,
    LipidProfile,
    Microalbuminuria,
    DentalReview,
}

impl CheckupKind {
    pub const ALL: [CheckupKind; 6] = [
        CheckupKind::FootExam,
        CheckupKind::Fundoscopy,
        CheckupKind::Electrocardiogram,
        CheckupKind::LipidProfile,
        CheckupKind::Microalbuminuria,
        CheckupKind::DentalReview,
    ];
}

/// Date each annual checkup was last performed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualCheckups {
    #[serde(default)]
    pub foot_exam: Option<NaiveDate>,
    #[serde(default)]
    pub fundoscopy: Option<NaiveDate>,
    #[serde(default)]
    pub electrocardiogram: Option<NaiveDate>,
    #[serde(default)]
    pub lipid_profile: Option<NaiveDate>,
    #[serde(default)]
    pub microalbuminuria: Option<NaiveDate>,
    #[serde(default)]
    pub dental_review: Option<NaiveDate>,
}

impl AnnualCheckups {
    pub fn get(&self, kind: CheckupKind) -> Option<NaiveDate> {
        *self.slot(kind)
    }

    pub(crate) fn stamp(&mut self, kind: CheckupKind, date: NaiveDate) {
        *self.slot_mut(kind) = Some(date);
    }

    pub(crate) fn clear(&mut self, kind: CheckupKind) {
        *self.slot_mut(kind) = None;
    }

    /// Checkups never performed or last performed more than a year before `on`.
    pub fn overdue_on(&self, on: NaiveDate) -> Vec<CheckupKind> {
        let year_ago = on.checked_sub_months(Months::new(12)).unwrap_or(on);
        CheckupKind::ALL
            .into_iter()
            .filter(|kind| match self.get(*kind) {
                Some(done) => done < year_ago,
                None => true,
            })
            .collect()
    }

    fn slot(&self, kind: CheckupKind) -> &Option<NaiveDate> {
        match kind {
            CheckupKind::FootExam => &self.foot_exam,
            CheckupKind::Fundoscopy => &self.fundoscopy,
            CheckupKind::Electrocardiogram => &self.electrocardiogram,
            CheckupKind::LipidProfile => &self.lipid_profile,
            CheckupKind::Microalbuminuria => &self.microalbuminuria,
            CheckupKind::DentalReview => &self.dental_review,
        }
    }

    fn slot_mut(&mut self, kind: CheckupKind) -> &mut Option<NaiveDate> {
        match kind {
            CheckupKind::FootExam => &mut self.foot_exam,
            CheckupKind::Fundoscopy => &mut self.fundoscopy,
            CheckupKind::Electrocardiogram => &mut self.electrocardiogram,
            CheckupKind::LipidProfile => &mut self.lipid_profile,
            CheckupKind::Microalbuminuria => &mut self.microalbuminuria,
            CheckupKind::DentalReview => &mut self.dental_review,
        }
    }
}
