//! Care episodes: chronic-disease and pregnancy records.
//!
//! A [`CareEpisode`] is owned by exactly one patient (referenced by id) and moves through a
//! two-state lifecycle: `Active` while care is ongoing, `Archived` once it is closed. Archived
//! episodes are read-only; every mutator checks [`CareEpisode::ensure_active`] first.
//!
//! Fields are private so the only way to change an episode is through
//! [`EpisodeStore`](crate::store::EpisodeStore), which enforces the lifecycle rules.

pub mod chronic;
pub mod pregnancy;

use crate::encounter::Encounter;
use crate::scoring::obstetric::RiskFactor;
use crate::validation::validate_tag;
use crate::{CareError, CareResult};
use care_types::BloodPressure;
use care_uuid::RecordId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use chronic::{
    AnnualCheckups, CheckupKind, ChronicRecord, Medication, NewChronicEpisode, NewMedication,
    TherapeuticGoals,
};
pub use pregnancy::{
    NewPregnancyEpisode, ObstetricHistory, PregnancyRecord, VaccineKind, Vaccinations,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeKind {
    Chronic,
    Pregnancy,
}

impl fmt::Display for EpisodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeKind::Chronic => f.write_str("chronic"),
            EpisodeKind::Pregnancy => f.write_str("pregnancy"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Active,
    Archived,
}

/// Kind-specific body of an episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpisodeBody {
    Chronic(ChronicRecord),
    Pregnancy(PregnancyRecord),
}

impl EpisodeBody {
    pub fn kind(&self) -> EpisodeKind {
        match self {
            EpisodeBody::Chronic(_) => EpisodeKind::Chronic,
            EpisodeBody::Pregnancy(_) => EpisodeKind::Pregnancy,
        }
    }
}

/// A longitudinal care episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CareEpisode {
    id: RecordId,
    patient_id: RecordId,
    status: EpisodeStatus,
    start_date: NaiveDate,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    outcome: Option<String>,
    body: EpisodeBody,
    /// Stored in append order; use the chronological accessors for display.
    #[serde(default)]
    visits: Vec<Encounter>,
}

impl CareEpisode {
    /// Builds a new Active episode from validated initial data.
    pub(crate) fn start(patient_id: RecordId, initial: NewEpisode) -> CareResult<Self> {
        let start_date = initial.start_date();
        let body = match initial {
            NewEpisode::Chronic(new) => EpisodeBody::Chronic(ChronicRecord::from_new(new)?),
            NewEpisode::Pregnancy(new) => EpisodeBody::Pregnancy(PregnancyRecord::from_new(new)?),
        };

        Ok(Self {
            id: RecordId::new(),
            patient_id,
            status: EpisodeStatus::Active,
            start_date,
            end_date: None,
            outcome: None,
            body,
            visits: Vec::new(),
        })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn patient_id(&self) -> RecordId {
        self.patient_id
    }

    pub fn kind(&self) -> EpisodeKind {
        self.body.kind()
    }

    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == EpisodeStatus::Active
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn outcome(&self) -> Option<&str> {
        self.outcome.as_deref()
    }

    pub fn body(&self) -> &EpisodeBody {
        &self.body
    }

    pub fn chronic(&self) -> Option<&ChronicRecord> {
        match &self.body {
            EpisodeBody::Chronic(record) => Some(record),
            EpisodeBody::Pregnancy(_) => None,
        }
    }

    pub fn pregnancy(&self) -> Option<&PregnancyRecord> {
        match &self.body {
            EpisodeBody::Pregnancy(record) => Some(record),
            EpisodeBody::Chronic(_) => None,
        }
    }

    /// Visits in storage (append) order.
    pub fn visits(&self) -> &[Encounter] {
        &self.visits
    }

    /// Visits oldest first, ordered by visit date and then by id.
    pub fn visits_chronological(&self) -> Vec<&Encounter> {
        let mut visits: Vec<&Encounter> = self.visits.iter().collect();
        visits.sort_by(|a, b| a.date().cmp(&b.date()).then_with(|| a.id().cmp(b.id())));
        visits
    }

    /// Visits newest first, the order clinical forms display them in.
    pub fn visits_newest_first(&self) -> Vec<&Encounter> {
        let mut visits = self.visits_chronological();
        visits.reverse();
        visits
    }

    /// The most recent visit by date.
    pub fn latest_visit(&self) -> Option<&Encounter> {
        self.visits
            .iter()
            .max_by(|a, b| a.date().cmp(&b.date()).then_with(|| a.id().cmp(b.id())))
    }

    /// Fails with [`CareError::EpisodeArchived`] unless the episode is Active.
    pub fn ensure_active(&self) -> CareResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CareError::EpisodeArchived(self.id))
        }
    }

    pub(crate) fn archive(
        &mut self,
        end_date: NaiveDate,
        outcome: Option<String>,
    ) -> CareResult<()> {
        self.ensure_active()?;
        if end_date < self.start_date {
            return Err(CareError::InvalidInput(format!(
                "end date {} precedes start date {}",
                end_date, self.start_date
            )));
        }
        let outcome = outcome
            .filter(|o| !o.trim().is_empty())
            .map(|o| validate_tag(&o))
            .transpose()?;

        self.status = EpisodeStatus::Archived;
        self.end_date = Some(end_date);
        self.outcome = outcome;
        Ok(())
    }

    pub(crate) fn push_visit(&mut self, visit: Encounter) {
        self.visits.push(visit);
    }

    /// Applies a patch to an Active episode.
    ///
    /// Callers work on a copy and swap it in only on success, so a failing patch leaves the
    /// stored episode untouched.
    pub(crate) fn apply(&mut self, patch: EpisodePatch) -> CareResult<()> {
        self.ensure_active()?;
        if patch.kind() != self.kind() {
            return Err(CareError::EpisodeKindMismatch {
                expected: self.kind(),
                actual: patch.kind(),
            });
        }

        match (&mut self.body, patch) {
            (EpisodeBody::Chronic(record), EpisodePatch::AddDiagnosis(tag)) => {
                record.add_diagnosis(&tag)?;
            }
            (EpisodeBody::Chronic(record), EpisodePatch::RemoveDiagnosis(tag)) => {
                record.remove_diagnosis(&tag);
            }
            (EpisodeBody::Chronic(record), EpisodePatch::SetGoals(goals)) => {
                record.set_goals(goals)?;
            }
            (EpisodeBody::Chronic(record), EpisodePatch::SetBaselineBloodPressure(bp)) => {
                record.set_baseline_blood_pressure(bp);
            }
            (EpisodeBody::Chronic(record), EpisodePatch::AddMedication(medication)) => {
                record.add_medication(medication)?;
            }
            (
                EpisodeBody::Chronic(record),
                EpisodePatch::SetMedicationActive {
                    medication_id,
                    active,
                },
            ) => {
                record.set_medication_active(medication_id, active)?;
            }
            (EpisodeBody::Chronic(record), EpisodePatch::StampCheckup { checkup, date }) => {
                record.annual_checkups_mut().stamp(checkup, date);
            }
            (EpisodeBody::Chronic(record), EpisodePatch::ClearCheckup(checkup)) => {
                record.annual_checkups_mut().clear(checkup);
            }
            (EpisodeBody::Pregnancy(record), EpisodePatch::SetObstetricHistory(history)) => {
                record.set_obstetric_history(history)?;
            }
            (EpisodeBody::Pregnancy(record), EpisodePatch::AddRiskFactor(factor)) => {
                record.add_risk_factor(factor);
            }
            (EpisodeBody::Pregnancy(record), EpisodePatch::RemoveRiskFactor(factor)) => {
                record.remove_risk_factor(factor);
            }
            (EpisodeBody::Pregnancy(record), EpisodePatch::StampVaccine { vaccine, date }) => {
                record.vaccines_mut().set(vaccine, Some(date));
            }
            (EpisodeBody::Pregnancy(record), EpisodePatch::ClearVaccine(vaccine)) => {
                record.vaccines_mut().set(vaccine, None);
            }
            (body, patch) => {
                return Err(CareError::EpisodeKindMismatch {
                    expected: body.kind(),
                    actual: patch.kind(),
                });
            }
        }

        Ok(())
    }

    /// Stamps checkups performed on a visit with the visit date.
    pub(crate) fn stamp_checkups(&mut self, checkups: &[CheckupKind], date: NaiveDate) {
        if let EpisodeBody::Chronic(record) = &mut self.body {
            for checkup in checkups {
                record.annual_checkups_mut().stamp(*checkup, date);
            }
        }
    }
}

/// Initial data for [`EpisodeStore::start_episode`](crate::store::EpisodeStore::start_episode).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NewEpisode {
    Chronic(NewChronicEpisode),
    Pregnancy(NewPregnancyEpisode),
}

impl NewEpisode {
    pub fn kind(&self) -> EpisodeKind {
        match self {
            NewEpisode::Chronic(_) => EpisodeKind::Chronic,
            NewEpisode::Pregnancy(_) => EpisodeKind::Pregnancy,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        match self {
            NewEpisode::Chronic(new) => new.start_date,
            NewEpisode::Pregnancy(new) => new.start_date,
        }
    }
}

/// A change to an Active episode's fields, goals or lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodePatch {
    AddDiagnosis(String),
    RemoveDiagnosis(String),
    SetGoals(TherapeuticGoals),
    SetBaselineBloodPressure(Option<BloodPressure>),
    AddMedication(NewMedication),
    SetMedicationActive {
        medication_id: RecordId,
        active: bool,
    },
    StampCheckup {
        checkup: CheckupKind,
        date: NaiveDate,
    },
    ClearCheckup(CheckupKind),
    SetObstetricHistory(ObstetricHistory),
    AddRiskFactor(RiskFactor),
    RemoveRiskFactor(RiskFactor),
    StampVaccine {
        vaccine: VaccineKind,
        date: NaiveDate,
    },
    ClearVaccine(VaccineKind),
}

impl EpisodePatch {
    /// The episode kind this patch applies to.
    pub fn kind(&self) -> EpisodeKind {
        match self {
            EpisodePatch::AddDiagnosis(_)
            | EpisodePatch::RemoveDiagnosis(_)
            | EpisodePatch::SetGoals(_)
            | EpisodePatch::SetBaselineBloodPressure(_)
            | EpisodePatch::AddMedication(_)
            | EpisodePatch::SetMedicationActive { .. }
            | EpisodePatch::StampCheckup { .. }
            | EpisodePatch::ClearCheckup(_) => EpisodeKind::Chronic,
            EpisodePatch::SetObstetricHistory(_)
            | EpisodePatch::AddRiskFactor(_)
            | EpisodePatch::RemoveRiskFactor(_)
            | EpisodePatch::StampVaccine { .. }
            | EpisodePatch::ClearVaccine(_) => EpisodeKind::Pregnancy,
        }
    }
}
