//! Encounter (visit) records and the values derived when they are appended.
//!
//! Derived fields are captured by value at append time: a visit's treatment snapshot or
//! gestational age never changes when the owning episode's medication list does later.

use crate::config::CoreConfig;
use crate::episode::{CareEpisode, CheckupKind, EpisodeBody, Medication};
use crate::validation::validate_positive;
use crate::{CareError, CareResult};
use care_types::BloodPressure;
use care_uuid::TimestampId;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_DAY: i64 = 86_400;

/// Raw visit data as captured on the form, before validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitInput {
    pub date: NaiveDate,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    /// Blood pressure as written on the form (`"SYS/DIA"`).
    #[serde(default)]
    pub blood_pressure: Option<String>,
    #[serde(default)]
    pub labs: LabResults,
    #[serde(default)]
    pub fundal_height_cm: Option<f64>,
    #[serde(default)]
    pub fetal_heart_rate_bpm: Option<u16>,
    #[serde(default)]
    pub notes: String,
    /// Annual checkups performed during this visit (chronic episodes).
    #[serde(default)]
    pub checkups_performed: Vec<CheckupKind>,
    /// Set when this visit closes the pregnancy (delivery or loss). The episode is archived
    /// with this end date in the same change, and gestational age is measured to it.
    #[serde(default)]
    pub finalizes_on: Option<NaiveDate>,
    /// Outcome recorded on the episode when the visit finalizes it.
    #[serde(default)]
    pub outcome: Option<String>,
}

/// Optional laboratory values reported at a visit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabResults {
    #[serde(default)]
    pub total_cholesterol_mg_dl: Option<f64>,
    #[serde(default)]
    pub hdl_mg_dl: Option<f64>,
    #[serde(default)]
    pub ldl_mg_dl: Option<f64>,
    #[serde(default)]
    pub triglycerides_mg_dl: Option<f64>,
    #[serde(default)]
    pub fasting_glucose_mg_dl: Option<f64>,
    #[serde(default)]
    pub hba1c_percent: Option<f64>,
}

impl LabResults {
    fn validate(&self) -> CareResult<()> {
        validate_positive("total cholesterol", self.total_cholesterol_mg_dl)?;
        validate_positive("HDL", self.hdl_mg_dl)?;
        validate_positive("LDL", self.ldl_mg_dl)?;
        validate_positive("triglycerides", self.triglycerides_mg_dl)?;
        validate_positive("fasting glucose", self.fasting_glucose_mg_dl)?;
        validate_positive("HbA1c", self.hba1c_percent)
    }
}

/// Validated clinical measurements of a visit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub weight_kg: f64,
    pub blood_pressure: BloodPressure,
    #[serde(default)]
    pub labs: LabResults,
    #[serde(default)]
    pub fundal_height_cm: Option<f64>,
    #[serde(default)]
    pub fetal_heart_rate_bpm: Option<u16>,
}

/// Values computed from the owning episode at append time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncounterDerived {
    Chronic { treatment_snapshot: String },
    Pregnancy { gestational_age: GestationalAge },
}

/// A visit appended to a care episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    id: TimestampId,
    date: NaiveDate,
    measurements: Measurements,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    checkups_performed: Vec<CheckupKind>,
    derived: EncounterDerived,
}

impl Encounter {
    pub fn id(&self) -> &TimestampId {
        &self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn checkups_performed(&self) -> &[CheckupKind] {
        &self.checkups_performed
    }

    pub fn derived(&self) -> &EncounterDerived {
        &self.derived
    }

    /// The treatment snapshot, for visits of chronic episodes.
    pub fn treatment_snapshot(&self) -> Option<&str> {
        match &self.derived {
            EncounterDerived::Chronic { treatment_snapshot } => Some(treatment_snapshot),
            EncounterDerived::Pregnancy { .. } => None,
        }
    }

    /// The gestational age, for visits of pregnancy episodes.
    pub fn gestational_age(&self) -> Option<GestationalAge> {
        match &self.derived {
            EncounterDerived::Pregnancy { gestational_age } => Some(*gestational_age),
            EncounterDerived::Chronic { .. } => None,
        }
    }
}

/// Gestational age in completed weeks plus remaining days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GestationalAge {
    pub weeks: u32,
    pub days: u32,
}

impl GestationalAge {
    /// Splits a day count into completed weeks and leftover days.
    pub fn from_days(days: u32) -> Self {
        Self {
            weeks: days / 7,
            days: days % 7,
        }
    }

    pub fn total_days(&self) -> u32 {
        self.weeks * 7 + self.days
    }

    /// `weeks + days / 7`, e.g. 8 weeks 4 days is 8.571…
    pub fn as_decimal(&self) -> f64 {
        f64::from(self.weeks) + f64::from(self.days) / 7.0
    }
}

impl fmt::Display for GestationalAge {
    /// Clinical `weeks.days` notation, e.g. `8.4`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.weeks, self.days)
    }
}

/// Whole days between two instants, rounded up.
///
/// The difference is taken in absolute value, so argument order does not matter; any started
/// day counts as a full day.
pub fn days_between_ceil(from: NaiveDateTime, to: NaiveDateTime) -> u32 {
    let seconds = (to - from).num_seconds().unsigned_abs();
    let days = seconds.div_ceil(SECONDS_PER_DAY as u64);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Gestational age at `reference` for a pregnancy with the given last menstrual period.
pub fn gestational_age_at(
    last_menstrual_period: NaiveDate,
    reference: NaiveDateTime,
) -> GestationalAge {
    let lmp = last_menstrual_period.and_time(NaiveTime::MIN);
    GestationalAge::from_days(days_between_ceil(lmp, reference))
}

/// Gestational age on a calendar date.
pub fn gestational_age_on(last_menstrual_period: NaiveDate, on: NaiveDate) -> GestationalAge {
    gestational_age_at(last_menstrual_period, on.and_time(NaiveTime::MIN))
}

/// Renders the active medications as `"{drug} {dose} {frequency}"` joined with `", "`.
///
/// Returns `fallback` when no medication is active.
pub fn treatment_snapshot<'a>(
    medications: impl IntoIterator<Item = &'a Medication>,
    fallback: &str,
) -> String {
    let lines: Vec<String> = medications
        .into_iter()
        .filter(|m| m.active)
        .map(Medication::display_line)
        .collect();

    if lines.is_empty() {
        fallback.to_string()
    } else {
        lines.join(", ")
    }
}

/// Validates a visit against its episode and computes the derived fields.
///
/// Pure: the episode is only read. The store applies the resulting encounter and its checkup
/// stamps to a copy of the episode in one replacement.
pub(crate) fn build_encounter(
    episode: &CareEpisode,
    input: VisitInput,
    cfg: &CoreConfig,
) -> CareResult<Encounter> {
    episode.ensure_active()?;

    if input.date < episode.start_date() {
        return Err(CareError::InvalidInput(format!(
            "visit date {} precedes episode start {}",
            input.date,
            episode.start_date()
        )));
    }
    if let Some(end_date) = input.finalizes_on {
        if episode.pregnancy().is_none() {
            return Err(CareError::InvalidInput(
                "only pregnancy episodes are finalized by a visit".into(),
            ));
        }
        if end_date < input.date {
            return Err(CareError::InvalidInput(format!(
                "finalization date {} precedes visit date {}",
                end_date, input.date
            )));
        }
    }

    let weight_kg = input
        .weight_kg
        .ok_or(CareError::MissingMeasurement("weight"))?;
    validate_positive("weight", Some(weight_kg))?;

    let blood_pressure = input
        .blood_pressure
        .as_deref()
        .filter(|bp| !bp.trim().is_empty())
        .ok_or(CareError::MissingMeasurement("blood pressure"))?;
    let blood_pressure = BloodPressure::parse(blood_pressure)?;

    input.labs.validate()?;
    validate_positive("fundal height", input.fundal_height_cm)?;

    let derived = match episode.body() {
        EpisodeBody::Chronic(record) => EncounterDerived::Chronic {
            treatment_snapshot: treatment_snapshot(
                record.current_medications(),
                cfg.no_active_medication_label(),
            ),
        },
        EpisodeBody::Pregnancy(record) => {
            let reference = input.finalizes_on.unwrap_or(input.date);
            EncounterDerived::Pregnancy {
                gestational_age: gestational_age_on(record.last_menstrual_period(), reference),
            }
        }
    };

    let last_id = episode.visits().iter().map(Encounter::id).max();
    let mut checkups_performed = input.checkups_performed;
    checkups_performed.sort();
    checkups_performed.dedup();

    Ok(Encounter {
        id: TimestampId::generate(last_id),
        date: input.date,
        measurements: Measurements {
            weight_kg,
            blood_pressure,
            labs: input.labs,
            fundal_height_cm: input.fundal_height_cm,
            fetal_heart_rate_bpm: input.fetal_heart_rate_bpm,
        },
        notes: input.notes.trim().to_string(),
        checkups_performed,
        derived,
    })
}
