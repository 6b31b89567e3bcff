//! Prenatal care record.

use crate::constants::GESTATION_LENGTH_DAYS;
use crate::scoring::obstetric::RiskFactor;
use crate::{CareError, CareResult};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Body of a pregnancy episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PregnancyRecord {
    last_menstrual_period: NaiveDate,
    expected_delivery_date: NaiveDate,
    #[serde(default)]
    obstetric_history: ObstetricHistory,
    #[serde(default)]
    risk_factors: BTreeSet<RiskFactor>,
    #[serde(default)]
    vaccines: Vaccinations,
}

impl PregnancyRecord {
    pub(crate) fn from_new(new: NewPregnancyEpisode) -> CareResult<Self> {
        let lmp = new
            .last_menstrual_period
            .ok_or(CareError::MissingLastMenstrualPeriod)?;
        if lmp > new.start_date {
            return Err(CareError::InvalidInput(format!(
                "last menstrual period {} is after the episode start date {}",
                lmp, new.start_date
            )));
        }
        new.obstetric_history.validate()?;

        Ok(Self {
            last_menstrual_period: lmp,
            expected_delivery_date: expected_delivery_date(lmp),
            obstetric_history: new.obstetric_history,
            risk_factors: new.risk_factors,
            vaccines: Vaccinations::default(),
        })
    }

    /// Last menstrual period (FUM).
    pub fn last_menstrual_period(&self) -> NaiveDate {
        self.last_menstrual_period
    }

    /// Expected delivery date (FPP), derived when the episode starts.
    pub fn expected_delivery_date(&self) -> NaiveDate {
        self.expected_delivery_date
    }

    pub fn obstetric_history(&self) -> &ObstetricHistory {
        &self.obstetric_history
    }

    pub fn risk_factors(&self) -> &BTreeSet<RiskFactor> {
        &self.risk_factors
    }

    pub fn vaccines(&self) -> &Vaccinations {
        &self.vaccines
    }

    pub(crate) fn set_obstetric_history(&mut self, history: ObstetricHistory) -> CareResult<()> {
        history.validate()?;
        self.obstetric_history = history;
        Ok(())
    }

    pub(crate) fn add_risk_factor(&mut self, factor: RiskFactor) -> bool {
        self.risk_factors.insert(factor)
    }

    pub(crate) fn remove_risk_factor(&mut self, factor: RiskFactor) -> bool {
        self.risk_factors.remove(&factor)
    }

    pub(crate) fn vaccines_mut(&mut self) -> &mut Vaccinations {
        &mut self.vaccines
    }
}

/// Expected delivery date by Naegele's rule (LMP + 280 days).
pub fn expected_delivery_date(last_menstrual_period: NaiveDate) -> NaiveDate {
    last_menstrual_period + Duration::days(GESTATION_LENGTH_DAYS)
}

/// Data required to start a pregnancy episode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPregnancyEpisode {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub last_menstrual_period: Option<NaiveDate>,
    #[serde(default)]
    pub obstetric_history: ObstetricHistory,
    #[serde(default)]
    pub risk_factors: BTreeSet<RiskFactor>,
}

/// Gravidity/parity counters (G, P, C, A).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstetricHistory {
    /// Total pregnancies including the current one.
    pub gravidity: u8,
    /// Vaginal births.
    pub parity: u8,
    pub cesareans: u8,
    pub abortions: u8,
}

impl ObstetricHistory {
    /// Completed pregnancies cannot outnumber pregnancies.
    fn validate(&self) -> CareResult<()> {
        let completed =
            u16::from(self.parity) + u16::from(self.cesareans) + u16::from(self.abortions);
        if completed > u16::from(self.gravidity) {
            return Err(CareError::InvalidInput(format!(
                "parity, cesareans and abortions ({}) exceed gravidity ({})",
                completed, self.gravidity
            )));
        }
        Ok(())
    }

    pub fn is_primigravida(&self) -> bool {
        self.gravidity <= 1
    }
}

/// Vaccines tracked during prenatal care.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaccineKind {
    TetanusDiphtheria,
    Tdap,
    Influenza,
    Covid19,
}

/// Date each prenatal vaccine was applied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccinations {
    #[serde(default)]
    pub tetanus_diphtheria: Option<NaiveDate>,
    #[serde(default)]
    pub tdap: Option<NaiveDate>,
    #[serde(default)]
    pub influenza: Option<NaiveDate>,
    #[serde(default)]
    pub covid19: Option<NaiveDate>,
}

impl Vaccinations {
    pub fn get(&self, kind: VaccineKind) -> Option<NaiveDate> {
        match kind {
            VaccineKind::TetanusDiphtheria => self.tetanus_diphtheria,
            VaccineKind::Tdap => self.tdap,
            VaccineKind::Influenza => self.influenza,
            VaccineKind::Covid19 => self.covid19,
        }
    }

    pub(crate) fn set(&mut self, kind: VaccineKind, date: Option<NaiveDate>) {
        let slot = match kind {
            VaccineKind::TetanusDiphtheria => &mut self.tetanus_diphtheria,
            VaccineKind::Tdap => &mut self.tdap,
            VaccineKind::Influenza => &mut self.influenza,
            VaccineKind::Covid19 => &mut self.covid19,
        };
        *slot = date;
    }
}
