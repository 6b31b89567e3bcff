//! Obstetric risk for prenatal care.
//!
//! Each risk factor carries a fixed weight of 1 to 3 points. Factors are grouped into three
//! categories for display, but the score is a flat sum over all of them.

use crate::config::Locale;
use crate::episode::{CareEpisode, EpisodeKind};
use crate::{CareError, CareResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Display grouping for risk factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Sociodemographic,
    ObstetricHistory,
    CurrentPregnancy,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [
        RiskCategory::Sociodemographic,
        RiskCategory::ObstetricHistory,
        RiskCategory::CurrentPregnancy,
    ];

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Sociodemographic => "Sociodemographic",
            Self::ObstetricHistory => "Obstetric history",
            Self::CurrentPregnancy => "Current pregnancy",
        }
    }
}

/// Risk factors that can be flagged on a pregnancy episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    // Sociodemographic
    AgeUnder16,
    AgeOver35,
    LowSocioeconomicStatus,
    Illiteracy,
    Smoking,
    SubstanceUse,
    Obesity,
    // Obstetric history
    RecurrentMiscarriage,
    PreviousStillbirth,
    PreviousPretermBirth,
    PreviousCesarean,
    PreviousPreeclampsia,
    PreviousPostpartumHemorrhage,
    GrandMultiparity,
    // Current pregnancy
    Hypertension,
    Diabetes,
    Anemia,
    MultiplePregnancy,
    VaginalBleeding,
    RhIsoimmunization,
    UrinaryTractInfection,
    AbnormalPresentation,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 22] = [
        RiskFactor::AgeUnder16,
        RiskFactor::AgeOver35,
        RiskFactor::LowSocioeconomicStatus,
        RiskFactor::Illiteracy,
        RiskFactor::Smoking,
        RiskFactor::SubstanceUse,
        RiskFactor::Obesity,
        RiskFactor::RecurrentMiscarriage,
        RiskFactor::PreviousStillbirth,
        RiskFactor::PreviousPretermBirth,
        RiskFactor::PreviousCesarean,
        RiskFactor::PreviousPreeclampsia,
        RiskFactor::PreviousPostpartumHemorrhage,
        RiskFactor::GrandMultiparity,
        RiskFactor::Hypertension,
        RiskFactor::Diabetes,
        RiskFactor::Anemia,
        RiskFactor::MultiplePregnancy,
        RiskFactor::VaginalBleeding,
        RiskFactor::RhIsoimmunization,
        RiskFactor::UrinaryTractInfection,
        RiskFactor::AbnormalPresentation,
    ];

    /// Fixed weight of the factor.
    #[must_use]
    pub const fn points(self) -> u32 {
        match self {
            Self::LowSocioeconomicStatus
            | Self::Illiteracy
            | Self::Anemia
            | Self::UrinaryTractInfection => 1,
            Self::AgeUnder16
            | Self::AgeOver35
            | Self::Smoking
            | Self::Obesity
            | Self::RecurrentMiscarriage
            | Self::PreviousPretermBirth
            | Self::PreviousCesarean
            | Self::PreviousPostpartumHemorrhage
            | Self::GrandMultiparity
            | Self::AbnormalPresentation => 2,
            Self::SubstanceUse
            | Self::PreviousStillbirth
            | Self::PreviousPreeclampsia
            | Self::Hypertension
            | Self::Diabetes
            | Self::MultiplePregnancy
            | Self::VaginalBleeding
            | Self::RhIsoimmunization => 3,
        }
    }

    #[must_use]
    pub const fn category(self) -> RiskCategory {
        match self {
            Self::AgeUnder16
            | Self::AgeOver35
            | Self::LowSocioeconomicStatus
            | Self::Illiteracy
            | Self::Smoking
            | Self::SubstanceUse
            | Self::Obesity => RiskCategory::Sociodemographic,
            Self::RecurrentMiscarriage
            | Self::PreviousStillbirth
            | Self::PreviousPretermBirth
            | Self::PreviousCesarean
            | Self::PreviousPreeclampsia
            | Self::PreviousPostpartumHemorrhage
            | Self::GrandMultiparity => RiskCategory::ObstetricHistory,
            Self::Hypertension
            | Self::Diabetes
            | Self::Anemia
            | Self::MultiplePregnancy
            | Self::VaginalBleeding
            | Self::RhIsoimmunization
            | Self::UrinaryTractInfection
            | Self::AbnormalPresentation => RiskCategory::CurrentPregnancy,
        }
    }
}

/// Obstetric risk band and the care level it calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstetricRiskLevel {
    Low,
    Moderate,
    High,
}

impl ObstetricRiskLevel {
    #[must_use]
    pub const fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Low, Locale::Es) => "Bajo",
            (Self::Moderate, Locale::Es) => "Moderado",
            (Self::High, Locale::Es) => "Alto",
            (Self::Low, Locale::En) => "Low",
            (Self::Moderate, Locale::En) => "Moderate",
            (Self::High, Locale::En) => "High",
        }
    }

    /// Where the pregnancy should be followed.
    #[must_use]
    pub const fn care_level(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Low, Locale::Es) => "Primer nivel de atención",
            (Self::Moderate, Locale::Es) => "Referencia a especialista",
            (Self::High, Locale::Es) => "Segundo o tercer nivel de atención",
            (Self::Low, Locale::En) => "First-level care",
            (Self::Moderate, Locale::En) => "Specialist referral",
            (Self::High, Locale::En) => "Second or third-level care",
        }
    }
}

impl fmt::Display for ObstetricRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(Locale::En))
    }
}

/// Points contributed by each category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub sociodemographic: u32,
    pub obstetric_history: u32,
    pub current_pregnancy: u32,
}

impl CategoryScores {
    #[must_use]
    pub fn get(&self, category: RiskCategory) -> u32 {
        match category {
            RiskCategory::Sociodemographic => self.sociodemographic,
            RiskCategory::ObstetricHistory => self.obstetric_history,
            RiskCategory::CurrentPregnancy => self.current_pregnancy,
        }
    }

    fn add(&mut self, category: RiskCategory, points: u32) {
        match category {
            RiskCategory::Sociodemographic => self.sociodemographic += points,
            RiskCategory::ObstetricHistory => self.obstetric_history += points,
            RiskCategory::CurrentPregnancy => self.current_pregnancy += points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstetricRiskAssessment {
    pub score: u32,
    pub level: ObstetricRiskLevel,
    pub by_category: CategoryScores,
}

/// Band for a score; upper bounds are inclusive (2 is Low, 6 is Moderate).
#[must_use]
pub const fn classify_obstetric_score(score: u32) -> ObstetricRiskLevel {
    if score <= 2 {
        ObstetricRiskLevel::Low
    } else if score <= 6 {
        ObstetricRiskLevel::Moderate
    } else {
        ObstetricRiskLevel::High
    }
}

/// Scores a set of flagged risk factors.
#[must_use]
pub fn score_risk_factors(factors: &BTreeSet<RiskFactor>) -> ObstetricRiskAssessment {
    let mut by_category = CategoryScores::default();
    for factor in factors {
        by_category.add(factor.category(), factor.points());
    }
    let score = factors.iter().map(|f| f.points()).sum();

    ObstetricRiskAssessment {
        score,
        level: classify_obstetric_score(score),
        by_category,
    }
}

/// Computes the obstetric risk of a pregnancy episode.
///
/// # Errors
///
/// Returns [`CareError::EpisodeKindMismatch`] for a non-pregnancy episode.
pub fn compute_obstetric_risk(episode: &CareEpisode) -> CareResult<ObstetricRiskAssessment> {
    let record = episode
        .pregnancy()
        .ok_or(CareError::EpisodeKindMismatch {
            expected: EpisodeKind::Pregnancy,
            actual: episode.kind(),
        })?;

    let assessment = score_risk_factors(record.risk_factors());
    tracing::debug!(
        "obstetric risk for episode {}: {} points ({})",
        episode.id(),
        assessment.score,
        assessment.level
    );
    Ok(assessment)
}
