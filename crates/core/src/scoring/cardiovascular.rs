//! Cardiovascular risk for chronic-disease follow-up.
//!
//! Points are accumulated from age and sex, diagnoses, smoking status, systolic pressure and
//! the lipid panel of the most recent visit. Diabetic patients reach the top band earlier.

use crate::config::Locale;
use crate::constants::{
    DEFAULT_BLOOD_PRESSURE, DEFAULT_HDL_MG_DL, DEFAULT_TOTAL_CHOLESTEROL_MG_DL, DIABETES_TAGS,
    HYPERTENSION_TAGS, SMOKING_TAGS,
};
use crate::episode::CareEpisode;
use crate::patient::PatientSnapshot;
use crate::validation::tags_include;
use care_types::Sex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cardiovascular risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvRiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl CvRiskLevel {
    #[must_use]
    pub const fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Low, Locale::Es) => "Bajo",
            (Self::Moderate, Locale::Es) => "Moderado",
            (Self::High, Locale::Es) => "Alto",
            (Self::VeryHigh, Locale::Es) => "Muy Alto",
            (Self::Low, Locale::En) => "Low",
            (Self::Moderate, Locale::En) => "Moderate",
            (Self::High, Locale::En) => "High",
            (Self::VeryHigh, Locale::En) => "Very High",
        }
    }
}

impl fmt::Display for CvRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(Locale::En))
    }
}

/// Result of [`compute_cv_risk`], with the inputs actually used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvRiskAssessment {
    pub points: u32,
    pub level: CvRiskLevel,
    pub diabetic: bool,
    pub smoker: bool,
    pub hypertensive: bool,
    /// Systolic pressure used: latest visit, else episode baseline, else 120.
    pub systolic: u16,
    pub total_cholesterol_mg_dl: f64,
    pub hdl_mg_dl: f64,
}

/// Maps a point total to a risk band.
///
/// A diabetic patient with 6 or more points is already Very High.
#[must_use]
pub fn classify_cv_points(points: u32, diabetic: bool) -> CvRiskLevel {
    if points >= 10 || (diabetic && points >= 6) {
        CvRiskLevel::VeryHigh
    } else if points >= 6 {
        CvRiskLevel::High
    } else if points >= 3 {
        CvRiskLevel::Moderate
    } else {
        CvRiskLevel::Low
    }
}

fn age_points(age: u32, sex: Sex) -> u32 {
    let (first, second) = match sex {
        Sex::Male => (45, 55),
        Sex::Female => (55, 65),
    };
    let mut points = 0;
    if age > first {
        points += 2;
    }
    if age > second {
        points += 2;
    }
    points
}

/// Computes the cardiovascular risk of a patient within a chronic episode.
///
/// Diagnoses and the baseline pressure come from the chronic body; for a pregnancy episode
/// only demographics and visit measurements contribute.
#[must_use]
pub fn compute_cv_risk(patient: &PatientSnapshot, episode: &CareEpisode) -> CvRiskAssessment {
    let record = episode.chronic();
    let diagnoses = record.map(|r| r.diagnoses()).unwrap_or_default();
    let latest = episode.latest_visit().map(|v| v.measurements());

    let diabetic = tags_include(diagnoses, DIABETES_TAGS);
    let hypertensive = tags_include(diagnoses, HYPERTENSION_TAGS);
    let smoker = patient.has_tag(SMOKING_TAGS);

    let systolic = latest
        .map(|m| m.blood_pressure.systolic())
        .or_else(|| {
            record
                .and_then(|r| r.baseline_blood_pressure())
                .map(|bp| bp.systolic())
        })
        .unwrap_or(DEFAULT_BLOOD_PRESSURE.0);
    let total_cholesterol_mg_dl = latest
        .and_then(|m| m.labs.total_cholesterol_mg_dl)
        .unwrap_or(DEFAULT_TOTAL_CHOLESTEROL_MG_DL);
    let hdl_mg_dl = latest
        .and_then(|m| m.labs.hdl_mg_dl)
        .unwrap_or(DEFAULT_HDL_MG_DL);

    let mut points = age_points(patient.age, patient.sex);
    if diabetic {
        points += 4;
    }
    if smoker {
        points += 3;
    }
    if hypertensive {
        points += 2;
    }
    if systolic >= 140 {
        points += 2;
    }
    if systolic >= 160 {
        points += 2;
    }
    if total_cholesterol_mg_dl >= 240.0 {
        points += 2;
    }
    if hdl_mg_dl < 40.0 {
        points += 1;
    }

    let level = classify_cv_points(points, diabetic);
    tracing::debug!(
        "cardiovascular risk for patient {}: {} points ({})",
        patient.id,
        points,
        level
    );

    CvRiskAssessment {
        points,
        level,
        diabetic,
        smoker,
        hypertensive,
        systolic,
        total_cholesterol_mg_dl,
        hdl_mg_dl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::encounter::{build_encounter, LabResults, VisitInput};
    use crate::episode::{NewChronicEpisode, NewEpisode};
    use care_types::BloodPressure;
    use care_uuid::RecordId;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn patient(age: u32, sex: Sex, tags: &[&str]) -> PatientSnapshot {
        PatientSnapshot::new(
            RecordId::new(),
            age,
            sex,
            tags.iter().map(|t| t.to_string()).collect(),
            None,
        )
        .unwrap()
    }

    fn episode(diagnoses: &[&str], baseline: Option<&str>) -> CareEpisode {
        CareEpisode::start(
            RecordId::new(),
            NewEpisode::Chronic(NewChronicEpisode {
                start_date: date("2024-01-10"),
                diagnoses: diagnoses.iter().map(|d| d.to_string()).collect(),
                baseline_blood_pressure: baseline.map(|bp| BloodPressure::parse(bp).unwrap()),
                ..Default::default()
            }),
        )
        .unwrap()
    }

    fn with_visit(mut episode: CareEpisode, on: &str, bp: &str, labs: LabResults) -> CareEpisode {
        let input = VisitInput {
            date: date(on),
            weight_kg: Some(82.0),
            blood_pressure: Some(bp.into()),
            labs,
            ..Default::default()
        };
        let encounter = build_encounter(&episode, input, &CoreConfig::default()).unwrap();
        episode.push_visit(encounter);
        episode
    }

    #[test]
    fn high_risk_diabetic_smoker_scores_eighteen() {
        let patient = patient(60, Sex::Male, &["Tabaquismo"]);
        let episode = with_visit(
            episode(&["Diabetes Mellitus", "Hipertensión Arterial"], None),
            "2024-03-01",
            "150/90",
            LabResults {
                total_cholesterol_mg_dl: Some(250.0),
                hdl_mg_dl: Some(35.0),
                ..Default::default()
            },
        );

        let risk = compute_cv_risk(&patient, &episode);
        assert_eq!(risk.points, 18);
        assert_eq!(risk.level, CvRiskLevel::VeryHigh);
        assert_eq!(risk.level.label(Locale::En), "Very High");
        assert!(risk.diabetic && risk.smoker && risk.hypertensive);
    }

    #[test]
    fn diabetic_short_circuit_at_six_points() {
        assert_eq!(classify_cv_points(6, true), CvRiskLevel::VeryHigh);
        assert_eq!(classify_cv_points(6, false), CvRiskLevel::High);
        assert_eq!(classify_cv_points(5, true), CvRiskLevel::Moderate);
        assert_eq!(classify_cv_points(10, false), CvRiskLevel::VeryHigh);
        assert_eq!(classify_cv_points(3, false), CvRiskLevel::Moderate);
        assert_eq!(classify_cv_points(2, true), CvRiskLevel::Low);
    }

    #[test]
    fn diabetic_woman_of_sixty_is_very_high() {
        // 2 (age > 55) + 4 (diabetes) = 6, which is Very High only because she is diabetic.
        let patient = patient(60, Sex::Female, &[]);
        let risk = compute_cv_risk(&patient, &episode(&["diabetes mellitus"], None));
        assert_eq!(risk.points, 6);
        assert_eq!(risk.level, CvRiskLevel::VeryHigh);
    }

    #[test]
    fn age_thresholds_are_strict_and_sex_specific() {
        assert_eq!(age_points(45, Sex::Male), 0);
        assert_eq!(age_points(46, Sex::Male), 2);
        assert_eq!(age_points(56, Sex::Male), 4);
        assert_eq!(age_points(55, Sex::Female), 0);
        assert_eq!(age_points(56, Sex::Female), 2);
        assert_eq!(age_points(66, Sex::Female), 4);
    }

    #[test]
    fn defaults_apply_without_visits_or_baseline() {
        let patient = patient(30, Sex::Male, &[]);
        let risk = compute_cv_risk(&patient, &episode(&["Dislipidemia"], None));
        assert_eq!(risk.systolic, 120);
        assert_eq!(risk.total_cholesterol_mg_dl, 180.0);
        assert_eq!(risk.hdl_mg_dl, 50.0);
        assert_eq!(risk.points, 0);
        assert_eq!(risk.level, CvRiskLevel::Low);
    }

    #[test]
    fn baseline_pressure_is_used_before_first_visit() {
        let patient = patient(30, Sex::Male, &[]);
        let risk = compute_cv_risk(&patient, &episode(&["Dislipidemia"], Some("165/95")));
        assert_eq!(risk.systolic, 165);
        assert_eq!(risk.points, 4);
        assert_eq!(risk.level, CvRiskLevel::Moderate);
    }

    #[test]
    fn latest_visit_by_date_wins_over_append_order() {
        let patient = patient(30, Sex::Male, &[]);
        let episode = with_visit(
            with_visit(
                episode(&["Dislipidemia"], Some("118/76")),
                "2024-05-01",
                "162/100",
                LabResults::default(),
            ),
            "2024-02-01",
            "128/82",
            LabResults::default(),
        );
        assert_eq!(compute_cv_risk(&patient, &episode).systolic, 162);
    }

    #[test]
    fn tags_match_without_case_or_accents() {
        let patient = patient(30, Sex::Male, &["TABAQUISMO"]);
        let risk = compute_cv_risk(&patient, &episode(&["HIPERTENSION ARTERIAL"], None));
        assert!(risk.smoker);
        assert!(risk.hypertensive);
        assert_eq!(risk.points, 5);
    }

    #[test]
    fn qualified_or_negated_tags_do_not_score() {
        let patient = patient(30, Sex::Male, &["Tabaquismo negado"]);
        let risk = compute_cv_risk(
            &patient,
            &episode(&["Hipertensión arterial pulmonar", "Prediabetes mellitus"], None),
        );
        assert!(!risk.smoker);
        assert!(!risk.hypertensive);
        assert!(!risk.diabetic);
        assert_eq!(risk.points, 0);
        assert_eq!(risk.level, CvRiskLevel::Low);
    }
}
