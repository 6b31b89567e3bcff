//! Command implementations.
//!
//! Each command reads its input, calls into `care-core` and returns the text to print, so the
//! commands can be exercised without spawning the binary.

use anyhow::{bail, Context, Result};
use care_core::encounter::gestational_age_on;
use care_core::episode::pregnancy::expected_delivery_date;
use care_core::note::{NoteContent, NoteKind, NoteService, SignOptions};
use care_core::scoring::{
    compute_aldrete, compute_cv_risk, compute_fluid_balance, compute_obstetric_risk,
    AldreteComponents, CategoryScores, FluidEntry,
};
use care_core::{CareEpisode, ClinicalNote, CoreConfig, PatientSnapshot};
use care_uuid::RecordId;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Input file for `cv-risk`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CvRiskInput {
    pub patient: PatientSnapshot,
    pub episode: CareEpisode,
}

#[derive(Serialize)]
struct CvRiskReport {
    points: u32,
    level: &'static str,
    diabetic: bool,
    smoker: bool,
    hypertensive: bool,
    systolic: u16,
    total_cholesterol_mg_dl: f64,
    hdl_mg_dl: f64,
}

#[derive(Serialize)]
struct ObstetricRiskReport {
    score: u32,
    level: &'static str,
    care_level: &'static str,
    by_category: CategoryScores,
}

#[derive(Serialize)]
struct GestationalAgeReport {
    last_menstrual_period: NaiveDate,
    on: NaiveDate,
    weeks: u32,
    days: u32,
    notation: String,
    decimal_weeks: f64,
    expected_delivery_date: NaiveDate,
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("failed to render YAML")
}

pub fn cv_risk(path: &Path, cfg: &CoreConfig) -> Result<String> {
    let input: CvRiskInput = read_yaml(path)?;
    let risk = compute_cv_risk(&input.patient, &input.episode);

    to_yaml(&CvRiskReport {
        points: risk.points,
        level: risk.level.label(cfg.locale()),
        diabetic: risk.diabetic,
        smoker: risk.smoker,
        hypertensive: risk.hypertensive,
        systolic: risk.systolic,
        total_cholesterol_mg_dl: risk.total_cholesterol_mg_dl,
        hdl_mg_dl: risk.hdl_mg_dl,
    })
}

pub fn obstetric_risk(path: &Path, cfg: &CoreConfig) -> Result<String> {
    let episode: CareEpisode = read_yaml(path)?;
    let risk = compute_obstetric_risk(&episode)?;

    to_yaml(&ObstetricRiskReport {
        score: risk.score,
        level: risk.level.label(cfg.locale()),
        care_level: risk.level.care_level(cfg.locale()),
        by_category: risk.by_category,
    })
}

pub fn aldrete(components: AldreteComponents) -> Result<String> {
    let score = compute_aldrete(&components)?;
    to_yaml(&score)
}

pub fn fluid_balance(inputs: &[f64], outputs: &[f64]) -> Result<String> {
    let entries = |prefix: &str, volumes: &[f64]| -> Vec<FluidEntry> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, ml)| FluidEntry::new(format!("{} {}", prefix, i + 1), *ml))
            .collect()
    };
    let balance = compute_fluid_balance(&entries("in", inputs), &entries("out", outputs));
    to_yaml(&balance)
}

pub fn gestational_age(lmp: NaiveDate, on: NaiveDate) -> Result<String> {
    if on < lmp {
        bail!("date {} is before the last menstrual period {}", on, lmp);
    }
    let ga = gestational_age_on(lmp, on);

    to_yaml(&GestationalAgeReport {
        last_menstrual_period: lmp,
        on,
        weeks: ga.weeks,
        days: ga.days,
        notation: ga.to_string(),
        decimal_weeks: (ga.as_decimal() * 100.0).round() / 100.0,
        expected_delivery_date: expected_delivery_date(lmp),
    })
}

/// Creates an empty draft note and renders it as YAML.
pub fn new_note(kind: NoteKind, patient_id: RecordId, author: &str) -> Result<String> {
    let note = NoteService::default().create_draft(patient_id, author, NoteContent::empty(kind))?;
    to_yaml(&note)
}

/// Signs the draft note stored at `path` with its current content.
///
/// The signed note is written to `output` when given, otherwise returned as YAML.
pub fn sign_note(
    path: &Path,
    signer: &str,
    options: SignOptions,
    output: Option<&Path>,
) -> Result<String> {
    let mut note: ClinicalNote = read_yaml(path)?;
    let content = note.content().clone();
    let signature = NoteService::default()
        .sign(&mut note, content, signer, options)
        .with_context(|| format!("could not sign note {}", note.id()))?;

    let yaml = to_yaml(&note)?;
    match output {
        Some(out) => {
            fs::write(out, yaml).with_context(|| format!("failed to write {}", out.display()))?;
            Ok(format!(
                "signed note {} (hash {}) written to {}",
                note.id(),
                signature.hash,
                out.display()
            ))
        }
        None => Ok(yaml),
    }
}
