//! Constants used throughout the care core crate.
//!
//! Clinical thresholds and defaults live here so the scoring and derivation code reads as the
//! rule it implements.

/// Naegele's rule: expected delivery date is the last menstrual period plus 280 days.
pub const GESTATION_LENGTH_DAYS: i64 = 280;

/// Aldrete totals below this value require explicit acknowledgement before signing.
pub const ALDRETE_CONFIRMATION_THRESHOLD: u8 = 8;

/// Highest value any single Aldrete component may take.
pub const ALDRETE_COMPONENT_MAX: u8 = 2;

/// Blood pressure assumed when neither a visit nor the episode baseline records one.
pub const DEFAULT_BLOOD_PRESSURE: (u16, u16) = (120, 80);

/// Total cholesterol (mg/dL) assumed when the latest visit has no lipid panel.
pub const DEFAULT_TOTAL_CHOLESTEROL_MG_DL: f64 = 180.0;

/// HDL cholesterol (mg/dL) assumed when the latest visit has no lipid panel.
pub const DEFAULT_HDL_MG_DL: f64 = 50.0;

/// Treatment snapshot recorded when no medication is active (Spanish locale).
pub const NO_ACTIVE_MEDICATION_ES: &str = "Sin medicación activa";

/// Treatment snapshot recorded when no medication is active (English locale).
pub const NO_ACTIVE_MEDICATION_EN: &str = "No active medication";

/// Diagnosis tags that identify diabetes for cardiovascular scoring.
pub const DIABETES_TAGS: &[&str] = &["Diabetes Mellitus"];

/// Diagnosis tags that identify arterial hypertension for cardiovascular scoring.
pub const HYPERTENSION_TAGS: &[&str] = &["Hipertensión Arterial", "Arterial Hypertension"];

/// Patient chronic-disease tags that identify active smoking.
pub const SMOKING_TAGS: &[&str] = &["Tabaquismo", "Smoking"];

/// Maximum length of a free-text tag (diagnosis, outcome).
pub const MAX_TAG_LEN: usize = 200;

/// A voluntary discharge form is witnessed by exactly this many people.
pub const DISCHARGE_WITNESS_COUNT: usize = 2;
