//! Deterministic clinical scores.
//!
//! Every function here is pure: it reads episode, visit or form data and returns a score with
//! its classification. Nothing is cached and nothing is written back to the episode.

pub mod aldrete;
pub mod cardiovascular;
pub mod fluid_balance;
pub mod obstetric;

pub use aldrete::{compute_aldrete, AldreteComponents, AldreteScore};
pub use cardiovascular::{classify_cv_points, compute_cv_risk, CvRiskAssessment, CvRiskLevel};
pub use fluid_balance::{compute_fluid_balance, FluidBalance, FluidEntry};
pub use obstetric::{
    classify_obstetric_score, compute_obstetric_risk, score_risk_factors, CategoryScores,
    ObstetricRiskAssessment, ObstetricRiskLevel, RiskCategory, RiskFactor,
};
