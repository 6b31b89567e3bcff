//! Kind-specific note payloads and their mandatory fields.

use crate::constants::DISCHARGE_WITNESS_COUNT;
use crate::scoring::{
    compute_aldrete, compute_fluid_balance, AldreteComponents, AldreteScore, FluidBalance,
    FluidEntry,
};
use crate::{CareError, CareResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Admission,
    Interconsultation,
    Anesthesia,
    Certificate,
    Discharge,
    Referral,
}

impl NoteKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NoteKind::Admission => "admission",
            NoteKind::Interconsultation => "interconsultation",
            NoteKind::Anesthesia => "anesthesia",
            NoteKind::Certificate => "certificate",
            NoteKind::Discharge => "discharge",
            NoteKind::Referral => "referral",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteKind {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admission" => Ok(NoteKind::Admission),
            "interconsultation" => Ok(NoteKind::Interconsultation),
            "anesthesia" => Ok(NoteKind::Anesthesia),
            "certificate" => Ok(NoteKind::Certificate),
            "discharge" => Ok(NoteKind::Discharge),
            "referral" => Ok(NoteKind::Referral),
            other => Err(CareError::InvalidInput(format!("unknown note kind '{}'", other))),
        }
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Collects the names of blank mandatory fields.
fn missing<'a>(fields: impl IntoIterator<Item = (&'static str, &'a str)>) -> Vec<&'static str> {
    fields
        .into_iter()
        .filter(|(_, value)| blank(value))
        .map(|(name, _)| name)
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionNote {
    pub chief_complaint: String,
    pub current_illness: String,
    pub admission_diagnosis: String,
    pub physical_exam: String,
    pub plan: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterconsultationNote {
    pub requesting_service: String,
    pub consulted_service: String,
    pub reason: String,
    pub assessment: String,
    pub recommendations: String,
    pub urgent: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnesthesiaNote {
    pub procedure: String,
    pub technique: String,
    /// ASA physical status, e.g. "II" or "III-E".
    pub asa_class: String,
    pub aldrete: Option<AldreteComponents>,
    pub fluids_in: Vec<FluidEntry>,
    pub fluids_out: Vec<FluidEntry>,
    pub observations: String,
}

impl AnesthesiaNote {
    /// Aldrete score of the recovery assessment, if one was recorded.
    pub fn aldrete_score(&self) -> CareResult<Option<AldreteScore>> {
        self.aldrete.as_ref().map(compute_aldrete).transpose()
    }

    pub fn fluid_balance(&self) -> FluidBalance {
        compute_fluid_balance(&self.fluids_in, &self.fluids_out)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateNote {
    pub purpose: String,
    pub clinical_findings: String,
    pub issued_to: String,
    /// Days of rest prescribed, for sick-leave certificates.
    pub rest_days: Option<u16>,
}

/// Voluntary discharge form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DischargeNote {
    pub applicant: String,
    pub reason: String,
    pub risk_disclosure: String,
    pub witnesses: Vec<String>,
}

impl DischargeNote {
    fn witnesses_complete(&self) -> bool {
        self.witnesses.len() == DISCHARGE_WITNESS_COUNT
            && self.witnesses.iter().all(|w| !blank(w))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralNote {
    pub destination_facility: String,
    pub reason: String,
    pub clinical_summary: String,
    pub urgent: bool,
}

/// Content payload of a clinical note.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteContent {
    Admission(AdmissionNote),
    Interconsultation(InterconsultationNote),
    Anesthesia(AnesthesiaNote),
    Certificate(CertificateNote),
    Discharge(DischargeNote),
    Referral(ReferralNote),
}

impl NoteContent {
    pub fn kind(&self) -> NoteKind {
        match self {
            NoteContent::Admission(_) => NoteKind::Admission,
            NoteContent::Interconsultation(_) => NoteKind::Interconsultation,
            NoteContent::Anesthesia(_) => NoteKind::Anesthesia,
            NoteContent::Certificate(_) => NoteKind::Certificate,
            NoteContent::Discharge(_) => NoteKind::Discharge,
            NoteContent::Referral(_) => NoteKind::Referral,
        }
    }

    /// An empty payload of the given kind, as a fresh form starts.
    pub fn empty(kind: NoteKind) -> Self {
        match kind {
            NoteKind::Admission => NoteContent::Admission(AdmissionNote::default()),
            NoteKind::Interconsultation => {
                NoteContent::Interconsultation(InterconsultationNote::default())
            }
            NoteKind::Anesthesia => NoteContent::Anesthesia(AnesthesiaNote::default()),
            NoteKind::Certificate => NoteContent::Certificate(CertificateNote::default()),
            NoteKind::Discharge => NoteContent::Discharge(DischargeNote::default()),
            NoteKind::Referral => NoteContent::Referral(ReferralNote::default()),
        }
    }

    /// Names of mandatory fields that are still blank; empty when the note may be signed.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        match self {
            NoteContent::Admission(n) => missing([
                ("chief_complaint", n.chief_complaint.as_str()),
                ("current_illness", n.current_illness.as_str()),
                ("admission_diagnosis", n.admission_diagnosis.as_str()),
            ]),
            NoteContent::Interconsultation(n) => missing([
                ("requesting_service", n.requesting_service.as_str()),
                ("consulted_service", n.consulted_service.as_str()),
                ("reason", n.reason.as_str()),
                ("assessment", n.assessment.as_str()),
                ("recommendations", n.recommendations.as_str()),
            ]),
            NoteContent::Anesthesia(n) => {
                let mut fields = missing([
                    ("procedure", n.procedure.as_str()),
                    ("technique", n.technique.as_str()),
                    ("asa_class", n.asa_class.as_str()),
                ]);
                if n.aldrete.is_none() {
                    fields.push("aldrete");
                }
                fields
            }
            NoteContent::Certificate(n) => missing([
                ("purpose", n.purpose.as_str()),
                ("clinical_findings", n.clinical_findings.as_str()),
                ("issued_to", n.issued_to.as_str()),
            ]),
            NoteContent::Discharge(n) => {
                let mut fields = missing([
                    ("applicant", n.applicant.as_str()),
                    ("reason", n.reason.as_str()),
                    ("risk_disclosure", n.risk_disclosure.as_str()),
                ]);
                if !n.witnesses_complete() {
                    fields.push("witnesses");
                }
                fields
            }
            NoteContent::Referral(n) => missing([
                ("destination_facility", n.destination_facility.as_str()),
                ("reason", n.reason.as_str()),
                ("clinical_summary", n.clinical_summary.as_str()),
            ]),
        }
    }
}
