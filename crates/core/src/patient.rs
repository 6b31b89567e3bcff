//! Inbound patient demographics.
//!
//! The patient directory owns demographic data; the core only receives a read-only snapshot of
//! the fields that clinical scoring depends on.

use crate::validation::{tags_include, validate_tag};
use crate::CareResult;
use care_types::{BloodType, Sex};
use care_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Snapshot of patient demographic data supplied by the patient directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    /// Patient identifier; episodes and notes reference the patient by this id.
    pub id: RecordId,

    /// Age in completed years.
    pub age: u32,

    pub sex: Sex,

    /// Chronic-disease tags held on the patient record (for example "Tabaquismo").
    #[serde(default)]
    pub chronic_disease_tags: Vec<String>,

    #[serde(default)]
    pub blood_type: Option<BloodType>,
}

impl PatientSnapshot {
    /// Builds a snapshot, validating every chronic-disease tag.
    pub fn new(
        id: RecordId,
        age: u32,
        sex: Sex,
        chronic_disease_tags: Vec<String>,
        blood_type: Option<BloodType>,
    ) -> CareResult<Self> {
        let chronic_disease_tags = chronic_disease_tags
            .iter()
            .map(|t| validate_tag(t))
            .collect::<CareResult<Vec<_>>>()?;

        Ok(Self {
            id,
            age,
            sex,
            chronic_disease_tags,
            blood_type,
        })
    }

    /// Returns true if one of the chronic-disease tags is one of `needles`.
    pub fn has_tag(&self, needles: &[&str]) -> bool {
        tags_include(&self.chronic_disease_tags, needles)
    }
}
