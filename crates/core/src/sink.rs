//! Collaborator seam for persistence and presentation.
//!
//! The core never performs I/O. After every committed mutation it hands the affected records to
//! a [`RecordSink`], which the persistence/presentation layer implements.

use crate::episode::{CareEpisode, EpisodeKind};
use crate::note::ClinicalNote;
use care_uuid::RecordId;

/// All episodes of one kind held for a patient, newest started first.
#[derive(Clone, Copy, Debug)]
pub struct PatientEpisodes<'a> {
    pub patient_id: RecordId,
    pub kind: EpisodeKind,
    pub episodes: &'a [CareEpisode],
}

/// Receives committed changes from the core.
///
/// Both callbacks default to doing nothing so implementors only override what they persist.
pub trait RecordSink: Send + Sync {
    /// Called after an episode store mutation has been applied.
    fn on_update_patient(&self, _update: &PatientEpisodes<'_>) {}

    /// Called after a clinical note draft has been saved or the note has been signed.
    fn on_save_note(&self, _note: &ClinicalNote) {}
}

/// Sink that discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl RecordSink for NoopSink {}
