use crate::episode::EpisodeKind;
use crate::note::NoteKind;
use care_uuid::{RecordId, TimestampId};

/// Broad classification of a [`CareError`].
///
/// Both kinds are recoverable by the caller: validation failures are corrected by fixing the
/// input, state failures by choosing a different operation for the record's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid required input.
    Validation,
    /// Operation illegal in the record's current lifecycle state.
    State,
}

#[derive(Debug, thiserror::Error)]
pub enum CareError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid value: {0}")]
    InvalidValue(#[from] care_types::TypesError),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] care_uuid::UuidError),

    #[error("at least one diagnosis is required to start a chronic disease episode")]
    MissingDiagnosis,
    #[error("a last menstrual period date is required to start a pregnancy episode")]
    MissingLastMenstrualPeriod,
    #[error("{0} is required to record a visit")]
    MissingMeasurement(&'static str),
    #[error("expected {expected} episode data, got {actual}")]
    EpisodeKindMismatch {
        expected: EpisodeKind,
        actual: EpisodeKind,
    },
    #[error("episode not found: {0}")]
    EpisodeNotFound(RecordId),
    #[error("medication not found: {0}")]
    MedicationNotFound(RecordId),

    #[error("expected {expected} note content, got {actual}")]
    NoteKindMismatch { expected: NoteKind, actual: NoteKind },
    #[error("cannot sign note, missing required fields: {}", .0.join(", "))]
    MissingNoteFields(Vec<&'static str>),
    #[error("Aldrete score {total} is below {threshold}; signing requires explicit acknowledgement")]
    LowAldreteNotAcknowledged { total: u8, threshold: u8 },
    #[error("failed to encode note content: {0}")]
    ContentEncoding(#[from] serde_json::Error),

    #[error("patient {patient_id} already has an active {kind} episode ({episode_id})")]
    ActiveEpisodeExists {
        patient_id: RecordId,
        kind: EpisodeKind,
        episode_id: RecordId,
    },
    #[error("episode {0} is archived and read-only")]
    EpisodeArchived(RecordId),
    #[error("note {0} is signed and can no longer be modified")]
    NoteSigned(TimestampId),
}

impl CareError {
    /// Returns whether this error is a validation or a lifecycle-state failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CareError::ActiveEpisodeExists { .. }
            | CareError::EpisodeArchived(_)
            | CareError::NoteSigned(_) => ErrorKind::State,
            _ => ErrorKind::Validation,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_state(&self) -> bool {
        self.kind() == ErrorKind::State
    }
}

pub type CareResult<T> = std::result::Result<T, CareError>;
