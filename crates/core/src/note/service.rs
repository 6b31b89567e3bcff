//! Note certification service.
//!
//! Wraps the [`ClinicalNote`] transitions and reports every committed change to the record
//! sink. The note itself enforces the lifecycle; the service adds the collaborator call and the
//! log lines.

use super::{ClinicalNote, NoteContent, NoteSignature, SignOptions};
use crate::sink::{NoopSink, RecordSink};
use crate::CareResult;
use care_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone)]
pub struct NoteService {
    sink: Arc<dyn RecordSink>,
}

impl Default for NoteService {
    fn default() -> Self {
        Self::new(Arc::new(NoopSink))
    }
}

impl NoteService {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink }
    }

    /// Creates a draft note for a patient.
    ///
    /// # Arguments
    ///
    /// * `patient_id` - Patient the note belongs to.
    /// * `author` - Clinician writing the note. Must be non-blank.
    /// * `content` - Initial content; also fixes the note kind.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `author` is blank.
    pub fn create_draft(
        &self,
        patient_id: RecordId,
        author: &str,
        content: NoteContent,
    ) -> CareResult<ClinicalNote> {
        let note = ClinicalNote::new_draft(patient_id, author, content)?;
        tracing::info!(
            "created {} draft {} for patient {}",
            note.kind(),
            note.id(),
            patient_id
        );
        self.sink.on_save_note(&note);
        Ok(note)
    }

    /// Saves new draft content.
    ///
    /// # Errors
    ///
    /// - [`CareError::NoteSigned`](crate::CareError::NoteSigned) if the note is signed.
    /// - [`CareError::NoteKindMismatch`](crate::CareError::NoteKindMismatch) if the content is
    ///   of another kind.
    pub fn save_draft(&self, note: &mut ClinicalNote, content: NoteContent) -> CareResult<()> {
        if let Err(err) = note.save_draft(content) {
            tracing::warn!("rejected draft save on note {}: {}", note.id(), err);
            return Err(err);
        }
        tracing::debug!("saved draft {}", note.id());
        self.sink.on_save_note(note);
        Ok(())
    }

    /// Signs a note, making it immutable.
    ///
    /// # Arguments
    ///
    /// * `note` - Draft to sign.
    /// * `content` - Final content; replaces the draft content on success.
    /// * `signer` - Name of the signing clinician.
    /// * `options` - Acknowledgements for soft gates such as a low Aldrete score.
    ///
    /// # Returns
    ///
    /// A copy of the signature stamped on the note.
    ///
    /// # Errors
    ///
    /// Any error from [`ClinicalNote::sign`]; the note is left unchanged.
    pub fn sign(
        &self,
        note: &mut ClinicalNote,
        content: NoteContent,
        signer: &str,
        options: SignOptions,
    ) -> CareResult<NoteSignature> {
        let signature = match note.sign(content, signer, options) {
            Ok(signature) => signature.clone(),
            Err(err) => {
                tracing::warn!("rejected signing of note {}: {}", note.id(), err);
                return Err(err);
            }
        };

        tracing::info!(
            "signed {} note {} (hash {})",
            note.kind(),
            note.id(),
            signature.hash
        );
        self.sink.on_save_note(note);
        Ok(signature)
    }
}

impl std::fmt::Debug for NoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteService").finish_non_exhaustive()
    }
}
