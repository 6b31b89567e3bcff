//! Clinical notes and their certification lifecycle.
//!
//! A note is created as an editable draft and moves once to Signed. Signing checks the
//! kind-specific mandatory fields, freezes the content and stamps an integrity hash. A signed
//! note accepts no further writes.
//!
//! The status is kept at runtime rather than in the type: notes loaded back from storage may be
//! in either state, and callers must get a [`CareError::NoteSigned`] rather than a compile error.

pub mod content;
pub mod service;

pub use content::{
    AdmissionNote, AnesthesiaNote, CertificateNote, DischargeNote, InterconsultationNote,
    NoteContent, NoteKind, ReferralNote,
};
pub use service::NoteService;

use crate::constants::ALDRETE_CONFIRMATION_THRESHOLD;
use crate::integrity::{generate_nonce, seal, IntegrityHash, SealInput};
use crate::{CareError, CareResult};
use care_types::NonEmptyText;
use care_uuid::{RecordId, TimestampId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Draft,
    Signed,
}

/// Options for [`ClinicalNote::sign`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignOptions {
    /// The signer has seen and accepted an Aldrete total below the recovery threshold.
    pub acknowledge_low_aldrete: bool,
}

/// Stamp recorded when a note is signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSignature {
    pub hash: IntegrityHash,
    pub signed_at: DateTime<Utc>,
    pub signed_by: NonEmptyText,
    /// Random value mixed into the hash; kept so the hash can be recomputed.
    pub nonce: String,
}

/// A clinical document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClinicalNote {
    id: TimestampId,
    patient_id: RecordId,
    kind: NoteKind,
    author: NonEmptyText,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    content: NoteContent,
    #[serde(default)]
    signature: Option<NoteSignature>,
}

impl ClinicalNote {
    /// Creates an unsigned draft. The note kind is taken from `content`.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::InvalidValue`] if `author` is blank.
    pub fn new_draft(patient_id: RecordId, author: &str, content: NoteContent) -> CareResult<Self> {
        let author = NonEmptyText::new(author)?;
        let id = TimestampId::generate(None);
        let now = id.timestamp();

        Ok(Self {
            id,
            patient_id,
            kind: content.kind(),
            author,
            created_at: now,
            updated_at: now,
            content,
            signature: None,
        })
    }

    pub fn id(&self) -> &TimestampId {
        &self.id
    }

    pub fn patient_id(&self) -> RecordId {
        self.patient_id
    }

    pub fn kind(&self) -> NoteKind {
        self.kind
    }

    pub fn author(&self) -> &str {
        self.author.as_str()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn content(&self) -> &NoteContent {
        &self.content
    }

    pub fn status(&self) -> NoteStatus {
        if self.signature.is_some() {
            NoteStatus::Signed
        } else {
            NoteStatus::Draft
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn signature(&self) -> Option<&NoteSignature> {
        self.signature.as_ref()
    }

    /// Integrity hash; present iff the note is signed.
    pub fn hash(&self) -> Option<&IntegrityHash> {
        self.signature.as_ref().map(|s| &s.hash)
    }

    fn ensure_draft(&self) -> CareResult<()> {
        if self.is_signed() {
            return Err(CareError::NoteSigned(self.id.clone()));
        }
        Ok(())
    }

    fn ensure_kind(&self, content: &NoteContent) -> CareResult<()> {
        if content.kind() != self.kind {
            return Err(CareError::NoteKindMismatch {
                expected: self.kind,
                actual: content.kind(),
            });
        }
        Ok(())
    }

    /// Replaces the draft content.
    ///
    /// # Errors
    ///
    /// - [`CareError::NoteSigned`] if the note is already signed; content is left unchanged.
    /// - [`CareError::NoteKindMismatch`] if `content` is of another kind.
    pub fn save_draft(&mut self, content: NoteContent) -> CareResult<()> {
        self.ensure_draft()?;
        self.ensure_kind(&content)?;

        self.content = content;
        self.updated_at = Utc::now().max(self.updated_at);
        Ok(())
    }

    /// Signs the note with `content` as its final text.
    ///
    /// See [`sign_at`](Self::sign_at).
    pub fn sign(
        &mut self,
        content: NoteContent,
        signer: &str,
        options: SignOptions,
    ) -> CareResult<&NoteSignature> {
        self.sign_at(content, signer, options, Utc::now())
    }

    /// Signs the note at a given instant.
    ///
    /// All checks run before anything is written, so on error the note stays an unchanged
    /// draft.
    ///
    /// # Errors
    ///
    /// - [`CareError::NoteSigned`] if the note is already signed.
    /// - [`CareError::NoteKindMismatch`] if `content` is of another kind.
    /// - [`CareError::InvalidValue`] if `signer` is blank.
    /// - [`CareError::MissingNoteFields`] listing every blank mandatory field.
    /// - [`CareError::LowAldreteNotAcknowledged`] for an anesthesia note whose Aldrete total is
    ///   below the threshold when `options.acknowledge_low_aldrete` is not set.
    pub fn sign_at(
        &mut self,
        content: NoteContent,
        signer: &str,
        options: SignOptions,
        signed_at: DateTime<Utc>,
    ) -> CareResult<&NoteSignature> {
        self.ensure_draft()?;
        self.ensure_kind(&content)?;
        let signed_by = NonEmptyText::new(signer)?;

        let missing = content.missing_fields();
        if !missing.is_empty() {
            return Err(CareError::MissingNoteFields(missing));
        }

        if let NoteContent::Anesthesia(anesthesia) = &content {
            if let Some(score) = anesthesia.aldrete_score()? {
                if score.requires_confirmation && !options.acknowledge_low_aldrete {
                    return Err(CareError::LowAldreteNotAcknowledged {
                        total: score.total,
                        threshold: ALDRETE_CONFIRMATION_THRESHOLD,
                    });
                }
            }
        }

        let content_json = serde_json::to_string(&content)?;
        let nonce = generate_nonce();
        let hash = self.seal_with(&signed_by, signed_at, &content_json, &nonce);

        self.content = content;
        self.updated_at = signed_at;
        Ok(self.signature.insert(NoteSignature {
            hash,
            signed_at,
            signed_by,
            nonce,
        }))
    }

    /// Recomputes the integrity hash from the stored fields and compares it.
    ///
    /// Returns `Ok(false)` for an unsigned note.
    pub fn verify_integrity(&self) -> CareResult<bool> {
        let Some(signature) = &self.signature else {
            return Ok(false);
        };
        let content_json = serde_json::to_string(&self.content)?;
        let expected = self.seal_with(
            &signature.signed_by,
            signature.signed_at,
            &content_json,
            &signature.nonce,
        );
        Ok(expected == signature.hash)
    }

    fn seal_with(
        &self,
        signer: &NonEmptyText,
        signed_at: DateTime<Utc>,
        content_json: &str,
        nonce: &str,
    ) -> IntegrityHash {
        let note_id = self.id.to_string();
        let patient_id = self.patient_id.to_string();
        seal(&SealInput {
            note_id: &note_id,
            patient_id: &patient_id,
            kind: self.kind.as_str(),
            signer: signer.as_str(),
            signed_at,
            content_json,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::AldreteComponents;

    fn admission(chief_complaint: &str) -> NoteContent {
        NoteContent::Admission(AdmissionNote {
            chief_complaint: chief_complaint.into(),
            current_illness: "Dolor abdominal de 12 horas de evolución".into(),
            admission_diagnosis: "Apendicitis aguda".into(),
            ..Default::default()
        })
    }

    fn anesthesia(aldrete: AldreteComponents) -> NoteContent {
        NoteContent::Anesthesia(AnesthesiaNote {
            procedure: "Apendicectomía".into(),
            technique: "Bloqueo neuroaxial".into(),
            asa_class: "I-E".into(),
            aldrete: Some(aldrete),
            ..Default::default()
        })
    }

    fn aldrete(value: u8) -> AldreteComponents {
        AldreteComponents {
            activity: value,
            respiration: value,
            circulation: value,
            consciousness: value,
            oxygenation: value,
        }
    }

    fn draft(content: NoteContent) -> ClinicalNote {
        ClinicalNote::new_draft(RecordId::new(), "Dr. Luis Ramírez", content).unwrap()
    }

    #[test]
    fn new_draft_is_unsigned_without_hash() {
        let note = draft(admission(""));
        assert_eq!(note.status(), NoteStatus::Draft);
        assert!(!note.is_signed());
        assert!(note.hash().is_none());
        assert_eq!(note.kind(), NoteKind::Admission);
    }

    #[test]
    fn new_draft_requires_author() {
        assert!(ClinicalNote::new_draft(RecordId::new(), "  ", admission("")).is_err());
    }

    #[test]
    fn save_draft_overwrites_content() {
        let mut note = draft(admission(""));
        note.save_draft(admission("Dolor en fosa ilíaca derecha")).unwrap();
        match note.content() {
            NoteContent::Admission(n) => {
                assert_eq!(n.chief_complaint, "Dolor en fosa ilíaca derecha")
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn save_draft_rejects_other_kind() {
        let mut note = draft(admission(""));
        let err = note
            .save_draft(NoteContent::empty(NoteKind::Referral))
            .unwrap_err();
        assert!(matches!(err, CareError::NoteKindMismatch { .. }));
    }

    #[test]
    fn sign_with_missing_field_fails_and_stays_draft() {
        let mut note = draft(admission(""));
        let before = note.clone();

        let err = note
            .sign(admission(" "), "Dr. Luis Ramírez", SignOptions::default())
            .unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(err, CareError::MissingNoteFields(ref f) if f == &["chief_complaint"]));
        assert!(!note.is_signed());
        assert_eq!(note, before);
    }

    #[test]
    fn sign_freezes_content_and_stamps_hash() {
        let mut note = draft(admission(""));
        let signature = note
            .sign(
                admission("Dolor abdominal"),
                "Dr. Luis Ramírez",
                SignOptions::default(),
            )
            .unwrap()
            .clone();

        assert!(note.is_signed());
        assert_eq!(note.status(), NoteStatus::Signed);
        assert_eq!(note.hash(), Some(&signature.hash));
        assert_eq!(signature.signed_by.as_str(), "Dr. Luis Ramírez");
        assert!(note.verify_integrity().unwrap());
    }

    #[test]
    fn signed_note_rejects_every_write() {
        let mut note = draft(admission(""));
        note.sign(admission("Dolor abdominal"), "Dr. Luis Ramírez", SignOptions::default())
            .unwrap();
        let frozen = serde_json::to_vec(note.content()).unwrap();
        let hash = note.hash().cloned();

        let err = note.save_draft(admission("Otro motivo")).unwrap_err();
        assert!(err.is_state());
        let err = note
            .sign(admission("Otro motivo"), "Dr. Luis Ramírez", SignOptions::default())
            .unwrap_err();
        assert!(matches!(err, CareError::NoteSigned(_)));

        assert_eq!(serde_json::to_vec(note.content()).unwrap(), frozen);
        assert_eq!(note.hash().cloned(), hash);
    }

    #[test]
    fn identical_content_signed_twice_gets_distinct_hashes() {
        let signed_at = Utc::now();
        let mut a = draft(admission(""));
        let mut b = a.clone();
        let hash_a = a
            .sign_at(admission("Fiebre"), "Dr. X", SignOptions::default(), signed_at)
            .unwrap()
            .hash
            .clone();
        let hash_b = b
            .sign_at(admission("Fiebre"), "Dr. X", SignOptions::default(), signed_at)
            .unwrap()
            .hash
            .clone();
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    fn full_aldrete_signs_without_acknowledgement() {
        let mut note = draft(anesthesia(aldrete(2)));
        note.sign(anesthesia(aldrete(2)), "Dra. Anestesióloga", SignOptions::default())
            .unwrap();
        assert!(note.is_signed());
    }

    #[test]
    fn low_aldrete_requires_acknowledgement() {
        let mut note = draft(anesthesia(aldrete(1)));

        let err = note
            .sign(anesthesia(aldrete(1)), "Dra. Anestesióloga", SignOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CareError::LowAldreteNotAcknowledged {
                total: 5,
                threshold: 8
            }
        ));
        assert!(!note.is_signed());

        note.sign(
            anesthesia(aldrete(1)),
            "Dra. Anestesióloga",
            SignOptions {
                acknowledge_low_aldrete: true,
            },
        )
        .unwrap();
        assert!(note.is_signed());
    }

    #[test]
    fn tampered_content_fails_verification() {
        let mut note = draft(admission(""));
        note.sign(admission("Cefalea"), "Dr. X", SignOptions::default())
            .unwrap();

        let mut value = serde_json::to_value(&note).unwrap();
        value["content"]["chief_complaint"] = "Migraña".into();
        let tampered: ClinicalNote = serde_json::from_value(value).unwrap();
        assert!(tampered.is_signed());
        assert!(!tampered.verify_integrity().unwrap());

        let reloaded: ClinicalNote =
            serde_json::from_str(&serde_json::to_string(&note).unwrap()).unwrap();
        assert!(reloaded.verify_integrity().unwrap());
    }

    #[test]
    fn unsigned_note_does_not_verify() {
        assert!(!draft(admission("")).verify_integrity().unwrap());
    }
}
