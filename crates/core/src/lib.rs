//! # Care Core
//!
//! Core clinical logic for longitudinal patient care.
//!
//! This crate contains the record model and the rules that govern it:
//! - **Episode Store**: chronic-disease and pregnancy episodes per patient, with at most one
//!   Active episode per kind and read-only archived episodes
//! - **Encounter Log**: append-only visits with values derived at append time (treatment
//!   snapshot, gestational age)
//! - **Scoring Engine**: cardiovascular and obstetric risk, Aldrete recovery score, fluid balance
//! - **Note Certification**: Draft → Signed lifecycle for clinical documents with an integrity
//!   hash stamped on signing
//!
//! **No I/O**: rendering, persistence and transport belong to the callers. Committed changes are
//! handed to a [`RecordSink`] implemented outside this crate. Configuration is resolved once at
//! startup into a [`CoreConfig`] and passed in; the core never reads environment variables.

pub mod config;
pub mod constants;
pub mod encounter;
pub mod episode;
pub mod error;
pub mod integrity;
pub mod note;
pub mod patient;
pub mod scoring;
pub mod sink;
pub mod store;
pub mod validation;

pub use config::{locale_from_env_value, CoreConfig, Locale};
pub use encounter::{Encounter, GestationalAge, LabResults, VisitInput};
pub use episode::{CareEpisode, EpisodeKind, EpisodePatch, EpisodeStatus, NewEpisode};
pub use error::{CareError, CareResult, ErrorKind};
pub use integrity::IntegrityHash;
pub use note::{ClinicalNote, NoteContent, NoteKind, NoteService, NoteStatus, SignOptions};
pub use patient::PatientSnapshot;
pub use sink::{NoopSink, PatientEpisodes, RecordSink};
pub use store::EpisodeStore;

pub use care_types::{BloodPressure, BloodType, NonEmptyText, Sex};
pub use care_uuid::{RecordId, TimestampId};
