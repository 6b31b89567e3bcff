//! Identifier utilities for care records.
//!
//! Two identifier shapes are used across the workspace:
//!
//! - [`RecordId`]: a canonical UUID (**32 lowercase hexadecimal characters**, no hyphens) used
//!   for patients and care episodes.
//! - [`TimestampId`]: a time-prefixed identifier for entries that accumulate inside a record
//!   (visits, clinical notes). Its textual form sorts chronologically.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Canonical form is *required* for externally supplied identifiers. Use [`RecordId::parse`]
//! to validate an input string; hyphenated or uppercase values are rejected rather than
//! normalised.

mod ids;

pub use ids::{RecordId, TimestampId, Uuid};

/// Error type for identifier parsing.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
