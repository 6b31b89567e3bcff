//! Integrity hashes stamped on signed notes.
//!
//! The hash is a SHA-256 digest over the note identity, the signer, the signing instant, the
//! canonical JSON of the frozen content and a random nonce drawn once per signing. Two signings
//! of identical content therefore never share a hash, while a stored note can still be checked
//! by recomputing the digest from its own fields.

use crate::{CareError, CareResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

const NONCE_BYTES: usize = 16;

/// Lowercase hex SHA-256 digest (64 characters).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntegrityHash(String);

impl IntegrityHash {
    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parses a stored hash, accepting only 64 lowercase hex characters.
    pub fn parse(input: &str) -> CareResult<Self> {
        let valid = input.len() == 64
            && input
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(CareError::InvalidInput(format!(
                "integrity hash must be 64 lowercase hex characters, got '{}'",
                input
            )));
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for IntegrityHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for IntegrityHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Everything that goes into a note's integrity hash.
pub(crate) struct SealInput<'a> {
    pub note_id: &'a str,
    pub patient_id: &'a str,
    pub kind: &'a str,
    pub signer: &'a str,
    pub signed_at: DateTime<Utc>,
    pub content_json: &'a str,
    pub nonce: &'a str,
}

/// Draws a fresh hex nonce for one signing event.
pub(crate) fn generate_nonce() -> String {
    let bytes: [u8; NONCE_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Computes the integrity hash of a signing event.
///
/// Fields are length-prefixed so that moving bytes between adjacent fields changes the digest.
pub(crate) fn seal(input: &SealInput<'_>) -> IntegrityHash {
    let signed_at = input
        .signed_at
        .to_rfc3339_opts(SecondsFormat::Micros, true);

    let mut hasher = Sha256::new();
    for field in [
        input.note_id,
        input.patient_id,
        input.kind,
        input.signer,
        signed_at.as_str(),
        input.content_json,
        input.nonce,
    ] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    let digest: [u8; 32] = hasher.finalize().into();
    IntegrityHash::from_bytes(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input<'a>(content_json: &'a str, nonce: &'a str) -> SealInput<'a> {
        SealInput {
            note_id: "20240301T101500.000Z-0123456789abcdef0123456789abcdef",
            patient_id: "fedcba9876543210fedcba9876543210",
            kind: "admission",
            signer: "Dra. Ana López",
            signed_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap(),
            content_json,
            nonce,
        }
    }

    #[test]
    fn seal_is_deterministic_for_same_input() {
        let a = seal(&input("{}", "00"));
        let b = seal(&input("{}", "00"));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn nonce_and_content_change_the_hash() {
        let base = seal(&input("{}", "00"));
        assert_ne!(base, seal(&input("{}", "01")));
        assert_ne!(base, seal(&input("{\"a\":1}", "00")));
    }

    #[test]
    fn nonces_are_fresh_per_call() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), NONCE_BYTES * 2);
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(IntegrityHash::parse("abc").is_err());
        assert!(IntegrityHash::parse(&"G".repeat(64)).is_err());
        assert!(IntegrityHash::parse(&"A".repeat(64)).is_err());
        assert!(IntegrityHash::parse(&"a".repeat(64)).is_ok());
    }
}
