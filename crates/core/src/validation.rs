//! Input validation utilities.
//!
//! Free text entered on forms ends up in printed legal documents, so tags are normalised and
//! bounded before they are stored on a record.

use crate::constants::MAX_TAG_LEN;
use crate::{CareError, CareResult};

/// Validates a free-text tag (diagnosis, outcome) and returns its trimmed form.
///
/// # Errors
///
/// Returns [`CareError::InvalidInput`] if the tag is empty, longer than [`MAX_TAG_LEN`]
/// characters, or contains control characters such as line breaks.
pub fn validate_tag(tag: &str) -> CareResult<String> {
    let trimmed = tag.trim();

    if trimmed.is_empty() {
        return Err(CareError::InvalidInput("tag cannot be empty".into()));
    }

    if trimmed.chars().count() > MAX_TAG_LEN {
        return Err(CareError::InvalidInput(format!(
            "tag exceeds maximum length of {} characters",
            MAX_TAG_LEN
        )));
    }

    if trimmed.chars().any(char::is_control) {
        return Err(CareError::InvalidInput(
            "tag must not contain control characters".into(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Folds text for tag comparison: lowercase with Spanish accents removed.
pub(crate) fn fold_tag(tag: &str) -> String {
    tag.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

/// Returns true if any of `tags` is one of `needles`, ignoring case and accents.
///
/// Whole tags are compared: a qualified tag such as "Tabaquismo negado" is a different
/// condition from "Tabaquismo".
pub(crate) fn tags_include<S: AsRef<str>>(tags: &[S], needles: &[&str]) -> bool {
    tags.iter().any(|tag| {
        let folded = fold_tag(tag.as_ref());
        needles.iter().any(|needle| folded == fold_tag(needle))
    })
}

/// Validates that an optional measurement is a finite, strictly positive number.
pub(crate) fn validate_positive(name: &'static str, value: Option<f64>) -> CareResult<()> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(CareError::InvalidInput(format!(
            "{} must be a positive number",
            name
        ))),
        _ => Ok(()),
    }
}
