//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Core code never reads process-wide environment variables itself.

use crate::constants::{NO_ACTIVE_MEDICATION_EN, NO_ACTIVE_MEDICATION_ES};
use crate::{CareError, CareResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Language used for labels the core writes into records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl FromStr for Locale {
    type Err = CareError;

    /// Accepts bare language codes and regional tags (`es`, `es-MX`, `en_GB`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match lang.as_str() {
            "es" => Ok(Locale::Es),
            "en" => Ok(Locale::En),
            _ => Err(CareError::InvalidInput(format!(
                "unsupported locale '{}' (expected es or en)",
                s.trim()
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug, Default)]
pub struct CoreConfig {
    locale: Locale,
}

impl CoreConfig {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Text captured as the treatment snapshot when no medication is active.
    pub fn no_active_medication_label(&self) -> &'static str {
        match self.locale {
            Locale::Es => NO_ACTIVE_MEDICATION_ES,
            Locale::En => NO_ACTIVE_MEDICATION_EN,
        }
    }
}

/// Parse the locale from an optional string value (typically `CARE_LOCALE`).
///
/// If `value` is `None` or empty/whitespace, returns the default locale.
pub fn locale_from_env_value(value: Option<String>) -> CareResult<Locale> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<Locale>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}
