//! Validated value types shared across the care record crates.
//!
//! Each type here guarantees its invariant once constructed, so downstream code can rely on
//! it without re-checking (a `BloodPressure` always has a systolic above its diastolic, a
//! `NonEmptyText` is always trimmed and non-empty).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when constructing validated value types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,

    /// Blood pressure text was not in `SYS/DIA` form
    #[error("blood pressure must be written as SYS/DIA, got '{0}'")]
    BloodPressureFormat(String),

    /// Blood pressure values were outside a physiologically plausible range
    #[error("blood pressure {systolic}/{diastolic} is out of range")]
    BloodPressureRange { systolic: u16, diastolic: u16 },

    #[error("unknown sex '{0}'")]
    UnknownSex(String),

    #[error("unknown blood type '{0}'")]
    UnknownBloodType(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::Empty`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An arterial blood pressure reading in mmHg.
///
/// Clinical forms capture blood pressure as a single `"SYS/DIA"` string, which is also the
/// serialised form of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BloodPressure {
    systolic: u16,
    diastolic: u16,
}

impl BloodPressure {
    const MAX_MMHG: u16 = 300;

    /// Builds a reading from its components.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::BloodPressureRange`] when either value is zero, above 300 mmHg,
    /// or when the diastolic is not below the systolic.
    pub fn new(systolic: u16, diastolic: u16) -> Result<Self, TypesError> {
        if systolic == 0
            || diastolic == 0
            || systolic > Self::MAX_MMHG
            || diastolic >= systolic
        {
            return Err(TypesError::BloodPressureRange {
                systolic,
                diastolic,
            });
        }
        Ok(Self {
            systolic,
            diastolic,
        })
    }

    /// Parses the `"SYS/DIA"` notation, tolerating whitespace around either number.
    pub fn parse(input: &str) -> Result<Self, TypesError> {
        let (sys, dia) = input
            .split_once('/')
            .ok_or_else(|| TypesError::BloodPressureFormat(input.to_owned()))?;
        let systolic = sys
            .trim()
            .parse::<u16>()
            .map_err(|_| TypesError::BloodPressureFormat(input.to_owned()))?;
        let diastolic = dia
            .trim()
            .parse::<u16>()
            .map_err(|_| TypesError::BloodPressureFormat(input.to_owned()))?;
        Self::new(systolic, diastolic)
    }

    pub fn systolic(&self) -> u16 {
        self.systolic
    }

    pub fn diastolic(&self) -> u16 {
        self.diastolic
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

impl FromStr for BloodPressure {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for BloodPressure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BloodPressure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BloodPressure::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Administrative sex as supplied by the patient directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl FromStr for Sex {
    type Err = TypesError;

    /// Accepts English and Spanish spellings as well as the single-letter forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "masculino" | "hombre" => Ok(Self::Male),
            "female" | "f" | "femenino" | "mujer" => Ok(Self::Female),
            _ => Err(TypesError::UnknownSex(s.to_owned())),
        }
    }
}

/// ABO/Rh blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }

    /// Whether the group is Rh negative, which matters for isoimmunisation in pregnancy.
    pub fn is_rh_negative(&self) -> bool {
        matches!(
            self,
            Self::ANegative | Self::BNegative | Self::AbNegative | Self::ONegative
        )
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_uppercase().replace(' ', "");
        let all = [
            Self::APositive,
            Self::ANegative,
            Self::BPositive,
            Self::BNegative,
            Self::AbPositive,
            Self::AbNegative,
            Self::OPositive,
            Self::ONegative,
        ];
        all.into_iter()
            .find(|t| t.as_str() == normalised)
            .ok_or_else(|| TypesError::UnknownBloodType(s.to_owned()))
    }
}
