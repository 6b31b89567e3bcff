//! Aldrete post-anesthesia recovery score.

use crate::constants::{ALDRETE_COMPONENT_MAX, ALDRETE_CONFIRMATION_THRESHOLD};
use crate::{CareError, CareResult};
use serde::{Deserialize, Serialize};

/// The five sub-scores, each selected independently from 0 to 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AldreteComponents {
    pub activity: u8,
    pub respiration: u8,
    pub circulation: u8,
    pub consciousness: u8,
    pub oxygenation: u8,
}

impl AldreteComponents {
    fn named(&self) -> [(&'static str, u8); 5] {
        [
            ("activity", self.activity),
            ("respiration", self.respiration),
            ("circulation", self.circulation),
            ("consciousness", self.consciousness),
            ("oxygenation", self.oxygenation),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AldreteScore {
    /// 0 to 10.
    pub total: u8,
    /// Below the threshold the signer must acknowledge the score before signing.
    pub requires_confirmation: bool,
}

/// Sums the five sub-scores.
///
/// # Errors
///
/// Returns [`CareError::InvalidInput`] if any component is above 2.
pub fn compute_aldrete(components: &AldreteComponents) -> CareResult<AldreteScore> {
    let mut total = 0;
    for (name, value) in components.named() {
        if value > ALDRETE_COMPONENT_MAX {
            return Err(CareError::InvalidInput(format!(
                "Aldrete {} must be between 0 and {}, got {}",
                name, ALDRETE_COMPONENT_MAX, value
            )));
        }
        total += value;
    }

    Ok(AldreteScore {
        total,
        requires_confirmation: total < ALDRETE_CONFIRMATION_THRESHOLD,
    })
}
