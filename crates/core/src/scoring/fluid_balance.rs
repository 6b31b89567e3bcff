//! Fluid intake/output balance.

use serde::{Deserialize, Serialize};

/// One charted intake or output (IV fluids, oral intake, diuresis, drains).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidEntry {
    pub label: String,
    pub volume_ml: f64,
}

impl FluidEntry {
    pub fn new(label: impl Into<String>, volume_ml: f64) -> Self {
        Self {
            label: label.into(),
            volume_ml,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidBalance {
    pub total_in_ml: f64,
    pub total_out_ml: f64,
    /// In minus out. Negative values are a net deficit.
    pub net_ml: f64,
}

impl FluidBalance {
    pub fn is_deficit(&self) -> bool {
        self.net_ml < 0.0
    }
}

/// Sum of intakes minus sum of outputs, unclamped.
pub fn compute_fluid_balance(inputs: &[FluidEntry], outputs: &[FluidEntry]) -> FluidBalance {
    let total_in_ml: f64 = inputs.iter().map(|e| e.volume_ml).sum();
    let total_out_ml: f64 = outputs.iter().map(|e| e.volume_ml).sum();

    FluidBalance {
        total_in_ml,
        total_out_ml,
        net_ml: total_in_ml - total_out_ml,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_is_in_minus_out() {
        let balance = compute_fluid_balance(
            &[
                FluidEntry::new("Solución Hartmann", 1000.0),
                FluidEntry::new("Vía oral", 350.0),
            ],
            &[FluidEntry::new("Diuresis", 900.0)],
        );
        assert_eq!(balance.total_in_ml, 1350.0);
        assert_eq!(balance.total_out_ml, 900.0);
        assert_eq!(balance.net_ml, 450.0);
        assert!(!balance.is_deficit());
    }

    #[test]
    fn deficit_is_not_clamped() {
        let balance = compute_fluid_balance(
            &[FluidEntry::new("Solución salina", 500.0)],
            &[
                FluidEntry::new("Diuresis", 800.0),
                FluidEntry::new("Drenaje", 250.0),
            ],
        );
        assert_eq!(balance.net_ml, -550.0);
        assert!(balance.is_deficit());
    }

    #[test]
    fn empty_chart_balances_to_zero() {
        let balance = compute_fluid_balance(&[], &[]);
        assert_eq!(balance.net_ml, 0.0);
        assert!(!balance.is_deficit());
    }
}
