//! Masses and widths used by the likelihood.

use std::f64::consts::{PI, SQRT_2};

use serde::{Deserialize, Serialize};

/// Fermi constant in GeV⁻².
const FERMI_CONSTANT: f64 = 1.16637e-5;
/// Strong coupling at the top mass scale used for the width correction.
const ALPHA_S: f64 = 0.118;

/// Pole masses and widths (GeV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConstants {
    /// b-quark mass.
    pub mass_bottom: f64,
    /// W-boson pole mass.
    pub mass_w: f64,
    /// W-boson width.
    pub gamma_w: f64,
    /// Top-quark pole mass.
    pub mass_top: f64,
    /// Top-quark width override. `None` derives the NLO width from the masses.
    pub gamma_top: Option<f64>,
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self { mass_bottom: 4.7, mass_w: 80.4, gamma_w: 2.1, mass_top: 172.5, gamma_top: None }
    }
}

impl PhysicsConstants {
    /// Top-quark width: the override if set, otherwise the NLO width
    ///
    /// `Γ = G_F m_t³ / (8π√2) (1 - x)² (1 + 2x) [1 - 2α_s/(3π) (2π²/3 - 5/2)]`,
    /// `x = m_W² / m_t²`.
    pub fn gamma_top(&self) -> f64 {
        self.gamma_top_at(self.mass_top)
    }

    /// Top-quark width for a top mass of `mt`: the override if set, otherwise the NLO
    /// width evaluated at `mt`.
    pub fn gamma_top_at(&self, mt: f64) -> f64 {
        if let Some(g) = self.gamma_top {
            return g;
        }
        let x = (self.mass_w / mt).powi(2);
        let born = FERMI_CONSTANT * mt.powi(3) / (8.0 * PI * SQRT_2) * (1.0 - x).powi(2) * (1.0 + 2.0 * x);
        let qcd = 1.0 - 2.0 * ALPHA_S / (3.0 * PI) * (2.0 * PI * PI / 3.0 - 2.5);
        born * qcd
    }
}
