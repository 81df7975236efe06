//! Relativistic Breit–Wigner weights for intermediate resonances.

use std::f64::consts::{PI, SQRT_2};

/// Log of the relativistic Breit–Wigner kernel `1 / ((m² - M²)² + M²Γ²)`.
///
/// The kernel is not normalized: its peak height depends on the pole mass and width.
#[inline]
pub fn log_breit_wigner_rel(m: f64, pole: f64, width: f64) -> f64 {
    let d = m * m - pole * pole;
    -(d * d + pole * pole * width * width).ln()
}

/// Log of the normalized relativistic Breit–Wigner density over `m ∈ [0, ∞)`.
///
/// `k / ((m² - M²)² + M²Γ²)` with `k = 2√2 M Γ γ / (π √(M² + γ))`, `γ = M √(M² + Γ²)`.
pub fn log_breit_wigner_rel_normalized(m: f64, pole: f64, width: f64) -> f64 {
    let gamma = pole * (pole * pole + width * width).sqrt();
    let k = 2.0 * SQRT_2 * pole * width * gamma / (PI * (pole * pole + gamma).sqrt());
    k.ln() + log_breit_wigner_rel(m, pole, width)
}
