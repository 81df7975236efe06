//! Gaussian resolution with an energy-dependent width.

use std::path::Path;

use kf_core::{Error, Result};

use crate::function::{Density, ResolutionFunction};
use crate::math::{normal_logpdf, normal_pdf};

/// Gaussian resolution with an energy-dependent width.
///
/// `sigma(x) = sqrt(a^2 x^2 + b^2 x + c^2)`: constant term `a`, stochastic term `b`
/// and noise term `c` of a calorimeter-style parameterization. The density is the
/// exactly normalized `N(measured; x, sigma(x))`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianResolution {
    coefficients: [f64; 3],
}

impl GaussianResolution {
    /// Number of coefficients `(a, b, c)`.
    pub const N_COEFFICIENTS: usize = 3;

    /// Create from the three width coefficients.
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { coefficients: [a, b, c] }
    }

    /// Constant width `sigma` independent of the true value.
    pub fn fixed_width(sigma: f64) -> Self {
        Self::new(0.0, 0.0, sigma)
    }

    /// Create from a coefficient slice of length 3.
    pub fn from_coefficients(coefficients: &[f64]) -> Result<Self> {
        match *coefficients {
            [a, b, c] => Ok(Self::new(a, b, c)),
            _ => Err(Error::Configuration(format!(
                "GaussianResolution expects {} coefficients, got {}",
                Self::N_COEFFICIENTS,
                coefficients.len()
            ))),
        }
    }

    /// Load coefficients from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let c = crate::read_coefficients(path, Self::N_COEFFICIENTS)?;
        Self::from_coefficients(&c)
    }
}

impl ResolutionFunction for GaussianResolution {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn width(&self, x: f64) -> f64 {
        let [a, b, c] = self.coefficients;
        // The stochastic term goes negative for x < 0; clamp so the width stays real.
        (a * a * x * x + b * b * x + c * c).max(0.0).sqrt()
    }

    fn density(&self, true_value: f64, measured: f64, _aux: Option<f64>) -> Density {
        let sigma = self.width(true_value);
        if !(sigma.is_finite() && sigma > 0.0) || !measured.is_finite() {
            return Density::invalid();
        }
        Density::valid(normal_pdf(measured, true_value, sigma))
    }

    fn log_density(&self, true_value: f64, measured: f64, _aux: Option<f64>) -> Option<f64> {
        let sigma = self.width(true_value);
        if !(sigma.is_finite() && sigma > 0.0) || !measured.is_finite() {
            return None;
        }
        Some(normal_logpdf(measured, true_value, sigma))
    }
}
