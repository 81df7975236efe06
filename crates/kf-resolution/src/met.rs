//! Missing-transverse-energy resolution.

use std::path::Path;

use kf_core::{Error, Result};

use crate::function::{Density, ResolutionFunction};
use crate::math::{normal_logpdf, normal_pdf, sigmoid};

/// Gaussian resolution of one missing-transverse-energy component.
///
/// The width depends on the scalar transverse-energy sum `S` of the event rather than on
/// the fitted value:
///
/// `sigma(S) = p2 + p3 / (1 + exp(-p1 (S - p0)))`
///
/// `density(true, measured, Some(S))` is `N(measured; true, sigma(S))`. Without `S` the
/// density is invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct MetResolution {
    coefficients: [f64; 4],
}

impl MetResolution {
    /// Number of coefficients `(p0, p1, p2, p3)`.
    pub const N_COEFFICIENTS: usize = 4;

    /// Create from the four sigmoid coefficients.
    pub fn new(p0: f64, p1: f64, p2: f64, p3: f64) -> Self {
        Self { coefficients: [p0, p1, p2, p3] }
    }

    /// Create from a coefficient slice of length 4.
    pub fn from_coefficients(coefficients: &[f64]) -> Result<Self> {
        match *coefficients {
            [p0, p1, p2, p3] => Ok(Self::new(p0, p1, p2, p3)),
            _ => Err(Error::Configuration(format!(
                "MetResolution expects {} coefficients, got {}",
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

    fn sigma(&self, sum_et: f64) -> f64 {
        let [p0, p1, p2, p3] = self.coefficients;
        p2 + p3 * sigmoid(p1 * (sum_et - p0))
    }
}

impl ResolutionFunction for MetResolution {
    fn name(&self) -> &str {
        "met_gaussian"
    }

    fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Width at scalar sum `x`.
    fn width(&self, x: f64) -> f64 {
        self.sigma(x).max(0.0)
    }

    fn density(&self, true_value: f64, measured: f64, aux: Option<f64>) -> Density {
        let Some(sum_et) = aux else {
            return Density::invalid();
        };
        let sigma = self.sigma(sum_et);
        if !(sigma.is_finite() && sigma > 0.0) {
            return Density::invalid();
        }
        Density::valid(normal_pdf(measured, true_value, sigma))
    }

    fn log_density(&self, true_value: f64, measured: f64, aux: Option<f64>) -> Option<f64> {
        let sigma = self.sigma(aux?);
        (sigma.is_finite() && sigma > 0.0).then(|| normal_logpdf(measured, true_value, sigma))
    }
}
