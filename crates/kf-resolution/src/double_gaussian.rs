//! Double-Gaussian resolution in the relative response.

use std::path::Path;

use kf_core::{Error, Result};
use statrs::consts::SQRT_2PI;

use crate::function::{Density, ResolutionFunction};
use crate::math::{LN_SQRT_2PI, gauss_kernel, log_add_exp};

/// Sum of two Gaussians in the relative response `Δ = (x - measured) / x`.
///
/// Each shape term is linear in the true value `x`:
///
/// | term | value |
/// |------|-------|
/// | `μ1` | `p0 + p1 x` |
/// | `σ1` | `p2 + p3 x` |
/// | `A2` | `p4 + p5 x` |
/// | `μ2` | `p6 + p7 x` |
/// | `σ2` | `p8 + p9 x` |
///
/// `p(Δ) = [g(Δ; μ1, σ1) + A2 g(Δ; μ2, σ2)] / (√(2π) (σ1 + A2 σ2))` with `g` the
/// unnormalized kernel. The density over the measured value carries the Jacobian
/// `1 / |x|`, so it integrates to one over `measured`.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleGaussianResolution {
    coefficients: [f64; 10],
}

struct Shape {
    mu1: f64,
    sigma1: f64,
    amp2: f64,
    mu2: f64,
    sigma2: f64,
}

impl DoubleGaussianResolution {
    /// Number of coefficients `p0..p9`.
    pub const N_COEFFICIENTS: usize = 10;

    /// Create from a coefficient slice of length 10.
    pub fn from_coefficients(coefficients: &[f64]) -> Result<Self> {
        let coefficients: [f64; 10] = coefficients.try_into().map_err(|_| {
            Error::Configuration(format!(
                "DoubleGaussianResolution expects {} coefficients, got {}",
                Self::N_COEFFICIENTS,
                coefficients.len()
            ))
        })?;
        Ok(Self { coefficients })
    }

    /// Load coefficients from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let c = crate::read_coefficients(path, Self::N_COEFFICIENTS)?;
        Self::from_coefficients(&c)
    }

    fn shape(&self, x: f64) -> Shape {
        let p = &self.coefficients;
        Shape {
            mu1: p[0] + p[1] * x,
            sigma1: p[2] + p[3] * x,
            amp2: p[4] + p[5] * x,
            mu2: p[6] + p[7] * x,
            sigma2: p[8] + p[9] * x,
        }
    }
}

impl ResolutionFunction for DoubleGaussianResolution {
    fn name(&self) -> &str {
        "double_gaussian"
    }

    fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn width(&self, x: f64) -> f64 {
        (x.abs() * self.shape(x).sigma1).max(0.0)
    }

    fn density(&self, true_value: f64, measured: f64, _aux: Option<f64>) -> Density {
        if !(true_value.is_finite() && true_value > 0.0) {
            return Density::invalid();
        }
        let s = self.shape(true_value);
        if !(s.sigma1 > 0.0 && s.sigma2 > 0.0 && s.amp2 >= 0.0) {
            return Density::invalid();
        }
        let delta = (true_value - measured) / true_value;
        let numerator = gauss_kernel(delta, s.mu1, s.sigma1) + s.amp2 * gauss_kernel(delta, s.mu2, s.sigma2);
        let norm = SQRT_2PI * (s.sigma1 + s.amp2 * s.sigma2);
        Density::valid(numerator / norm / true_value)
    }

    fn log_density(&self, true_value: f64, measured: f64, _aux: Option<f64>) -> Option<f64> {
        if !(true_value.is_finite() && true_value > 0.0) {
            return None;
        }
        let s = self.shape(true_value);
        if !(s.sigma1 > 0.0 && s.sigma2 > 0.0 && s.amp2 >= 0.0) {
            return None;
        }
        let delta = (true_value - measured) / true_value;
        let z1 = (delta - s.mu1) / s.sigma1;
        let z2 = (delta - s.mu2) / s.sigma2;
        let second = if s.amp2 > 0.0 { s.amp2.ln() - 0.5 * z2 * z2 } else { f64::NEG_INFINITY };
        let log_numerator = log_add_exp(-0.5 * z1 * z1, second);
        let log_norm = LN_SQRT_2PI + (s.sigma1 + s.amp2 * s.sigma2).ln();
        Some(log_numerator - log_norm - true_value.ln())
    }
}
