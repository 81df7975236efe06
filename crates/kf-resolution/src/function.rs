//! The resolution-function contract.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use kf_core::Result;
use serde::{Deserialize, Serialize};

use crate::{DoubleGaussianResolution, GaussianResolution, MetResolution};

/// Probability density returned by a [`ResolutionFunction`].
///
/// When `valid` is false the model does not apply to the inputs and `value` must not be
/// used (it is *not* a zero probability).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Density {
    /// Density value.
    pub value: f64,
    /// Whether the model is applicable for the given inputs.
    pub valid: bool,
}

impl Density {
    /// A usable density value.
    #[inline]
    pub fn valid(value: f64) -> Self {
        Self { value, valid: true }
    }

    /// Marker for inputs outside the model's domain.
    #[inline]
    pub fn invalid() -> Self {
        Self { value: 0.0, valid: false }
    }

    /// `ln(value)` when valid and strictly positive.
    #[inline]
    pub fn ln(self) -> Option<f64> {
        if self.valid && self.value > 0.0 && self.value.is_finite() {
            Some(self.value.ln())
        } else {
            None
        }
    }
}

/// Transfer function relating a true kinematic value to its measurement.
///
/// Implementations are immutable after construction and shared by reference
/// (`Arc<dyn ResolutionFunction>`) between likelihood instances and threads.
pub trait ResolutionFunction: Send + Sync + fmt::Debug {
    /// Short human-readable name of the functional form.
    fn name(&self) -> &str;

    /// Stored coefficients (empty for non-parametric forms).
    fn coefficients(&self) -> &[f64];

    /// Number of stored coefficients.
    fn n_coefficients(&self) -> usize {
        self.coefficients().len()
    }

    /// Width of the response for true value `x`. Never negative.
    fn width(&self, x: f64) -> f64;

    /// Density of observing `measured` given the true value.
    ///
    /// `aux` carries an auxiliary input for forms that need one (the scalar
    /// transverse-energy sum for missing-energy resolutions).
    fn density(&self, true_value: f64, measured: f64, aux: Option<f64>) -> Density;

    /// `ln density`, or `None` if the density is invalid or not positive.
    ///
    /// Closed-form densities override this to evaluate in log space, so a valid density
    /// far in its tail still yields a finite value.
    fn log_density(&self, true_value: f64, measured: f64, aux: Option<f64>) -> Option<f64> {
        self.density(true_value, measured, aux).ln()
    }
}

/// Closed set of parametric forms that can be built from a coefficient list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionForm {
    /// `sigma(x) = sqrt(a^2 x^2 + b^2 x + c^2)`.
    Gaussian,
    /// Gaussian whose width is a sigmoid in the scalar transverse-energy sum.
    Met,
    /// Sum of two Gaussians in the relative response.
    DoubleGaussian,
}

impl ResolutionForm {
    /// Number of coefficients the form expects.
    pub fn arity(self) -> usize {
        match self {
            ResolutionForm::Gaussian => GaussianResolution::N_COEFFICIENTS,
            ResolutionForm::Met => MetResolution::N_COEFFICIENTS,
            ResolutionForm::DoubleGaussian => DoubleGaussianResolution::N_COEFFICIENTS,
        }
    }

    /// Build a shared function from explicit coefficients.
    pub fn build(self, coefficients: &[f64]) -> Result<Arc<dyn ResolutionFunction>> {
        Ok(match self {
            ResolutionForm::Gaussian => Arc::new(GaussianResolution::from_coefficients(coefficients)?),
            ResolutionForm::Met => Arc::new(MetResolution::from_coefficients(coefficients)?),
            ResolutionForm::DoubleGaussian => {
                Arc::new(DoubleGaussianResolution::from_coefficients(coefficients)?)
            }
        })
    }

    /// Build a shared function from a coefficient file.
    pub fn load(self, path: &Path) -> Result<Arc<dyn ResolutionFunction>> {
        let coefficients = crate::read_coefficients(path, self.arity())?;
        self.build(&coefficients)
    }
}
