//! Core traits for kinfit
//!
//! The likelihood crates never depend on a concrete sampler. Anything that can
//! propose parameter vectors (MCMC chains, simulated annealing, gradient
//! optimizers) drives a model through [`LogDensityModel`].

use crate::Result;

/// Universal model interface for external samplers and optimizers.
///
/// Implementations must be pure functions of the parameter vector: no sampler
/// state is stored between calls, so independent chains can each hold their own
/// instance.
pub trait LogDensityModel: Send + Sync {
    /// Number of parameters.
    fn dim(&self) -> usize;

    /// Parameter names (stable order).
    fn parameter_names(&self) -> Vec<String>;

    /// Parameter bounds (min, max) (stable order).
    fn parameter_bounds(&self) -> Vec<(f64, f64)>;

    /// Suggested initial values (stable order).
    fn parameter_init(&self) -> Vec<f64>;

    /// Log-density (log-likelihood) at `params`.
    fn log_density(&self, params: &[f64]) -> Result<f64>;

    /// Negative log-likelihood.
    fn nll(&self, params: &[f64]) -> Result<f64> {
        Ok(-self.log_density(params)?)
    }

    /// Gradient of NLL.
    ///
    /// The default uses central finite differences with a step scaled to each
    /// parameter's magnitude, clipped to the parameter bounds.
    fn grad_nll(&self, params: &[f64]) -> Result<Vec<f64>> {
        let bounds = self.parameter_bounds();
        let mut grad = vec![0.0; params.len()];
        let mut shifted = params.to_vec();
        for j in 0..params.len() {
            let h = 1e-6 * params[j].abs().max(1.0);
            let (lo, hi) = bounds.get(j).copied().unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
            let x_plus = (params[j] + h).min(hi);
            let x_minus = (params[j] - h).max(lo);
            let span = x_plus - x_minus;
            if span <= 0.0 {
                // Parameter is pinned (e.g. a fixed mass); no direction to move in.
                continue;
            }
            shifted[j] = x_plus;
            let f_plus = self.nll(&shifted)?;
            shifted[j] = x_minus;
            let f_minus = self.nll(&shifted)?;
            shifted[j] = params[j];
            grad[j] = (f_plus - f_minus) / span;
        }
        Ok(grad)
    }
}
