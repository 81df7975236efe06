//! Common data types for kinfit

use serde::{Deserialize, Serialize};

/// Allowed range and suggested proposal step of one fit parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBound {
    /// Stable parameter name.
    pub name: String,
    /// Lower limit.
    pub lower: f64,
    /// Upper limit. Equal to `lower` for a fixed parameter.
    pub upper: f64,
    /// Suggested initial step size for the sampler.
    pub step: f64,
}

impl ParameterBound {
    /// Create a bound with a step of 1% of the range.
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self { name: name.into(), lower, upper, step: 0.01 * (upper - lower) }
    }

    /// Whether the range collapses to a single value.
    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }

    /// Whether `x` lies inside the closed range.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }

    /// Clamp `x` into the range.
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.lower, self.upper)
    }

    /// `(lower, upper)` tuple.
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }
}

/// Named additive log-likelihood terms, in a stable order.
///
/// Produced for diagnostics; [`FitComponents::total`] equals the log-likelihood
/// returned by the scalar evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitComponents {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FitComponents {
    /// Create an empty set with room for `n` components.
    pub fn with_capacity(n: usize) -> Self {
        Self { names: Vec::with_capacity(n), values: Vec::with_capacity(n) }
    }

    /// Append a named term.
    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.names.push(name.into());
        self.values.push(value);
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no terms were recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Term names (stable order).
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Term values (stable order).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Look up a term by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| n == name).map(|i| self.values[i])
    }

    /// Sum of all terms.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Iterate `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}
