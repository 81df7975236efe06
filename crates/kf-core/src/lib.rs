//! # kf-core
//!
//! Core types, traits, and error handling for kinfit.
//!
//! This crate provides:
//! - Common error types
//! - The [`LogDensityModel`] trait consumed by external samplers/optimizers
//! - Shared data structures (parameter bounds, named likelihood components)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::LogDensityModel;
pub use types::{FitComponents, ParameterBound};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
