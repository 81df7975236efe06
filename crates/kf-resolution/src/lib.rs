//! # kf-resolution
//!
//! Detector resolution ("transfer") functions for kinematic fits.
//!
//! This crate provides:
//! - The [`ResolutionFunction`] trait: a width and a normalized density relating a
//!   true (fitted) quantity to its measured value.
//! - Parametric forms ([`GaussianResolution`], [`MetResolution`],
//!   [`DoubleGaussianResolution`]) and an empirical [`HistogramResolution`].
//! - Coefficient-file loading with strict arity checks.
//! - A [`ResolutionRegistry`] selecting functions by object kind and detector
//!   pseudorapidity, built from a [`DetectorLayout`] or a [`DetectorConfig`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coefficients;
pub mod detector;
pub mod double_gaussian;
pub mod function;
pub mod gaussian;
pub mod histogram;
pub mod met;
pub mod registry;

mod math;

pub use coefficients::{parse_coefficients, read_coefficients};
pub use detector::{BinSpec, BinnedTableSpec, DetectorConfig, DetectorLayout, ResolutionSpec};
pub use double_gaussian::DoubleGaussianResolution;
pub use function::{Density, ResolutionForm, ResolutionFunction};
pub use gaussian::GaussianResolution;
pub use histogram::{DensityLookup, Histogram1D, Histogram2D, HistogramResolution};
pub use met::MetResolution;
pub use registry::{EtaBinning, ObjectKind, RegistryBuilder, ResolutionRegistry};
