//! # kf-likelihood
//!
//! Kinematic-fit likelihood for `tt̄ → b ℓ ν b q q̄'` events.
//!
//! For one jet-to-parton assignment ([`TopLeptonJetsEvent`]) the
//! [`TopLeptonJetsLikelihood`] maps a 9-parameter vector (parton energies, neutrino
//! momentum, top mass) to a log-likelihood built from detector resolution functions
//! and relativistic Breit–Wigner factors. It implements
//! [`kf_core::LogDensityModel`], so any external sampler or optimizer can drive it.
//!
//! Also provided:
//! - [`neutrino::neutrino_pz_solutions`]: analytic longitudinal neutrino momentum under
//!   a W-mass constraint.
//! - [`PermutationFilter`]: detection of permutations the likelihood cannot distinguish.
//! - [`LightJetSeparation`]: optional up/down/b flavor reweighting of permutations.
//! - [`BTagWorkingPoint`]: optional b-tagging term of the event probability.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod breit_wigner;
pub mod constants;
pub mod event;
pub mod kinematics;
pub mod likelihood;
pub mod neutrino;
pub mod parameters;
pub mod permutations;
pub mod reweight;

pub use constants::PhysicsConstants;
pub use event::{JetTagInfo, LeptonKind, MeasuredObject, MissingEnergy, TopLeptonJetsEvent};
pub use kinematics::FourMomentum;
pub use likelihood::{
    INVALID_LOG_LIKELIHOOD, LikelihoodConfig, ReconstructedKinematics, TopLeptonJets,
    TopLeptonJetsLikelihood,
};
pub use neutrino::{NeutrinoSolutions, neutrino_pz_solutions};
pub use parameters::{BoundsConfig, Param};
pub use permutations::{PermutationFilter, RoleSymmetry};
pub use reweight::{BTagWorkingPoint, FlavorLookups, JetFlavor, LJetSeparationMethod, LightJetSeparation};

#[cfg(test)]
mod tests;
