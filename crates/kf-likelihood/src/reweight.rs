//! Up/down/b flavor reweighting of jet-to-parton assignments.
//!
//! Each flavor has binned densities of the jet transverse momentum and the flavor-tag
//! discriminant, either as two 1-D lookups or as one 2-D lookup at
//! `(tag weight, pT)`. The log-probability of an assignment is the sum over the four
//! roles, using b densities for both b roles, up for light quark 1 and down for light
//! quark 2.
//!
//! [`BTagWorkingPoint`] scores the discrete b-tagging decisions of the same four roles.

use std::sync::Arc;

use kf_core::{Error, Result};
use kf_resolution::DensityLookup;
use serde::{Deserialize, Serialize};

use crate::event::JetTagInfo;
use crate::likelihood::INVALID_LOG_LIKELIHOOD;

/// How permutations are reweighted by jet flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LJetSeparationMethod {
    /// No reweighting.
    #[default]
    None,
    /// Product of 1-D pT and tag-weight densities.
    PermReweight,
    /// 2-D density at `(tag weight, pT)`.
    #[serde(rename = "perm_reweight_2d")]
    PermReweight2D,
}

/// Parton flavor hypothesis for a jet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JetFlavor {
    /// Up-type light quark.
    Up,
    /// Down-type light quark.
    Down,
    /// b quark.
    Bottom,
}

/// Binned densities for one flavor.
#[derive(Debug, Clone, Default)]
pub struct FlavorLookups {
    /// 1-D density of the jet pT.
    pub pt: Option<Arc<dyn DensityLookup>>,
    /// 1-D density of the tag weight.
    pub tag_weight: Option<Arc<dyn DensityLookup>>,
    /// 2-D density at `(tag weight, pT)`.
    pub joint: Option<Arc<dyn DensityLookup>>,
}

impl FlavorLookups {
    /// Lookups for [`LJetSeparationMethod::PermReweight`].
    pub fn separate(pt: Arc<dyn DensityLookup>, tag_weight: Arc<dyn DensityLookup>) -> Self {
        Self { pt: Some(pt), tag_weight: Some(tag_weight), joint: None }
    }

    /// Lookup for [`LJetSeparationMethod::PermReweight2D`].
    pub fn joint(joint: Arc<dyn DensityLookup>) -> Self {
        Self { pt: None, tag_weight: None, joint: Some(joint) }
    }

    fn validate(&self, method: LJetSeparationMethod, flavor: JetFlavor) -> Result<()> {
        let need = |slot: &Option<Arc<dyn DensityLookup>>, what: &str, dim: usize| -> Result<()> {
            match slot {
                Some(l) if l.dim() == dim => Ok(()),
                Some(l) => Err(Error::Configuration(format!(
                    "{flavor:?} {what} lookup has dimension {}, expected {dim}",
                    l.dim()
                ))),
                None => Err(Error::Configuration(format!("{method:?} needs a {flavor:?} {what} lookup"))),
            }
        };
        match method {
            LJetSeparationMethod::None => Ok(()),
            LJetSeparationMethod::PermReweight => {
                need(&self.pt, "pt", 1)?;
                need(&self.tag_weight, "tag weight", 1)
            }
            LJetSeparationMethod::PermReweight2D => need(&self.joint, "joint", 2),
        }
    }
}

/// Flavor reweighting configuration shared between likelihood instances.
#[derive(Debug, Clone, Default)]
pub struct LightJetSeparation {
    method: LJetSeparationMethod,
    up: FlavorLookups,
    down: FlavorLookups,
    bottom: FlavorLookups,
}

impl LightJetSeparation {
    /// Create a reweighting. Fails if a lookup the method needs is missing or has the
    /// wrong dimension.
    pub fn new(
        method: LJetSeparationMethod,
        up: FlavorLookups,
        down: FlavorLookups,
        bottom: FlavorLookups,
    ) -> Result<Self> {
        up.validate(method, JetFlavor::Up)?;
        down.validate(method, JetFlavor::Down)?;
        bottom.validate(method, JetFlavor::Bottom)?;
        Ok(Self { method, up, down, bottom })
    }

    /// Method in use.
    pub fn method(&self) -> LJetSeparationMethod {
        self.method
    }

    /// Whether permutations are reweighted at all.
    pub fn is_enabled(&self) -> bool {
        self.method != LJetSeparationMethod::None
    }

    fn lookups(&self, flavor: JetFlavor) -> &FlavorLookups {
        match flavor {
            JetFlavor::Up => &self.up,
            JetFlavor::Down => &self.down,
            JetFlavor::Bottom => &self.bottom,
        }
    }

    /// Density of a jet with `info` under the `flavor` hypothesis; `1.0` when disabled.
    pub fn jet_probability(&self, flavor: JetFlavor, info: &JetTagInfo) -> f64 {
        let l = self.lookups(flavor);
        let eval = |slot: &Option<Arc<dyn DensityLookup>>, point: &[f64]| {
            slot.as_ref().map_or(0.0, |h| h.evaluate(point))
        };
        match self.method {
            LJetSeparationMethod::None => 1.0,
            LJetSeparationMethod::PermReweight => {
                eval(&l.pt, &[info.pt]) * eval(&l.tag_weight, &[info.tag_weight])
            }
            LJetSeparationMethod::PermReweight2D => eval(&l.joint, &[info.tag_weight, info.pt]),
        }
    }

    /// Log-probability of the role-ordered jets `(b_had, b_lep, q1, q2)`.
    ///
    /// Returns [`INVALID_LOG_LIKELIHOOD`] if any density is not positive.
    pub fn log_probability(&self, jets: &[JetTagInfo; 4]) -> f64 {
        if !self.is_enabled() {
            return 0.0;
        }
        let flavors = [JetFlavor::Bottom, JetFlavor::Bottom, JetFlavor::Up, JetFlavor::Down];
        let mut sum = 0.0;
        for (flavor, info) in flavors.iter().zip(jets) {
            let p = self.jet_probability(*flavor, info);
            if !(p > 0.0 && p.is_finite()) {
                return INVALID_LOG_LIKELIHOOD;
            }
            sum += p.ln();
        }
        sum
    }
}

/// Efficiency and light-jet rejection of a b-tagging working point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BTagWorkingPoint {
    /// Probability that a b jet is tagged.
    pub efficiency: f64,
    /// Inverse probability that a light jet is tagged.
    pub rejection: f64,
}

impl BTagWorkingPoint {
    /// Create a working point. Requires `0 < efficiency <= 1` and `rejection >= 1`.
    pub fn new(efficiency: f64, rejection: f64) -> Result<Self> {
        if !(efficiency > 0.0 && efficiency <= 1.0) {
            return Err(Error::Configuration(format!("b-tag efficiency {efficiency} outside (0, 1]")));
        }
        if !(rejection.is_finite() && rejection >= 1.0) {
            return Err(Error::Configuration(format!("b-tag rejection {rejection} must be >= 1")));
        }
        Ok(Self { efficiency, rejection })
    }

    /// Probability of the tagging decision `tagged` under the `flavor` hypothesis.
    pub fn jet_probability(&self, flavor: JetFlavor, tagged: bool) -> f64 {
        let p_tag = match flavor {
            JetFlavor::Bottom => self.efficiency,
            JetFlavor::Up | JetFlavor::Down => 1.0 / self.rejection,
        };
        if tagged { p_tag } else { 1.0 - p_tag }
    }

    /// Log-probability of the role-ordered decisions `(b_had, b_lep, q1, q2)`.
    ///
    /// Returns [`INVALID_LOG_LIKELIHOOD`] if a decision has zero probability.
    pub fn log_probability(&self, tagged: &[bool; 4]) -> f64 {
        let flavors = [JetFlavor::Bottom, JetFlavor::Bottom, JetFlavor::Up, JetFlavor::Down];
        let mut sum = 0.0;
        for (flavor, t) in flavors.iter().zip(tagged) {
            let p = self.jet_probability(*flavor, *t);
            if p <= 0.0 {
                return INVALID_LOG_LIKELIHOOD;
            }
            sum += p.ln();
        }
        sum
    }
}
