//! Fit-parameter layout and range policy.

use serde::{Deserialize, Serialize};

/// Fit parameters, in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// Energy of the hadronic-side b quark.
    BHadE = 0,
    /// Energy of the leptonic-side b quark.
    BLepE = 1,
    /// Energy of light quark 1.
    Lq1E = 2,
    /// Energy of light quark 2.
    Lq2E = 3,
    /// Energy of the charged lepton.
    LepE = 4,
    /// Neutrino `px`.
    NuPx = 5,
    /// Neutrino `py`.
    NuPy = 6,
    /// Neutrino `pz`.
    NuPz = 7,
    /// Hadronic top-quark mass.
    TopM = 8,
}

impl Param {
    /// Number of fit parameters.
    pub const COUNT: usize = 9;

    /// All parameters in vector order.
    pub const ALL: [Param; Param::COUNT] = [
        Param::BHadE,
        Param::BLepE,
        Param::Lq1E,
        Param::Lq2E,
        Param::LepE,
        Param::NuPx,
        Param::NuPy,
        Param::NuPz,
        Param::TopM,
    ];

    /// Position in the parameter vector.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable parameter name.
    pub const fn name(self) -> &'static str {
        match self {
            Param::BHadE => "energy hadronic b",
            Param::BLepE => "energy leptonic b",
            Param::Lq1E => "energy light quark 1",
            Param::Lq2E => "energy light quark 2",
            Param::LepE => "energy lepton",
            Param::NuPx => "p_x neutrino",
            Param::NuPy => "p_y neutrino",
            Param::NuPz => "p_z neutrino",
            Param::TopM => "top mass",
        }
    }
}

/// How parameter ranges are derived from the measured event.
///
/// With `widths_from_resolution` off (see [`crate::LikelihoodConfig`]) energies range
/// over `E (1 ± fraction)`; with it on, over `E ± n σ(E)` using the resolution width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoundsConfig {
    /// Relative half-range of jet energies (fraction policy).
    pub jet_fraction: f64,
    /// Relative half-range of the lepton energy (fraction policy).
    pub lepton_fraction: f64,
    /// Jet half-range in resolution widths.
    pub n_sigmas_jet: f64,
    /// Lepton half-range in resolution widths.
    pub n_sigmas_lepton: f64,
    /// Neutrino `px`/`py` half-range in missing-ET widths.
    pub n_sigmas_met: f64,
    /// Neutrino `px`/`py` half-range as a multiple of `|MET|` (fraction policy).
    pub met_fraction: f64,
    /// Smallest neutrino `px`/`py` half-range (GeV).
    pub min_met_window: f64,
    /// Neutrino `pz` half-range (GeV); widened to twice the seed if that is larger.
    pub pz_limit: f64,
    /// Range of the top-mass parameter when it is not fixed (GeV).
    pub top_mass_range: (f64, f64),
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            jet_fraction: 0.5,
            lepton_fraction: 0.2,
            n_sigmas_jet: 7.0,
            n_sigmas_lepton: 2.0,
            n_sigmas_met: 1.0,
            met_fraction: 1.0,
            min_met_window: 10.0,
            pz_limit: 1000.0,
            top_mass_range: (100.0, 1000.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense() {
        for (i, p) in Param::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
        assert_eq!(Param::TopM.name(), "top mass");
    }

    #[test]
    fn test_bounds_config_defaults_from_empty_json() {
        let c: BoundsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c, BoundsConfig::default());
        assert!(serde_json::from_str::<BoundsConfig>(r#"{ "bogus": 1 }"#).is_err());
    }
}
