//! The lepton+jets likelihood.
//!
//! [`TopLeptonJets`] holds everything fixed for a run (the shared resolution registry,
//! the configuration and the lepton flavor). Binding it to one jet-to-parton assignment
//! yields a [`TopLeptonJetsLikelihood`]: an immutable, thread-safe map from the 9-entry
//! parameter vector to a log-likelihood.

use std::sync::Arc;

use kf_core::{Error, FitComponents, LogDensityModel, ParameterBound, Result};
use kf_resolution::{ObjectKind, ResolutionFunction, ResolutionRegistry};
use serde::{Deserialize, Serialize};

use crate::breit_wigner::{log_breit_wigner_rel, log_breit_wigner_rel_normalized};
use crate::constants::PhysicsConstants;
use crate::event::{LeptonKind, MeasuredObject, MissingEnergy, TopLeptonJetsEvent};
use crate::kinematics::FourMomentum;
use crate::neutrino::neutrino_pz_solutions;
use crate::parameters::{BoundsConfig, Param};
use crate::permutations::PermutationFilter;
use crate::reweight::{BTagWorkingPoint, LightJetSeparation};

/// Log-likelihood contribution of a density the resolution model cannot evaluate.
pub const INVALID_LOG_LIKELIHOOD: f64 = -1e10;

/// Smallest lepton energy allowed in the fit (GeV).
const MIN_LEPTON_ENERGY: f64 = 0.001;

/// Number of steps across a parameter range used as the suggested proposal step.
const STEPS_PER_RANGE: f64 = 100.0;

const COMPONENT_NAMES: [&str; 11] = [
    "TF_bhad", "TF_blep", "TF_lq1", "TF_lq2", "TF_lep", "TF_METx", "TF_METy", "BW_Whad",
    "BW_Wlep", "BW_Thad", "BW_Tlep",
];

/// Likelihood configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LikelihoodConfig {
    /// Pin the top mass to the pole mass and drop the top Breit–Wigner terms.
    pub top_mass_fixed: bool,
    /// Derive energy and neutrino ranges from resolution widths instead of fractions.
    pub widths_from_resolution: bool,
    /// Use measured jet masses instead of the b mass / massless light quarks.
    pub use_jet_mass: bool,
    /// Use the normalized relativistic Breit–Wigner.
    pub normalized_breit_wigner: bool,
    /// Parameter range policy.
    pub bounds: BoundsConfig,
    /// Masses and widths.
    pub constants: PhysicsConstants,
}

impl LikelihoodConfig {
    /// Parse a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Run-level lepton+jets likelihood, not yet bound to an event.
#[derive(Debug, Clone)]
pub struct TopLeptonJets {
    registry: Arc<ResolutionRegistry>,
    config: LikelihoodConfig,
    lepton: LeptonKind,
    separation: Option<Arc<LightJetSeparation>>,
    btag: Option<BTagWorkingPoint>,
    filter: PermutationFilter,
}

impl TopLeptonJets {
    /// Configure the likelihood. Fails if the registry has no table for the lepton flavor.
    pub fn new(
        registry: Arc<ResolutionRegistry>,
        config: LikelihoodConfig,
        lepton: LeptonKind,
    ) -> Result<Self> {
        let kind = lepton_object_kind(lepton);
        if !registry.supports(kind) {
            return Err(Error::Configuration(format!(
                "registry '{}' has no {kind} resolution",
                registry.name()
            )));
        }
        let c = &config.constants;
        if !(c.mass_w > 0.0 && c.gamma_w > 0.0 && c.mass_top > 0.0 && c.mass_bottom >= 0.0) {
            return Err(Error::Configuration(format!("invalid physics constants: {c:?}")));
        }
        let (lo, hi) = config.bounds.top_mass_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(Error::Configuration(format!("invalid top mass range [{lo}, {hi}]")));
        }
        Ok(Self {
            registry,
            config,
            lepton,
            separation: None,
            btag: None,
            filter: PermutationFilter::light_quarks(),
        })
    }

    /// Attach up/down/b flavor reweighting of permutations.
    pub fn with_light_jet_separation(mut self, separation: Arc<LightJetSeparation>) -> Self {
        self.separation = Some(separation);
        self
    }

    /// Score b-tagging decisions of the jets with a working point.
    pub fn with_btag_working_point(mut self, working_point: BTagWorkingPoint) -> Self {
        self.btag = Some(working_point);
        self
    }

    /// Configuration.
    pub fn config(&self) -> &LikelihoodConfig {
        &self.config
    }

    /// Charged-lepton flavor.
    pub fn lepton_kind(&self) -> LeptonKind {
        self.lepton
    }

    /// Shared resolution registry.
    pub fn registry(&self) -> &Arc<ResolutionRegistry> {
        &self.registry
    }

    /// Partner of permutation `index` under the light-quark exchange, or `None` if the
    /// permutation has no partner. The base likelihood of both is identical, so a fit of
    /// one can be reused for the other; a flavor reweight still has to be computed per
    /// permutation.
    pub fn invariant_permutation_partner(&self, index: usize, total: usize) -> Result<Option<usize>> {
        self.filter.partner_of(index, total)
    }

    /// Bind to one jet-to-parton assignment.
    ///
    /// Transfer functions are selected here from the detector pseudorapidity of each
    /// object; a pseudorapidity beyond the last bin uses the outermost bin.
    pub fn bind(&self, event: TopLeptonJetsEvent) -> Result<TopLeptonJetsLikelihood> {
        let jet_tf = [
            self.registry.resolution_or_fallback(ObjectKind::BJet, event.b_had.detector_eta())?,
            self.registry.resolution_or_fallback(ObjectKind::BJet, event.b_lep.detector_eta())?,
            self.registry.resolution_or_fallback(ObjectKind::LightJet, event.light_q1.detector_eta())?,
            self.registry.resolution_or_fallback(ObjectKind::LightJet, event.light_q2.detector_eta())?,
        ];
        let lepton_tf = self
            .registry
            .resolution_or_fallback(lepton_object_kind(self.lepton), event.lepton.detector_eta())?;
        let met_tf = Arc::clone(self.registry.missing_et());

        let jet_masses = if self.config.use_jet_mass {
            event.jets().map(|j| j.m())
        } else {
            let mb = self.config.constants.mass_bottom;
            [mb, mb, 0.0, 0.0]
        };

        let mut likelihood = TopLeptonJetsLikelihood {
            config: self.config.clone(),
            lepton: self.lepton,
            jet_tf,
            lepton_tf,
            met_tf,
            jet_masses,
            separation: self.separation.clone(),
            btag: self.btag,
            bounds: Vec::new(),
            init: Vec::new(),
            event,
        };
        likelihood.bounds = likelihood.compute_bounds();
        likelihood.init = likelihood.compute_init();
        Ok(likelihood)
    }

    /// Bind to the permutation with lexicographic rank `index` of `jets` (see
    /// [`PermutationFilter`]).
    pub fn bind_permutation(
        &self,
        jets: &[MeasuredObject],
        index: usize,
        lepton: MeasuredObject,
        met: MissingEnergy,
    ) -> Result<TopLeptonJetsLikelihood> {
        if jets.len() > PermutationFilter::MAX_OBJECTS {
            return Err(Error::Validation(format!(
                "{} jets exceed the {} a permutation index can address",
                jets.len(),
                PermutationFilter::MAX_OBJECTS
            )));
        }
        let total: usize = (1..=jets.len()).product();
        if jets.len() < 4 || index >= total {
            return Err(Error::Validation(format!(
                "permutation {index} of {} jets does not assign four jets",
                jets.len()
            )));
        }
        let order = PermutationFilter::permutation_at(index, jets.len());
        let event = TopLeptonJetsEvent::from_permutation(jets, &order, lepton, met)
            .ok_or_else(|| Error::Validation(format!("invalid ordering {order:?}")))?;
        self.bind(event)
    }
}

fn lepton_object_kind(lepton: LeptonKind) -> ObjectKind {
    match lepton {
        LeptonKind::Electron => ObjectKind::Electron,
        LeptonKind::Muon => ObjectKind::Muon,
    }
}

/// Fitted partons and composite systems for one parameter vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructedKinematics {
    /// Hadronic-side b quark.
    pub b_had: FourMomentum,
    /// Leptonic-side b quark.
    pub b_lep: FourMomentum,
    /// Light quark 1.
    pub light_q1: FourMomentum,
    /// Light quark 2.
    pub light_q2: FourMomentum,
    /// Charged lepton.
    pub lepton: FourMomentum,
    /// Neutrino.
    pub neutrino: FourMomentum,
    /// `q1 + q2`.
    pub w_had: FourMomentum,
    /// `lepton + neutrino`.
    pub w_lep: FourMomentum,
    /// `b_had + q1 + q2`.
    pub top_had: FourMomentum,
    /// `b_lep + lepton + neutrino`.
    pub top_lep: FourMomentum,
}

/// The likelihood of one jet-to-parton assignment.
///
/// Immutable after [`TopLeptonJets::bind`]; evaluations take the parameter vector by
/// reference and allocate nothing shared, so one instance may be evaluated from several
/// threads.
#[derive(Debug, Clone)]
pub struct TopLeptonJetsLikelihood {
    event: TopLeptonJetsEvent,
    config: LikelihoodConfig,
    lepton: LeptonKind,
    jet_tf: [Arc<dyn ResolutionFunction>; 4],
    lepton_tf: Arc<dyn ResolutionFunction>,
    met_tf: Arc<dyn ResolutionFunction>,
    jet_masses: [f64; 4],
    separation: Option<Arc<LightJetSeparation>>,
    btag: Option<BTagWorkingPoint>,
    bounds: Vec<ParameterBound>,
    init: Vec<f64>,
}

/// Parton with energy `e` and mass `m` along the measured direction.
fn rescale(measured: &FourMomentum, e: f64, m: f64, role: &str) -> Result<FourMomentum> {
    if !(e.is_finite() && e >= 0.0 && e >= m) {
        return Err(Error::Computation(format!("{role}: energy {e} below rest mass {m}")));
    }
    let dir = measured
        .direction()
        .ok_or_else(|| Error::Computation(format!("{role}: measured momentum has no direction")))?;
    let p = (e * e - m * m).sqrt();
    Ok(FourMomentum::new(e, p * dir[0], p * dir[1], p * dir[2]))
}

fn bound(param: Param, lower: f64, upper: f64) -> ParameterBound {
    let upper = upper.max(lower);
    ParameterBound {
        name: param.name().to_string(),
        lower,
        upper,
        step: (upper - lower) / STEPS_PER_RANGE,
    }
}

fn log_or_invalid(v: Option<f64>) -> f64 {
    v.unwrap_or(INVALID_LOG_LIKELIHOOD)
}

impl TopLeptonJetsLikelihood {
    /// The bound event.
    pub fn event(&self) -> &TopLeptonJetsEvent {
        &self.event
    }

    /// Configuration.
    pub fn config(&self) -> &LikelihoodConfig {
        &self.config
    }

    /// Names of the additive terms of [`Self::log_likelihood_components`], in order.
    pub fn component_names() -> &'static [&'static str] {
        &COMPONENT_NAMES
    }

    /// Parameter ranges, in [`Param`] order.
    pub fn define_parameters(&self) -> Vec<ParameterBound> {
        self.bounds.clone()
    }

    /// Starting point derived from the measurement, inside [`Self::define_parameters`].
    pub fn initial_parameters(&self) -> Vec<f64> {
        self.init.clone()
    }

    fn energy_range(&self, e: f64, m: f64, tf: &dyn ResolutionFunction, fraction: f64, n_sigmas: f64) -> (f64, f64) {
        if self.config.widths_from_resolution {
            let sigma = tf.width(e);
            ((e - n_sigmas * sigma).max(m), e + n_sigmas * sigma)
        } else {
            ((e * (1.0 - fraction)).max(m), e * (1.0 + fraction))
        }
    }

    fn compute_bounds(&self) -> Vec<ParameterBound> {
        let b = &self.config.bounds;
        let ev = &self.event;
        let mut out = Vec::with_capacity(Param::COUNT);

        let roles = [Param::BHadE, Param::BLepE, Param::Lq1E, Param::Lq2E];
        for (i, (param, jet)) in roles.iter().zip(ev.jets()).enumerate() {
            let (lo, hi) =
                self.energy_range(jet.e(), self.jet_masses[i], self.jet_tf[i].as_ref(), b.jet_fraction, b.n_sigmas_jet);
            out.push(bound(*param, lo, hi));
        }

        let lep = &ev.lepton;
        let (lo, hi) = match (self.config.widths_from_resolution, self.lepton) {
            // The muon function is in pT; convert its width to an energy width.
            (true, LeptonKind::Muon) => {
                let sin_theta = lep.momentum().sin_theta();
                let sigma = if sin_theta > 0.0 { self.lepton_tf.width(lep.pt()) / sin_theta } else { 0.0 };
                (lep.e() - b.n_sigmas_lepton * sigma, lep.e() + b.n_sigmas_lepton * sigma)
            }
            _ => self.energy_range(lep.e(), 0.0, self.lepton_tf.as_ref(), b.lepton_fraction, b.n_sigmas_lepton),
        };
        out.push(bound(Param::LepE, lo.max(MIN_LEPTON_ENERGY), hi));

        let met = &ev.met;
        let half = if self.config.widths_from_resolution {
            (b.n_sigmas_met * self.met_tf.width(met.sum_et)).max(b.min_met_window)
        } else {
            (b.met_fraction * met.magnitude()).max(b.min_met_window)
        };
        out.push(bound(Param::NuPx, met.ex - half, met.ex + half));
        out.push(bound(Param::NuPy, met.ey - half, met.ey + half));

        let limit = b.pz_limit.max(2.0 * self.pz_seed().abs());
        out.push(bound(Param::NuPz, -limit, limit));

        let mt = self.config.constants.mass_top;
        let (lo, hi) = if self.config.top_mass_fixed { (mt, mt) } else { b.top_mass_range };
        out.push(bound(Param::TopM, lo, hi));
        out
    }

    /// Neutrino `pz` solving the W-mass constraint with the measured lepton and MET.
    fn pz_seed(&self) -> f64 {
        let lep = self.event.lepton.momentum();
        let massless = FourMomentum::new(lep.p(), lep.px, lep.py, lep.pz);
        neutrino_pz_solutions(&massless, &self.event.met, self.config.constants.mass_w, None)
            .smallest_magnitude()
            .unwrap_or(0.0)
    }

    fn compute_init(&self) -> Vec<f64> {
        let ev = &self.event;
        let top_mass = if self.config.top_mass_fixed {
            self.config.constants.mass_top
        } else {
            (*ev.b_had.momentum() + *ev.light_q1.momentum() + *ev.light_q2.momentum()).m()
        };
        let raw = [
            ev.b_had.e(),
            ev.b_lep.e(),
            ev.light_q1.e(),
            ev.light_q2.e(),
            ev.lepton.e(),
            ev.met.ex,
            ev.met.ey,
            self.pz_seed(),
            top_mass,
        ];
        raw.iter().zip(&self.bounds).map(|(&x, b)| if x.is_finite() { b.clamp(x) } else { b.lower }).collect()
    }

    fn check_len(&self, params: &[f64]) -> Result<()> {
        if params.len() != Param::COUNT {
            return Err(Error::Validation(format!(
                "expected {} parameters, got {}",
                Param::COUNT,
                params.len()
            )));
        }
        Ok(())
    }

    /// Four-vectors of the fitted partons and their composite systems.
    ///
    /// Fails with [`Error::Validation`] for a parameter vector of the wrong length and
    /// with [`Error::Computation`] when an energy is negative or below the parton mass.
    pub fn reconstruct(&self, params: &[f64]) -> Result<ReconstructedKinematics> {
        self.check_len(params)?;
        let ev = &self.event;
        let p = |x: Param| params[x.index()];

        let b_had = rescale(ev.b_had.momentum(), p(Param::BHadE), self.jet_masses[0], "b_had")?;
        let b_lep = rescale(ev.b_lep.momentum(), p(Param::BLepE), self.jet_masses[1], "b_lep")?;
        let light_q1 = rescale(ev.light_q1.momentum(), p(Param::Lq1E), self.jet_masses[2], "light_q1")?;
        let light_q2 = rescale(ev.light_q2.momentum(), p(Param::Lq2E), self.jet_masses[3], "light_q2")?;
        let lepton = rescale(ev.lepton.momentum(), p(Param::LepE), 0.0, "lepton")?;

        let (nx, ny, nz) = (p(Param::NuPx), p(Param::NuPy), p(Param::NuPz));
        let nu_e = (nx * nx + ny * ny + nz * nz).sqrt();
        if !nu_e.is_finite() {
            return Err(Error::Computation("neutrino momentum is not finite".into()));
        }
        let neutrino = FourMomentum::new(nu_e, nx, ny, nz);

        let w_had = light_q1 + light_q2;
        let w_lep = lepton + neutrino;
        Ok(ReconstructedKinematics {
            b_had,
            b_lep,
            light_q1,
            light_q2,
            lepton,
            neutrino,
            w_had,
            w_lep,
            top_had: w_had + b_had,
            top_lep: w_lep + b_lep,
        })
    }

    fn log_bw(&self, m: f64, pole: f64, width: f64) -> f64 {
        if self.config.normalized_breit_wigner {
            log_breit_wigner_rel_normalized(m, pole, width)
        } else {
            log_breit_wigner_rel(m, pole, width)
        }
    }

    /// Named additive terms of the log-likelihood.
    ///
    /// Top Breit–Wigner terms are `0.0` when the top mass is fixed. If the partons
    /// cannot be reconstructed every transfer-function term is
    /// [`INVALID_LOG_LIKELIHOOD`] and every Breit–Wigner term is `0.0`.
    pub fn log_likelihood_components(&self, params: &[f64]) -> Result<FitComponents> {
        self.check_len(params)?;
        let mut values = [0.0; 11];

        match self.reconstruct(params) {
            Ok(k) => {
                let ev = &self.event;
                let fitted = [k.b_had.e, k.b_lep.e, k.light_q1.e, k.light_q2.e];
                for (i, jet) in ev.jets().iter().enumerate() {
                    values[i] = log_or_invalid(self.jet_tf[i].log_density(fitted[i], jet.e(), None));
                }
                values[4] = log_or_invalid(match self.lepton {
                    LeptonKind::Electron => self.lepton_tf.log_density(k.lepton.e, ev.lepton.e(), None),
                    LeptonKind::Muon => self.lepton_tf.log_density(
                        k.lepton.e * ev.lepton.momentum().sin_theta(),
                        ev.lepton.pt(),
                        None,
                    ),
                });
                let sum_et = Some(ev.met.sum_et);
                values[5] = log_or_invalid(self.met_tf.log_density(k.neutrino.px, ev.met.ex, sum_et));
                values[6] = log_or_invalid(self.met_tf.log_density(k.neutrino.py, ev.met.ey, sum_et));

                let c = &self.config.constants;
                values[7] = self.log_bw(k.w_had.m(), c.mass_w, c.gamma_w);
                values[8] = self.log_bw(k.w_lep.m(), c.mass_w, c.gamma_w);
                if !self.config.top_mass_fixed {
                    let mt = params[Param::TopM.index()];
                    let gamma = c.gamma_top_at(mt);
                    values[9] = self.log_bw(k.top_had.m(), mt, gamma);
                    values[10] = self.log_bw(k.top_lep.m(), mt, gamma);
                }
            }
            Err(e) => {
                log::debug!("unreconstructable parameters {params:?}: {e}");
                values[..7].fill(INVALID_LOG_LIKELIHOOD);
            }
        }

        let mut out = FitComponents::with_capacity(values.len());
        for (name, v) in COMPONENT_NAMES.iter().zip(values) {
            out.push(*name, v);
        }
        Ok(out)
    }

    /// Log-likelihood at `params`. Equal to the sum of
    /// [`Self::log_likelihood_components`].
    pub fn log_likelihood(&self, params: &[f64]) -> Result<f64> {
        Ok(self.log_likelihood_components(params)?.total())
    }

    /// Flavor log-probability of this assignment from jet transverse momenta and tag
    /// weights; `0.0` without light-jet separation.
    ///
    /// Fails with [`Error::Validation`] when separation is enabled and a jet carries no
    /// tag weight.
    pub fn log_event_probability_ljet_reweight(&self) -> Result<f64> {
        let Some(sep) = self.separation.as_deref() else {
            return Ok(0.0);
        };
        if !sep.is_enabled() {
            return Ok(0.0);
        }
        let info = self
            .event
            .jet_tag_info()
            .ok_or_else(|| Error::Validation("light-jet separation needs a tag weight on every jet".into()))?;
        Ok(sep.log_probability(&info))
    }

    /// b-tagging log-probability of this assignment; `0.0` without a working point.
    ///
    /// Fails with [`Error::Validation`] when a working point is set and a jet carries no
    /// tagging decision.
    pub fn log_event_probability_btag(&self) -> Result<f64> {
        let Some(wp) = self.btag else {
            return Ok(0.0);
        };
        let tagged = self
            .event
            .jet_btags()
            .ok_or_else(|| Error::Validation("b-tag working point needs a decision on every jet".into()))?;
        Ok(wp.log_probability(&tagged))
    }

    /// Log-probability of this assignment at the fitted `params`: the log-likelihood plus
    /// the b-tagging and flavor-reweighting terms.
    pub fn log_event_probability(&self, params: &[f64]) -> Result<f64> {
        let base = self.log_likelihood(params)?;
        Ok(base + self.log_event_probability_btag()? + self.log_event_probability_ljet_reweight()?)
    }
}

impl LogDensityModel for TopLeptonJetsLikelihood {
    fn dim(&self) -> usize {
        Param::COUNT
    }

    fn parameter_names(&self) -> Vec<String> {
        self.bounds.iter().map(|b| b.name.clone()).collect()
    }

    fn parameter_bounds(&self) -> Vec<(f64, f64)> {
        self.bounds.iter().map(ParameterBound::as_tuple).collect()
    }

    fn parameter_init(&self) -> Vec<f64> {
        self.initial_parameters()
    }

    fn log_density(&self, params: &[f64]) -> Result<f64> {
        self.log_likelihood(params)
    }
}
