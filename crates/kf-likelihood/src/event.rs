//! Measured event content for one jet-to-parton assignment.

use serde::{Deserialize, Serialize};

use crate::kinematics::FourMomentum;

/// Flavor of the charged lepton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeptonKind {
    /// Electron: the energy is compared to its measurement.
    Electron,
    /// Muon: the transverse momentum is compared to its measurement.
    Muon,
}

/// Immutable snapshot of one reconstructed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredObject {
    momentum: FourMomentum,
    detector_eta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    btagged: Option<bool>,
}

impl MeasuredObject {
    /// Object with the detector pseudorapidity equal to the kinematic one.
    pub fn new(momentum: FourMomentum) -> Self {
        Self { detector_eta: momentum.eta(), momentum, tag_weight: None, btagged: None }
    }

    /// Object from `(pt, eta, phi, E)`.
    pub fn from_pt_eta_phi_e(pt: f64, eta: f64, phi: f64, e: f64) -> Self {
        Self::new(FourMomentum::from_pt_eta_phi_e(pt, eta, phi, e))
    }

    /// Override the detector pseudorapidity used to select resolution bins.
    pub fn with_detector_eta(mut self, eta: f64) -> Self {
        self.detector_eta = eta;
        self
    }

    /// Attach a flavor-tagging discriminant.
    pub fn with_tag_weight(mut self, w: f64) -> Self {
        self.tag_weight = Some(w);
        self
    }

    /// Mark whether the jet passed the b-tagging working point.
    pub fn with_btag(mut self, tagged: bool) -> Self {
        self.btagged = Some(tagged);
        self
    }

    /// Four-momentum.
    pub fn momentum(&self) -> &FourMomentum {
        &self.momentum
    }

    /// Energy.
    pub fn e(&self) -> f64 {
        self.momentum.e
    }

    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.momentum.pt()
    }

    /// Kinematic pseudorapidity.
    pub fn eta(&self) -> f64 {
        self.momentum.eta()
    }

    /// Azimuth.
    pub fn phi(&self) -> f64 {
        self.momentum.phi()
    }

    /// Invariant mass.
    pub fn m(&self) -> f64 {
        self.momentum.m()
    }

    /// Detector pseudorapidity (region value).
    pub fn detector_eta(&self) -> f64 {
        self.detector_eta
    }

    /// Flavor-tagging discriminant, if known.
    pub fn tag_weight(&self) -> Option<f64> {
        self.tag_weight
    }

    /// b-tagging decision, if known.
    pub fn is_btagged(&self) -> Option<bool> {
        self.btagged
    }
}

/// Missing transverse energy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingEnergy {
    /// x component.
    pub ex: f64,
    /// y component.
    pub ey: f64,
    /// Scalar sum of transverse energy in the event.
    pub sum_et: f64,
}

impl MissingEnergy {
    /// Create from components and scalar sum.
    pub fn new(ex: f64, ey: f64, sum_et: f64) -> Self {
        Self { ex, ey, sum_et }
    }

    /// Magnitude of the missing-ET vector.
    pub fn magnitude(&self) -> f64 {
        self.ex.hypot(self.ey)
    }
}

/// Jet quantities used by the flavor reweighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JetTagInfo {
    /// Transverse momentum.
    pub pt: f64,
    /// Flavor-tagging discriminant.
    pub tag_weight: f64,
}

/// One permutation of a lepton+jets event: measured objects assigned to roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopLeptonJetsEvent {
    /// Jet assigned to the b quark of the hadronic top.
    pub b_had: MeasuredObject,
    /// Jet assigned to the b quark of the leptonic top.
    pub b_lep: MeasuredObject,
    /// Jet assigned to the first light quark of the hadronic W.
    pub light_q1: MeasuredObject,
    /// Jet assigned to the second light quark of the hadronic W.
    pub light_q2: MeasuredObject,
    /// Charged lepton.
    pub lepton: MeasuredObject,
    /// Missing transverse energy.
    pub met: MissingEnergy,
}

impl TopLeptonJetsEvent {
    /// Build the event for one ordering of `jets`: `order[r]` is the jet index assigned
    /// to role `r` in `(b_had, b_lep, light_q1, light_q2)`.
    pub fn from_permutation(
        jets: &[MeasuredObject],
        order: &[usize],
        lepton: MeasuredObject,
        met: MissingEnergy,
    ) -> Option<Self> {
        let pick = |r: usize| order.get(r).and_then(|&i| jets.get(i)).cloned();
        Some(Self {
            b_had: pick(0)?,
            b_lep: pick(1)?,
            light_q1: pick(2)?,
            light_q2: pick(3)?,
            lepton,
            met,
        })
    }

    /// The four jets in role order.
    pub fn jets(&self) -> [&MeasuredObject; 4] {
        [&self.b_had, &self.b_lep, &self.light_q1, &self.light_q2]
    }

    /// Flavor-reweighting inputs in role order; `None` if a jet has no tag weight.
    pub fn jet_tag_info(&self) -> Option<[JetTagInfo; 4]> {
        let info = |j: &MeasuredObject| j.tag_weight().map(|w| JetTagInfo { pt: j.pt(), tag_weight: w });
        Some([info(&self.b_had)?, info(&self.b_lep)?, info(&self.light_q1)?, info(&self.light_q2)?])
    }

    /// b-tagging decisions in role order; `None` if a jet has no decision.
    pub fn jet_btags(&self) -> Option<[bool; 4]> {
        Some([
            self.b_had.is_btagged()?,
            self.b_lep.is_btagged()?,
            self.light_q1.is_btagged()?,
            self.light_q2.is_btagged()?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jet(pt: f64) -> MeasuredObject {
        MeasuredObject::from_pt_eta_phi_e(pt, 0.3, 1.0, pt * 1.1)
    }

    #[test]
    fn test_from_permutation() {
        let jets = vec![jet(10.0), jet(20.0), jet(30.0), jet(40.0), jet(50.0)];
        let lep = MeasuredObject::from_pt_eta_phi_e(35.0, 0.1, 0.0, 35.2);
        let ev = TopLeptonJetsEvent::from_permutation(&jets, &[4, 0, 2, 1], lep.clone(), MissingEnergy::new(1.0, 2.0, 300.0))
            .unwrap();
        assert!((ev.b_had.pt() - 50.0).abs() < 1e-9);
        assert!((ev.light_q2.pt() - 20.0).abs() < 1e-9);
        assert!(TopLeptonJetsEvent::from_permutation(&jets, &[0, 1, 2], lep.clone(), MissingEnergy::new(0.0, 0.0, 0.0)).is_none());
        assert!(TopLeptonJetsEvent::from_permutation(&jets, &[0, 1, 2, 9], lep, MissingEnergy::new(0.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_detector_eta_defaults_to_kinematic() {
        let j = jet(25.0);
        assert!((j.detector_eta() - 0.3).abs() < 1e-12);
        assert_eq!(j.clone().with_detector_eta(-2.0).detector_eta(), -2.0);
    }

    #[test]
    fn test_tag_info_requires_all_weights() {
        let lep = MeasuredObject::from_pt_eta_phi_e(35.0, 0.1, 0.0, 35.2);
        let met = MissingEnergy::new(3.0, 4.0, 100.0);
        assert_eq!(met.magnitude(), 5.0);
        let jets: Vec<_> = (1..=4).map(|i| jet(10.0 * i as f64).with_tag_weight(0.1 * i as f64)).collect();
        let ev = TopLeptonJetsEvent::from_permutation(&jets, &[0, 1, 2, 3], lep.clone(), met).unwrap();
        let info = ev.jet_tag_info().unwrap();
        assert!((info[3].tag_weight - 0.4).abs() < 1e-12);
        assert!(ev.jet_btags().is_none());
        let mut ev2 = ev.clone();
        ev2.light_q1 = jet(5.0);
        assert!(ev2.jet_tag_info().is_none());
    }
}
