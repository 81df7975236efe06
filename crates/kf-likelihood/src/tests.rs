use std::f64::consts::PI;
use std::sync::Arc;

use approx::assert_relative_eq;
use kf_core::{Error, LogDensityModel};
use kf_resolution::{
    EtaBinning, GaussianResolution, MetResolution, RegistryBuilder, ResolutionFunction,
    ResolutionRegistry,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use statrs::consts::SQRT_2PI;

use crate::*;

fn gauss(a: f64, b: f64, c: f64) -> Arc<dyn ResolutionFunction> {
    Arc::new(GaussianResolution::new(a, b, c))
}

fn registry() -> Arc<ResolutionRegistry> {
    let jets = EtaBinning::new(vec![2.5, 4.5], vec![gauss(0.03, 0.8, 4.0), gauss(0.05, 1.0, 6.0)]).unwrap();
    let electrons = EtaBinning::new(vec![2.5], vec![gauss(0.0, 0.0, 5.0)]).unwrap();
    let muons = EtaBinning::new(vec![2.5], vec![gauss(0.01, 0.0, 0.1)]).unwrap();
    let reg = RegistryBuilder::new("toy")
        .jets(jets)
        .electrons(electrons)
        .muons(muons)
        .missing_et(Arc::new(MetResolution::new(200.0, 0.02, 8.0, 10.0)))
        .build()
        .unwrap();
    Arc::new(reg)
}

/// Boost `p` (given in the rest frame of `parent`) into the frame `parent` is measured in.
fn boost(p: FourMomentum, parent: &FourMomentum) -> FourMomentum {
    let m = parent.m();
    let (bx, by, bz) = (parent.px / parent.e, parent.py / parent.e, parent.pz / parent.e);
    let gamma = parent.e / m;
    let bp = bx * p.px + by * p.py + bz * p.pz;
    let k = gamma * gamma / (gamma + 1.0) * bp + gamma * p.e;
    FourMomentum::new(gamma * (p.e + bp), p.px + k * bx, p.py + k * by, p.pz + k * bz)
}

/// Isotropic two-body decay of `parent` into masses `m1`, `m2`.
fn decay(rng: &mut StdRng, parent: &FourMomentum, m1: f64, m2: f64) -> (FourMomentum, FourMomentum) {
    let mm = parent.m();
    let p = ((mm * mm - (m1 + m2).powi(2)) * (mm * mm - (m1 - m2).powi(2))).sqrt() / (2.0 * mm);
    let cos_t: f64 = rng.random_range(-1.0..1.0);
    let phi: f64 = rng.random_range(-PI..PI);
    let sin_t = (1.0 - cos_t * cos_t).sqrt();
    let (x, y, z) = (p * sin_t * phi.cos(), p * sin_t * phi.sin(), p * cos_t);
    let a = FourMomentum::new((p * p + m1 * m1).sqrt(), x, y, z);
    let b = FourMomentum::new((p * p + m2 * m2).sqrt(), -x, -y, -z);
    (boost(a, parent), boost(b, parent))
}

struct Truth {
    b_had: FourMomentum,
    b_lep: FourMomentum,
    q1: FourMomentum,
    q2: FourMomentum,
    lepton: FourMomentum,
    neutrino: FourMomentum,
}

fn generate_truth(rng: &mut StdRng) -> Truth {
    let c = PhysicsConstants::default();
    let pt = Normal::new(80.0, 30.0).unwrap();
    let mut top = || {
        let pt_val: f64 = pt.sample(rng);
        let eta: f64 = rng.random_range(-1.2..1.2);
        let phi: f64 = rng.random_range(-PI..PI);
        FourMomentum::from_pt_eta_phi_m(pt_val.abs() + 10.0, eta, phi, c.mass_top)
    };
    let (t_had, t_lep) = (top(), top());
    let (w_had, b_had) = decay(rng, &t_had, c.mass_w, c.mass_bottom);
    let (q1, q2) = decay(rng, &w_had, 0.0, 0.0);
    let (w_lep, b_lep) = decay(rng, &t_lep, c.mass_w, c.mass_bottom);
    let (lepton, neutrino) = decay(rng, &w_lep, 0.0, 0.0);
    Truth { b_had, b_lep, q1, q2, lepton, neutrino }
}

fn event_from_truth(t: &Truth) -> TopLeptonJetsEvent {
    let sum_et = [t.b_had, t.b_lep, t.q1, t.q2, t.lepton].iter().map(|p| p.pt()).sum::<f64>();
    TopLeptonJetsEvent {
        b_had: MeasuredObject::new(t.b_had),
        b_lep: MeasuredObject::new(t.b_lep),
        light_q1: MeasuredObject::new(t.q1),
        light_q2: MeasuredObject::new(t.q2),
        lepton: MeasuredObject::new(t.lepton),
        met: MissingEnergy::new(t.neutrino.px, t.neutrino.py, sum_et),
    }
}

fn simple_event() -> TopLeptonJetsEvent {
    let jet = |pt: f64, eta: f64, phi: f64| MeasuredObject::new(FourMomentum::from_pt_eta_phi_m(pt, eta, phi, 0.0));
    TopLeptonJetsEvent {
        b_had: jet(70.0, 0.4, 0.3),
        b_lep: jet(60.0, -0.8, 2.9),
        light_q1: jet(45.0, 1.1, -0.9),
        light_q2: jet(35.0, -0.2, 1.4),
        lepton: jet(40.0, 0.6, -2.2),
        met: MissingEnergy::new(-20.0, 30.0, 320.0),
    }
}

fn model(config: LikelihoodConfig, lepton: LeptonKind) -> TopLeptonJets {
    TopLeptonJets::new(registry(), config, lepton).unwrap()
}

#[test]
fn test_components_sum_to_log_likelihood() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    let mut p = lh.initial_parameters();
    for shift in [0.0, 3.0, -7.5] {
        p[Param::Lq1E.index()] += shift;
        p[Param::TopM.index()] += shift;
        let comps = lh.log_likelihood_components(&p).unwrap();
        assert_eq!(comps.len(), 11);
        assert_eq!(comps.names()[0], "TF_bhad");
        assert_eq!(comps.names()[10], "BW_Tlep");
        assert_eq!(comps.total(), lh.log_likelihood(&p).unwrap());
    }
}

#[test]
fn test_fixed_top_mass_synthetic_events_are_finite() {
    let mut rng = StdRng::seed_from_u64(7);
    let config = LikelihoodConfig { top_mass_fixed: true, ..Default::default() };
    let m = model(config, LeptonKind::Electron);
    for _ in 0..50 {
        let truth = generate_truth(&mut rng);
        let lh = m.bind(event_from_truth(&truth)).unwrap();
        let init = lh.initial_parameters();
        let ll = lh.log_likelihood(&init).unwrap();
        assert!(ll.is_finite());
        assert!(ll > INVALID_LOG_LIKELIHOOD);

        let comps = lh.log_likelihood_components(&init).unwrap();
        assert_eq!(comps.get("BW_Thad"), Some(0.0));
        assert_eq!(comps.get("BW_Tlep"), Some(0.0));
        let top = &lh.define_parameters()[Param::TopM.index()];
        assert!(top.is_fixed());
        assert_eq!(init[Param::TopM.index()], 172.5);
    }
}

#[test]
fn test_truth_beats_distorted_parameters() {
    let mut rng = StdRng::seed_from_u64(11);
    let m = model(LikelihoodConfig::default(), LeptonKind::Electron);
    let truth = generate_truth(&mut rng);
    let lh = m.bind(event_from_truth(&truth)).unwrap();

    let at_truth = [
        truth.b_had.e,
        truth.b_lep.e,
        truth.q1.e,
        truth.q2.e,
        truth.lepton.e,
        truth.neutrino.px,
        truth.neutrino.py,
        truth.neutrino.pz,
        172.5,
    ];
    let mut off = at_truth;
    off[Param::Lq1E.index()] *= 1.3;
    off[Param::NuPz.index()] += 150.0;
    let good = lh.log_likelihood(&at_truth).unwrap();
    let bad = lh.log_likelihood(&off).unwrap();
    assert!(good > bad, "truth {good} should beat distorted {bad}");

    let k = lh.reconstruct(&at_truth).unwrap();
    assert_relative_eq!(k.w_had.m(), 80.4, epsilon = 1e-6);
    assert_relative_eq!(k.top_lep.m(), 172.5, epsilon = 1e-6);
}

#[test]
fn test_wrong_parameter_length_is_error() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    assert!(matches!(lh.log_likelihood(&[1.0; 8]), Err(Error::Validation(_))));
    assert!(matches!(lh.log_likelihood_components(&[1.0; 10]), Err(Error::Validation(_))));
    assert!(matches!(lh.reconstruct(&[]), Err(Error::Validation(_))));
}

#[test]
fn test_negative_energy_gives_sentinel() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    let mut p = lh.initial_parameters();
    p[Param::BHadE.index()] = -5.0;
    assert!(matches!(lh.reconstruct(&p), Err(Error::Computation(_))));

    let comps = lh.log_likelihood_components(&p).unwrap();
    for (name, v) in comps.iter() {
        if name.starts_with("TF_") {
            assert_eq!(v, INVALID_LOG_LIKELIHOOD, "{name}");
        } else {
            assert_eq!(v, 0.0, "{name}");
        }
    }
    assert_eq!(lh.log_likelihood(&p).unwrap(), 7.0 * INVALID_LOG_LIKELIHOOD);
}

#[test]
fn test_b_energy_below_mass_gives_sentinel() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    let mut p = lh.initial_parameters();
    p[Param::BLepE.index()] = 3.0;
    assert!(lh.log_likelihood(&p).unwrap() <= 7.0 * INVALID_LOG_LIKELIHOOD);
}

#[test]
fn test_electron_transfer_function_at_measurement() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    let comps = lh.log_likelihood_components(&lh.initial_parameters()).unwrap();
    let expected = -(5.0 * SQRT_2PI).ln();
    assert_relative_eq!(comps.get("TF_lep").unwrap(), expected, epsilon = 1e-12);
}

#[test]
fn test_muon_compares_transverse_momentum() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Muon).bind(simple_event()).unwrap();
    let init = lh.initial_parameters();
    let comps = lh.log_likelihood_components(&init).unwrap();
    // Gaussian (0.01, 0, 0.1) at pT = 40: σ = sqrt(0.16 + 0.01).
    let sigma = (0.01f64 * 0.01 * 40.0 * 40.0 + 0.1 * 0.1).sqrt();
    assert_relative_eq!(comps.get("TF_lep").unwrap(), -(sigma * SQRT_2PI).ln(), epsilon = 1e-9);

    let mut shifted = init.clone();
    shifted[Param::LepE.index()] *= 1.01;
    let c2 = lh.log_likelihood_components(&shifted).unwrap();
    assert!(c2.get("TF_lep").unwrap() < comps.get("TF_lep").unwrap());
}

#[test]
fn test_missing_lepton_table_rejected() {
    let jets = EtaBinning::new(vec![2.5], vec![gauss(0.0, 1.0, 3.0)]).unwrap();
    let reg = RegistryBuilder::new("jets only")
        .jets(jets)
        .missing_et(Arc::new(MetResolution::new(200.0, 0.02, 8.0, 10.0)))
        .build()
        .unwrap();
    let r = TopLeptonJets::new(Arc::new(reg), LikelihoodConfig::default(), LeptonKind::Muon);
    assert!(matches!(r, Err(Error::Configuration(_))));
}

#[test]
fn test_forward_jet_falls_back_to_outer_bin() {
    let mut ev = simple_event();
    ev.light_q2 = ev.light_q2.clone().with_detector_eta(6.0);
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(ev.clone()).unwrap();
    let comps = lh.log_likelihood_components(&lh.initial_parameters()).unwrap();
    // Outer bin: σ(E) with (0.05, 1.0, 6.0).
    let e = ev.light_q2.e();
    let sigma = (0.05f64 * 0.05 * e * e + e + 36.0).sqrt();
    assert_relative_eq!(comps.get("TF_lq2").unwrap(), -(sigma * SQRT_2PI).ln(), epsilon = 1e-9);
}

#[test]
fn test_fraction_bounds() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    let bounds = lh.define_parameters();
    assert_eq!(bounds.len(), Param::COUNT);
    let ev = lh.event();

    let b = &bounds[Param::BHadE.index()];
    assert_relative_eq!(b.lower, 0.5 * ev.b_had.e(), epsilon = 1e-12);
    assert_relative_eq!(b.upper, 1.5 * ev.b_had.e(), epsilon = 1e-12);
    assert_relative_eq!(b.step, (b.upper - b.lower) / 100.0, epsilon = 1e-12);

    let lep = &bounds[Param::LepE.index()];
    assert_relative_eq!(lep.lower, 0.8 * ev.lepton.e(), epsilon = 1e-12);

    // |MET| = 36.06 > 10 GeV floor.
    let px = &bounds[Param::NuPx.index()];
    assert_relative_eq!(px.upper - px.lower, 2.0 * ev.met.magnitude(), epsilon = 1e-9);

    let pz = &bounds[Param::NuPz.index()];
    assert_eq!((pz.lower, pz.upper), (-1000.0, 1000.0));
    assert_eq!(bounds[Param::TopM.index()].as_tuple(), (100.0, 1000.0));

    for (x, b) in lh.initial_parameters().iter().zip(&bounds) {
        assert!(b.contains(*x), "{} = {x} outside [{}, {}]", b.name, b.lower, b.upper);
    }
}

#[test]
fn test_resolution_bounds() {
    let config = LikelihoodConfig { widths_from_resolution: true, ..Default::default() };
    let lh = model(config, LeptonKind::Electron).bind(simple_event()).unwrap();
    let bounds = lh.define_parameters();
    let e = lh.event().light_q1.e();
    let sigma = (0.03f64 * 0.03 * e * e + 0.64 * e + 16.0).sqrt();
    let q1 = &bounds[Param::Lq1E.index()];
    assert_relative_eq!(q1.upper, e + 7.0 * sigma, epsilon = 1e-9);
    assert_relative_eq!(q1.lower, (e - 7.0 * sigma).max(0.0), epsilon = 1e-9);
    // b jets never go below the b mass.
    assert!(bounds[Param::BHadE.index()].lower >= 4.7);

    // MET width at sum_et = 320: 8 + 10·sigmoid(0.02·120).
    let met_sigma = 8.0 + 10.0 / (1.0 + (-0.02f64 * 120.0).exp());
    let px = &bounds[Param::NuPx.index()];
    assert_relative_eq!(px.upper - px.lower, 2.0 * met_sigma, epsilon = 1e-9);
}

#[test]
fn test_top_breit_wigner_uses_mass_parameter() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    let mut p = lh.initial_parameters();
    let k = lh.reconstruct(&p).unwrap();
    p[Param::TopM.index()] = k.top_had.m();
    let at_peak = lh.log_likelihood_components(&p).unwrap().get("BW_Thad").unwrap();
    p[Param::TopM.index()] = k.top_had.m() + 20.0;
    let off_peak = lh.log_likelihood_components(&p).unwrap().get("BW_Thad").unwrap();
    assert!(at_peak > off_peak);
    assert_ne!(at_peak, 0.0);
}

#[test]
fn test_log_density_model_interface() {
    let lh = model(LikelihoodConfig { top_mass_fixed: true, ..Default::default() }, LeptonKind::Electron)
        .bind(simple_event())
        .unwrap();
    assert_eq!(lh.dim(), 9);
    assert_eq!(lh.parameter_names()[7], "p_z neutrino");
    let init = lh.parameter_init();
    assert_eq!(lh.nll(&init).unwrap(), -lh.log_likelihood(&init).unwrap());
    let g = lh.grad_nll(&init).unwrap();
    assert_eq!(g.len(), 9);
    assert!(g.iter().all(|x| x.is_finite()));
    assert_eq!(g[Param::TopM.index()], 0.0);
}

#[test]
fn test_partner_permutation_has_same_likelihood() {
    let ev = simple_event();
    let jets = vec![ev.b_had.clone(), ev.b_lep.clone(), ev.light_q1.clone(), ev.light_q2.clone()];
    let m = model(LikelihoodConfig::default(), LeptonKind::Electron);
    for index in [0usize, 7, 18] {
        let partner = m.invariant_permutation_partner(index, 24).unwrap().unwrap();
        assert_eq!(partner, index ^ 1);
        let a = m.bind_permutation(&jets, index, ev.lepton.clone(), ev.met).unwrap();
        let b = m.bind_permutation(&jets, partner, ev.lepton.clone(), ev.met).unwrap();
        let pa = a.initial_parameters();
        let mut pb = pa.clone();
        pb.swap(Param::Lq1E.index(), Param::Lq2E.index());
        for (x, y) in b.initial_parameters().iter().zip(&pb) {
            assert_relative_eq!(*x, *y, epsilon = 1e-9);
        }
        assert_relative_eq!(a.log_likelihood(&pa).unwrap(), b.log_likelihood(&pb).unwrap(), epsilon = 1e-9);
    }
    assert!(m.bind_permutation(&jets, 24, ev.lepton.clone(), ev.met).is_err());
    assert!(m.bind_permutation(&jets[..3], 0, ev.lepton, ev.met).is_err());
}

#[test]
fn test_ljet_reweight_requires_tag_weights() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    assert_eq!(lh.log_event_probability_ljet_reweight().unwrap(), 0.0);

    let flat: Arc<dyn kf_resolution::DensityLookup> =
        Arc::new(kf_resolution::Histogram1D::from_edges_and_contents(vec![0.0, 200.0], &[1.0]).unwrap());
    let tag: Arc<dyn kf_resolution::DensityLookup> =
        Arc::new(kf_resolution::Histogram1D::from_edges_and_contents(vec![0.0, 1.0], &[1.0]).unwrap());
    let f = || FlavorLookups::separate(Arc::clone(&flat), Arc::clone(&tag));
    let sep = LightJetSeparation::new(LJetSeparationMethod::PermReweight, f(), f(), f()).unwrap();
    let m = model(LikelihoodConfig::default(), LeptonKind::Electron).with_light_jet_separation(Arc::new(sep));

    assert!(matches!(
        m.bind(simple_event()).unwrap().log_event_probability_ljet_reweight(),
        Err(Error::Validation(_))
    ));

    let mut ev = simple_event();
    for j in [&mut ev.b_had, &mut ev.b_lep, &mut ev.light_q1, &mut ev.light_q2] {
        *j = j.clone().with_tag_weight(0.5);
    }
    let lp = m.bind(ev).unwrap().log_event_probability_ljet_reweight().unwrap();
    assert_relative_eq!(lp, 4.0 * (1.0f64 / 200.0).ln(), epsilon = 1e-12);
}

#[test]
fn test_neutrino_seed_satisfies_w_mass() {
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    let init = lh.initial_parameters();
    let k = lh.reconstruct(&init).unwrap();
    let ev = lh.event();
    let sols = neutrino_pz_solutions(ev.lepton.momentum(), &ev.met, 80.4, None);
    match sols.smallest_magnitude() {
        Some(z) => {
            assert_relative_eq!(init[Param::NuPz.index()], z, epsilon = 1e-9);
            assert_relative_eq!(k.w_lep.m(), 80.4, epsilon = 1e-6);
        }
        None => assert_eq!(init[Param::NuPz.index()], 0.0),
    }
}

#[test]
fn test_met_tail_inside_bounds_is_not_sentinel() {
    let mut ev = simple_event();
    ev.met = MissingEnergy::new(900.0, 0.0, 320.0);
    let lh = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(ev).unwrap();
    let px = &lh.define_parameters()[Param::NuPx.index()];
    let mut p = lh.initial_parameters();
    p[Param::NuPx.index()] = px.lower;

    let comps = lh.log_likelihood_components(&p).unwrap();
    let sigma = 8.0 + 10.0 / (1.0 + (-0.02f64 * 120.0).exp());
    let z = (900.0 - px.lower) / sigma;
    let expected = -0.5 * z * z - (sigma * SQRT_2PI).ln();
    let met_x = comps.get("TF_METx").unwrap();
    assert!(met_x > INVALID_LOG_LIKELIHOOD);
    assert_relative_eq!(met_x, expected, epsilon = 1e-9);
}

#[test]
fn test_too_many_jets_rejected() {
    let ev = simple_event();
    let jets = vec![ev.b_had.clone(); 21];
    let m = model(LikelihoodConfig::default(), LeptonKind::Electron);
    assert!(matches!(m.bind_permutation(&jets, 0, ev.lepton, ev.met), Err(Error::Validation(_))));
}

#[test]
fn test_event_probability_adds_btag_term() {
    let wp = BTagWorkingPoint::new(0.7, 50.0).unwrap();
    let m = model(LikelihoodConfig::default(), LeptonKind::Electron).with_btag_working_point(wp);

    let untagged = m.bind(simple_event()).unwrap();
    assert!(matches!(untagged.log_event_probability_btag(), Err(Error::Validation(_))));

    let mut ev = simple_event();
    for (j, tagged) in [&mut ev.b_had, &mut ev.b_lep, &mut ev.light_q1, &mut ev.light_q2]
        .into_iter()
        .zip([true, false, false, false])
    {
        *j = j.clone().with_btag(tagged);
    }
    let lh = m.bind(ev).unwrap();
    let btag = lh.log_event_probability_btag().unwrap();
    let expected: f64 = 0.7f64.ln() + 0.3f64.ln() + 2.0 * (1.0 - 1.0 / 50.0f64).ln();
    assert_relative_eq!(btag, expected, epsilon = 1e-12);

    let p = lh.initial_parameters();
    let total = lh.log_event_probability(&p).unwrap();
    assert_relative_eq!(total, lh.log_likelihood(&p).unwrap() + btag, epsilon = 1e-12);

    // Without a working point the event probability is the likelihood alone.
    let plain = model(LikelihoodConfig::default(), LeptonKind::Electron).bind(simple_event()).unwrap();
    let q = plain.initial_parameters();
    assert_eq!(plain.log_event_probability_btag().unwrap(), 0.0);
    assert_eq!(plain.log_event_probability(&q).unwrap(), plain.log_likelihood(&q).unwrap());
}
