use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use kf_core::LogDensityModel;
use kf_likelihood::{
    FourMomentum, LeptonKind, LikelihoodConfig, MeasuredObject, MissingEnergy, PermutationFilter,
    TopLeptonJets, TopLeptonJetsEvent, neutrino_pz_solutions,
};
use kf_resolution::{EtaBinning, GaussianResolution, MetResolution, RegistryBuilder, ResolutionFunction};

fn model() -> TopLeptonJets {
    let jets: Vec<Arc<dyn ResolutionFunction>> = (0..3)
        .map(|i| Arc::new(GaussianResolution::new(0.03, 0.8, 4.0 + i as f64)) as Arc<dyn ResolutionFunction>)
        .collect();
    let leptons: Vec<Arc<dyn ResolutionFunction>> = (0..3)
        .map(|_| Arc::new(GaussianResolution::new(0.007, 0.15, 0.3)) as Arc<dyn ResolutionFunction>)
        .collect();
    let registry = RegistryBuilder::new("bench")
        .jets(EtaBinning::new(vec![1.7, 3.2, 4.9], jets).unwrap())
        .electrons(EtaBinning::new(vec![0.5, 1.5, 2.5], leptons).unwrap())
        .missing_et(Arc::new(MetResolution::new(200.0, 0.02, 8.0, 10.0)))
        .build()
        .unwrap();
    TopLeptonJets::new(Arc::new(registry), LikelihoodConfig::default(), LeptonKind::Electron).unwrap()
}

fn jet(pt: f64, eta: f64, phi: f64) -> MeasuredObject {
    MeasuredObject::new(FourMomentum::from_pt_eta_phi_m(pt, eta, phi, 0.0))
}

fn bench_likelihood(c: &mut Criterion) {
    let m = model();
    let jets = vec![jet(70.0, 0.4, 0.3), jet(60.0, -0.8, 2.9), jet(45.0, 1.1, -0.9), jet(35.0, -0.2, 1.4), jet(28.0, 2.1, 0.6)];
    let lepton = jet(40.0, 0.6, -2.2);
    let met = MissingEnergy::new(-20.0, 30.0, 320.0);

    let event = TopLeptonJetsEvent::from_permutation(&jets, &[0, 1, 2, 3], lepton.clone(), met).unwrap();
    let lh = m.bind(event).unwrap();
    let init = lh.initial_parameters();
    c.bench_function("log_likelihood", |b| b.iter(|| black_box(lh.log_likelihood(black_box(&init)).unwrap())));
    c.bench_function("grad_nll_central_difference", |b| b.iter(|| black_box(lh.grad_nll(black_box(&init)).unwrap())));

    c.bench_function("neutrino_pz_solutions", |b| {
        b.iter(|| black_box(neutrino_pz_solutions(black_box(lepton.momentum()), black_box(&met), 80.4, None)))
    });

    let filter = PermutationFilter::light_quarks();
    c.bench_function("scan_canonical_permutations_5_jets", |b| {
        b.iter(|| {
            let mut best = f64::NEG_INFINITY;
            for index in filter.canonical_indices(120).unwrap() {
                let lh = m.bind_permutation(&jets, index, lepton.clone(), met).unwrap();
                best = best.max(lh.log_likelihood(&lh.initial_parameters()).unwrap());
            }
            black_box(best)
        })
    });
}

criterion_group!(benches, bench_likelihood);
criterion_main!(benches);
