use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use approx::assert_relative_eq;
use kf_core::Error;
use kf_resolution::{
    DetectorConfig, DetectorLayout, EtaBinning, GaussianResolution, MetResolution, ObjectKind,
    RegistryBuilder, ResolutionFunction,
};
use statrs::consts::SQRT_2PI;

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("kinfit_{}_{}_{}", std::process::id(), nanos, tag));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn write_layout(dir: &Path, layout: DetectorLayout) {
    for (i, _) in layout.jet_boundaries().iter().enumerate() {
        write(dir, &format!("par_energy_jets_eta{}.txt", i + 1), &format!("0.03\n0.8\n{}\n", 4.0 + i as f64));
    }
    for i in 1..=3 {
        write(dir, &format!("par_pt_electrons_eta{i}.txt"), "0.007 0.15 0.3");
        write(dir, &format!("par_pt_muons_eta{i}.txt"), "0.01 0.0 0.1");
    }
    write(dir, "par_misset.txt", "# p0 p1 p2 p3\n200 0.02 8 10\n");
}

#[test]
fn atlas_layout_loads_all_tables() {
    let dir = tmp_dir("atlas");
    write_layout(&dir, DetectorLayout::AtlasDelphes);
    let reg = DetectorLayout::AtlasDelphes.load(&dir).unwrap();

    assert_eq!(reg.name(), "atlas_delphes");
    assert_eq!(reg.table(ObjectKind::LightJet).unwrap().boundaries(), &[1.7, 3.2, 4.9]);
    let f = reg.resolution_for(ObjectKind::LightJet, 3.5).unwrap();
    assert_eq!(f.coefficients(), &[0.03, 0.8, 6.0]);
    assert_eq!(reg.missing_et().coefficients(), &[200.0, 0.02, 8.0, 10.0]);
    assert!(reg.resolution_for(ObjectKind::Muon, 2.4).is_ok());
    assert!(matches!(reg.resolution_for(ObjectKind::Electron, 2.6), Err(Error::OutOfRange { .. })));
}

#[test]
fn cms_layout_has_two_jet_bins() {
    let dir = tmp_dir("cms");
    write_layout(&dir, DetectorLayout::CmsDelphes);
    let reg = DetectorLayout::CmsDelphes.load(&dir).unwrap();
    assert_eq!(reg.table(ObjectKind::BJet).unwrap().n_bins(), 2);
    let f = reg.resolution_for(ObjectKind::BJet, 4.2).unwrap();
    assert_eq!(f.coefficients(), &[0.03, 0.8, 5.0]);
}

#[test]
fn malformed_coefficient_file_is_fatal() {
    let dir = tmp_dir("broken");
    write_layout(&dir, DetectorLayout::AtlasDelphes);
    write(&dir, "par_energy_jets_eta2.txt", "0.03 0.8");
    let err = DetectorLayout::AtlasDelphes.load(&dir).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{err}");
    assert!(err.to_string().contains("par_energy_jets_eta2.txt"));
}

#[test]
fn json_config_with_relative_files() {
    let dir = tmp_dir("json");
    let tf = dir.join("tf");
    std::fs::create_dir_all(&tf).unwrap();
    write_layout(&tf, DetectorLayout::AtlasDelphes);
    write(
        &dir,
        "detector.json",
        r#"{ "type": "layout", "layout": "atlas_delphes", "folder": "tf" }"#,
    );
    let reg = DetectorConfig::load_registry(&dir.join("detector.json")).unwrap();
    assert_eq!(reg.table(ObjectKind::Electron).unwrap().n_bins(), 3);

    write(
        &dir,
        "custom.json",
        r#"{
            "type": "custom",
            "name": "files",
            "jets": { "bins": [ { "upper": 5.0, "resolution": { "form": "gaussian", "file": "tf/par_energy_jets_eta1.txt" } } ] },
            "missing_et": { "form": "met", "file": "tf/par_misset.txt" }
        }"#,
    );
    let reg = DetectorConfig::load_registry(&dir.join("custom.json")).unwrap();
    assert_eq!(reg.name(), "files");
    assert_eq!(reg.resolution_for(ObjectKind::LightJet, 0.0).unwrap().coefficients(), &[0.03, 0.8, 4.0]);
}

#[test]
fn fixed_width_three_bin_scenario() {
    let bins: Vec<Arc<dyn ResolutionFunction>> =
        (0..3).map(|_| Arc::new(GaussianResolution::new(0.0, 0.0, 5.0)) as Arc<dyn ResolutionFunction>).collect();
    let jets = EtaBinning::new(vec![1.7, 3.2, 4.9], bins).unwrap();
    let reg = RegistryBuilder::new("scenario")
        .jets(jets)
        .missing_et(Arc::new(MetResolution::new(0.0, 0.0, 10.0, 0.0)))
        .build()
        .unwrap();

    let table = reg.table(ObjectKind::LightJet).unwrap();
    assert_eq!(table.bin_index(2.0), Some(1));
    let f = reg.resolution_for(ObjectKind::LightJet, 2.0).unwrap();
    assert!(Arc::ptr_eq(&f, table.function(1).unwrap()));

    let d = f.density(100.0, 100.0, None);
    assert!(d.valid);
    assert_relative_eq!(d.value, 1.0 / (5.0 * SQRT_2PI), epsilon = 1e-15);
}
