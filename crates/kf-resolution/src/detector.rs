//! Detector layouts and JSON detector configuration.
//!
//! The set of reference layouts is closed; each knows its bin boundaries and the names
//! of the coefficient files it reads from a layout folder. Custom detectors are described
//! with [`DetectorConfig::Custom`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kf_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::function::{ResolutionForm, ResolutionFunction};
use crate::registry::{EtaBinning, RegistryBuilder, ResolutionRegistry};

/// Reference detector layouts (fast-simulation parameterizations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorLayout {
    /// ATLAS-like: jets binned at |η| 1.7 / 3.2 / 4.9.
    AtlasDelphes,
    /// CMS-like: jets binned at |η| 3.0 / 5.0.
    CmsDelphes,
}

const LEPTON_BOUNDARIES: &[f64] = &[0.5, 1.5, 2.5];

impl DetectorLayout {
    /// Layout name.
    pub fn name(self) -> &'static str {
        match self {
            DetectorLayout::AtlasDelphes => "atlas_delphes",
            DetectorLayout::CmsDelphes => "cms_delphes",
        }
    }

    /// Upper |η| boundaries of the jet energy bins.
    pub fn jet_boundaries(self) -> &'static [f64] {
        match self {
            DetectorLayout::AtlasDelphes => &[1.7, 3.2, 4.9],
            DetectorLayout::CmsDelphes => &[3.0, 5.0],
        }
    }

    /// Upper |η| boundaries of the electron energy bins.
    pub fn electron_boundaries(self) -> &'static [f64] {
        LEPTON_BOUNDARIES
    }

    /// Upper |η| boundaries of the muon momentum bins.
    pub fn muon_boundaries(self) -> &'static [f64] {
        LEPTON_BOUNDARIES
    }

    /// Build the registry from the coefficient files in `folder`.
    ///
    /// Expected files: `par_energy_jets_eta{i}.txt`, `par_pt_electrons_eta{i}.txt`,
    /// `par_pt_muons_eta{i}.txt` (Gaussian form, `i` starting at 1) and `par_misset.txt`
    /// (missing-ET form).
    pub fn load(self, folder: &Path) -> Result<ResolutionRegistry> {
        let table = |prefix: &str, boundaries: &[f64]| -> Result<EtaBinning> {
            let functions = (1..=boundaries.len())
                .map(|i| ResolutionForm::Gaussian.load(&folder.join(format!("{prefix}_eta{i}.txt"))))
                .collect::<Result<Vec<_>>>()?;
            EtaBinning::new(boundaries.to_vec(), functions)
        };
        let registry = RegistryBuilder::new(self.name())
            .jets(table("par_energy_jets", self.jet_boundaries())?)
            .electrons(table("par_pt_electrons", self.electron_boundaries())?)
            .muons(table("par_pt_muons", self.muon_boundaries())?)
            .missing_et(ResolutionForm::Met.load(&folder.join("par_misset.txt"))?)
            .build()?;
        log::debug!("loaded {} resolutions from {}", self.name(), folder.display());
        Ok(registry)
    }
}

/// Where a parametric resolution takes its coefficients from.
///
/// Exactly one of `coefficients` / `file` must be given. Relative files are resolved
/// against the directory of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionSpec {
    /// Functional form.
    pub form: ResolutionForm,
    /// Inline coefficients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficients: Option<Vec<f64>>,
    /// Coefficient file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl ResolutionSpec {
    /// Inline Gaussian coefficients.
    pub fn gaussian(a: f64, b: f64, c: f64) -> Self {
        Self { form: ResolutionForm::Gaussian, coefficients: Some(vec![a, b, c]), file: None }
    }

    /// Build the function, reading `file` relative to `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Result<Arc<dyn ResolutionFunction>> {
        match (&self.coefficients, &self.file) {
            (Some(c), None) => self.form.build(c),
            (None, Some(f)) => self.form.load(&base_dir.join(f)),
            _ => Err(Error::Configuration(
                "resolution spec needs exactly one of `coefficients` or `file`".into(),
            )),
        }
    }
}

/// One `|η|` bin of a custom table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinSpec {
    /// Upper |η| boundary (exclusive).
    pub upper: f64,
    /// Resolution in this bin.
    pub resolution: ResolutionSpec,
}

/// Custom `|η|`-binned table, bins in ascending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinnedTableSpec {
    /// Bins.
    pub bins: Vec<BinSpec>,
}

impl BinnedTableSpec {
    fn build(&self, base_dir: &Path) -> Result<EtaBinning> {
        let boundaries = self.bins.iter().map(|b| b.upper).collect();
        let functions =
            self.bins.iter().map(|b| b.resolution.build(base_dir)).collect::<Result<Vec<_>>>()?;
        EtaBinning::new(boundaries, functions)
    }
}

/// Detector configuration, as read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectorConfig {
    /// A reference layout reading its coefficient files from `folder`.
    Layout {
        /// Layout.
        layout: DetectorLayout,
        /// Folder with the coefficient files.
        folder: PathBuf,
    },
    /// Explicit tables.
    Custom {
        /// Registry name.
        name: String,
        /// Jet energy table.
        jets: BinnedTableSpec,
        /// Optional dedicated b-jet table.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        b_jets: Option<BinnedTableSpec>,
        /// Electron table.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        electrons: Option<BinnedTableSpec>,
        /// Muon table.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        muons: Option<BinnedTableSpec>,
        /// Optional dedicated photon table.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        photons: Option<BinnedTableSpec>,
        /// Missing-ET resolution.
        missing_et: ResolutionSpec,
    },
}

impl DetectorConfig {
    /// Parse a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON configuration and build its registry. Relative paths are resolved
    /// against the file's directory.
    pub fn load_registry(path: &Path) -> Result<ResolutionRegistry> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.build(base)
    }

    /// Build the registry described by this configuration.
    pub fn build(&self, base_dir: &Path) -> Result<ResolutionRegistry> {
        match self {
            DetectorConfig::Layout { layout, folder } => layout.load(&base_dir.join(folder)),
            DetectorConfig::Custom { name, jets, b_jets, electrons, muons, photons, missing_et } => {
                let mut builder = RegistryBuilder::new(name.clone())
                    .jets(jets.build(base_dir)?)
                    .missing_et(missing_et.build(base_dir)?);
                if let Some(t) = b_jets {
                    builder = builder.b_jets(t.build(base_dir)?);
                }
                if let Some(t) = electrons {
                    builder = builder.electrons(t.build(base_dir)?);
                }
                if let Some(t) = muons {
                    builder = builder.muons(t.build(base_dir)?);
                }
                if let Some(t) = photons {
                    builder = builder.photons(t.build(base_dir)?);
                }
                builder.build()
            }
        }
    }
}
