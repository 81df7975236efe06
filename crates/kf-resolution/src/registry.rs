//! Per-detector lookup of resolution functions by object kind and pseudorapidity.

use std::fmt;
use std::sync::Arc;

use kf_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::function::ResolutionFunction;

/// Physics object kinds with their own resolution tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Light-quark jet energy.
    LightJet,
    /// b-quark jet energy.
    BJet,
    /// Electron energy.
    Electron,
    /// Muon transverse momentum.
    Muon,
    /// Photon energy.
    Photon,
    /// One missing-transverse-energy component.
    MissingEt,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::LightJet => "light jet",
            ObjectKind::BJet => "b jet",
            ObjectKind::Electron => "electron",
            ObjectKind::Muon => "muon",
            ObjectKind::Photon => "photon",
            ObjectKind::MissingEt => "missing ET",
        };
        f.write_str(s)
    }
}

/// Ascending `|η|` bins, one resolution function per bin.
///
/// Bin `i` covers `[boundary_{i-1}, boundary_i)` with an implicit lower edge of 0.
#[derive(Debug, Clone)]
pub struct EtaBinning {
    boundaries: Vec<f64>,
    functions: Vec<Arc<dyn ResolutionFunction>>,
}

impl EtaBinning {
    /// Create a table from upper bin boundaries and the matching functions.
    pub fn new(boundaries: Vec<f64>, functions: Vec<Arc<dyn ResolutionFunction>>) -> Result<Self> {
        if boundaries.is_empty() {
            return Err(Error::Configuration("EtaBinning requires at least one bin".into()));
        }
        if boundaries.len() != functions.len() {
            return Err(Error::Configuration(format!(
                "EtaBinning has {} boundaries but {} functions",
                boundaries.len(),
                functions.len()
            )));
        }
        let mut previous = 0.0;
        for (i, &b) in boundaries.iter().enumerate() {
            if !(b.is_finite() && b > previous) {
                return Err(Error::Configuration(format!(
                    "EtaBinning boundaries must be finite, positive and strictly ascending; \
                     boundary[{i}] = {b} after {previous}"
                )));
            }
            previous = b;
        }
        Ok(Self { boundaries, functions })
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.boundaries.len()
    }

    /// Upper bin boundaries.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Upper edge of the last bin.
    pub fn limit(&self) -> f64 {
        self.boundaries[self.boundaries.len() - 1]
    }

    /// Index of the first bin with `|region| < boundary`, or `None` if out of range.
    pub fn bin_index(&self, region: f64) -> Option<usize> {
        let a = region.abs();
        self.boundaries.iter().position(|&b| a < b)
    }

    /// Function for bin `i`.
    pub fn function(&self, i: usize) -> Option<&Arc<dyn ResolutionFunction>> {
        self.functions.get(i)
    }

    /// Function of the outermost (widest) bin.
    pub fn widest(&self) -> &Arc<dyn ResolutionFunction> {
        &self.functions[self.functions.len() - 1]
    }
}

/// Read-only table of resolution functions for one detector configuration.
///
/// Built once at configuration time and shared (`Arc<ResolutionRegistry>`) between any
/// number of likelihood instances.
#[derive(Debug, Clone)]
pub struct ResolutionRegistry {
    name: String,
    jets: EtaBinning,
    b_jets: Option<EtaBinning>,
    electrons: Option<EtaBinning>,
    muons: Option<EtaBinning>,
    photons: Option<EtaBinning>,
    missing_et: Arc<dyn ResolutionFunction>,
}

impl ResolutionRegistry {
    /// Configuration name (e.g. the detector layout).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bin table used for `kind`, if configured. `None` for [`ObjectKind::MissingEt`].
    pub fn table(&self, kind: ObjectKind) -> Option<&EtaBinning> {
        match kind {
            ObjectKind::LightJet => Some(&self.jets),
            ObjectKind::BJet => Some(self.b_jets.as_ref().unwrap_or(&self.jets)),
            ObjectKind::Electron => self.electrons.as_ref(),
            ObjectKind::Muon => self.muons.as_ref(),
            ObjectKind::Photon => self.photons.as_ref().or(self.electrons.as_ref()),
            ObjectKind::MissingEt => None,
        }
    }

    /// Whether a function can be selected for `kind`.
    pub fn supports(&self, kind: ObjectKind) -> bool {
        kind == ObjectKind::MissingEt || self.table(kind).is_some()
    }

    /// Select the resolution function for `kind` at detector pseudorapidity `region`.
    ///
    /// Missing ET is unbinned and ignores `region`. Fails with [`Error::OutOfRange`] when
    /// `|region|` is beyond the last boundary, and with [`Error::Configuration`] when no
    /// table was configured for `kind`.
    pub fn resolution_for(
        &self,
        kind: ObjectKind,
        region: f64,
    ) -> Result<Arc<dyn ResolutionFunction>> {
        if kind == ObjectKind::MissingEt {
            return Ok(Arc::clone(&self.missing_et));
        }
        let table = self.table(kind).ok_or_else(|| {
            Error::Configuration(format!("registry '{}' has no {kind} resolution", self.name))
        })?;
        match table.bin_index(region) {
            Some(i) => Ok(Arc::clone(&table.functions[i])),
            None => Err(Error::OutOfRange {
                kind: kind.to_string(),
                value: region.abs(),
                limit: table.limit(),
            }),
        }
    }

    /// Like [`Self::resolution_for`], but an out-of-range region falls back to the widest
    /// bin with a warning instead of failing.
    pub fn resolution_or_fallback(
        &self,
        kind: ObjectKind,
        region: f64,
    ) -> Result<Arc<dyn ResolutionFunction>> {
        match self.resolution_for(kind, region) {
            Err(Error::OutOfRange { kind: k, value, limit }) => {
                log::warn!(
                    "{}: {k} |eta| = {value} beyond last bin ({limit}); using outermost bin",
                    self.name
                );
                let table = self.table(kind).ok_or_else(|| {
                    Error::Configuration(format!("registry '{}' has no {kind} resolution", self.name))
                })?;
                Ok(Arc::clone(table.widest()))
            }
            other => other,
        }
    }

    /// The missing-ET resolution.
    pub fn missing_et(&self) -> &Arc<dyn ResolutionFunction> {
        &self.missing_et
    }
}

/// Incremental construction of a [`ResolutionRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    name: String,
    jets: Option<EtaBinning>,
    b_jets: Option<EtaBinning>,
    electrons: Option<EtaBinning>,
    muons: Option<EtaBinning>,
    photons: Option<EtaBinning>,
    missing_et: Option<Arc<dyn ResolutionFunction>>,
}

impl RegistryBuilder {
    /// Start a named registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Jet table (used for b-jets too unless [`Self::b_jets`] is set).
    pub fn jets(mut self, table: EtaBinning) -> Self {
        self.jets = Some(table);
        self
    }

    /// Dedicated b-jet table.
    pub fn b_jets(mut self, table: EtaBinning) -> Self {
        self.b_jets = Some(table);
        self
    }

    /// Electron table (used for photons too unless [`Self::photons`] is set).
    pub fn electrons(mut self, table: EtaBinning) -> Self {
        self.electrons = Some(table);
        self
    }

    /// Muon table.
    pub fn muons(mut self, table: EtaBinning) -> Self {
        self.muons = Some(table);
        self
    }

    /// Dedicated photon table.
    pub fn photons(mut self, table: EtaBinning) -> Self {
        self.photons = Some(table);
        self
    }

    /// Missing-ET resolution.
    pub fn missing_et(mut self, function: Arc<dyn ResolutionFunction>) -> Self {
        self.missing_et = Some(function);
        self
    }

    /// Finish; jets and missing ET are mandatory.
    pub fn build(self) -> Result<ResolutionRegistry> {
        let jets = self.jets.ok_or_else(|| {
            Error::Configuration(format!("registry '{}' is missing a jet table", self.name))
        })?;
        let missing_et = self.missing_et.ok_or_else(|| {
            Error::Configuration(format!("registry '{}' is missing a missing-ET resolution", self.name))
        })?;
        Ok(ResolutionRegistry {
            name: self.name,
            jets,
            b_jets: self.b_jets,
            electrons: self.electrons,
            muons: self.muons,
            photons: self.photons,
            missing_et,
        })
    }
}
