//! Empirical (binned) densities.
//!
//! Histogram storage is not owned by the fit: anything that can answer "density at this
//! point" implements [`DensityLookup`] and can be injected. [`Histogram1D`] and
//! [`Histogram2D`] are minimal piecewise-constant implementations.

use std::fmt;
use std::sync::Arc;

use kf_core::{Error, Result};

use crate::function::{Density, ResolutionFunction};

/// Binned density lookup.
pub trait DensityLookup: Send + Sync + fmt::Debug {
    /// Dimension of the lookup point.
    fn dim(&self) -> usize;

    /// Density at `point` (`point.len() == self.dim()`). Zero outside the support.
    fn evaluate(&self, point: &[f64]) -> f64;
}

fn validate_edges(what: &str, edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::Configuration(format!(
            "{what} requires at least 2 bin edges, got {}",
            edges.len()
        )));
    }
    for i in 0..edges.len() {
        let e = edges[i];
        if !e.is_finite() {
            return Err(Error::Configuration(format!("{what} bin_edges[{i}] must be finite, got {e}")));
        }
        if i > 0 && edges[i - 1] >= e {
            return Err(Error::Configuration(format!(
                "{what} bin edges must be strictly increasing, got edges[{}]={} and edges[{}]={}",
                i - 1,
                edges[i - 1],
                i,
                e
            )));
        }
    }
    Ok(())
}

fn validate_contents(what: &str, contents: &[f64]) -> Result<f64> {
    let mut total = 0.0;
    for (i, w) in contents.iter().enumerate() {
        if !w.is_finite() || *w < 0.0 {
            return Err(Error::Configuration(format!(
                "{what} bin_content[{i}] must be finite and >=0, got {w}"
            )));
        }
        total += w;
    }
    if !(total.is_finite() && total > 0.0) {
        return Err(Error::Configuration(format!(
            "{what} total content must be finite and >0, got {total}"
        )));
    }
    Ok(total)
}

/// Half-open bin lookup `[e_i, e_{i+1})`, with the last edge included in the last bin.
fn bin_index(edges: &[f64], x: f64) -> Option<usize> {
    let (first, last) = (edges[0], edges[edges.len() - 1]);
    if !(x >= first && x <= last) {
        return None;
    }
    let n_bins = edges.len() - 1;
    let idx = edges.partition_point(|&e| e <= x);
    Some(idx.saturating_sub(1).min(n_bins - 1))
}

/// Piecewise-constant 1-D density normalized to unit integral.
#[derive(Debug, Clone)]
pub struct Histogram1D {
    edges: Vec<f64>,
    density: Vec<f64>,
}

impl Histogram1D {
    /// Construct from edges and non-negative bin contents.
    pub fn from_edges_and_contents(edges: Vec<f64>, contents: &[f64]) -> Result<Self> {
        validate_edges("Histogram1D", &edges)?;
        if contents.len() + 1 != edges.len() {
            return Err(Error::Configuration(format!(
                "Histogram1D bin_content length mismatch: expected {}, got {}",
                edges.len() - 1,
                contents.len()
            )));
        }
        let total = validate_contents("Histogram1D", contents)?;
        let density =
            contents.iter().enumerate().map(|(i, w)| w / total / (edges[i + 1] - edges[i])).collect();
        Ok(Self { edges, density })
    }

    /// Bin edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }
}

impl DensityLookup for Histogram1D {
    fn dim(&self) -> usize {
        1
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        match point.first().and_then(|&x| bin_index(&self.edges, x)) {
            Some(i) => self.density[i],
            None => 0.0,
        }
    }
}

/// Piecewise-constant 2-D density normalized to unit integral.
///
/// Contents are row-major over `x` bins: `contents[ix * n_y + iy]`.
#[derive(Debug, Clone)]
pub struct Histogram2D {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    density: Vec<f64>,
}

impl Histogram2D {
    /// Construct from both edge sets and non-negative row-major contents.
    pub fn from_edges_and_contents(
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
        contents: &[f64],
    ) -> Result<Self> {
        validate_edges("Histogram2D (x)", &x_edges)?;
        validate_edges("Histogram2D (y)", &y_edges)?;
        let (nx, ny) = (x_edges.len() - 1, y_edges.len() - 1);
        if contents.len() != nx * ny {
            return Err(Error::Configuration(format!(
                "Histogram2D bin_content length mismatch: expected {}, got {}",
                nx * ny,
                contents.len()
            )));
        }
        let total = validate_contents("Histogram2D", contents)?;
        let mut density = Vec::with_capacity(contents.len());
        for ix in 0..nx {
            let wx = x_edges[ix + 1] - x_edges[ix];
            for iy in 0..ny {
                let wy = y_edges[iy + 1] - y_edges[iy];
                density.push(contents[ix * ny + iy] / total / (wx * wy));
            }
        }
        Ok(Self { x_edges, y_edges, density })
    }
}

impl DensityLookup for Histogram2D {
    fn dim(&self) -> usize {
        2
    }

    fn evaluate(&self, point: &[f64]) -> f64 {
        let [x, y] = match point {
            [x, y] => [*x, *y],
            _ => return 0.0,
        };
        match (bin_index(&self.x_edges, x), bin_index(&self.y_edges, y)) {
            (Some(ix), Some(iy)) => self.density[ix * (self.y_edges.len() - 1) + iy],
            _ => 0.0,
        }
    }
}

/// Resolution function backed by an empirical 1-D response distribution.
///
/// The lookup is evaluated at the relative response `r = (measured - x) / x`; the density
/// over `measured` is `lookup(r) / x`.
#[derive(Debug, Clone)]
pub struct HistogramResolution {
    lookup: Arc<dyn DensityLookup>,
    relative_width: f64,
}

impl HistogramResolution {
    /// Wrap a 1-D lookup. `relative_width` is the response width reported by
    /// [`ResolutionFunction::width`] per unit of the true value.
    pub fn new(lookup: Arc<dyn DensityLookup>, relative_width: f64) -> Result<Self> {
        if lookup.dim() != 1 {
            return Err(Error::Configuration(format!(
                "HistogramResolution requires a 1-D lookup, got dim={}",
                lookup.dim()
            )));
        }
        if !(relative_width.is_finite() && relative_width >= 0.0) {
            return Err(Error::Configuration(format!(
                "HistogramResolution relative_width must be finite and >=0, got {relative_width}"
            )));
        }
        Ok(Self { lookup, relative_width })
    }
}

impl ResolutionFunction for HistogramResolution {
    fn name(&self) -> &str {
        "histogram"
    }

    fn coefficients(&self) -> &[f64] {
        &[]
    }

    fn width(&self, x: f64) -> f64 {
        self.relative_width * x.abs()
    }

    fn density(&self, true_value: f64, measured: f64, _aux: Option<f64>) -> Density {
        if !(true_value.is_finite() && true_value > 0.0) {
            return Density::invalid();
        }
        let response = (measured - true_value) / true_value;
        Density::valid(self.lookup.evaluate(&[response]) / true_value)
    }
}
