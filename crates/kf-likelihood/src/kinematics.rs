//! Minimal Lorentz four-vector.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Four-momentum `(E, px, py, pz)` in GeV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FourMomentum {
    /// Energy.
    pub e: f64,
    /// x component of the momentum.
    pub px: f64,
    /// y component of the momentum.
    pub py: f64,
    /// z (beam) component of the momentum.
    pub pz: f64,
}

impl FourMomentum {
    /// Create from energy and momentum components.
    pub const fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Create from transverse momentum, pseudorapidity, azimuth and mass.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let p2 = px * px + py * py + pz * pz;
        Self::new((p2 + m * m).sqrt(), px, py, pz)
    }

    /// Create from transverse momentum, pseudorapidity, azimuth and energy.
    pub fn from_pt_eta_phi_e(pt: f64, eta: f64, phi: f64, e: f64) -> Self {
        Self::new(e, pt * phi.cos(), pt * phi.sin(), pt * eta.sinh())
    }

    /// Squared three-momentum magnitude.
    #[inline]
    pub fn p2(&self) -> f64 {
        self.px * self.px + self.py * self.py + self.pz * self.pz
    }

    /// Three-momentum magnitude.
    #[inline]
    pub fn p(&self) -> f64 {
        self.p2().sqrt()
    }

    /// Transverse momentum.
    #[inline]
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Invariant mass squared (may be negative through rounding or off-shell inputs).
    #[inline]
    pub fn m2(&self) -> f64 {
        self.e * self.e - self.p2()
    }

    /// Invariant mass; negative `m²` is reported as zero.
    #[inline]
    pub fn m(&self) -> f64 {
        self.m2().max(0.0).sqrt()
    }

    /// Pseudorapidity. Infinite for momenta along the beam.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 {
            return if self.pz >= 0.0 { f64::INFINITY } else { f64::NEG_INFINITY };
        }
        (self.pz / pt).asinh()
    }

    /// Azimuthal angle in `(-π, π]`.
    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// `sin θ` of the momentum with respect to the beam axis.
    pub fn sin_theta(&self) -> f64 {
        let p = self.p();
        if p == 0.0 { 0.0 } else { self.pt() / p }
    }

    /// Unit vector along the three-momentum, or `None` for a null momentum.
    pub fn direction(&self) -> Option<[f64; 3]> {
        let p = self.p();
        if !(p > 0.0 && p.is_finite()) {
            return None;
        }
        Some([self.px / p, self.py / p, self.pz / p])
    }
}

impl Add for FourMomentum {
    type Output = FourMomentum;

    fn add(self, o: FourMomentum) -> FourMomentum {
        FourMomentum::new(self.e + o.e, self.px + o.px, self.py + o.py, self.pz + o.pz)
    }
}

impl AddAssign for FourMomentum {
    fn add_assign(&mut self, o: FourMomentum) {
        *self = *self + o;
    }
}
