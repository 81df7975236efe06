//! Longitudinal neutrino momentum from a resonance-mass constraint.
//!
//! With the neutrino massless and its transverse momentum fixed to the missing-ET vector,
//! `(p_ℓ + p_ν)² = M²` is a quadratic in `p_ν,z`. Writing
//!
//! `μ = (M² - m_ℓ²)/2 + p_ℓx p_νx + p_ℓy p_νy`, `a = E_ℓ² - p_ℓz²`,
//!
//! the reduced discriminant is `D = μ² - p_νT² a` and the roots are
//! `p_νz = (μ p_ℓz ± E_ℓ √D) / a`.

use crate::event::MissingEnergy;
use crate::kinematics::FourMomentum;

/// Relative tolerance below which the discriminant counts as zero.
const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Zero, one or two real solutions for `p_νz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeutrinoSolutions {
    /// Negative discriminant.
    None,
    /// Degenerate (zero) discriminant, or the linear case of a lepton along the beam.
    One(f64),
    /// Two distinct roots, `+√D` branch first.
    Two(f64, f64),
}

impl NeutrinoSolutions {
    /// Number of real roots.
    pub fn len(&self) -> usize {
        match self {
            NeutrinoSolutions::None => 0,
            NeutrinoSolutions::One(_) => 1,
            NeutrinoSolutions::Two(..) => 2,
        }
    }

    /// True if no real root exists.
    pub fn is_empty(&self) -> bool {
        matches!(self, NeutrinoSolutions::None)
    }

    /// Roots as a vector.
    pub fn roots(&self) -> Vec<f64> {
        match *self {
            NeutrinoSolutions::None => vec![],
            NeutrinoSolutions::One(z) => vec![z],
            NeutrinoSolutions::Two(a, b) => vec![a, b],
        }
    }

    /// Tie-break used for seeding fits: the root of smallest magnitude.
    pub fn smallest_magnitude(&self) -> Option<f64> {
        match *self {
            NeutrinoSolutions::None => None,
            NeutrinoSolutions::One(z) => Some(z),
            NeutrinoSolutions::Two(a, b) => Some(if b.abs() < a.abs() { b } else { a }),
        }
    }
}

/// Solve for `p_νz` given the charged lepton, the missing-ET vector and the target mass.
///
/// `extra` (e.g. a radiated photon) is added to the lepton side before solving.
pub fn neutrino_pz_solutions(
    lepton: &FourMomentum,
    met: &MissingEnergy,
    mass: f64,
    extra: Option<&FourMomentum>,
) -> NeutrinoSolutions {
    let mut c = *lepton;
    if let Some(x) = extra {
        c += *x;
    }
    let (nx, ny) = (met.ex, met.ey);
    let nu_pt2 = nx * nx + ny * ny;

    let mu = 0.5 * (mass * mass - c.m2()) + c.px * nx + c.py * ny;
    let a = c.e * c.e - c.pz * c.pz;

    if a.abs() <= DEGENERATE_TOLERANCE * c.e * c.e {
        // Lepton along the beam: 2 μ p_ℓz z = E² p_νT² - μ² is linear in z.
        if mu == 0.0 || c.pz == 0.0 {
            return NeutrinoSolutions::None;
        }
        return NeutrinoSolutions::One((c.e * c.e * nu_pt2 - mu * mu) / (2.0 * mu * c.pz));
    }

    let disc = mu * mu - nu_pt2 * a;
    if disc.abs() <= DEGENERATE_TOLERANCE * mu * mu {
        return NeutrinoSolutions::One(mu * c.pz / a);
    }
    if disc < 0.0 {
        return NeutrinoSolutions::None;
    }
    let root = c.e * disc.sqrt();
    NeutrinoSolutions::Two((mu * c.pz + root) / a, (mu * c.pz - root) / a)
}
