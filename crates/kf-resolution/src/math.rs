//! Small numeric helpers shared by the parametric resolution forms.

use statrs::consts::SQRT_2PI;

/// `ln(sqrt(2π))`.
pub(crate) const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Normalized Gaussian density `N(x; mu, sigma)`. Caller guarantees `sigma > 0`.
#[inline]
pub(crate) fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp() / (sigma * SQRT_2PI)
}

/// `ln N(x; mu, sigma)`, computed in log space so it stays finite far in the tails.
/// Caller guarantees `sigma > 0`.
#[inline]
pub(crate) fn normal_logpdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    -0.5 * z * z - sigma.ln() - LN_SQRT_2PI
}

/// `ln(exp(a) + exp(b))` without overflow or underflow.
#[inline]
pub(crate) fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// Unnormalized Gaussian kernel `exp(-0.5 ((x-mu)/sigma)^2)`.
#[inline]
pub(crate) fn gauss_kernel(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp()
}

/// Stable sigmoid: `1 / (1 + exp(-x))`.
#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    let e = (-x.abs()).exp();
    let recip = 1.0 / (1.0 + e);
    if x >= 0.0 { recip } else { e * recip }
}
