//! Detection of permutations the likelihood cannot tell apart.
//!
//! Permutation indices are lexicographic ranks of orderings of the `n` detected jets
//! (`n!` permutations in total). Role `r` is assigned the jet at position `r`; positions
//! beyond the number of roles hold unassigned jets. Exchanging two symmetric roles maps
//! each ordering onto a partner with an identical likelihood, so an enumerator only needs
//! to evaluate one of the two.

use kf_core::{Error, Result};

/// Two roles whose exchange leaves the likelihood unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSymmetry {
    /// First role position.
    pub a: usize,
    /// Second role position.
    pub b: usize,
}

impl RoleSymmetry {
    /// Light quark 1 ↔ light quark 2 in `(b_had, b_lep, q1, q2)` role order.
    pub const LIGHT_QUARKS: RoleSymmetry = RoleSymmetry { a: 2, b: 3 };
}

/// Stateless partner lookup for one role symmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationFilter {
    symmetry: Option<RoleSymmetry>,
}

fn factorial(n: usize) -> usize {
    (1..=n).product()
}

impl PermutationFilter {
    /// Largest object count whose permutation count fits in `usize`.
    pub const MAX_OBJECTS: usize = 20;

    /// Filter for a likelihood invariant under `symmetry`.
    pub fn new(symmetry: RoleSymmetry) -> Self {
        Self { symmetry: (symmetry.a != symmetry.b).then_some(symmetry) }
    }

    /// Filter for a likelihood with no role symmetry: no permutation has a partner.
    pub fn none() -> Self {
        Self { symmetry: None }
    }

    /// Light-quark symmetry of the lepton+jets likelihood.
    pub fn light_quarks() -> Self {
        Self::new(RoleSymmetry::LIGHT_QUARKS)
    }

    /// The symmetry, if any.
    pub fn symmetry(&self) -> Option<RoleSymmetry> {
        self.symmetry
    }

    /// Number of objects `n` with `n! == total`.
    pub fn n_objects_for(total: usize) -> Result<usize> {
        let mut f = 1usize;
        for n in 1..=Self::MAX_OBJECTS {
            f *= n;
            if f == total {
                return Ok(n);
            }
            if f > total {
                break;
            }
        }
        Err(Error::Validation(format!(
            "permutation count {total} is not n! for any n <= {}",
            Self::MAX_OBJECTS
        )))
    }

    /// Ordering with lexicographic rank `index` among the permutations of `0..n`.
    pub fn permutation_at(index: usize, n: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let mut rest = index;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let f = factorial(n - 1 - i);
            let k = (rest / f).min(pool.len() - 1);
            rest %= f;
            out.push(pool.remove(k));
        }
        out
    }

    /// Lexicographic rank of `ordering` (a permutation of `0..n`).
    pub fn rank_of(ordering: &[usize]) -> usize {
        let n = ordering.len();
        let mut rank = 0;
        for i in 0..n {
            let smaller_later = ordering[i + 1..].iter().filter(|&&x| x < ordering[i]).count();
            rank += smaller_later * factorial(n - 1 - i);
        }
        rank
    }

    /// Index of the permutation with the symmetric roles exchanged.
    ///
    /// Returns `Ok(None)` when the filter has no symmetry. Fails if `total` is not a
    /// factorial, `index >= total`, or the symmetric roles exceed the object count.
    pub fn partner_of(&self, index: usize, total: usize) -> Result<Option<usize>> {
        let n = Self::n_objects_for(total)?;
        if index >= total {
            return Err(Error::Validation(format!("permutation index {index} out of range 0..{total}")));
        }
        let Some(RoleSymmetry { a, b }) = self.symmetry else {
            return Ok(None);
        };
        if a >= n || b >= n {
            return Err(Error::Validation(format!(
                "roles ({a}, {b}) need at least {} objects, permutation count implies {n}",
                a.max(b) + 1
            )));
        }
        let mut ordering = Self::permutation_at(index, n);
        ordering.swap(a, b);
        Ok(Some(Self::rank_of(&ordering)))
    }

    /// Whether `index` is the representative (lower index) of its partner pair.
    pub fn is_canonical(&self, index: usize, total: usize) -> Result<bool> {
        Ok(match self.partner_of(index, total)? {
            Some(p) => index < p,
            None => true,
        })
    }

    /// Representatives of every partner pair, ascending.
    pub fn canonical_indices(&self, total: usize) -> Result<Vec<usize>> {
        let mut out = Vec::with_capacity(total);
        for i in 0..total {
            if self.is_canonical(i, total)? {
                out.push(i);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_unrank() {
        for n in 1..=5 {
            let total = factorial(n);
            for i in 0..total {
                let p = PermutationFilter::permutation_at(i, n);
                assert_eq!(PermutationFilter::rank_of(&p), i);
            }
        }
        assert_eq!(PermutationFilter::permutation_at(0, 4), vec![0, 1, 2, 3]);
        assert_eq!(PermutationFilter::permutation_at(23, 4), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_four_jets_partner_is_adjacent() {
        let f = PermutationFilter::light_quarks();
        for i in 0..24 {
            let p = f.partner_of(i, 24).unwrap().unwrap();
            assert_eq!(p, i ^ 1);
            assert_ne!(p, i);
            assert_eq!(f.partner_of(p, 24).unwrap(), Some(i));
        }
        assert_eq!(f.canonical_indices(24).unwrap().len(), 12);
    }

    #[test]
    fn test_five_jets_involution() {
        let f = PermutationFilter::light_quarks();
        for i in 0..120 {
            let p = f.partner_of(i, 120).unwrap().unwrap();
            assert_ne!(p, i);
            assert_eq!(f.partner_of(p, 120).unwrap(), Some(i));
            let (oi, op) = (PermutationFilter::permutation_at(i, 5), PermutationFilter::permutation_at(p, 5));
            assert_eq!((oi[0], oi[1], oi[4]), (op[0], op[1], op[4]));
            assert_eq!((oi[2], oi[3]), (op[3], op[2]));
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let f = PermutationFilter::light_quarks();
        assert!(f.partner_of(0, 25).is_err());
        assert!(f.partner_of(24, 24).is_err());
        // 3 jets cannot fill role 3.
        assert!(f.partner_of(0, 6).is_err());
        assert_eq!(PermutationFilter::none().partner_of(5, 24).unwrap(), None);
        assert!(PermutationFilter::none().is_canonical(5, 24).unwrap());
        assert_eq!(PermutationFilter::new(RoleSymmetry { a: 1, b: 1 }).symmetry(), None);
    }
}
