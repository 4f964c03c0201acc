//! Templated singular value decomposition with bond truncation.
//!
//! [`Tensor::svd`] factors a tensor into *U* · *S* · *V* along a caller
//! chosen index partition: the *row template* lists the indices that stay
//! on the *U* side, everything else goes to *V*. Two fresh bond
//! [`Index`]es are minted for the factorization, one between *U* and *S*
//! and one between *S* and *V*, both sized to the number of singular
//! values kept under the truncation parameters.
//!
//! Truncation discards trailing singular values that fall below a cutoff
//! relative to the spectrum's norm, and optionally caps the number kept.
//! The discarded weight is reported through a [`Spectrum`].

use log::trace;
use nalgebra as na;
use num_traits::{ Float, One, Zero };
use crate::{
    ComplexScalar,
    index::Index,
    tensor::Tensor,
};

/// Truncation parameters for [`Tensor::svd`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SvdOpts<R> {
    /// Threshold below which normalized singular values are discarded.
    /// At least one singular value is always kept.
    pub cutoff: R,
    /// Hard cap on the number of singular values kept.
    pub max_dim: Option<usize>,
}

impl<R: Float> Default for SvdOpts<R> {
    /// Square of machine epsilon as the cutoff, no cap.
    fn default() -> Self {
        Self { cutoff: Float::powi(R::epsilon(), 2), max_dim: None }
    }
}

impl<R: Float> SvdOpts<R> {
    /// Truncation by cutoff alone.
    pub fn cutoff(cutoff: R) -> Self { Self { cutoff, max_dim: None } }

    /// Add a cap on the number of singular values kept.
    pub fn with_max_dim(mut self, max_dim: usize) -> Self {
        self.max_dim = Some(max_dim);
        self
    }
}

/// Report on the singular value spectrum retained by a decomposition.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum<R> {
    probs: Vec<R>,
    truncated_weight: R,
}

impl<R: Float> Spectrum<R> {
    /// Return the number of singular values kept.
    pub fn bond_dim(&self) -> usize { self.probs.len() }

    /// Return the kept squared singular values, normalized against the
    /// full spectrum, in decreasing order.
    pub fn probs(&self) -> &[R] { &self.probs }

    /// Return the total squared weight of the discarded singular values,
    /// relative to the full spectrum.
    pub fn truncated_weight(&self) -> R { self.truncated_weight }

    /// Return the von Neumann entropy of the kept spectrum,
    ///
    /// *S*<sub>vN</sub> = -Σ<sub>*k*</sub> *p*<sub>*k*</sub> ln *p*<sub>*k*</sub>
    pub fn entropy_vn(&self) -> R {
        self.probs.iter().copied()
            .filter(|p| *p > R::zero())
            .map(|p| -p * Float::ln(p))
            .fold(R::zero(), |acc, x| acc + x)
    }
}

/// Output of [`Tensor::svd`].
///
/// `u` carries the row-template indices plus a fresh bond index shared
/// with `s`; `v` carries a second fresh bond index shared with `s` plus
/// all remaining indices. `s` is diagonal on the two bond indices and
/// holds the kept singular values unnormalized.
#[derive(Clone, Debug, PartialEq)]
pub struct Svd<A: ComplexScalar> {
    pub u: Tensor<Index, A>,
    pub s: Tensor<Index, A>,
    pub v: Tensor<Index, A>,
    pub spectrum: Spectrum<A::Re>,
}

impl<A: ComplexScalar> Tensor<Index, A> {
    /// Factor `self` into *U* · *S* · *V* with the indices in `row`
    /// staying on the *U* side, truncating the singular value spectrum
    /// according to `opts`.
    ///
    /// The indices not named in `row` keep their stored order on the *V*
    /// side. `self` is consumed logically but not mutated; the factors
    /// are fresh tensors.
    ///
    /// # Panics
    /// Panics if `row` names an index not held by `self`, or on SVD
    /// non-convergence inside the linear algebra kernel.
    pub fn svd(&self, row: &[Index], opts: &SvdOpts<A::Re>) -> Svd<A> {
        for idx in row {
            if !self.has_index(idx) {
                panic!("svd: template index {} is not in the tensor", idx);
            }
        }
        let col: Vec<Index> =
            self.indices().iter()
            .filter(|idx| !row.contains(idx))
            .copied()
            .collect();
        let m: usize = row.iter().map(|idx| idx.dim()).product();
        let n: usize = col.iter().map(|idx| idx.dim()).product();
        let order: Vec<Index> =
            row.iter().copied().chain(col.iter().copied()).collect();
        let (_, flat) = self.clone().into_ordered(&order).into_flat();
        let q = flat.reshape_generic(na::Dyn(m), na::Dyn(n));

        let na::SVD { u: Some(u), v_t: Some(v_t), singular_values: sig } =
            q.svd(true, true)
            else { unreachable!() };

        // singular values come out in decreasing order; truncate trailing
        // values below the cutoff relative to the spectrum norm
        let total: A::Re =
            sig.iter()
            .map(|sj| Float::powi(*sj, 2))
            .fold(A::Re::zero(), |acc, x| acc + x);
        let norm = Float::sqrt(total);
        let mut rank: usize =
            sig.iter()
            .take_while(|sj| {
                Float::is_normal(**sj) && **sj / norm > opts.cutoff
            })
            .count()
            .max(1);
        if let Some(max_dim) = opts.max_dim {
            rank = rank.min(max_dim.max(1));
        }
        rank = rank.min(sig.len());
        let probs: Vec<A::Re> =
            sig.iter().take(rank)
            .map(|sj| Float::powi(*sj, 2) / total)
            .collect();
        let kept: A::Re =
            probs.iter().fold(A::Re::zero(), |acc, x| acc + *x);
        let truncated_weight =
            Float::max(A::Re::zero(), A::Re::one() - kept);
        let spectrum = Spectrum { probs, truncated_weight };
        trace!(
            "svd: kept {} of {} singular values, truncated weight {}",
            rank,
            sig.len(),
            truncated_weight,
        );

        let ubond = Index::bond(rank);
        let vbond = Index::bond(rank);
        let u_data =
            u.columns(0, rank)
            .into_owned()
            .reshape_generic(na::Dyn(m * rank), na::Const::<1>);
        let u_indices: Vec<Index> =
            row.iter().copied().chain([ubond]).collect();
        let u = Tensor::from_parts(u_indices, u_data);
        let s =
            match Tensor::new([ubond, vbond], |pos| {
                if pos[0] == pos[1] {
                    A::from_real(sig[pos[0]])
                } else {
                    A::zero()
                }
            }) {
                Ok(t) => t,
                Err(err) => panic!("{}", err),
            };
        let v_data =
            v_t.rows(0, rank)
            .into_owned()
            .reshape_generic(na::Dyn(rank * n), na::Const::<1>);
        let v_indices: Vec<Index> = [vbond].into_iter().chain(col).collect();
        let v = Tensor::from_parts(v_indices, v_data);

        Svd { u, s, v, spectrum }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use num_complex::Complex64 as C64;
    use crate::tensor::common_index;

    type TestTensor = Tensor<Index, C64>;

    #[test]
    fn factors_reconstruct_the_original() {
        let i = Index::new(2, "i");
        let j = Index::new(3, "j");
        let k = Index::new(2, "k");
        let t: TestTensor =
            Tensor::new([i, j, k], |p| {
                C64::new(
                    (p[0] * 6 + p[1] * 2 + p[2]) as f64,
                    (p[0] as f64) - (p[2] as f64),
                )
            })
            .unwrap();
        let Svd { u, s, v, spectrum } = t.svd(&[i, k], &SvdOpts::default());
        assert!(u.has_index(&i));
        assert!(u.has_index(&k));
        assert!(v.has_index(&j));
        assert!(common_index(&u, &s).is_some());
        assert!(common_index(&s, &v).is_some());
        assert!(spectrum.truncated_weight() < 1e-14);
        let recon = u * s * v;
        let diff = recon - t;
        assert_approx_eq!(f64, diff.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn product_state_has_unit_bond_dim() {
        let i = Index::new(2, "i");
        let j = Index::new(2, "j");
        // |00> as a rank-2 tensor: exactly one nonzero singular value
        let mut t: TestTensor = Tensor::zeros([i, j]);
        t.set(&[(i, 0), (j, 0)], C64::from(1.0));
        let Svd { s, spectrum, .. } = t.svd(&[i], &SvdOpts::cutoff(1e-12));
        assert_eq!(spectrum.bond_dim(), 1);
        assert_eq!(s.shape(), vec![1, 1]);
        assert_approx_eq!(f64, spectrum.probs()[0], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn max_dim_caps_the_rank() {
        let i = Index::new(4, "i");
        let j = Index::new(4, "j");
        // full-rank diagonal
        let t: TestTensor =
            Tensor::new([i, j], |p| {
                if p[0] == p[1] {
                    C64::from(1.0 + p[0] as f64)
                } else {
                    C64::from(0.0)
                }
            })
            .unwrap();
        let opts = SvdOpts::cutoff(1e-12).with_max_dim(2);
        let Svd { spectrum, .. } = t.svd(&[i], &opts);
        assert_eq!(spectrum.bond_dim(), 2);
        assert!(spectrum.truncated_weight() > 0.0);
    }

    #[test]
    fn single_index_template_still_factors() {
        let i = Index::new(2, "i");
        let j = Index::new(2, "j");
        let t: TestTensor =
            Tensor::new([i, j], |p| C64::from((1 + p[0] + 2 * p[1]) as f64))
            .unwrap();
        let Svd { u, s, v, .. } = t.clone().svd(&[i], &SvdOpts::default());
        assert_eq!(u.rank(), 2);
        let recon = u * s * v;
        let diff = recon - t;
        assert_approx_eq!(f64, diff.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn entangled_pair_splits_evenly() {
        let i = Index::new(2, "i");
        let j = Index::new(2, "j");
        // (|00> + |11>)/sqrt(2)
        let r = std::f64::consts::FRAC_1_SQRT_2;
        let mut t: TestTensor = Tensor::zeros([i, j]);
        t.set(&[(i, 0), (j, 0)], C64::from(r));
        t.set(&[(i, 1), (j, 1)], C64::from(r));
        let Svd { spectrum, .. } = t.svd(&[i], &SvdOpts::cutoff(1e-12));
        assert_eq!(spectrum.bond_dim(), 2);
        assert_approx_eq!(f64, spectrum.probs()[0], 0.5, epsilon = 1e-14);
        assert_approx_eq!(f64, spectrum.probs()[1], 0.5, epsilon = 1e-14);
        assert_approx_eq!(
            f64,
            spectrum.entropy_vn(),
            std::f64::consts::LN_2,
            epsilon = 1e-12
        );
    }
}
