//! Constructors for common one- and two-site gate tensors.
//!
//! Every constructor takes the site index (or indices) the gate acts on
//! and returns a tensor over those indices and their primed counterparts:
//! the unprimed leg contracts against the wave function's ket leg, the
//! primed leg becomes the new ket leg after application. Two-site gates
//! are rank 4 and are the valid arguments of
//! [`Circuit::apply`][crate::circuit::Circuit::apply].
//!
//! The [`Gate`] enum names the same operators by site id instead of by
//! index, for use with the cursor-routing
//! [`Circuit::apply_gate`][crate::circuit::Circuit::apply_gate].

use num_complex::Complex64 as C64;
use num_traits::One;
use crate::{ circuit::QTensor, index::Index };

/// Identity.
pub fn id(s: Index) -> QTensor {
    let mut ret = QTensor::zeros([s, s.prime()]);
    ret.set(&[(s, 0), (s.prime(), 0)], C64::one());
    ret.set(&[(s, 1), (s.prime(), 1)], C64::one());
    ret
}

/// Pauli X.
pub fn pauli_x(s: Index) -> QTensor {
    let mut ret = QTensor::zeros([s, s.prime()]);
    ret.set(&[(s, 0), (s.prime(), 1)], C64::one());
    ret.set(&[(s, 1), (s.prime(), 0)], C64::one());
    ret
}

/// Pauli Y.
pub fn pauli_y(s: Index) -> QTensor {
    let mut ret = QTensor::zeros([s, s.prime()]);
    ret.set(&[(s, 0), (s.prime(), 1)], C64::i());
    ret.set(&[(s, 1), (s.prime(), 0)], -C64::i());
    ret
}

/// Pauli Z.
pub fn pauli_z(s: Index) -> QTensor {
    let mut ret = QTensor::zeros([s, s.prime()]);
    ret.set(&[(s, 0), (s.prime(), 0)], C64::one());
    ret.set(&[(s, 1), (s.prime(), 1)], -C64::one());
    ret
}

/// Projection onto ∣0⟩, i.e. ∣0⟩⟨0∣.
pub fn proj_0(s: Index) -> QTensor {
    let mut ret = QTensor::zeros([s, s.prime()]);
    ret.set(&[(s, 0), (s.prime(), 0)], C64::one());
    ret
}

/// Projection onto ∣1⟩, i.e. ∣1⟩⟨1∣.
pub fn proj_1(s: Index) -> QTensor {
    let mut ret = QTensor::zeros([s, s.prime()]);
    ret.set(&[(s, 1), (s.prime(), 1)], C64::one());
    ret
}

/// Map from ∣0⟩ to ∣1⟩ (lowering in the computational ordering), i.e.
/// ∣1⟩⟨0∣.
pub fn proj_0_to_1(s: Index) -> QTensor {
    let mut ret = QTensor::zeros([s, s.prime()]);
    ret.set(&[(s, 0), (s.prime(), 1)], C64::one());
    ret
}

/// Map from ∣1⟩ to ∣0⟩, i.e. ∣0⟩⟨1∣.
pub fn proj_1_to_0(s: Index) -> QTensor {
    let mut ret = QTensor::zeros([s, s.prime()]);
    ret.set(&[(s, 1), (s.prime(), 0)], C64::one());
    ret
}

/// Hadamard.
pub fn hadamard(s: Index) -> QTensor {
    let h = C64::from(std::f64::consts::FRAC_1_SQRT_2);
    let mut plus = proj_0(s) + proj_0_to_1(s);
    let mut minus = proj_1(s) - proj_1_to_0(s);
    plus.scale_mut(h);
    minus.scale_mut(h);
    plus + minus
}

/// Controlled NOT; `s1` is the control.
pub fn cnot(s1: Index, s2: Index) -> QTensor {
    proj_0(s1) * id(s2) + proj_1(s1) * pauli_x(s2)
}

/// Controlled Y; `s1` is the control.
pub fn cy(s1: Index, s2: Index) -> QTensor {
    proj_0(s1) * id(s2) + proj_1(s1) * pauli_y(s2)
}

/// Controlled Z; `s1` is the control.
pub fn cz(s1: Index, s2: Index) -> QTensor {
    proj_0(s1) * id(s2) + proj_1(s1) * pauli_z(s2)
}

/// Exchange the states of two sites.
pub fn swap(s1: Index, s2: Index) -> QTensor {
    let mut ret = QTensor::zeros([s1, s1.prime(), s2, s2.prime()]);
    ret.set(&[(s1, 0), (s1.prime(), 0), (s2, 0), (s2.prime(), 0)], C64::one());
    ret.set(&[(s1, 1), (s1.prime(), 1), (s2, 1), (s2.prime(), 1)], C64::one());
    ret.set(&[(s1, 0), (s1.prime(), 1), (s2, 1), (s2.prime(), 0)], C64::one());
    ret.set(&[(s1, 1), (s1.prime(), 0), (s2, 0), (s2.prime(), 1)], C64::one());
    ret
}

/// A gate in a quantum circuit, addressed by site id.
///
/// Two-site gates hold the control site first; they can only be applied
/// across sites that are adjacent in the circuit's topology.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Gate {
    /// Identity.
    Id(usize),
    /// Pauli X.
    X(usize),
    /// Pauli Y.
    Y(usize),
    /// Pauli Z.
    Z(usize),
    /// Hadamard.
    H(usize),
    /// Controlled X.
    Cnot(usize, usize),
    /// Controlled Y.
    Cy(usize, usize),
    /// Controlled Z.
    Cz(usize, usize),
    /// Exchange the states of two neighboring sites.
    Swap(usize, usize),
}

impl Gate {
    /// Return `true` if `self` acts on a single site.
    pub fn is_one_site(&self) -> bool {
        matches!(
            self,
            Self::Id(_) | Self::X(_) | Self::Y(_) | Self::Z(_) | Self::H(_),
        )
    }

    /// Return `true` if `self` acts on two sites.
    pub fn is_two_site(&self) -> bool { !self.is_one_site() }

    /// Return the corresponding tensor operator over the given site
    /// indices.
    ///
    /// # Panics
    /// Panics if a site id held by `self` is out of range for `sites`.
    pub fn tensor(&self, sites: &[Index]) -> QTensor {
        match *self {
            Self::Id(k) => id(sites[k]),
            Self::X(k) => pauli_x(sites[k]),
            Self::Y(k) => pauli_y(sites[k]),
            Self::Z(k) => pauli_z(sites[k]),
            Self::H(k) => hadamard(sites[k]),
            Self::Cnot(k, l) => cnot(sites[k], sites[l]),
            Self::Cy(k, l) => cy(sites[k], sites[l]),
            Self::Cz(k, l) => cz(sites[k], sites[l]),
            Self::Swap(k, l) => swap(sites[k], sites[l]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn elem(t: &QTensor, s: Index, ket: usize, bra: usize) -> C64 {
        t.get(&[(s, ket), (s.prime(), bra)])
    }

    #[test]
    fn pauli_matrices() {
        let s = Index::site();
        let x = pauli_x(s);
        assert_eq!(elem(&x, s, 0, 1), C64::one());
        assert_eq!(elem(&x, s, 1, 0), C64::one());
        assert_eq!(elem(&x, s, 0, 0), C64::from(0.0));
        let y = pauli_y(s);
        assert_eq!(elem(&y, s, 0, 1), C64::i());
        assert_eq!(elem(&y, s, 1, 0), -C64::i());
        let z = pauli_z(s);
        assert_eq!(elem(&z, s, 0, 0), C64::one());
        assert_eq!(elem(&z, s, 1, 1), -C64::one());
    }

    #[test]
    fn hadamard_elements() {
        let s = Index::site();
        let h = hadamard(s);
        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert_approx_eq!(f64, elem(&h, s, 0, 0).re, r, epsilon = 1e-15);
        assert_approx_eq!(f64, elem(&h, s, 0, 1).re, r, epsilon = 1e-15);
        assert_approx_eq!(f64, elem(&h, s, 1, 0).re, -r, epsilon = 1e-15);
        assert_approx_eq!(f64, elem(&h, s, 1, 1).re, r, epsilon = 1e-15);
    }

    #[test]
    fn hadamard_is_unitary() {
        // H† H = Id on the 2x2 matrix elements
        let s = Index::site();
        let h = hadamard(s);
        for ket in 0..2 {
            for bra in 0..2 {
                let mut acc = C64::from(0.0);
                for mid in 0..2 {
                    acc += elem(&h, s, ket, mid).conj()
                        * elem(&h, s, bra, mid);
                }
                let expected = if ket == bra { 1.0 } else { 0.0 };
                assert_approx_eq!(f64, acc.re, expected, epsilon = 1e-15);
                assert_approx_eq!(f64, acc.im, 0.0, epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn cnot_permutes_basis_states() {
        let s1 = Index::site();
        let s2 = Index::site();
        let g = cnot(s1, s2);
        assert_eq!(g.rank(), 4);
        let e = |k1: usize, k2: usize, b1: usize, b2: usize| {
            g.get(&[
                (s1, k1), (s2, k2), (s1.prime(), b1), (s2.prime(), b2),
            ])
        };
        // control clear: target untouched
        assert_eq!(e(0, 0, 0, 0), C64::one());
        assert_eq!(e(0, 1, 0, 1), C64::one());
        // control set: target flipped
        assert_eq!(e(1, 0, 1, 1), C64::one());
        assert_eq!(e(1, 1, 1, 0), C64::one());
        // nothing mixes the control
        assert_eq!(e(0, 0, 1, 0), C64::from(0.0));
        assert_eq!(e(1, 0, 1, 0), C64::from(0.0));
    }

    #[test]
    fn cz_is_diagonal() {
        let s1 = Index::site();
        let s2 = Index::site();
        let g = cz(s1, s2);
        let e = |k1: usize, k2: usize| {
            g.get(&[
                (s1, k1), (s2, k2), (s1.prime(), k1), (s2.prime(), k2),
            ])
        };
        assert_eq!(e(0, 0), C64::one());
        assert_eq!(e(0, 1), C64::one());
        assert_eq!(e(1, 0), C64::one());
        assert_eq!(e(1, 1), -C64::one());
    }

    #[test]
    fn swap_exchanges_states() {
        let s1 = Index::site();
        let s2 = Index::site();
        let g = swap(s1, s2);
        assert_eq!(
            g.get(&[(s1, 0), (s2, 1), (s1.prime(), 1), (s2.prime(), 0)]),
            C64::one(),
        );
        assert_eq!(
            g.get(&[(s1, 0), (s2, 1), (s1.prime(), 0), (s2.prime(), 1)]),
            C64::from(0.0),
        );
    }

    #[test]
    fn gate_enum_delegates_to_constructors() {
        let sites = vec![Index::site(), Index::site()];
        let g = Gate::Cnot(0, 1);
        assert!(g.is_two_site());
        let t = g.tensor(&sites);
        assert_eq!(t.rank(), 4);
        let h = Gate::H(1);
        assert!(h.is_one_site());
        assert_eq!(h.tensor(&sites).rank(), 2);
    }
}
