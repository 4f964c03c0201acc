//! Tools for simulating quantum circuits whose wave functions are stored as
//! tree tensor product states (TPS).
//!
//! A TPS assigns one tensor to every qubit of a circuit, with bond indices
//! running along the edges of a tree-shaped *circuit topology*. Gates are
//! applied locally through a two-site cursor that can be walked along the
//! edges of the topology; every cursor move re-factors the contracted
//! two-site wave function with a singular value decomposition, truncating
//! the bond dimension as it goes.
//!
//! The building blocks live in separate modules, leaves first:
//! [`index`] defines index identities, [`tensor`] the named-index tensor
//! algebra, [`svd`] the templated decomposition, [`topology`] the circuit
//! graph, [`gate`] the operator constructors, and [`circuit`] the wave
//! function itself together with the [`overlap`][circuit::overlap]
//! evaluator.

use nalgebra as na;
use num_traits::Float;

pub mod index;
pub mod tensor;
pub mod svd;
pub mod topology;
pub mod gate;
pub mod circuit;

/// Convenience trait to identify complex number types that can be used in
/// linear-algebraic operations.
///
/// Marries [`nalgebra::ComplexField`] with [`num_traits::Float`] on the
/// associated real type, so that downstream code can rely on both interfaces
/// with a single bound.
pub trait ComplexScalar: na::ComplexField<RealField = Self::Re> + Copy {
    /// Type for associated real values.
    type Re: Float + na::RealField + Copy;
}

impl<A> ComplexScalar for A
where
    A: na::ComplexField + Copy,
    A::RealField: Float + Copy,
{
    type Re = A::RealField;
}
