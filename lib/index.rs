//! Index identities for the site, link, and bond degrees of freedom of a
//! tree tensor product state.
//!
//! The tensor algebra in this crate matches contractions by index
//! *identity*, not by position, so indices act as global names. An
//! [`Index`] is a value type carrying a globally unique id, a dimension, a
//! prime level, and a short tag used for printing. Two `Index`es compare
//! equal iff they descend from the same [`Index::new`] call *and* sit at
//! the same prime level; copies of an index are therefore
//! interchangeable, and sharing an index between two tensors (or two
//! circuits) is just a matter of passing the value around.

use std::{
    fmt,
    sync::atomic::{ AtomicU64, Ordering },
};
use crate::tensor::Idx;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A tensor index with global identity.
///
/// For every index there is an infinite ladder of primed versions, each
/// distinct from all others; see [`prime`][Self::prime]. Priming is used
/// to give operator tensors separate input and output legs, and to
/// distinguish the bra and ket copies of a state in an overlap.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Index {
    id: u64,
    dim: usize,
    prime: u32,
    tag: &'static str,
}

impl Index {
    /// Create a fresh index with a new identity.
    pub fn new(dim: usize, tag: &'static str) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self { id, dim, prime: 0, tag }
    }

    /// Create a fresh dimension-2 physical (on-site) index.
    pub fn site() -> Self { Self::new(2, "Site") }

    /// Create a fresh dimension-1 link (bond) index.
    pub fn link() -> Self { Self::new(1, "Link") }

    // bond indices minted by an SVD carry the link tag so that rebound
    // link slots print uniformly
    pub(crate) fn bond(dim: usize) -> Self { Self::new(dim, "Link") }

    /// Return the number of values the index can take.
    pub fn dim(&self) -> usize { self.dim }

    /// Return the prime level.
    pub fn prime_level(&self) -> u32 { self.prime }

    /// Return the printing tag.
    pub fn tag(&self) -> &'static str { self.tag }

    /// Return the index one prime level up from `self`.
    ///
    /// The result has the same identity base and dimension, but is
    /// distinct from `self` and from every other level of the ladder.
    #[must_use]
    pub fn prime(&self) -> Self { Self { prime: self.prime + 1, ..*self } }
}

impl Idx for Index {
    fn dim(&self) -> usize { self.dim }

    fn label(&self) -> String { self.to_string() }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tag, self.id)?;
        for _ in 0..self.prime { write!(f, "'")?; }
        Ok(())
    }
}
