//! The wave function of a quantum circuit, stored as a tree tensor
//! product state (TPS) and driven through a two-site cursor.
//!
//! A [`Circuit`] keeps one tensor per qubit, each carrying the qubit's
//! physical index plus one link index per edge incident on it in the
//! circuit's [topology][crate::topology]. Two adjacent sites are always
//! merged into a single two-site tensor `Psi` — the *cursor* — which is
//! where gates are applied. Moving the cursor to a neighboring site
//! re-factors `Psi` with a truncated SVD ([`Circuit::shift_to`]), so the
//! bond dimensions of the state stay bounded as gates entangle it.
//!
//! ```
//! use num_complex::Complex64 as C64;
//! use tree_tps::circuit::{ Circuit, overlap };
//! use tree_tps::gate;
//! use tree_tps::svd::SvdOpts;
//! use tree_tps::topology;
//!
//! // two qubits in |00>
//! let init = vec![(C64::from(1.0), C64::from(0.0)); 2];
//! let mut c = Circuit::new(topology::chain(2), &init, None).unwrap();
//!
//! // prepare a Bell pair
//! let (s0, s1) = (c.site(0), c.site(1));
//! c.apply(&(gate::hadamard(s0) * gate::id(s1)));
//! c.apply(&gate::cnot(s0, s1));
//!
//! // <psi|Z0 Z1|psi> = 1
//! let ops = vec![gate::pauli_z(s0), gate::pauli_z(s1)];
//! let zz = overlap(c.clone(), &ops, c, &SvdOpts::default());
//! assert!((zz.re - 1.0).abs() < 1e-10);
//! ```

use std::fmt;
use log::debug;
use num_complex::Complex64 as C64;
use num_traits::Zero;
use rand::Rng;
use thiserror::Error;
use crate::{
    gate::{ self, Gate },
    index::Index,
    svd::{ Spectrum, Svd, SvdOpts },
    tensor::{ common_index, Tensor, TensorError },
    topology::CircuitTopology,
};

/// Tensors over [`Index`] with the element type used throughout the
/// circuit layer.
pub type QTensor = Tensor<Index, C64>;

#[derive(Debug, Error)]
pub enum CircuitError {
    /// Returned when attempting to create a circuit with fewer than two
    /// sites; the cursor needs a pair to sit on.
    #[error("error in circuit creation: fewer than two sites")]
    TooFewSites,

    /// Returned when the number of initial qubit states does not match
    /// the topology.
    #[error("error in circuit creation: {0} initial qubit states for {1} sites")]
    WrongAmplitudeCount(usize, usize),

    /// Returned when the number of adopted site indices does not match
    /// the topology.
    #[error("error in circuit creation: {0} site indices for {1} sites")]
    WrongSiteIndexCount(usize, usize),

    /// Returned when an adopted site index is not two-dimensional.
    #[error("error in circuit creation: site index {0} does not have dimension 2")]
    BadSiteIndexDim(Index),

    /// Returned when a site has more than three neighbors.
    #[error("error in circuit creation: site {0} has degree {1}, max is 3")]
    DegreeTooLarge(usize, usize),

    /// Returned when the topology contains a cycle or is disconnected.
    #[error("error in circuit creation: topology is not a tree")]
    NotATree,

    /// Returned when sites 0 and 1, the initial cursor position, do not
    /// share a link.
    #[error("error in circuit creation: sites 0 and 1 are not adjacent")]
    CursorNotAdjacent,

    /// Returned when a [`Gate`] addresses a site outside the topology.
    #[error("error in gate application: site {0} is out of range")]
    GateOutOfRange(usize),

    /// Returned when a two-site [`Gate`] addresses sites that do not
    /// share a link.
    #[error("error in gate application: sites {0} and {1} are not adjacent")]
    GateNotAdjacent(usize, usize),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}
use CircuitError::*;
pub type CircuitResult<T> = Result<T, CircuitError>;

/// The result of a projective measurement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    /// ∣0⟩
    Zero = 0,
    /// ∣1⟩
    One = 1,
}

impl Outcome {
    /// Return `true` if `self` is `Zero`.
    pub fn is_zero(&self) -> bool { matches!(self, Self::Zero) }

    /// Return `true` if `self` is `One`.
    pub fn is_one(&self) -> bool { matches!(self, Self::One) }
}

impl From<Outcome> for usize {
    fn from(outcome: Outcome) -> Self { outcome as usize }
}

/// A quantum circuit wave function over a tree topology.
///
/// The state is kept in a mixed representation: every site *except* the
/// two under the cursor owns a factored tensor, while the cursor pair is
/// merged into the single tensor `Psi`. [`Self::decompose_psi`] flushes
/// `Psi` back into its two site tensors; after a flush `Psi` is stale
/// and becomes authoritative again on the next [`Self::shift_to`] or
/// [`Self::apply`].
///
/// Site indices may be shared between circuits (pass them to
/// [`Self::new`]) so that their tensors contract without renaming; the
/// [`overlap`] evaluator relies on this.
#[derive(Clone, Debug)]
pub struct Circuit {
    topology: CircuitTopology,
    // physical indices, one per site
    s: Vec<Index>,
    // link indices, one per edge; rebound every time an SVD crosses the
    // edge
    a: Vec<Index>,
    // site tensors; m[cursor.0] and m[cursor.1] are stale while psi is
    // authoritative
    m: Vec<QTensor>,
    // contracted two-site wave function at the cursor
    psi: QTensor,
    cursor: (usize, usize),
    // breadth-first site ordering rooted at 0, used by `overlap`
    order: Vec<usize>,
}

impl Circuit {
    /// Initialize a TPS wave function to a product state.
    ///
    /// Every link starts with dimension 1 and every site tensor holds the
    /// one-qubit state α∣0⟩ + β∣1⟩ given by the corresponding entry of
    /// `init`; amplitudes are taken as given and not renormalized. The
    /// cursor starts at `(0, 1)`, which requires those sites to be
    /// adjacent in `topology`.
    ///
    /// If `site_indices` is provided, the circuit adopts the given
    /// physical indices instead of creating fresh ones. This is mainly
    /// used to share physical indices among several "replica" wave
    /// functions of the same circuit, as required by [`overlap`].
    pub fn new(
        topology: CircuitTopology,
        init: &[(C64, C64)],
        site_indices: Option<Vec<Index>>,
    ) -> CircuitResult<Self> {
        let n = topology.num_bits();
        if n < 2 { return Err(TooFewSites); }
        if init.len() != n {
            return Err(WrongAmplitudeCount(init.len(), n));
        }
        if !topology.is_tree() { return Err(NotATree); }
        if let Some(site) = (0..n).find(|i| topology.degree(*i) > 3) {
            return Err(DegreeTooLarge(site, topology.degree(site)));
        }
        if !topology.are_adjacent(0, 1) { return Err(CursorNotAdjacent); }
        let s: Vec<Index> =
            match site_indices {
                Some(s) => {
                    if s.len() != n {
                        return Err(WrongSiteIndexCount(s.len(), n));
                    }
                    if let Some(idx) = s.iter().find(|idx| idx.dim() != 2) {
                        return Err(BadSiteIndexDim(*idx));
                    }
                    s
                },
                None => (0..n).map(|_| Index::site()).collect(),
            };
        let a: Vec<Index> =
            (0..topology.num_links()).map(|_| Index::link()).collect();
        let mut m: Vec<QTensor> = Vec::with_capacity(n);
        for (i, (alpha, beta)) in init.iter().enumerate() {
            let indices: Vec<Index> =
                [s[i]].into_iter()
                .chain(
                    topology.neighbors_of(i).iter().map(|nb| a[nb.link]))
                .collect();
            // links all have dimension 1, so only the site value varies
            let t =
                QTensor::new(
                    indices,
                    |pos| if pos[0] == 0 { *alpha } else { *beta },
                )?;
            m.push(t);
        }
        let cursor = (0, 1);
        let psi = m[cursor.0].clone() * m[cursor.1].clone();
        let order = topology.bfs_order(0);
        Ok(Self { topology, s, a, m, psi, cursor, order })
    }

    /// Return the number of qubits.
    pub fn size(&self) -> usize { self.topology.num_bits() }

    /// Return the circuit's topology.
    pub fn topology(&self) -> &CircuitTopology { &self.topology }

    /// Return the site tensor of site `i`.
    ///
    /// While `i` is under the cursor, the returned tensor is stale and
    /// [`Self::psi`] is authoritative for it.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn m(&self, i: usize) -> &QTensor {
        if i >= self.size() { panic!("m: site {i} is out of range"); }
        &self.m[i]
    }

    /// Return all site tensors.
    pub fn m_all(&self) -> &[QTensor] { &self.m }

    /// Return the contracted two-site wave function at the cursor.
    pub fn psi(&self) -> &QTensor { &self.psi }

    /// Return the physical index of site `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn site(&self, i: usize) -> Index {
        if i >= self.size() { panic!("site: site {i} is out of range"); }
        self.s[i]
    }

    /// Return all physical indices.
    pub fn sites(&self) -> &[Index] { &self.s }

    /// Return the cursor position.
    pub fn cursor(&self) -> (usize, usize) { self.cursor }

    // `s[site]` plus the link indices incident on `site`, except the one
    // leading to `exclude`; ordering follows the topology's neighbor
    // lists, which are stable
    fn side_template(&self, site: usize, exclude: usize) -> Vec<Index> {
        [self.s[site]].into_iter()
            .chain(
                self.topology.neighbors_of(site).iter()
                    .filter(|nb| nb.site != exclude)
                    .map(|nb| self.a[nb.link]),
            )
            .collect()
    }

    /// Decompose and truncate the wave function at the cursor position,
    /// leaving the cursor where it is.
    ///
    /// `M[first]` receives the isometry on the `first` side, `M[second]`
    /// the singular values (renormalized to unit norm) contracted with
    /// the `second`-side isometry, and the link between the two sites is
    /// rebound to the fresh bond index. After this call `Psi` is stale;
    /// it becomes authoritative again on the next [`Self::shift_to`] or
    /// [`Self::apply`].
    pub fn decompose_psi(&mut self, opts: &SvdOpts<f64>) -> Spectrum<f64> {
        let (first, second) = self.cursor;
        let link =
            self.topology.link_between(first, second)
            .expect("cursor endpoints are adjacent");
        let utemplate = self.side_template(first, second);
        let Svd { u, mut s, v, spectrum } = self.psi.svd(&utemplate, opts);
        self.a[link] =
            common_index(&u, &s)
            .expect("svd factors share exactly one bond index");
        let nrm = s.norm();
        s.scale_mut((1.0 / nrm).into());
        self.m[first] = u;
        self.m[second] = s * v;
        debug!(
            "decompose: cursor ({first},{second}), bond dim {}",
            spectrum.bond_dim(),
        );
        spectrum
    }

    /// Shift the cursor to the neighboring site `ind`.
    ///
    /// The endpoint of the cursor that `ind` is *not* adjacent to is
    /// resolved into its site tensor through an SVD truncated according
    /// to `opts`; the freed half of `Psi` is then contracted with
    /// `M[ind]` to form the new cursor tensor. The singular value tensor
    /// is renormalized, so exact (untruncated) shifts preserve the norm
    /// of the state.
    ///
    /// # Panics
    /// Panics if `ind` is already under the cursor or is not adjacent to
    /// exactly one of the cursor's endpoints.
    pub fn shift_to(&mut self, ind: usize, opts: &SvdOpts<f64>)
        -> Spectrum<f64>
    {
        let (first, second) = self.cursor;
        if ind >= self.size() {
            panic!("shift_to: site {ind} is out of range");
        }
        if ind == first || ind == second {
            panic!("shift_to: site {ind} is already under the cursor");
        }
        let link =
            self.topology.link_between(first, second)
            .expect("cursor endpoints are adjacent");
        if self.topology.are_adjacent(ind, first) {
            // advancing through `first`: fully resolve the `second` side
            // and fold the shared mass onto the new cursor tensor
            let vtemplate = self.side_template(second, first);
            let utemplate: Vec<Index> =
                self.psi.indices().iter()
                .filter(|idx| !vtemplate.contains(idx))
                .copied()
                .collect();
            let Svd { u, mut s, v, spectrum } =
                self.psi.svd(&utemplate, opts);
            self.a[link] =
                common_index(&s, &v)
                .expect("svd factors share exactly one bond index");
            let nrm = s.norm();
            s.scale_mut((1.0 / nrm).into());
            self.m[second] = v;
            self.psi = self.m[ind].clone() * u * s;
            self.cursor = (ind, first);
            debug!(
                "shift: ({first},{second}) -> ({ind},{first}), bond dim {}",
                spectrum.bond_dim(),
            );
            spectrum
        } else if self.topology.are_adjacent(ind, second) {
            // mirror image: resolve the `first` side
            let utemplate = self.side_template(first, second);
            let Svd { u, mut s, v, spectrum } =
                self.psi.svd(&utemplate, opts);
            self.a[link] =
                common_index(&u, &s)
                .expect("svd factors share exactly one bond index");
            let nrm = s.norm();
            s.scale_mut((1.0 / nrm).into());
            self.m[first] = u;
            self.psi = s * v * self.m[ind].clone();
            self.cursor = (second, ind);
            debug!(
                "shift: ({first},{second}) -> ({second},{ind}), bond dim {}",
                spectrum.bond_dim(),
            );
            spectrum
        } else {
            panic!("shift_to: site {ind} is not adjacent to the cursor");
        }
    }

    /// Apply a two-site operator at the cursor position.
    ///
    /// `op` must be rank 4 with indices exactly
    /// `{s[first], s[second], s[first]', s[second]'}`. No SVD is
    /// performed: the bond dimension internal to `Psi` grows implicitly
    /// and is re-truncated on the next [`Self::shift_to`] or
    /// [`Self::decompose_psi`].
    ///
    /// # Panics
    /// Panics if `op` is not rank 4 or does not carry exactly the cursor
    /// pair's site indices and their primes.
    pub fn apply(&mut self, op: &QTensor) {
        let (first, second) = self.cursor;
        let sf = self.s[first];
        let ss = self.s[second];
        if op.rank() != 4 {
            panic!("apply: expected a rank-4 operator, got rank {}",
                op.rank());
        }
        let expected = [sf, ss, sf.prime(), ss.prime()];
        if !expected.iter().all(|idx| op.has_index(idx)) {
            panic!("apply: operator indices do not match the cursor sites");
        }
        let mut psi =
            std::mem::replace(&mut self.psi, QTensor::new_scalar(C64::zero()));
        psi.replace_index(&sf, sf.prime())
            .expect("site indices have a fixed dimension");
        psi.replace_index(&ss, ss.prime())
            .expect("site indices have a fixed dimension");
        self.psi = op.clone() * psi;
    }

    /// Divide the wave function by its norm.
    pub fn normalize(&mut self) {
        let nrm = self.psi.norm();
        self.psi.scale_mut((1.0 / nrm).into());
    }

    /// Replace every site index, link index, and tensor of the circuit
    /// with its primed version.
    ///
    /// Used by [`overlap`] to distinguish the bra and ket copies of a
    /// state.
    pub fn prime_all(&mut self) {
        for idx in self.s.iter_mut() { *idx = idx.prime(); }
        for idx in self.a.iter_mut() { *idx = idx.prime(); }
        for t in self.m.iter_mut() { t.map_indices(|idx| idx.prime()); }
        self.psi.map_indices(|idx| idx.prime());
    }

    /// Shift the cursor through a sequence of sites, in order.
    ///
    /// # Panics
    /// Panics as [`Self::shift_to`] does if any entry breaks the walk.
    pub fn move_cursor_along(&mut self, path: &[usize], opts: &SvdOpts<f64>) {
        for &site in path { self.shift_to(site, opts); }
    }

    // walk the cursor along the unique tree path until `target` is one of
    // its endpoints
    fn route_to_site(&mut self, target: usize, opts: &SvdOpts<f64>) {
        loop {
            let (first, second) = self.cursor;
            if first == target || second == target { break; }
            let next = {
                let pf = self.topology.path(first, target);
                if pf[1] == second {
                    self.topology.path(second, target)[1]
                } else {
                    pf[1]
                }
            };
            self.shift_to(next, opts);
        }
    }

    // walk the cursor until it covers exactly the edge `(k, l)`
    fn route_to_edge(&mut self, k: usize, l: usize, opts: &SvdOpts<f64>) {
        self.route_to_site(k, opts);
        let (first, second) = self.cursor;
        if (first, second) == (k, l) || (first, second) == (l, k) {
            return;
        }
        self.shift_to(l, opts);
    }

    /// Walk the cursor to the site(s) a [`Gate`] addresses, then apply
    /// it.
    ///
    /// One-site gates are embedded as `g ⊗ Id` on whichever partner site
    /// ends up sharing the cursor. Two-site gates must address sites that
    /// are adjacent in the topology. Cursor movement truncates according
    /// to `opts`.
    pub fn apply_gate(&mut self, gate: &Gate, opts: &SvdOpts<f64>)
        -> CircuitResult<()>
    {
        match *gate {
            Gate::Cnot(k, l) | Gate::Cy(k, l) | Gate::Cz(k, l)
            | Gate::Swap(k, l) => {
                if k >= self.size() { return Err(GateOutOfRange(k)); }
                if l >= self.size() { return Err(GateOutOfRange(l)); }
                if !self.topology.are_adjacent(k, l) {
                    return Err(GateNotAdjacent(k, l));
                }
                self.route_to_edge(k, l, opts);
                let op = gate.tensor(&self.s);
                self.apply(&op);
            },
            Gate::Id(k) | Gate::X(k) | Gate::Y(k) | Gate::Z(k)
            | Gate::H(k) => {
                if k >= self.size() { return Err(GateOutOfRange(k)); }
                self.route_to_site(k, opts);
                let (first, second) = self.cursor;
                let partner = if first == k { second } else { first };
                let op = gate.tensor(&self.s) * gate::id(self.s[partner]);
                self.apply(&op);
            },
        }
        Ok(())
    }

    /// Walk the cursor to site `k` and return the probability of
    /// measuring it in ∣0⟩.
    ///
    /// # Panics
    /// Panics if `k` is out of range.
    pub fn probability_of_zero(&mut self, k: usize, opts: &SvdOpts<f64>)
        -> f64
    {
        if k >= self.size() {
            panic!("probability_of_zero: site {k} is out of range");
        }
        self.route_to_site(k, opts);
        let sk = self.s[k];
        let mut ket = self.psi.clone();
        ket.replace_index(&sk, sk.prime())
            .expect("site indices have a fixed dimension");
        let projected = gate::proj_0(sk) * ket;
        let val =
            (self.psi.conj() * projected)
            .as_scalar()
            .expect("bra and ket share all indices");
        let total = self.psi.norm();
        val.re / total.powi(2)
    }

    /// Perform a randomized projective measurement on site `k`,
    /// reporting the outcome.
    ///
    /// The cursor is walked to `k`, the state is projected onto the
    /// sampled outcome, and the wave function is renormalized.
    ///
    /// # Panics
    /// Panics if `k` is out of range.
    pub fn observe_qubit<R>(
        &mut self,
        k: usize,
        opts: &SvdOpts<f64>,
        rng: &mut R,
    ) -> Outcome
    where R: Rng + ?Sized
    {
        let p0 = self.probability_of_zero(k, opts);
        let r: f64 = rng.gen();
        let sk = self.s[k];
        let (proj, outcome) =
            if r < p0 {
                (gate::proj_0(sk), Outcome::Zero)
            } else {
                (gate::proj_1(sk), Outcome::One)
            };
        let mut psi =
            std::mem::replace(&mut self.psi, QTensor::new_scalar(C64::zero()));
        psi.replace_index(&sk, sk.prime())
            .expect("site indices have a fixed dimension");
        self.psi = proj * psi;
        self.normalize();
        debug!("measure: site {k} -> {outcome:?} (p0 = {p0})");
        outcome
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.m.iter().enumerate() {
            writeln!(f, "M[{i}] = {t}")?;
        }
        writeln!(f, "-----------")?;
        writeln!(f, "Psi = {}", self.psi)?;
        write!(f, "cursor = ({}, {})", self.cursor.0, self.cursor.1)
    }
}

/// Compute ⟨ψ₁∣O∣ψ₂⟩ for two circuits sharing site indices and a
/// per-site operator list.
///
/// `ops[i]` must be a rank-2 tensor on `{s[i], s[i]'}` (as produced by
/// the constructors in [`gate`]); the full operator is the tensor
/// product of the list. Both circuits are flushed and the second is
/// primed internally, which is why they are taken by value — callers'
/// states are never perturbed.
///
/// The contraction follows the breadth-first site ordering fixed at
/// construction, so the accumulator always shares at least one index
/// with the next site tensor.
///
/// # Panics
/// Panics if the circuits differ in size or site indices, or if the
/// operator list has the wrong length.
pub fn overlap(
    mut circuit1: Circuit,
    ops: &[QTensor],
    mut circuit2: Circuit,
    opts: &SvdOpts<f64>,
) -> C64 {
    if circuit1.size() != circuit2.size() {
        panic!("overlap: circuits differ in size");
    }
    if ops.len() != circuit1.size() {
        panic!(
            "overlap: {} operators for {} sites",
            ops.len(), circuit1.size(),
        );
    }
    if circuit1.sites() != circuit2.sites() {
        panic!("overlap: circuits do not share site indices");
    }
    circuit1.decompose_psi(opts);
    circuit2.decompose_psi(opts);
    circuit2.prime_all();

    let i0 = circuit1.order[0];
    let mut t =
        circuit1.m[i0].conj() * ops[i0].clone() * circuit2.m[i0].clone();
    for &i in circuit1.order[1..].iter() {
        t = circuit1.m[i].conj() * ops[i].clone() * t
            * circuit2.m[i].clone();
    }
    t.as_scalar().expect("overlap contraction closes to a scalar")
}
