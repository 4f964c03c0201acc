//! A dense array of complex amplitudes whose shape is determined by a set
//! of named indices.
//!
//! A [`Tensor`] is the multi-linear generalization of vectors and
//! matrices: a collection of numbers accessed by supplying one value per
//! index. Contraction is driven entirely by index *identity* — the binary
//! product sums over every index the two operands share and leaves all
//! others untouched, falling back to an ordinary tensor product when
//! nothing is shared.
//!
//! ```
//! use tree_tps::index::Index;
//! use tree_tps::tensor::Tensor;
//! use num_complex::Complex64 as C64;
//!
//! let i = Index::new(3, "i");
//! let j = Index::new(4, "j");
//! let k = Index::new(5, "k");
//!
//! let a: Tensor<Index, C64> = Tensor::new([i, j], |_| C64::from(1.0)).unwrap();
//! let b: Tensor<Index, C64> = Tensor::new([j, k], |_| C64::from(2.0)).unwrap();
//!
//! let c = a * b; // C_{i,k} = Σ_j A_{i,j} B_{j,k}
//! assert_eq!(c.indices(), &[i, k]);
//! assert_eq!(c.get(&[(i, 0), (k, 0)]), C64::from(8.0));
//! ```
//!
//! Elements are stored flat, first index fastest; all reorderings needed
//! for contraction and factorization happen internally.

use std::fmt;
use itertools::Itertools;
use nalgebra as na;
use num_traits::Zero;
use thiserror::Error;
use crate::ComplexScalar;

#[derive(Debug, Error)]
pub enum TensorError {
    /// Returned when attempting to create a new tensor with duplicate
    /// indices.
    #[error("error in tensor creation: duplicate indices")]
    DuplicateIndices,

    /// Returned when attempting to create a new tensor with at least one
    /// index that has zero dimension.
    #[error("error in tensor creation: encountered a zero-dimensional index")]
    ZeroDimIndex,

    /// Returned when a tensor add is attempted between two tensors with
    /// non-matching index sets.
    #[error("error in tensor add: non-matching indices")]
    IncompatibleIndicesAdd,

    /// Returned when a tensor sub is attempted between two tensors with
    /// non-matching index sets.
    #[error("error in tensor sub: non-matching indices")]
    IncompatibleIndicesSub,

    /// Returned when an index is rebound to a replacement of a different
    /// dimension.
    #[error("error in index replacement: dimension mismatch")]
    ReplacementDimMismatch,

    /// Returned when an index replacement would duplicate an index already
    /// held by the tensor.
    #[error("error in index replacement: replacement already present")]
    ReplacementDuplicate,
}
use TensorError::*;
pub type TensorResult<T> = Result<T, TensorError>;

/// Describes a tensor index.
///
/// The tensor algebra only needs to know an index's dimension and how to
/// print it; identity is whatever the implementing type's `PartialEq`
/// says it is. The circuit layer uses [`Index`][crate::index::Index],
/// whose identity is a globally unique id plus a prime level.
pub trait Idx: Clone + PartialEq + fmt::Debug {
    /// Return the number of values the index can take.
    ///
    /// This value must never be zero.
    fn dim(&self) -> usize;

    /// Return an identifying label for the index. This method is used
    /// only for printing purposes.
    ///
    /// The default implementation renders `self` using `Debug`.
    fn label(&self) -> String { format!("{self:?}") }
}

// advance a multi-index one step, first position fastest
fn inc<T: Idx>(pos: &mut [usize], indices: &[T]) {
    for (p, idx) in pos.iter_mut().zip(indices) {
        *p += 1;
        if *p < idx.dim() { return; }
        *p = 0;
    }
}

fn is_unique<T: PartialEq>(elems: &[T]) -> bool {
    elems.iter().enumerate()
        .all(|(k, e0)| elems[k + 1..].iter().all(|e1| e0 != e1))
}

fn total_dim<T: Idx>(indices: &[T]) -> usize {
    indices.iter().map(Idx::dim).product()
}

// stride of `target` in a first-index-fastest layout
fn stride_of<T: Idx>(indices: &[T], target: &T) -> usize {
    let mut stride = 1;
    for idx in indices {
        if idx == target { return stride; }
        stride *= idx.dim();
    }
    panic!("stride_of: index {} is not in the tensor", target.label());
}

/// Basic implementation of an abstract tensor object.
///
/// A `Tensor<T, A>` consists of a series of *unique* indices belonging to
/// a type `T` implementing [`Idx`] and one numerical quantity of type `A`
/// per joint index value. A tensor with no indices is a scalar holding
/// exactly one value.
///
/// Multiplication greedily contracts over all matching indices, resorting
/// to an ordinary tensor product when the operands have none in common.
/// Addition and subtraction require equal index *sets*; the order in
/// which the indices are stored does not matter.
///
/// Note that equality between `Tensor`s depends on inner structure: for
/// two `Tensor`s to be equal, their indices must be equal *and in the
/// same storage order*, in addition to naive pairwise equality between
/// elements.
#[derive(Clone, Debug)]
pub struct Tensor<T, A> {
    indices: Vec<T>,
    data: na::DVector<A>,
}

impl<T, A> PartialEq for Tensor<T, A>
where
    T: PartialEq,
    A: na::Scalar,
{
    fn eq(&self, other: &Self) -> bool {
        self.indices == other.indices && self.data == other.data
    }
}

impl<T, A> Tensor<T, A>
where
    T: Idx,
    A: ComplexScalar,
{
    /// Create a new tensor using a function over index values.
    ///
    /// The function receives one value per index, in the order the
    /// indices were given. Fails if duplicate or zero-dimensional indices
    /// are provided.
    pub fn new<I, F>(indices: I, mut elems: F) -> TensorResult<Self>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&[usize]) -> A,
    {
        let indices: Vec<T> = indices.into_iter().collect();
        if !is_unique(&indices) { return Err(DuplicateIndices); }
        if indices.iter().any(|idx| idx.dim() == 0) {
            return Err(ZeroDimIndex);
        }
        let len = total_dim(&indices);
        let mut pos = vec![0_usize; indices.len()];
        let data =
            na::DVector::from_iterator(
                len,
                (0..len).map(|k| {
                    if k > 0 { inc(&mut pos, &indices); }
                    elems(&pos)
                }),
            );
        Ok(Self { indices, data })
    }

    /// Create a new tensor with all elements set to zero.
    ///
    /// # Panics
    /// Panics on duplicate or zero-dimensional indices; use [`Self::new`]
    /// to handle those conditions as errors.
    pub fn zeros<I>(indices: I) -> Self
    where I: IntoIterator<Item = T>
    {
        match Self::new(indices, |_| A::zero()) {
            Ok(t) => t,
            Err(err) => panic!("{}", err),
        }
    }

    /// Create a new rank-0 (scalar) tensor.
    pub fn new_scalar(val: A) -> Self {
        Self { indices: Vec::new(), data: na::DVector::from_element(1, val) }
    }

    pub(crate) fn from_parts(indices: Vec<T>, data: na::DVector<A>) -> Self {
        debug_assert_eq!(total_dim(&indices), data.len());
        Self { indices, data }
    }

    /// Return the rank (i.e. the number of indices) of `self`.
    pub fn rank(&self) -> usize { self.indices.len() }

    /// Return `true` if `self` has rank 0.
    pub fn is_scalar(&self) -> bool { self.indices.is_empty() }

    /// Return the scalar value of `self`, if `self` has rank 0.
    pub fn as_scalar(&self) -> Option<A> {
        self.is_scalar().then(|| self.data[0])
    }

    /// Return the shape (dimensions of each index) of `self` in a vector.
    pub fn shape(&self) -> Vec<usize> {
        self.indices.iter().map(Idx::dim).collect()
    }

    /// Return the indices of `self`, in storage order.
    pub fn indices(&self) -> &[T] { &self.indices }

    /// Return `true` if `self` has the given index.
    pub fn has_index(&self, index: &T) -> bool {
        self.indices.contains(index)
    }

    // flat storage position of a full set of index assignments
    fn flat_pos(&self, at: &[(T, usize)]) -> usize {
        if at.len() != self.indices.len() {
            panic!(
                "element access: expected {} index assignments, got {}",
                self.indices.len(), at.len(),
            );
        }
        let mut k = 0;
        let mut stride = 1;
        for idx in self.indices.iter() {
            let (_, v) =
                at.iter().find(|(target, _)| target == idx)
                .unwrap_or_else(|| panic!(
                    "element access: missing assignment for index {}",
                    idx.label(),
                ));
            if *v >= idx.dim() {
                panic!(
                    "element access: value {} out of range for index {}",
                    v, idx.label(),
                );
            }
            k += v * stride;
            stride *= idx.dim();
        }
        k
    }

    /// Return a single element by a full set of index assignments.
    ///
    /// # Panics
    /// Panics if the assignments do not cover the tensor's indices
    /// exactly, or if a value is out of range.
    pub fn get(&self, at: &[(T, usize)]) -> A { self.data[self.flat_pos(at)] }

    /// Assign a single element by a full set of index assignments.
    ///
    /// # Panics
    /// Panics if the assignments do not cover the tensor's indices
    /// exactly, or if a value is out of range.
    pub fn set(&mut self, at: &[(T, usize)], val: A) {
        let k = self.flat_pos(at);
        self.data[k] = val;
    }

    // copy of `self` with its indices stored in the given order, which
    // must be a permutation of the current ones
    fn permuted(&self, order: &[T]) -> Self {
        debug_assert_eq!(order.len(), self.indices.len());
        let old_strides: Vec<usize> =
            order.iter().map(|idx| stride_of(&self.indices, idx)).collect();
        let len = self.data.len();
        let mut pos = vec![0_usize; order.len()];
        let data =
            na::DVector::from_iterator(
                len,
                (0..len).map(|k| {
                    if k > 0 { inc(&mut pos, order); }
                    let old: usize =
                        pos.iter().zip(&old_strides)
                        .map(|(p, s)| p * s)
                        .sum();
                    self.data[old]
                }),
            );
        Self { indices: order.to_vec(), data }
    }

    pub(crate) fn into_ordered(self, order: &[T]) -> Self {
        if self.indices == order { self } else { self.permuted(order) }
    }

    pub(crate) fn into_flat(self) -> (Vec<T>, na::DVector<A>) {
        (self.indices, self.data)
    }

    /// Multiply `self` with `other`, consuming both. All common indices
    /// are contracted; if no common indices exist, this is equivalent to
    /// an ordinary tensor product.
    ///
    /// The result carries all non-common indices of `self` followed by
    /// those of `other`. This operation is used by the `*` operator.
    pub fn multiply(self, other: Self) -> Self {
        let common: Vec<T> =
            self.indices.iter()
            .filter(|idx| other.has_index(idx))
            .cloned()
            .collect();
        let keep_a: Vec<T> =
            self.indices.iter()
            .filter(|idx| !common.contains(idx))
            .cloned()
            .collect();
        let keep_b: Vec<T> =
            other.indices.iter()
            .filter(|idx| !common.contains(idx))
            .cloned()
            .collect();
        let m = total_dim(&keep_a);
        let d = total_dim(&common);
        let n = total_dim(&keep_b);
        let order_a: Vec<T> =
            keep_a.iter().cloned().chain(common.iter().cloned()).collect();
        let order_b: Vec<T> =
            common.into_iter().chain(keep_b.iter().cloned()).collect();
        let a =
            self.into_ordered(&order_a).data
            .reshape_generic(na::Dyn(m), na::Dyn(d));
        let b =
            other.into_ordered(&order_b).data
            .reshape_generic(na::Dyn(d), na::Dyn(n));
        let c = a * b;
        let data = c.reshape_generic(na::Dyn(m * n), na::Const::<1>);
        let indices: Vec<T> = keep_a.into_iter().chain(keep_b).collect();
        Self { indices, data }
    }

    /// Compute the sum of `self` and `other`, consuming both.
    ///
    /// Fails if either tensor holds an index not held by the other.
    ///
    /// This operation is used by the `+` operator.
    pub fn add_checked(self, other: Self) -> TensorResult<Self> {
        if self.rank() != other.rank()
            || !self.indices.iter().all(|idx| other.has_index(idx))
        {
            return Err(IncompatibleIndicesAdd);
        }
        let rhs = other.into_ordered(&self.indices);
        Ok(Self { data: self.data + rhs.data, indices: self.indices })
    }

    /// Compute the difference of `self` and `other`, consuming both.
    ///
    /// Fails if either tensor holds an index not held by the other.
    ///
    /// This operation is used by the `-` operator.
    pub fn sub_checked(self, other: Self) -> TensorResult<Self> {
        if self.rank() != other.rank()
            || !self.indices.iter().all(|idx| other.has_index(idx))
        {
            return Err(IncompatibleIndicesSub);
        }
        let rhs = other.into_ordered(&self.indices);
        Ok(Self { data: self.data - rhs.data, indices: self.indices })
    }

    /// Return a new tensor containing the element-wise complex
    /// conjugation of `self`.
    pub fn conj(&self) -> Self {
        Self {
            indices: self.indices.clone(),
            data: self.data.map(|a| a.conjugate()),
        }
    }

    /// Return the Frobenius norm of `self`.
    pub fn norm(&self) -> A::Re { self.data.norm() }

    /// Multiply every element of `self` by a scalar in place.
    pub fn scale_mut(&mut self, factor: A) { self.data *= factor; }

    /// Rebind a single index identity, leaving the data untouched.
    ///
    /// Fails if the replacement's dimension differs from the original's
    /// or if the replacement is already held by the tensor. Does nothing
    /// if `old` is not held by the tensor.
    pub fn replace_index(&mut self, old: &T, new: T) -> TensorResult<()> {
        let Some(k) = self.indices.iter().position(|idx| idx == old)
            else { return Ok(()); };
        if new.dim() != self.indices[k].dim() {
            return Err(ReplacementDimMismatch);
        }
        if new != *old && self.has_index(&new) {
            return Err(ReplacementDuplicate);
        }
        self.indices[k] = new;
        Ok(())
    }

    /// Rebind every index identity through a mapping function, leaving
    /// the data untouched.
    ///
    /// # Panics
    /// Panics if the mapping changes any index's dimension.
    pub fn map_indices<F>(&mut self, mut f: F)
    where F: FnMut(&T) -> T
    {
        for idx in self.indices.iter_mut() {
            let new = f(idx);
            if new.dim() != idx.dim() {
                panic!(
                    "map_indices: the dimension of {} changed",
                    idx.label(),
                );
            }
            *idx = new;
        }
    }
}

/// Return the unique index shared by `a` and `b`.
///
/// Returns `None` if the tensors share no index, or more than one.
pub fn common_index<T, A>(a: &Tensor<T, A>, b: &Tensor<T, A>) -> Option<T>
where T: Idx, A: ComplexScalar
{
    a.indices.iter()
        .filter(|idx| b.has_index(idx))
        .exactly_one()
        .ok()
        .cloned()
}

impl<T, A> std::ops::Mul<Tensor<T, A>> for Tensor<T, A>
where
    T: Idx,
    A: ComplexScalar,
{
    type Output = Tensor<T, A>;

    fn mul(self, other: Tensor<T, A>) -> Self::Output {
        self.multiply(other)
    }
}

impl<T, A> std::ops::Add<Tensor<T, A>> for Tensor<T, A>
where
    T: Idx,
    A: ComplexScalar,
{
    type Output = Tensor<T, A>;

    fn add(self, other: Tensor<T, A>) -> Self::Output {
        match self.add_checked(other) {
            Ok(res) => res,
            Err(err) => panic!("{}", err),
        }
    }
}

impl<T, A> std::ops::Sub<Tensor<T, A>> for Tensor<T, A>
where
    T: Idx,
    A: ComplexScalar,
{
    type Output = Tensor<T, A>;

    fn sub(self, other: Tensor<T, A>) -> Self::Output {
        match self.sub_checked(other) {
            Ok(res) => res,
            Err(err) => panic!("{}", err),
        }
    }
}

impl<T, A> fmt::Display for Tensor<T, A>
where
    T: Idx,
    A: na::Scalar + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        let n_idxs = self.indices.len();
        for (k, idx) in self.indices.iter().enumerate() {
            write!(f, "{}", idx.label())?;
            if k < n_idxs - 1 { write!(f, ", ")?; }
        }
        write!(f, " }} [")?;
        let len = self.data.len();
        for (k, a) in self.data.iter().enumerate() {
            write!(f, "{}", a)?;
            if k < len - 1 { write!(f, ", ")?; }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use num_complex::Complex64 as C64;
    use crate::index::Index;

    type TestTensor = Tensor<Index, C64>;

    fn c(re: f64) -> C64 { C64::from(re) }

    #[test]
    fn construction_and_element_access() {
        let i = Index::new(2, "i");
        let j = Index::new(3, "j");
        let mut t: TestTensor =
            Tensor::new([i, j], |pos| c((pos[0] + 10 * pos[1]) as f64))
            .unwrap();
        assert_eq!(t.rank(), 2);
        assert_eq!(t.shape(), vec![2, 3]);
        assert_eq!(t.get(&[(i, 1), (j, 2)]), c(21.0));
        // assignment order doesn't matter
        assert_eq!(t.get(&[(j, 2), (i, 1)]), c(21.0));
        t.set(&[(i, 0), (j, 1)], c(-1.0));
        assert_eq!(t.get(&[(i, 0), (j, 1)]), c(-1.0));
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let i = Index::new(2, "i");
        let res: TensorResult<TestTensor> = Tensor::new([i, i], |_| c(0.0));
        assert!(matches!(res, Err(TensorError::DuplicateIndices)));
    }

    #[test]
    fn contraction_matches_matrix_product() {
        let i = Index::new(2, "i");
        let j = Index::new(2, "j");
        let k = Index::new(2, "k");
        // A = [[1, 2], [3, 4]], B = [[5, 6], [7, 8]] (row = first index)
        let a: TestTensor =
            Tensor::new([i, j], |p| c((1 + 2 * p[0] + p[1]) as f64)).unwrap();
        let b: TestTensor =
            Tensor::new([j, k], |p| c((5 + 2 * p[0] + p[1]) as f64)).unwrap();
        let prod = a * b;
        assert_eq!(prod.indices(), &[i, k]);
        assert_eq!(prod.get(&[(i, 0), (k, 0)]), c(19.0));
        assert_eq!(prod.get(&[(i, 0), (k, 1)]), c(22.0));
        assert_eq!(prod.get(&[(i, 1), (k, 0)]), c(43.0));
        assert_eq!(prod.get(&[(i, 1), (k, 1)]), c(50.0));
    }

    #[test]
    fn contraction_is_order_independent() {
        let i = Index::new(2, "i");
        let j = Index::new(3, "j");
        let k = Index::new(2, "k");
        let a: TestTensor =
            Tensor::new([i, j], |p| c((p[0] * 3 + p[1]) as f64 + 1.0))
            .unwrap();
        let b: TestTensor =
            Tensor::new([k, j], |p| c((p[0] as f64) - (p[1] as f64))).unwrap();
        let ab = a.clone() * b.clone();
        let ba = b * a;
        for vi in 0..2 {
            for vk in 0..2 {
                assert_eq!(
                    ab.get(&[(i, vi), (k, vk)]),
                    ba.get(&[(i, vi), (k, vk)]),
                );
            }
        }
    }

    #[test]
    fn product_without_common_indices_is_outer() {
        let i = Index::new(2, "i");
        let j = Index::new(3, "j");
        let a: TestTensor = Tensor::new([i], |p| c(p[0] as f64 + 1.0)).unwrap();
        let b: TestTensor = Tensor::new([j], |p| c(p[0] as f64 + 1.0)).unwrap();
        let prod = a * b;
        assert_eq!(prod.rank(), 2);
        assert_eq!(prod.get(&[(i, 1), (j, 2)]), c(6.0));
    }

    #[test]
    fn full_contraction_yields_a_scalar() {
        let i = Index::new(4, "i");
        let a: TestTensor = Tensor::new([i], |p| c(p[0] as f64)).unwrap();
        let b: TestTensor = Tensor::new([i], |_| c(1.0)).unwrap();
        let s = a * b;
        assert!(s.is_scalar());
        assert_eq!(s.as_scalar(), Some(c(6.0)));
    }

    #[test]
    fn add_requires_matching_indices() {
        let i = Index::new(2, "i");
        let j = Index::new(2, "j");
        let a: TestTensor = Tensor::new([i], |_| c(1.0)).unwrap();
        let b: TestTensor = Tensor::new([j], |_| c(1.0)).unwrap();
        assert!(matches!(
            a.add_checked(b),
            Err(TensorError::IncompatibleIndicesAdd),
        ));
    }

    #[test]
    fn add_aligns_index_order() {
        let i = Index::new(2, "i");
        let j = Index::new(2, "j");
        let a: TestTensor =
            Tensor::new([i, j], |p| c((p[0] * 2 + p[1]) as f64)).unwrap();
        let b: TestTensor =
            Tensor::new([j, i], |p| c((p[1] * 2 + p[0]) as f64)).unwrap();
        // b stores the same elements with its indices transposed, so a + b = 2a
        let sum = a.clone() + b;
        for vi in 0..2 {
            for vj in 0..2 {
                assert_eq!(
                    sum.get(&[(i, vi), (j, vj)]),
                    a.get(&[(i, vi), (j, vj)]) * c(2.0),
                );
            }
        }
    }

    #[test]
    fn norm_is_frobenius() {
        let i = Index::new(2, "i");
        let t: TestTensor =
            Tensor::new([i], |p| if p[0] == 0 { c(3.0) } else { c(4.0) })
            .unwrap();
        assert_approx_eq!(f64, t.norm(), 5.0, epsilon = 1e-15);
    }

    #[test]
    fn conj_negates_imaginary_parts() {
        let i = Index::new(2, "i");
        let t: TestTensor =
            Tensor::new([i], |_| C64::new(1.0, 2.0)).unwrap();
        let tc = t.conj();
        assert_eq!(tc.get(&[(i, 0)]), C64::new(1.0, -2.0));
    }

    #[test]
    fn replace_index_rebinds_identity() {
        let i = Index::new(2, "i");
        let j = Index::new(2, "j");
        let k = Index::new(3, "k");
        let mut t: TestTensor = Tensor::new([i], |_| c(1.0)).unwrap();
        t.replace_index(&i, j).unwrap();
        assert!(t.has_index(&j));
        assert!(!t.has_index(&i));
        assert!(matches!(
            t.replace_index(&j, k),
            Err(TensorError::ReplacementDimMismatch),
        ));
    }

    #[test]
    fn common_index_finds_the_unique_shared_index() {
        let i = Index::new(2, "i");
        let j = Index::new(2, "j");
        let k = Index::new(2, "k");
        let a: TestTensor = Tensor::zeros([i, j]);
        let b: TestTensor = Tensor::zeros([j, k]);
        let d: TestTensor = Tensor::zeros([i, j]);
        assert_eq!(common_index(&a, &b), Some(j));
        assert_eq!(common_index(&b, &Tensor::zeros([i])), None);
        // ambiguous: two shared indices
        assert_eq!(common_index(&a, &d), None);
    }
}
