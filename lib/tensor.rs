//! Fixed-arity tensor types for the building blocks of a matrix product state.
//!
//! The base structure here is a rank-3 tensor with indices `vL`, `i`, and
//! `vR`,
//! ```text
//!  vL       vR
//! ---- B ----
//!      |
//!      | i
//! ```
//! where `i` is the physical index and `vL` and `vR` are the virtual bond
//! indices shared with the tensor's neighbors in the matrix product state
//! (MPS). Two such tensors contracted over a shared bond give the rank-4,
//! two-site tensor
//! ```text
//!  vL            vR
//! ---- theta ----
//!      |    |
//!      | i  | j
//! ```
//! Both are stored as plain `ndarray` arrays, but only ever in the axis order
//! shown above. Wrapping them keeps that order explicit: every access goes
//! through a named axis, and shapes are checked when a tensor is built.
//!
//! Most of the contractions needed by the MPS are carried out here in
//! matrix form, by fusing the physical index with either the left bond index
//! ([`SiteTensor::fuse_left`]) or the right bond index
//! ([`SiteTensor::fuse_right`]).

use itertools::Itertools;
use ndarray as nd;
use crate::{
    MPSScalar,
    mps::{ MPSError, MPSResult },
};

/// A single rank-3 site tensor with axes `[vL, i, vR]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteTensor<A> {
    data: nd::Array3<A>,
}

impl<A> SiteTensor<A> {
    /// Wrap an array with axes `[vL, i, vR]`.
    ///
    /// Fails if any axis has zero length.
    pub fn new(data: nd::Array3<A>) -> MPSResult<Self> {
        if data.shape().iter().any(|d| *d == 0) {
            return Err(MPSError::ZeroDimension);
        }
        Ok(Self { data })
    }

    /// Dimension of the left bond index.
    pub fn chi_l(&self) -> usize { self.data.shape()[0] }

    /// Dimension of the physical index.
    pub fn phys(&self) -> usize { self.data.shape()[1] }

    /// Dimension of the right bond index.
    pub fn chi_r(&self) -> usize { self.data.shape()[2] }

    /// Return the dimensions of each index as `(vL, i, vR)`.
    pub fn dims(&self) -> (usize, usize, usize) { self.data.dim() }

    /// Return a reference to the underlying array.
    pub fn as_array(&self) -> &nd::Array3<A> { &self.data }

    /// Discard axis information and return the underlying array.
    pub fn into_array(self) -> nd::Array3<A> { self.data }

    /// Return the `vL × vR` matrix for a fixed value `s` of the physical
    /// index.
    ///
    /// *Panics if `s` is out of bounds.*
    pub fn matrix(&self, s: usize) -> nd::ArrayView2<'_, A> {
        self.data.index_axis(nd::Axis(1), s)
    }
}

impl<A> SiteTensor<A>
where A: MPSScalar
{
    /// Fuse the physical index with the left bond index, giving a matrix with
    /// rows `(vL, i)` and columns `vR`.
    pub fn fuse_left(&self) -> nd::Array2<A> {
        let (chi_l, d, chi_r) = self.dims();
        nd::Array2::from_shape_fn(
            (chi_l * d, chi_r),
            |(v_s, w)| self.data[[v_s / d, v_s % d, w]],
        )
    }

    /// Fuse the physical index with the right bond index, giving a matrix with
    /// rows `vL` and columns `(i, vR)`.
    pub fn fuse_right(&self) -> nd::Array2<A> {
        let (chi_l, d, chi_r) = self.dims();
        nd::Array2::from_shape_fn(
            (chi_l, d * chi_r),
            |(v, s_w)| self.data[[v, s_w / chi_r, s_w % chi_r]],
        )
    }

    /// Multiply the left bond index by a vector of real weights, i.e. return
    /// `diag(weights) · B`.
    ///
    /// *Panics if `weights` is shorter than the left bond dimension.*
    pub fn scale_left(&self, weights: &nd::Array1<A::Real>) -> Self {
        let data
            = nd::Array3::from_shape_fn(
                self.dims(),
                |(v, s, w)| self.data[[v, s, w]].mul_real(weights[v]),
            );
        Self { data }
    }

    /// Multiply the right bond index by a vector of real weights, i.e. return
    /// `B · diag(weights)`.
    ///
    /// *Panics if `weights` is shorter than the right bond dimension.*
    pub fn scale_right(&self, weights: &nd::Array1<A::Real>) -> Self {
        let data
            = nd::Array3::from_shape_fn(
                self.dims(),
                |(v, s, w)| self.data[[v, s, w]].mul_real(weights[w]),
            );
        Self { data }
    }

    /// Push a bond environment through this tensor.
    ///
    /// `env` carries axes `[vL*, vL]` (bra, ket) and the result carries
    /// `[vR*, vR]`:
    /// ```text
    ///  .--- B* ---  vR*
    ///  |    |
    /// env  op
    ///  |    |
    ///  '--- B ----  vR
    /// ```
    /// If `op` is given, it acts on the ket's physical index, with the usual
    /// left-multiplication arrangement of its elements. The shape of `op` is
    /// not checked here.
    pub fn transfer(&self, env: &nd::Array2<A>, op: Option<&nd::Array2<A>>)
        -> nd::Array2<A>
    {
        let (chi_l, d, chi_r) = self.dims();
        let mut acc: nd::Array2<A> = nd::Array2::zeros((chi_r, chi_r));
        for s in 0..d {
            let bra: nd::Array2<A> = self.matrix(s).t().mapv(|b| b.conj());
            let ket: nd::Array2<A>
                = match op {
                    Some(op) => {
                        let mut ket: nd::Array2<A>
                            = nd::Array2::zeros((chi_l, chi_r));
                        (0..d).for_each(|t| {
                            ket.scaled_add(op[[s, t]], &self.matrix(t));
                        });
                        ket
                    },
                    None => self.matrix(s).to_owned(),
                };
            acc += &bra.dot(env).dot(&ket);
        }
        acc
    }

    /// Compute `Σ_i B_i B_i†`, which is the identity on the left bond index
    /// when the tensor is right-canonical.
    pub fn right_gram(&self) -> nd::Array2<A> {
        let chi_l = self.chi_l();
        let mut acc: nd::Array2<A> = nd::Array2::zeros((chi_l, chi_l));
        for s in 0..self.phys() {
            let bs = self.matrix(s);
            acc += &bs.dot(&bs.t().mapv(|b| b.conj()));
        }
        acc
    }
}

/// A two-site tensor with axes `[vL, i, j, vR]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TwoSiteTensor<A> {
    data: nd::Array4<A>,
}

impl<A> TwoSiteTensor<A> {
    /// Wrap an array with axes `[vL, i, j, vR]`.
    ///
    /// Fails if any axis has zero length.
    pub fn new(data: nd::Array4<A>) -> MPSResult<Self> {
        if data.shape().iter().any(|d| *d == 0) {
            return Err(MPSError::ZeroDimension);
        }
        Ok(Self { data })
    }

    /// Dimension of the left bond index.
    pub fn chi_l(&self) -> usize { self.data.shape()[0] }

    /// Dimension of the left physical index.
    pub fn phys_l(&self) -> usize { self.data.shape()[1] }

    /// Dimension of the right physical index.
    pub fn phys_r(&self) -> usize { self.data.shape()[2] }

    /// Dimension of the right bond index.
    pub fn chi_r(&self) -> usize { self.data.shape()[3] }

    /// Return the dimensions of each index as `(vL, i, j, vR)`.
    pub fn dims(&self) -> (usize, usize, usize, usize) { self.data.dim() }

    /// Return a reference to the underlying array.
    pub fn as_array(&self) -> &nd::Array4<A> { &self.data }

    /// Discard axis information and return the underlying array.
    pub fn into_array(self) -> nd::Array4<A> { self.data }
}

impl<A> TwoSiteTensor<A>
where A: MPSScalar
{
    /// Contract two site tensors over the right bond of `left` and the left
    /// bond of `right`.
    ///
    /// Fails if the two bond dimensions differ.
    pub fn contract(left: &SiteTensor<A>, right: &SiteTensor<A>)
        -> MPSResult<Self>
    {
        if left.chi_r() != right.chi_l() {
            return Err(MPSError::ContractionMismatch {
                left: left.chi_r(),
                right: right.chi_l(),
            });
        }
        let (chi_l, di, _) = left.dims();
        let (_, dj, chi_r) = right.dims();
        let q: nd::Array2<A> = left.fuse_left().dot(&right.fuse_right());
        let data
            = nd::Array4::from_shape_fn(
                (chi_l, di, dj, chi_r),
                |(v, s, t, w)| q[[v * di + s, t * chi_r + w]],
            );
        Ok(Self { data })
    }

    /// Group `(vL, i)` into rows and `(j, vR)` into columns.
    pub fn to_matrix(&self) -> nd::Array2<A> {
        let (chi_l, di, dj, chi_r) = self.dims();
        nd::Array2::from_shape_fn(
            (chi_l * di, dj * chi_r),
            |(v_s, t_w)| {
                self.data[[v_s / di, v_s % di, t_w / chi_r, t_w % chi_r]]
            },
        )
    }

    /// Compute `⟨θ|op|θ⟩` for a two-site operator with axes
    /// `[i, j, i*, j*]`. The shape of `op` is not checked here.
    pub fn expectation(&self, op: &nd::Array4<A>) -> A {
        let (chi_l, di, dj, chi_r) = self.dims();
        let th = &self.data;
        (0..chi_l).cartesian_product(0..chi_r)
            .cartesian_product((0..di).cartesian_product(0..dj))
            .map(|((v, w), (s, t))| {
                let op_th: A
                    = (0..di).cartesian_product(0..dj)
                    .map(|(ss, tt)| op[[s, t, ss, tt]] * th[[v, ss, tt, w]])
                    .fold(A::zero(), |acc, x| acc + x);
                th[[v, s, t, w]].conj() * op_th
            })
            .fold(A::zero(), |acc, x| acc + x)
    }
}
