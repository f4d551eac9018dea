//! Matrix product states in right-canonical form.
//!
//! The state of `L` particles is stored as a chain of `L` rank-3 "B" tensors
//! and `L` vectors of Schmidt values, where `S[k]` lives on the bond
//! immediately to the left of `B[k]`:
//!
//! ```text
//!   S[0]        S[1]        S[2]              S[L-1]
//!    |           |           |                  |
//!    V           V           V                  V
//!  ----- B[0] ----- B[1] ----- B[2] -- ... -- ----- B[L-1] -----
//!         |          |          |                    |
//!         | i_0      | i_1      | i_2                | i_L-1
//! ```
//!
//! Every `B[k]` is right-canonical, i.e. `Σ_i B[k]_i B[k]_i† = 1` on its left
//! bond index. Combined with the Schmidt values on the left, this means that
//! `diag(S[k]) · B[k]` (see [`MPS::theta1`]) is the correctly normalized
//! local wavefunction in mixed-canonical form, and local quantities can be
//! computed without touching the rest of the chain.
//!
//! With [`BoundaryCondition::Finite`], the outermost bonds are trivial
//! (dimension 1) and there are `L - 1` non-trivial bonds. With
//! [`BoundaryCondition::Infinite`], the `L` tensors form the unit cell of an
//! infinite, translation-invariant chain: the right bond of `B[L-1]` is the
//! left bond of `B[0]`, and all `L` bonds are non-trivial.
//!
//! The only operation that changes the tensors is a bond update
//! ([`MPS::update_bond`]), which takes the output of
//! [`split_truncate_theta`][crate::split::split_truncate_theta] and writes it
//! back while keeping the chain right-canonical.

use std::{
    fmt,
    str::FromStr,
};
use log::debug;
use ndarray as nd;
use ndarray_linalg::{
    JobSvd,
    SVDDCInto,
    error::LinalgError,
    types::Scalar,
};
use num_traits::{ Float, One, ToPrimitive, Zero };
use thiserror::Error;
use crate::{
    MPSScalar,
    config::{ MPSConfig, TruncParams },
    split::{ Split, split_truncate_theta },
    tensor::{ SiteTensor, TwoSiteTensor },
};

#[derive(Debug, Error)]
pub enum MPSError {
    /// Returned when attempting to create a new MPS for a state of less than 1
    /// particle.
    #[error("error in MPS creation: cannot create for an empty system")]
    EmptySystem,

    /// Returned when parsing a boundary condition from anything other than
    /// `"finite"` or `"infinite"`.
    #[error("error in MPS creation: unrecognized boundary condition {0:?}")]
    InvalidBoundary(String),

    /// Returned when the number of Schmidt vectors doesn't match the number
    /// of site tensors.
    #[error("error in MPS creation: expected {expected} Schmidt vectors, got {got}")]
    SchmidtCount { expected: usize, got: usize },

    /// Returned when a tensor's bond dimension doesn't match the Schmidt
    /// vector on that bond.
    #[error("inconsistent bond dimension at bond {0}")]
    BondMismatch(usize),

    /// Returned when a finite MPS has a non-trivial outer bond.
    #[error("error in MPS creation: outer bonds of a finite MPS must have dimension 1")]
    NontrivialBoundary,

    /// Returned when a tensor or state has an index of zero dimension.
    #[error("tensor has an index of zero dimension")]
    ZeroDimension,

    /// Returned when two tensors are contracted over bonds of different
    /// dimensions.
    #[error("cannot contract bonds of dimension {left} and {right}")]
    ContractionMismatch { left: usize, right: usize },

    /// Returned when a site (or a site's right neighbor) doesn't exist.
    #[error("site index {0} out of bounds")]
    SiteOutOfBounds(usize),

    /// Returned when a product state asks for a local state outside of the
    /// physical dimension.
    #[error("error in MPS creation: local state {state} not available at site {site}")]
    InvalidLocalState { site: usize, state: usize },

    /// Returned when attempting to create a new MPS from data with a
    /// length/shape that doesn't match the provided dimensions.
    #[error("error in MPS creation: array length/shape doesn't match dimensions")]
    StateIncompatibleShape,

    /// Returned when attempting to create a new MPS from a zero vector.
    #[error("error in MPS creation: state has zero norm")]
    ZeroNorm,

    /// Returned when an operation is only defined for finite chains.
    #[error("operation requires finite boundary conditions")]
    NotFinite,

    /// Returned when an operation is only defined for infinite chains.
    #[error("operation requires infinite boundary conditions")]
    NotInfinite,

    /// Returned when an operator's dimensions do not agree with the relevant
    /// physical indices.
    #[error("error in operator application: incorrect shape")]
    OperatorIncompatibleShape,

    /// Returned when the number of bond operators doesn't match the number of
    /// bonds.
    #[error("expected {expected} bond operators, got {got}")]
    OperatorCount { expected: usize, got: usize },

    /// Returned when a correlation function is requested with `i ≥ j`.
    #[error("correlation function requires i < j, got i = {i}, j = {j}")]
    CorrelationOrder { i: usize, j: usize },

    /// Returned when truncation is asked to keep no singular values at all.
    #[error("error in truncation: chi_max must be at least 1")]
    InvalidChiMax,

    /// Returned when every singular value falls below the discard threshold.
    #[error("error in truncation: no singular values above threshold")]
    RankCollapse,

    /// Returned when a Schmidt vector has drifted away from unit norm.
    #[error("Schmidt values on bond {bond} are not normalized (norm = {norm})")]
    NotNormalized { bond: usize, norm: f64 },

    /// Returned when a site tensor is not right-canonical.
    #[error("tensor at site {site} is not right-canonical (deviation = {dev:e})")]
    NotCanonical { site: usize, dev: f64 },

    /// Returned when an expectation value of a supposedly Hermitian operator
    /// has a non-negligible imaginary part.
    #[error("expectation value at {at} has non-negligible imaginary part {im:e}")]
    ComplexExpectation { at: usize, im: f64 },

    /// Returned when the singular value solver fails to converge.
    #[error("singular value decomposition failed: {0}")]
    SvdFailed(#[source] LinalgError),

    /// Returned when the eigenvalue solver fails to converge.
    #[error("eigenvalue decomposition failed: {0}")]
    EigFailed(#[source] LinalgError),
}
use MPSError::*;
pub type MPSResult<T> = Result<T, MPSError>;

impl MPSError {
    /// Return `true` if the error comes from a numerical solver rather than
    /// from invalid input.
    ///
    /// These are the only errors worth retrying, e.g. with a different
    /// [`SvdSolver`][crate::config::SvdSolver].
    pub fn is_numerical(&self) -> bool {
        matches!(self, SvdFailed(..) | EigFailed(..))
    }
}

/// Boundary conditions of the chain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BoundaryCondition {
    /// Open chain of `L` sites with trivial outer bonds.
    #[default]
    Finite,
    /// Unit cell of `L` sites repeated infinitely.
    Infinite,
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite => write!(f, "finite"),
            Self::Infinite => write!(f, "infinite"),
        }
    }
}

impl FromStr for BoundaryCondition {
    type Err = MPSError;

    fn from_str(s: &str) -> MPSResult<Self> {
        match s {
            "finite" => Ok(Self::Finite),
            "infinite" => Ok(Self::Infinite),
            _ => Err(InvalidBoundary(s.to_string())),
        }
    }
}

/// A matrix product state in right-canonical form.
///
/// Cloning produces a fully independent copy of all tensors and Schmidt
/// values.
#[derive(Clone, Debug)]
pub struct MPS<A>
where A: Scalar
{
    // Site tensors, each with axis signature [vL, i, vR].
    pub(crate) bs: Vec<SiteTensor<A>>, // length L ≥ 1
    // Schmidt values; `ss[k]` is on the bond left of `bs[k]`.
    pub(crate) ss: Vec<nd::Array1<A::Real>>, // length L
    pub(crate) bc: BoundaryCondition,
    pub(crate) config: MPSConfig,
}

impl<A> MPS<A>
where A: MPSScalar
{
    /// Create a new MPS from site tensors and Schmidt values.
    ///
    /// The tensors are assumed to be right-canonical, and each Schmidt vector
    /// to be normalized; see [`Self::check_canonical`] to verify this.
    ///
    /// Fails if no tensors are given, if there is not exactly one Schmidt
    /// vector per tensor, or if bond dimensions are inconsistent.
    pub fn new(
        bs: Vec<SiteTensor<A>>,
        ss: Vec<nd::Array1<A::Real>>,
        bc: BoundaryCondition,
    ) -> MPSResult<Self>
    {
        if bs.is_empty() { return Err(EmptySystem); }
        let n = bs.len();
        if ss.len() != n {
            return Err(SchmidtCount { expected: n, got: ss.len() });
        }
        for (k, bk) in bs.iter().enumerate() {
            if bk.chi_l() != ss[k].len() { return Err(BondMismatch(k)); }
            if k + 1 < n {
                if bk.chi_r() != ss[k + 1].len() {
                    return Err(BondMismatch(k + 1));
                }
            } else {
                match bc {
                    BoundaryCondition::Finite if bk.chi_r() != 1 => {
                        return Err(NontrivialBoundary);
                    },
                    BoundaryCondition::Infinite if bk.chi_r() != ss[0].len() => {
                        return Err(BondMismatch(0));
                    },
                    _ => { },
                }
            }
        }
        if bc == BoundaryCondition::Finite && ss[0].len() != 1 {
            return Err(NontrivialBoundary);
        }
        Ok(Self { bs, ss, bc, config: MPSConfig::default() })
    }

    /// Like [`Self::new`], but taking bare arrays with axes `[vL, i, vR]`.
    pub fn from_arrays(
        bs: Vec<nd::Array3<A>>,
        ss: Vec<nd::Array1<A::Real>>,
        bc: BoundaryCondition,
    ) -> MPSResult<Self>
    {
        let bs: Vec<SiteTensor<A>>
            = bs.into_iter()
            .map(SiteTensor::new)
            .collect::<MPSResult<_>>()?;
        Self::new(bs, ss, bc)
    }

    /// Initialize to a product state where the `k`-th particle (of physical
    /// dimension `d`) is in its `states[k]`-th basis state.
    ///
    /// Fails if `states` is empty or any `states[k] ≥ d`.
    pub fn product_state(d: usize, states: &[usize], bc: BoundaryCondition)
        -> MPSResult<Self>
    {
        if states.is_empty() { return Err(EmptySystem); }
        if d == 0 { return Err(ZeroDimension); }
        let bs: Vec<SiteTensor<A>>
            = states.iter().enumerate()
            .map(|(k, &p)| {
                if p >= d { return Err(InvalidLocalState { site: k, state: p }); }
                let mut b: nd::Array3<A> = nd::Array::zeros((1, d, 1));
                b[[0, p, 0]] = A::one();
                SiteTensor::new(b)
            })
            .collect::<MPSResult<_>>()?;
        let ss: Vec<nd::Array1<A::Real>>
            = (0..states.len())
            .map(|_| nd::array![A::Real::one()])
            .collect();
        Self::new(bs, ss, bc)
    }

    /// Initialize `n` particles all in the first of their `d` basis states
    /// (a ferromagnetic product state).
    pub fn init_fm(n: usize, d: usize, bc: BoundaryCondition)
        -> MPSResult<Self>
    {
        Self::product_state(d, &vec![0; n], bc)
    }

    /// Initialize `n` particles alternating between the first and the last of
    /// their `d` basis states, starting with the first (a Néel product
    /// state).
    pub fn init_neel(n: usize, d: usize, bc: BoundaryCondition)
        -> MPSResult<Self>
    {
        if d == 0 { return Err(ZeroDimension); }
        let states: Vec<usize>
            = (0..n).map(|k| if k % 2 == 0 { 0 } else { d - 1 }).collect();
        Self::product_state(d, &states, bc)
    }

    /// Initialize a finite MPS by factoring a pure state vector, sweeping
    /// from the right with successive singular value decompositions.
    ///
    /// The state is normalized before factoring, and singular values not
    /// greater than `eps` are dropped (at least one is always kept).
    ///
    /// Fails if `dims` is empty or the state vector does not have length
    /// Π<sub>*k*</sub> `dims[k]`.
    pub fn from_vector<I>(dims: &[usize], state: I, eps: f64)
        -> MPSResult<Self>
    where I: IntoIterator<Item = A>
    {
        if dims.is_empty() { return Err(EmptySystem); }
        if dims.contains(&0) { return Err(ZeroDimension); }
        let statelen: usize = dims.iter().product();
        let state: nd::Array1<A> = state.into_iter().collect();
        if state.len() != statelen { return Err(StateIncompatibleShape); }
        let norm: A::Real
            = Float::sqrt(
                state.iter()
                    .map(|a| a.square())
                    .fold(A::Real::zero(), |acc, a| acc + a)
            );
        if norm <= A::Real::zero() { return Err(ZeroNorm); }
        let eps = A::real(eps.abs());
        let n = dims.len();

        // built right to left, reversed at the end
        let mut bs: Vec<SiteTensor<A>> = Vec::with_capacity(n);
        let mut ss: Vec<nd::Array1<A::Real>> = Vec::with_capacity(n);
        // rows of q are the unprocessed physical indices, columns are the
        // left bond of the last tensor built
        let mut q: nd::Array2<A>
            = nd::Array2::from_shape_fn(
                (statelen, 1), |(r, _)| state[r].div_real(norm));
        let mut rest = statelen;
        let mut chi_r: usize = 1;
        for k in (1..n).rev() {
            let d = dims[k];
            rest /= d;
            let m: nd::Array2<A>
                = nd::Array2::from_shape_fn(
                    (rest, d * chi_r),
                    |(r, s_w)| q[[r * d + s_w / chi_r, s_w % chi_r]],
                );
            let (Some(u), s, Some(vt))
                = m.svddc_into(JobSvd::Some).map_err(SvdFailed)?
                else { unreachable!() };
            let rank = s.iter().take_while(|sk| **sk > eps).count().max(1);
            let snorm: A::Real
                = Float::sqrt(
                    s.iter().take(rank)
                        .map(|sk| *sk * *sk)
                        .fold(A::Real::zero(), |acc, x| acc + x)
                );
            let b
                = nd::Array3::from_shape_fn(
                    (rank, d, chi_r),
                    |(v, t, w)| vt[[v, t * chi_r + w]],
                );
            bs.push(SiteTensor::new(b)?);
            ss.push(s.iter().take(rank).map(|sk| *sk / snorm).collect());
            q = nd::Array2::from_shape_fn(
                (rest, rank), |(r, v)| u[[r, v]].mul_real(s[v] / snorm));
            chi_r = rank;
        }
        let qnorm: A::Real
            = Float::sqrt(
                q.iter()
                    .map(|a| a.square())
                    .fold(A::Real::zero(), |acc, a| acc + a)
            );
        let b0
            = nd::Array3::from_shape_fn(
                (1, dims[0], chi_r),
                |(_, s, w)| q[[s, w]].div_real(qnorm),
            );
        bs.push(SiteTensor::new(b0)?);
        ss.push(nd::array![A::Real::one()]);
        bs.reverse();
        ss.reverse();
        Self::new(bs, ss, BoundaryCondition::Finite)
    }

    /// Replace the numerical configuration.
    pub fn with_config(mut self, config: MPSConfig) -> Self {
        self.config = config;
        self
    }

    /// Return a reference to the numerical configuration.
    pub fn config(&self) -> &MPSConfig { &self.config }

    /// Return a mutable reference to the numerical configuration.
    pub fn config_mut(&mut self) -> &mut MPSConfig { &mut self.config }

    /// Return the number of sites (in the unit cell, for infinite chains).
    pub fn n(&self) -> usize { self.bs.len() }

    /// Return the boundary conditions.
    pub fn bc(&self) -> BoundaryCondition { self.bc }

    /// Return the number of non-trivial bonds: `L - 1` for finite chains and
    /// `L` for infinite ones.
    pub fn nbonds(&self) -> usize {
        match self.bc {
            BoundaryCondition::Finite => self.n() - 1,
            BoundaryCondition::Infinite => self.n(),
        }
    }

    /// Return the dimension of each non-trivial bond, i.e. the right bond
    /// dimension of `B[k]` for `k < nbonds`.
    pub fn bond_dims(&self) -> Vec<usize> {
        self.bs.iter().take(self.nbonds()).map(|b| b.chi_r()).collect()
    }

    /// Return the largest bond dimension in the chain.
    pub fn max_bond_dim(&self) -> usize {
        self.bs.iter().map(|b| b.chi_l().max(b.chi_r())).max().unwrap_or(1)
    }

    /// Return the site tensors.
    pub fn sites(&self) -> &[SiteTensor<A>] { &self.bs }

    /// Return the `k`-th site tensor, if it exists.
    pub fn site(&self, k: usize) -> Option<&SiteTensor<A>> { self.bs.get(k) }

    /// Return all Schmidt vectors.
    pub fn schmidt_values(&self) -> &[nd::Array1<A::Real>] { &self.ss }

    /// Return the Schmidt values on the bond left of site `k`, if it exists.
    pub fn schmidt(&self, k: usize) -> Option<&nd::Array1<A::Real>> {
        self.ss.get(k)
    }

    /// Return the index of the right neighbor of site `k`, wrapping around
    /// for infinite chains.
    pub(crate) fn next_site(&self, k: usize) -> MPSResult<usize> {
        let n = self.n();
        match self.bc {
            BoundaryCondition::Finite if k + 1 < n => Ok(k + 1),
            BoundaryCondition::Infinite if k < n => Ok((k + 1) % n),
            _ => Err(SiteOutOfBounds(k)),
        }
    }

    /// Return the tensor at an unwrapped site index, which may exceed `L` for
    /// infinite chains.
    pub(crate) fn site_wrapped(&self, k: usize) -> MPSResult<&SiteTensor<A>> {
        match self.bc {
            BoundaryCondition::Finite => self.bs.get(k).ok_or(SiteOutOfBounds(k)),
            BoundaryCondition::Infinite => Ok(&self.bs[k % self.n()]),
        }
    }

    /// Compute the effective single-site wavefunction on site `k` in mixed
    /// canonical form, `diag(S[k]) · B[k]`.
    ///
    /// The returned tensor has axes `[vL, i, vR]`, like the `B` tensors.
    pub fn theta1(&self, k: usize) -> MPSResult<SiteTensor<A>> {
        let bk = self.bs.get(k).ok_or(SiteOutOfBounds(k))?;
        Ok(bk.scale_left(&self.ss[k]))
    }

    /// Compute the effective two-site wavefunction on sites `k` and
    /// `k + 1` (mod `L`) in mixed canonical form.
    ///
    /// The returned tensor has axes `[vL, i, j, vR]`. Fails for `k ≥ L - 1`
    /// in a finite chain.
    pub fn theta2(&self, k: usize) -> MPSResult<TwoSiteTensor<A>> {
        let j = self.next_site(k)?;
        TwoSiteTensor::contract(&self.theta1(k)?, &self.bs[j])
    }

    /// Write the result of a split back into the chain, replacing `B[k]`,
    /// `S[k + 1]`, and `B[k + 1]` (indices mod `L`).
    ///
    /// The left tensor of `split` is left-canonical; it is converted back to
    /// right-canonical form using the Schmidt values on either side, so the
    /// chain stays right-canonical. `split` must have been computed from a
    /// two-site wavefunction of the form given by [`Self::theta2`] at the
    /// same bond.
    ///
    /// Fails if the bond doesn't exist, if both tensors would be the same site
    /// (an infinite chain with a one-site unit cell), or if the outer
    /// dimensions of `split` don't match the current tensors.
    pub fn update_bond(&mut self, k: usize, split: Split<A>) -> MPSResult<()> {
        let j = self.next_site(k)?;
        if j == k { return Err(BondMismatch(j)); }
        let Split { left, schmidt, right, .. } = split;
        let consistent
            = left.chi_l() == self.bs[k].chi_l()
            && left.phys() == self.bs[k].phys()
            && right.phys() == self.bs[j].phys()
            && right.chi_r() == self.bs[j].chi_r()
            && left.chi_r() == schmidt.len()
            && right.chi_l() == schmidt.len();
        if !consistent { return Err(BondMismatch(j)); }
        let clamp = A::real(self.config.zero_clamp);
        let inv: nd::Array1<A::Real>
            = self.ss[k].iter()
            .map(|sv| if *sv > clamp { A::Real::one() / *sv } else { A::Real::zero() })
            .collect();
        debug!(bond = j, chi = schmidt.len(); "updating bond");
        self.bs[k] = left.scale_left(&inv).scale_right(&schmidt);
        self.ss[j] = schmidt;
        self.bs[j] = right;
        Ok(())
    }

    /// Split and truncate a two-site wavefunction for bond `k` (see
    /// [`split_truncate_theta`]) and write the result back with
    /// [`Self::update_bond`].
    ///
    /// Returns the discarded weight.
    pub fn split_truncate_bond(
        &mut self,
        k: usize,
        theta: &TwoSiteTensor<A>,
        params: &TruncParams,
    ) -> MPSResult<A::Real>
    {
        let split = split_truncate_theta(theta, params)?;
        let trunc_err = split.trunc_err;
        self.update_bond(k, split)?;
        Ok(trunc_err)
    }

    /// Re-truncate the bond between sites `k` and `k + 1` (mod `L`) without
    /// applying any operator.
    ///
    /// Returns the discarded weight.
    pub fn compress_bond(&mut self, k: usize, params: &TruncParams)
        -> MPSResult<A::Real>
    {
        let theta = self.theta2(k)?;
        self.split_truncate_bond(k, &theta, params)
    }

    /// Check that every site tensor is right-canonical and every Schmidt
    /// vector has unit norm, up to the configured tolerances.
    pub fn check_canonical(&self) -> MPSResult<()> {
        let tol = A::real(self.config.canonical_tol);
        for (k, bk) in self.bs.iter().enumerate() {
            let gram = bk.right_gram();
            let dev: A::Real
                = gram.indexed_iter()
                .map(|((a, b), g)| {
                    if a == b { (*g - A::one()).abs() } else { g.abs() }
                })
                .fold(A::Real::zero(), |acc, x| Float::max(acc, x));
            if dev > tol {
                let dev = dev.to_f64().unwrap_or(f64::NAN);
                return Err(NotCanonical { site: k, dev });
            }
        }
        for k in 0..self.n() {
            self.schmidt_norm_checked(k)?;
        }
        Ok(())
    }

    /// Return the Schmidt values on bond `k` with entries below the zero
    /// clamp set to zero, failing if they are not normalized.
    pub(crate) fn schmidt_norm_checked(&self, k: usize)
        -> MPSResult<Vec<A::Real>>
    {
        let zero = A::Real::zero();
        let clamp = A::real(self.config.zero_clamp);
        let s: Vec<A::Real>
            = self.ss[k].iter()
            .map(|sv| if *sv < clamp { zero } else { *sv })
            .collect();
        let norm: A::Real
            = Float::sqrt(s.iter().map(|sv| *sv * *sv).fold(zero, |acc, x| acc + x));
        if Float::abs(norm - A::Real::one()) >= A::real(self.config.norm_tol) {
            let norm = norm.to_f64().unwrap_or(f64::NAN);
            return Err(NotNormalized { bond: k, norm });
        }
        Ok(s)
    }

    /// Contract a finite MPS into a single state vector, with the physical
    /// index of site 0 varying slowest.
    ///
    /// Fails for infinite chains.
    pub fn to_vector(&self) -> MPSResult<nd::Array1<A>> {
        if self.bc != BoundaryCondition::Finite { return Err(NotFinite); }
        // rows are the physical indices so far, columns the open right bond
        let mut psi: nd::Array2<A> = self.theta1(0)?.fuse_left();
        for bk in self.bs.iter().skip(1) {
            let (_, d, chi_r) = bk.dims();
            let rows = psi.nrows();
            let q: nd::Array2<A> = psi.dot(&bk.fuse_right());
            psi = nd::Array2::from_shape_fn(
                (rows * d, chi_r),
                |(r_s, w)| q[[r_s / d, (r_s % d) * chi_r + w]],
            );
        }
        Ok(psi.column(0).to_owned())
    }
}
