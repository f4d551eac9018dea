//! Two-point correlation functions and the transfer-matrix correlation length.
//!
//! A correlation function `⟨O_i O_j⟩` is computed by sweeping a bond
//! environment from site `i` to site `j`:
//! ```text
//!  .-- θ*[i] -- B*[i+1] -- ... -- B*[j] --.
//!  |     |         |                |     |
//!  |    O_i        |               O_j    |
//!  |     |         |                |     |
//!  '-- θ[i] --- B[i+1] --- ... --- B[j] --'
//! ```
//! The partially contracted environment is exposed as [`PartialContraction`],
//! so that a sweep over many `j` for a fixed `i` only absorbs each site once.

use std::cmp::Ordering;
use log::warn;
use ndarray as nd;
use ndarray_linalg::{ EigVals, types::Scalar };
use num_traits::{ Float, One, ToPrimitive, Zero };
use crate::{
    MPSScalar,
    mps::{ BoundaryCondition, MPS, MPSError, MPSResult },
    tensor::SiteTensor,
};

/// A correlation function contracted from a fixed left site up to, and
/// including, some later site.
///
/// The environment holds the bra and ket right bond indices of the last
/// absorbed site, with axes `[vR*, vR]`. Site indices are unwrapped, i.e. they
/// keep increasing past `L` for infinite chains.
///
/// The contraction borrows the state it was started on, so the state cannot
/// be modified while the contraction is alive:
/// ```compile_fail
/// use ndarray as nd;
/// use simple_mps::{ BoundaryCondition, MPS, PartialContraction, TruncParams };
///
/// let mut mps: MPS<f64> = MPS::init_fm(4, 2, BoundaryCondition::Finite).unwrap();
/// let z: nd::Array2<f64> = nd::array![[1.0, 0.0], [0.0, -1.0]];
/// let mut part = PartialContraction::start(&mps, &z, 0).unwrap();
/// mps.compress_bond(0, &TruncParams::new(1, 0.0)).unwrap();
/// part.absorb().unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct PartialContraction<'a, A>
where A: Scalar
{
    mps: &'a MPS<A>,
    start: usize,
    site: usize,
    env: nd::Array2<A>,
}

fn check_op<A>(b: &SiteTensor<A>, op: &nd::Array2<A>) -> MPSResult<()> {
    let d = b.phys();
    if op.shape() != [d, d] {
        Err(MPSError::OperatorIncompatibleShape)
    } else {
        Ok(())
    }
}

impl<'a, A> PartialContraction<'a, A>
where A: MPSScalar
{
    /// Begin a contraction on `mps` at site `i` with operator `op` applied
    /// there.
    ///
    /// Fails if `i` is not a site of the chain or `op` has the wrong shape.
    pub fn start(mps: &'a MPS<A>, op: &nd::Array2<A>, i: usize)
        -> MPSResult<Self>
    {
        let theta = mps.theta1(i)?;
        check_op(&theta, op)?;
        let id: nd::Array2<A> = nd::Array2::eye(theta.chi_l());
        let env = theta.transfer(&id, Some(op));
        Ok(Self { mps, start: i, site: i, env })
    }

    /// Return the state being contracted.
    pub fn mps(&self) -> &'a MPS<A> { self.mps }

    /// Return the site where the contraction began.
    pub fn start_site(&self) -> usize { self.start }

    /// Return the last site absorbed.
    pub fn site(&self) -> usize { self.site }

    /// Return the current environment, with axes `[vR*, vR]`.
    pub fn env(&self) -> &nd::Array2<A> { &self.env }

    /// Absorb the next site with no operator applied.
    ///
    /// Fails if there is no next site in a finite chain.
    pub fn absorb(&mut self) -> MPSResult<&mut Self> {
        let k = self.site + 1;
        let bk = self.mps.site_wrapped(k)?;
        self.env = bk.transfer(&self.env, None);
        self.site = k;
        Ok(self)
    }

    /// Finish the contraction at the next site with operator `op` applied
    /// there, leaving `self` unchanged.
    ///
    /// Fails if there is no next site in a finite chain or `op` has the wrong
    /// shape.
    pub fn close(&self, op: &nd::Array2<A>) -> MPSResult<A> {
        let bk = self.mps.site_wrapped(self.site + 1)?;
        check_op(bk, op)?;
        Ok(bk.transfer(&self.env, Some(op)).diag().sum())
    }
}

impl<A> MPS<A>
where A: MPSScalar
{
    /// Compute the correlation function `⟨O_i O_j⟩` between two operators on
    /// sites `i < j`.
    ///
    /// For infinite chains, `j` may extend past the unit cell. Each call
    /// contracts the whole range from `i` to `j`; see
    /// [`Self::correlation_function_range`] or [`PartialContraction`] for
    /// repeated evaluations sharing the same `i`.
    ///
    /// Fails if `i ≥ j`, if either site is out of bounds, or if either
    /// operator has the wrong shape.
    pub fn correlation_function(
        &self,
        op_i: &nd::Array2<A>,
        i: usize,
        op_j: &nd::Array2<A>,
        j: usize,
    ) -> MPSResult<A>
    {
        if i >= j { return Err(MPSError::CorrelationOrder { i, j }); }
        let mut part = PartialContraction::start(self, op_i, i)?;
        while part.site() + 1 < j {
            part.absorb()?;
        }
        part.close(op_j)
    }

    /// Compute the correlation functions `⟨O_i O_j⟩` for all
    /// `j` in `i + 1..=j_max` in a single sweep.
    ///
    /// Returns an empty vector if `j_max ≤ i`.
    pub fn correlation_function_range(
        &self,
        op_i: &nd::Array2<A>,
        i: usize,
        op_j: &nd::Array2<A>,
        j_max: usize,
    ) -> MPSResult<Vec<A>>
    {
        let mut part = PartialContraction::start(self, op_i, i)?;
        let mut acc: Vec<A> = Vec::with_capacity(j_max.saturating_sub(i));
        for j in i + 1..=j_max {
            acc.push(part.close(op_j)?);
            if j < j_max { part.absorb()?; }
        }
        Ok(acc)
    }

    /// Construct the transfer matrix of the unit cell,
    /// ```text
    ///  --- B*[0] --- B*[1] --- ... --- B*[L-1] ---
    ///        |         |                  |
    ///  --- B[0] ---- B[1] ---- ... --- B[L-1] ----
    /// ```
    /// as a square matrix with fused row indices `(vL, vL*)` and fused column
    /// indices `(vR, vR*)`.
    ///
    /// Fails for finite chains.
    pub fn transfer_matrix(&self) -> MPSResult<nd::Array2<A>> {
        if self.bc != BoundaryCondition::Infinite {
            return Err(MPSError::NotInfinite);
        }
        let t
            = self.bs.iter().skip(1)
            .fold(site_transfer(&self.bs[0]), |t, b| t.dot(&site_transfer(b)));
        Ok(t)
    }

    /// Compute the correlation length of an infinite chain from the
    /// second-largest eigenvalue magnitude `λ₂` of the unit-cell transfer
    /// matrix, as `ξ = -L / ln λ₂`.
    ///
    /// If any bond dimension exceeds the configured limit, the computation is
    /// skipped and `-1` is returned. If `ξ` exceeds the configured cap (or
    /// `λ₂` is not below 1), `+∞` is returned. A unit cell with all bond
    /// dimensions equal to 1 has `ξ = 0`.
    ///
    /// Fails for finite chains or if the eigenvalue solver fails.
    pub fn correlation_length(&self) -> MPSResult<A::Real> {
        if self.bc != BoundaryCondition::Infinite {
            return Err(MPSError::NotInfinite);
        }
        let chi = self.max_bond_dim();
        if chi > self.config.corr_len_max_chi {
            warn!(
                chi = chi, limit = self.config.corr_len_max_chi;
                "skipping correlation length for large bond dimension"
            );
            return Ok(-A::Real::one());
        }
        let t = self.transfer_matrix()?;
        let eta = t.eigvals().map_err(MPSError::EigFailed)?;
        let mut mags: Vec<A::Real> = eta.iter().map(|z| Scalar::abs(*z)).collect();
        mags.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        let Some(&lambda2) = mags.get(1) else { return Ok(A::Real::zero()); };
        let xi = -A::real(self.n()) / Float::ln(lambda2);
        let cap = A::real(self.config.corr_len_cap);
        if Float::is_nan(xi) || xi < A::Real::zero() || xi > cap {
            warn!(
                lambda2 = lambda2.to_f64().unwrap_or(f64::NAN);
                "correlation length diverges"
            );
            return Ok(<A::Real as Float>::infinity());
        }
        Ok(xi)
    }
}

// Transfer matrix of a single site, with rows (vL, vL*) and columns
// (vR, vR*).
fn site_transfer<A>(b: &SiteTensor<A>) -> nd::Array2<A>
where A: MPSScalar
{
    let (chi_l, d, chi_r) = b.dims();
    let arr = b.as_array();
    nd::Array2::from_shape_fn(
        (chi_l * chi_l, chi_r * chi_r),
        |(v_vc, w_wc)| {
            let (v, vc) = (v_vc / chi_l, v_vc % chi_l);
            let (w, wc) = (w_wc / chi_r, w_wc % chi_r);
            (0..d)
                .map(|s| arr[[v, s, w]] * arr[[vc, s, wc]].conj())
                .fold(A::zero(), |acc, x| acc + x)
        },
    )
}
