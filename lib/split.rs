//! Splitting and truncation of two-site wavefunctions.
//!
//! A two-site wavefunction in mixed-canonical form is factored as
//! ```text
//!  vL --(theta)-- vR    =>    vL --(A)-- diag(S) --(B)-- vR
//!        |   |                      |                |
//!        i   j                      i                j
//! ```
//! by a singular value decomposition, keeping at most `chi_max` of the
//! largest singular values on the new bond. This truncation is the only
//! approximation made anywhere in the crate.

use std::cmp::Ordering;
use itertools::Itertools;
use log::{ debug, warn };
use ndarray as nd;
use ndarray_linalg::{
    JobSvd,
    SVDDCInto,
    SVDInto,
    error::LinalgError,
    types::Scalar,
};
use num_traits::{ Float, One, ToPrimitive, Zero };
use crate::{
    MPSScalar,
    config::{ SvdSolver, TruncParams },
    mps::{ MPSError, MPSResult },
    tensor::{ SiteTensor, TwoSiteTensor },
};

/// Output of [`split_truncate_theta`].
#[derive(Clone, Debug)]
pub struct Split<A>
where A: Scalar
{
    /// Left-canonical tensor on the left site, with axes `[vL, i, vC]`.
    pub left: SiteTensor<A>,
    /// Normalized Schmidt values on the new bond `vC`, in descending order.
    pub schmidt: nd::Array1<A::Real>,
    /// Right-canonical tensor on the right site, with axes `[vC, j, vR]`.
    pub right: SiteTensor<A>,
    /// Discarded weight, `Σ_discarded σ² / Σ σ²`.
    pub trunc_err: A::Real,
}

struct Svd<A: Scalar> {
    u: nd::Array2<A>,
    s: nd::Array1<A::Real>,
    vt: nd::Array2<A>,
}

fn svd_with<A>(q: nd::Array2<A>, solver: SvdSolver)
    -> Result<Svd<A>, LinalgError>
where A: MPSScalar
{
    match solver {
        SvdSolver::Standard => {
            let (Some(u), s, Some(vt)) = q.svd_into(true, true)?
                else { unreachable!() };
            Ok(Svd { u, s, vt })
        },
        SvdSolver::DivideConquer => {
            let (Some(u), s, Some(vt)) = q.svddc_into(JobSvd::Some)?
                else { unreachable!() };
            Ok(Svd { u, s, vt })
        },
    }
}

fn do_svd<A>(q: nd::Array2<A>, params: &TruncParams) -> MPSResult<Svd<A>>
where A: MPSScalar
{
    let retry = params.fallback.map(|alt| (alt, q.clone()));
    match svd_with(q, params.solver) {
        Ok(svd) => Ok(svd),
        Err(err) => match retry {
            Some((alt, q)) if alt != params.solver => {
                warn!(
                    "singular value decomposition with {:?} failed ({err}); \
                    retrying with {alt:?}",
                    params.solver,
                );
                svd_with(q, alt).map_err(MPSError::SvdFailed)
            },
            _ => Err(MPSError::SvdFailed(err)),
        },
    }
}

/// Split and truncate a two-site wavefunction in mixed canonical form.
///
/// `theta` (axes `[vL, i, j, vR]`) is reshaped into a matrix with rows
/// `(vL, i)` and columns `(j, vR)` and decomposed. The retained rank is the
/// number of singular values greater than `params.eps`, capped at
/// `params.chi_max`; the largest such values are kept (ties going to the
/// lower original index) and renormalized to unit norm.
///
/// Fails if `params.chi_max` is zero, if no singular value exceeds
/// `params.eps`, or if the decomposition fails with every configured solver.
/// Only the last of these is worth retrying (see
/// [`MPSError::is_numerical`]).
///
/// ```
/// use ndarray as nd;
/// use simple_mps::{ TruncParams, TwoSiteTensor, split_truncate_theta };
///
/// // (∣00⟩ + ∣11⟩) / √2
/// let h = 0.5_f64.sqrt();
/// let mut theta: nd::Array4<f64> = nd::Array4::zeros((1, 2, 2, 1));
/// theta[[0, 0, 0, 0]] = h;
/// theta[[0, 1, 1, 0]] = h;
/// let theta = TwoSiteTensor::new(theta).unwrap();
///
/// let split = split_truncate_theta(&theta, &TruncParams::new(4, 1e-14)).unwrap();
/// assert_eq!(split.schmidt.len(), 2);
/// assert!((split.schmidt[0] - h).abs() < 1e-12);
/// ```
pub fn split_truncate_theta<A>(theta: &TwoSiteTensor<A>, params: &TruncParams)
    -> MPSResult<Split<A>>
where A: MPSScalar
{
    if params.chi_max == 0 { return Err(MPSError::InvalidChiMax); }
    let (chi_l, di, dj, chi_r) = theta.dims();
    let Svd { u, s, vt } = do_svd(theta.to_matrix(), params)?;

    // truncate
    let eps = A::real(params.eps.abs());
    let rank
        = s.iter()
        .filter(|sk| **sk > eps)
        .count()
        .min(params.chi_max);
    if rank == 0 { return Err(MPSError::RankCollapse); }
    let piv: Vec<usize>
        = (0..s.len())
        .sorted_by(|&a, &b| {
            s[b].partial_cmp(&s[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        })
        .take(rank)
        .collect();

    // renormalize
    let total: A::Real
        = s.iter().map(|sk| *sk * *sk).fold(A::Real::zero(), |acc, x| acc + x);
    let kept: A::Real
        = piv.iter().map(|&k| s[k] * s[k]).fold(A::Real::zero(), |acc, x| acc + x);
    let norm = Float::sqrt(kept);
    let schmidt: nd::Array1<A::Real> = piv.iter().map(|&k| s[k] / norm).collect();
    let trunc_err
        = if total > A::Real::zero() {
            Float::max(A::Real::one() - kept / total, A::Real::zero())
        } else {
            A::Real::zero()
        };

    // split legs
    let left
        = nd::Array3::from_shape_fn(
            (chi_l, di, rank),
            |(v, p, c)| u[[v * di + p, piv[c]]],
        );
    let right
        = nd::Array3::from_shape_fn(
            (rank, dj, chi_r),
            |(c, t, w)| vt[[piv[c], t * chi_r + w]],
        );
    debug!(
        chi = rank,
        trunc_err = trunc_err.to_f64().unwrap_or(f64::NAN);
        "split two-site wavefunction"
    );
    Ok(Split {
        left: SiteTensor::new(left)?,
        schmidt,
        right: SiteTensor::new(right)?,
        trunc_err,
    })
}
