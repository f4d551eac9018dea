//! Local expectation values and entanglement entropies.
//!
//! Because the chain is kept in right-canonical form, the expectation value of
//! an operator acting on sites `k..k + n` only needs the effective
//! wavefunction on those sites; everything to the right contracts to the
//! identity and everything to the left is summarized by the Schmidt values.

use ndarray as nd;
use num_traits::{ Float, One, ToPrimitive, Zero };
use crate::{
    MPSScalar,
    mps::{ BoundaryCondition, MPS, MPSError, MPSResult },
};

impl<A> MPS<A>
where A: MPSScalar
{
    // Discard the imaginary part of an expectation value, failing if it isn't
    // negligible.
    fn real_part(&self, at: usize, z: A) -> MPSResult<A::Real> {
        let re = z.re();
        let im = z.im();
        let scale = Float::max(A::Real::one(), Float::abs(re));
        if Float::abs(im) > A::real(self.config.imag_tol) * scale {
            let im = im.to_f64().unwrap_or(f64::NAN);
            return Err(MPSError::ComplexExpectation { at, im });
        }
        Ok(re)
    }

    /// Evaluate the expectation value of a local operator on every site.
    ///
    /// The arrangement of the elements of `op` should correspond to the usual
    /// left-matrix-multiplication view of operator application. `op` is
    /// expected to be Hermitian.
    ///
    /// Fails if `op` is not square with dimension equal to the physical
    /// dimension of every site, or if any expectation value has a
    /// non-negligible imaginary part.
    pub fn site_expectation_value(&self, op: &nd::Array2<A>)
        -> MPSResult<Vec<A::Real>>
    {
        (0..self.n())
            .map(|k| {
                let theta = self.theta1(k)?;
                let d = theta.phys();
                if op.shape() != [d, d] {
                    return Err(MPSError::OperatorIncompatibleShape);
                }
                let env: nd::Array2<A> = nd::Array2::eye(theta.chi_l());
                let ev: A = theta.transfer(&env, Some(op)).diag().sum();
                self.real_part(k, ev)
            })
            .collect()
    }

    /// Evaluate the expectation value of a two-site operator on every bond.
    ///
    /// `ops[k]` acts on sites `k` and `k + 1` (mod `L`) and has axes
    /// `[i, j, i*, j*]`, where the last two are summed against the ket. Each
    /// is expected to be Hermitian.
    ///
    /// Fails if `ops` doesn't hold exactly one operator per bond, if any
    /// operator has the wrong shape, or if any expectation value has a
    /// non-negligible imaginary part.
    pub fn bond_expectation_value(&self, ops: &[nd::Array4<A>])
        -> MPSResult<Vec<A::Real>>
    {
        if ops.len() != self.nbonds() {
            return Err(MPSError::OperatorCount {
                expected: self.nbonds(),
                got: ops.len(),
            });
        }
        ops.iter().enumerate()
            .map(|(k, op)| {
                let theta = self.theta2(k)?;
                let (_, di, dj, _) = theta.dims();
                if op.shape() != [di, dj, di, dj] {
                    return Err(MPSError::OperatorIncompatibleShape);
                }
                self.real_part(k, theta.expectation(op))
            })
            .collect()
    }

    // Bonds carrying a non-trivial bipartition.
    fn entropy_bonds(&self) -> std::ops::Range<usize> {
        match self.bc {
            BoundaryCondition::Finite => 1..self.n(),
            BoundaryCondition::Infinite => 0..self.n(),
        }
    }

    /// Compute the Von Neumann entropy for a bipartition at every non-trivial
    /// bond (`1..L` for finite chains, `0..L` for infinite ones).
    ///
    /// Fails if any Schmidt vector is not normalized.
    pub fn entanglement_entropy(&self) -> MPSResult<Vec<A::Real>> {
        let zero = A::Real::zero();
        self.entropy_bonds()
            .map(|b| {
                let s = self.schmidt_norm_checked(b)?;
                let entropy
                    = s.into_iter()
                    .filter(|sk| *sk > zero)
                    .map(|sk| {
                        let sk2 = sk * sk;
                        -sk2 * Float::ln(sk2)
                    })
                    .fold(zero, |acc, term| acc + term);
                Ok(entropy)
            })
            .collect()
    }

    /// Compute the `a`-th Rényi entropy for a bipartition at every
    /// non-trivial bond.
    ///
    /// Returns the Von Neumann entropy for `a == 1`. Fails if any Schmidt
    /// vector is not normalized.
    pub fn entanglement_entropy_renyi(&self, a: f64) -> MPSResult<Vec<A::Real>> {
        if a == 1.0 { return self.entanglement_entropy(); }
        let zero = A::Real::zero();
        let a = A::real(a);
        self.entropy_bonds()
            .map(|b| {
                let s = self.schmidt_norm_checked(b)?;
                let sum
                    = s.into_iter()
                    .filter(|sk| *sk > zero)
                    .map(|sk| Float::powf(sk * sk, a))
                    .fold(zero, |acc, term| acc + term);
                Ok(Float::ln(sum) / (A::Real::one() - a))
            })
            .collect()
    }
}
