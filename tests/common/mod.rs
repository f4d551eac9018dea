//! Shared helpers for the integration tests.

#![allow(dead_code)]

use ndarray as nd;
use rand::{ Rng, SeedableRng, rngs::StdRng };

pub fn pauli_x() -> nd::Array2<f64> { nd::array![[0.0, 1.0], [1.0, 0.0]] }

pub fn pauli_z() -> nd::Array2<f64> { nd::array![[1.0, 0.0], [0.0, -1.0]] }

pub fn ident(d: usize) -> nd::Array2<f64> { nd::Array2::eye(d) }

/// Two-site operator `a ⊗ b` with axes `[i, j, i*, j*]`.
pub fn kron_op(a: &nd::Array2<f64>, b: &nd::Array2<f64>) -> nd::Array4<f64> {
    let (da, db) = (a.nrows(), b.nrows());
    nd::Array4::from_shape_fn(
        (da, db, da, db),
        |(i, j, ii, jj)| a[[i, ii]] * b[[j, jj]],
    )
}

/// Random normalized real state vector of `n` qubits.
pub fn random_state(seed: u64, n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let psi: Vec<f64> = (0..1 << n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let norm: f64 = psi.iter().map(|x| x * x).sum::<f64>().sqrt();
    psi.into_iter().map(|x| x / norm).collect()
}

/// Apply a single-qubit operator to qubit `k` of an `n`-qubit dense state,
/// with qubit 0 as the most significant bit.
pub fn apply_local(
    psi: &[f64],
    n: usize,
    k: usize,
    op: &nd::Array2<f64>,
) -> Vec<f64>
{
    let shift = n - 1 - k;
    (0..psi.len())
        .map(|idx| {
            let s = (idx >> shift) & 1;
            (0..2)
                .map(|t| {
                    let src = (idx & !(1 << shift)) | (t << shift);
                    op[[s, t]] * psi[src]
                })
                .sum()
        })
        .collect()
}

pub fn inner(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
