//! Tools for working with one-dimensional quantum states as matrix product
//! states (MPS) in right-canonical form.
//!
//! A state is stored as a chain of rank-3 site tensors together with the
//! Schmidt values on every bond (see [`mps`] for the conventions). Both finite
//! chains and infinite, translation-invariant chains (described by a repeating
//! unit cell) are supported. On top of the storage, this crate provides
//! - effective one- and two-site wavefunctions ([`MPS::theta1`],
//!   [`MPS::theta2`]),
//! - truncated splitting of a two-site wavefunction back into two site tensors
//!   ([`split_truncate_theta`]) and the bond update that writes it back,
//! - local expectation values and entanglement entropies,
//! - two-point correlation functions and the transfer-matrix correlation
//!   length of infinite chains.
//!
//! ```
//! use ndarray as nd;
//! use simple_mps::{ BoundaryCondition, MPS };
//!
//! let mps: MPS<f64> = MPS::init_fm(4, 2, BoundaryCondition::Finite).unwrap();
//! let z: nd::Array2<f64> = nd::array![[1.0, 0.0], [0.0, -1.0]];
//! assert_eq!(mps.site_expectation_value(&z).unwrap(), vec![1.0; 4]);
//! assert_eq!(mps.entanglement_entropy().unwrap(), vec![0.0; 3]);
//! ```

use ndarray_linalg::types::{ Lapack, Scalar };

pub mod tensor;
pub mod config;
pub mod mps;
pub mod split;
pub mod observables;
pub mod correlation;

pub use config::{ MPSConfig, SvdSolver, TruncParams };
pub use mps::{ BoundaryCondition, MPS, MPSError, MPSResult };
pub use split::{ Split, split_truncate_theta };
pub use tensor::{ SiteTensor, TwoSiteTensor };
pub use correlation::PartialContraction;

/// Element types usable in an [`MPS`]: real or complex floating-point numbers
/// with LAPACK support, i.e. `f32`, `f64`, `c32`, and `c64`.
pub trait MPSScalar: Scalar + Lapack { }

impl<A> MPSScalar for A
where A: Scalar + Lapack
{ }
