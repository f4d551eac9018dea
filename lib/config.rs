//! Numerical tolerances and truncation settings.
//!
//! Every threshold used by the MPS routines lives here rather than inside the
//! routines themselves, so that precision can be traded against cost per use
//! case. All values are plain `f64`s and are converted to the real type of the
//! MPS scalar when used.
//!
//! ```
//! use simple_mps::{ MPSConfig, SvdSolver, TruncParams };
//!
//! let config = MPSConfig::default().with_corr_len_max_chi(50);
//! assert_eq!(config.norm_tol, 1e-13);
//!
//! let params = TruncParams::new(32, 1e-10)
//!     .with_solver(SvdSolver::DivideConquer)
//!     .without_fallback();
//! assert_eq!(params.fallback, None);
//! ```

/// LAPACK driver used for singular value decompositions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SvdSolver {
    /// QR-iteration based `*gesvd`.
    #[default]
    Standard,
    /// Divide-and-conquer `*gesdd`.
    DivideConquer,
}

impl SvdSolver {
    /// Return the other available solver.
    pub fn alternate(self) -> Self {
        match self {
            Self::Standard => Self::DivideConquer,
            Self::DivideConquer => Self::Standard,
        }
    }
}

/// Settings for splitting and truncating a two-site wavefunction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TruncParams {
    /// Maximum number of singular values to keep. Must be at least 1.
    pub chi_max: usize,
    /// Singular values not greater than this are always discarded. The
    /// absolute value is used.
    pub eps: f64,
    /// Solver tried first.
    pub solver: SvdSolver,
    /// Solver tried if the first one fails to converge.
    pub fallback: Option<SvdSolver>,
}

impl TruncParams {
    /// Create a new set of parameters with the standard solver and the
    /// divide-and-conquer solver as fallback.
    pub fn new(chi_max: usize, eps: f64) -> Self {
        Self {
            chi_max,
            eps,
            solver: SvdSolver::Standard,
            fallback: Some(SvdSolver::DivideConquer),
        }
    }

    /// Set the maximum number of singular values kept.
    pub fn with_chi_max(mut self, chi_max: usize) -> Self {
        self.chi_max = chi_max;
        self
    }

    /// Set the discard threshold.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Set the primary solver. The fallback, if any, becomes the other one.
    pub fn with_solver(mut self, solver: SvdSolver) -> Self {
        self.solver = solver;
        if self.fallback.is_some() {
            self.fallback = Some(solver.alternate());
        }
        self
    }

    /// Set the fallback solver.
    pub fn with_fallback(mut self, fallback: SvdSolver) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Surface solver failures immediately instead of retrying.
    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }
}

/// Tolerances and cost limits attached to each
/// [`MPS`][crate::mps::MPS].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MPSConfig {
    /// Maximum deviation of a Schmidt vector's norm from 1.
    pub norm_tol: f64,
    /// Schmidt values below this are treated as exactly zero when computing
    /// entropies.
    pub zero_clamp: f64,
    /// Maximum imaginary part allowed in an expectation value, relative to
    /// `max(1, |real part|)`.
    pub imag_tol: f64,
    /// Maximum element-wise deviation of `Σ_i B_i B_i†` from the identity.
    pub canonical_tol: f64,
    /// Bond dimensions above this skip the correlation length computation.
    pub corr_len_max_chi: usize,
    /// Correlation lengths above this are reported as infinite.
    pub corr_len_cap: f64,
}

impl Default for MPSConfig {
    fn default() -> Self {
        Self {
            norm_tol: 1e-13,
            zero_clamp: 1e-20,
            imag_tol: 1e-12,
            canonical_tol: 1e-10,
            corr_len_max_chi: 100,
            corr_len_cap: 1000.0,
        }
    }
}

impl MPSConfig {
    /// Set the Schmidt normalization tolerance.
    pub fn with_norm_tol(mut self, norm_tol: f64) -> Self {
        self.norm_tol = norm_tol;
        self
    }

    /// Set the Schmidt value zero clamp.
    pub fn with_zero_clamp(mut self, zero_clamp: f64) -> Self {
        self.zero_clamp = zero_clamp;
        self
    }

    /// Set the imaginary part tolerance for expectation values.
    pub fn with_imag_tol(mut self, imag_tol: f64) -> Self {
        self.imag_tol = imag_tol;
        self
    }

    /// Set the tolerance for the right-canonical check.
    pub fn with_canonical_tol(mut self, canonical_tol: f64) -> Self {
        self.canonical_tol = canonical_tol;
        self
    }

    /// Set the largest bond dimension for which the correlation length is
    /// computed.
    pub fn with_corr_len_max_chi(mut self, corr_len_max_chi: usize) -> Self {
        self.corr_len_max_chi = corr_len_max_chi;
        self
    }

    /// Set the correlation length above which the result is reported as
    /// infinite.
    pub fn with_corr_len_cap(mut self, corr_len_cap: f64) -> Self {
        self.corr_len_cap = corr_len_cap;
        self
    }
}
