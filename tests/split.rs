use approx::assert_abs_diff_eq;
use ndarray as nd;
use rand::{ Rng, SeedableRng, rngs::StdRng };
use simple_mps::{
    MPSError,
    SvdSolver,
    TruncParams,
    TwoSiteTensor,
    split_truncate_theta,
};

fn random_theta(rng: &mut StdRng, dims: (usize, usize, usize, usize))
    -> TwoSiteTensor<f64>
{
    let data = nd::Array4::from_shape_simple_fn(dims, || rng.gen_range(-1.0..1.0));
    TwoSiteTensor::new(data).unwrap()
}

#[test]
fn hadamard_product_is_maximally_entangled() {
    // 0.5 * (H ⊗ H) with H = [[1, 1], [1, -1]], reshaped to (2, 2, 2, 2)
    let h: nd::Array2<f64> = nd::array![[1.0, 1.0], [1.0, -1.0]];
    let hh = nd::Array2::from_shape_fn(
        (4, 4), |(r, c)| 0.5 * h[[r / 2, c / 2]] * h[[r % 2, c % 2]]);
    let theta = nd::Array4::from_shape_fn(
        (2, 2, 2, 2), |(v, i, j, w)| hh[[v * 2 + i, j * 2 + w]]);
    let theta = TwoSiteTensor::new(theta).unwrap();

    let split = split_truncate_theta(&theta, &TruncParams::new(4, 0.0)).unwrap();
    assert_eq!(split.schmidt.len(), 4);
    split.schmidt.iter().for_each(|s| assert_abs_diff_eq!(*s, 0.5, epsilon = 1e-12));
    assert_abs_diff_eq!(split.trunc_err, 0.0, epsilon = 1e-12);
    assert_eq!(split.left.dims(), (2, 2, 4));
    assert_eq!(split.right.dims(), (4, 2, 2));
}

#[test]
fn random_splits_are_normalized() {
    let mut rng = StdRng::seed_from_u64(10546);
    for chi_max in 1..=6 {
        let theta = random_theta(&mut rng, (3, 2, 2, 3));
        let split = split_truncate_theta(&theta, &TruncParams::new(chi_max, 1e-14))
            .unwrap();
        assert!(split.schmidt.len() <= chi_max);
        let norm: f64 = split.schmidt.iter().map(|s| s * s).sum();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
        split.schmidt.windows(2).into_iter()
            .for_each(|w| assert!(w[0] >= w[1]));
        assert!((0.0..=1.0).contains(&split.trunc_err));
        assert_eq!(split.left.chi_r(), split.schmidt.len());
        assert_eq!(split.right.chi_l(), split.schmidt.len());
    }
}

#[test]
fn untruncated_split_reconstructs_theta() {
    let mut rng = StdRng::seed_from_u64(2718);
    let theta = random_theta(&mut rng, (2, 3, 3, 2));
    let norm: f64 = theta.as_array().iter().map(|x| x * x).sum::<f64>().sqrt();
    for solver in [SvdSolver::Standard, SvdSolver::DivideConquer] {
        let params = TruncParams::new(36, 0.0).with_solver(solver);
        let split = split_truncate_theta(&theta, &params).unwrap();
        assert_eq!(split.schmidt.len(), 6);
        let rebuilt
            = split.left.scale_right(&split.schmidt).fuse_left()
            .dot(&split.right.fuse_right());
        theta.to_matrix().iter().zip(rebuilt.iter())
            .for_each(|(a, b)| assert_abs_diff_eq!(*a / norm, *b, epsilon = 1e-10));
    }
}

#[test]
fn threshold_drops_small_values() {
    // Schmidt decomposition with weights 0.8 and 1e-8 on the two product
    // states ∣00⟩ and ∣11⟩
    let mut theta: nd::Array4<f64> = nd::Array4::zeros((1, 2, 2, 1));
    theta[[0, 0, 0, 0]] = 0.8;
    theta[[0, 1, 1, 0]] = 1e-8;
    let theta = TwoSiteTensor::new(theta).unwrap();
    let split = split_truncate_theta(&theta, &TruncParams::new(2, 1e-6)).unwrap();
    assert_eq!(split.schmidt.len(), 1);
    assert_abs_diff_eq!(split.schmidt[0], 1.0, epsilon = 1e-14);
}

#[test]
fn zero_wavefunction_collapses() {
    let theta: nd::Array4<f64> = nd::Array4::zeros((2, 2, 2, 2));
    let theta = TwoSiteTensor::new(theta).unwrap();
    let res = split_truncate_theta(&theta, &TruncParams::new(4, 0.0));
    assert!(matches!(res, Err(MPSError::RankCollapse)));
    assert!(!res.unwrap_err().is_numerical());
}

#[test]
fn parameter_builders() {
    let params = TruncParams::new(1, 0.5)
        .with_chi_max(3)
        .with_eps(1e-12)
        .with_fallback(SvdSolver::Standard);
    assert_eq!(params.chi_max, 3);
    assert_eq!(params.eps, 1e-12);
    assert_eq!(params.solver, SvdSolver::Standard);
    assert_eq!(params.fallback, Some(SvdSolver::Standard));
    let params = params.without_fallback().with_solver(SvdSolver::DivideConquer);
    assert_eq!(params.fallback, None);
    assert_eq!(SvdSolver::default().alternate(), SvdSolver::DivideConquer);

    let mut rng = StdRng::seed_from_u64(31);
    let theta = random_theta(&mut rng, (2, 2, 2, 2));
    let split = split_truncate_theta(&theta, &params).unwrap();
    assert_eq!(split.schmidt.len(), 3);
    assert!(split.trunc_err > 0.0);
}
