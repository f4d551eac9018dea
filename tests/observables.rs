mod common;

use approx::assert_abs_diff_eq;
use ndarray as nd;
use num_complex::Complex64 as C64;
use simple_mps::{ BoundaryCondition, MPS, MPSConfig, MPSError };
use common::*;

#[test]
fn product_state_expectations() {
    let fm: MPS<f64> = MPS::init_fm(4, 2, BoundaryCondition::Finite).unwrap();
    assert_eq!(fm.site_expectation_value(&pauli_z()).unwrap(), vec![1.0; 4]);
    assert_eq!(fm.site_expectation_value(&ident(2)).unwrap(), vec![1.0; 4]);
    assert_eq!(fm.site_expectation_value(&pauli_x()).unwrap(), vec![0.0; 4]);
    assert_eq!(fm.entanglement_entropy().unwrap(), vec![0.0; 3]);

    let neel: MPS<f64> = MPS::init_neel(4, 2, BoundaryCondition::Finite).unwrap();
    assert_eq!(
        neel.site_expectation_value(&pauli_z()).unwrap(),
        vec![1.0, -1.0, 1.0, -1.0],
    );
    assert_eq!(neel.entanglement_entropy().unwrap(), vec![0.0; 3]);
    let zz = kron_op(&pauli_z(), &pauli_z());
    let bonds = neel.bond_expectation_value(&vec![zz; 3]).unwrap();
    bonds.iter().for_each(|e| assert_abs_diff_eq!(*e, -1.0, epsilon = 1e-14));
}

#[test]
fn infinite_chain_has_one_operator_per_bond() {
    let neel: MPS<f64> = MPS::init_neel(2, 2, BoundaryCondition::Infinite).unwrap();
    let zz = kron_op(&pauli_z(), &pauli_z());
    let bonds = neel.bond_expectation_value(&[zz.clone(), zz.clone()]).unwrap();
    assert_eq!(bonds, vec![-1.0, -1.0]);
    assert!(matches!(
        neel.bond_expectation_value(&[zz]),
        Err(MPSError::OperatorCount { expected: 2, got: 1 }),
    ));
    assert_eq!(neel.entanglement_entropy().unwrap().len(), 2);
}

#[test]
fn site_values_match_dense_state() {
    let psi = random_state(42, 3);
    let mps: MPS<f64> = MPS::from_vector(&[2, 2, 2], psi.clone(), 0.0).unwrap();
    for op in [pauli_x(), pauli_z()] {
        let evs = mps.site_expectation_value(&op).unwrap();
        for (k, ev) in evs.into_iter().enumerate() {
            let dense = inner(&psi, &apply_local(&psi, 3, k, &op));
            assert_abs_diff_eq!(ev, dense, epsilon = 1e-10);
        }
    }
}

#[test]
fn bond_values_match_dense_state() {
    let psi = random_state(43, 3);
    let mps: MPS<f64> = MPS::from_vector(&[2, 2, 2], psi.clone(), 0.0).unwrap();
    let xz = kron_op(&pauli_x(), &pauli_z());
    let evs = mps.bond_expectation_value(&[xz.clone(), xz]).unwrap();
    for (k, ev) in evs.into_iter().enumerate() {
        let z_psi = apply_local(&psi, 3, k + 1, &pauli_z());
        let dense = inner(&psi, &apply_local(&z_psi, 3, k, &pauli_x()));
        assert_abs_diff_eq!(ev, dense, epsilon = 1e-10);
    }
}

#[test]
fn bell_state_entropy() {
    let h = 0.5_f64.sqrt();
    let mps: MPS<f64> = MPS::from_vector(&[2, 2], vec![h, 0.0, 0.0, h], 1e-12).unwrap();
    let s_vn = mps.entanglement_entropy().unwrap();
    assert_eq!(s_vn.len(), 1);
    assert_abs_diff_eq!(s_vn[0], 2.0_f64.ln(), epsilon = 1e-12);
    for a in [0.5, 2.0, 3.0] {
        let s_a = mps.entanglement_entropy_renyi(a).unwrap();
        assert_abs_diff_eq!(s_a[0], 2.0_f64.ln(), epsilon = 1e-12);
    }
    assert_eq!(mps.entanglement_entropy_renyi(1.0).unwrap(), s_vn);
}

#[test]
fn entropy_requires_normalized_schmidt_values() {
    let mut b0: nd::Array3<f64> = nd::Array3::zeros((1, 2, 2));
    b0[[0, 0, 0]] = 1.0;
    b0[[0, 1, 1]] = 1.0;
    let mut b1: nd::Array3<f64> = nd::Array3::zeros((2, 2, 1));
    b1[[0, 0, 0]] = 1.0;
    b1[[1, 1, 0]] = 1.0;
    let mps = MPS::from_arrays(
        vec![b0, b1],
        vec![nd::array![1.0], nd::array![1.0, 1.0]],
        BoundaryCondition::Finite,
    ).unwrap();
    assert!(matches!(
        mps.entanglement_entropy(),
        Err(MPSError::NotNormalized { bond: 1, .. }),
    ));
    assert!(mps.entanglement_entropy_renyi(2.0).is_err());
}

// Two sites with the given Schmidt values on the middle bond; both tensors
// are isometries.
fn two_site_chain(schmidt: nd::Array1<f64>) -> MPS<f64> {
    let chi = schmidt.len();
    let mut b0: nd::Array3<f64> = nd::Array3::zeros((1, 2, chi));
    b0[[0, 0, 0]] = 1.0;
    let b1 = nd::Array3::from_shape_fn(
        (chi, 2, 1), |(v, s, _)| if v == s { 1.0 } else { 0.0 });
    MPS::from_arrays(
        vec![b0, b1],
        vec![nd::array![1.0], schmidt],
        BoundaryCondition::Finite,
    ).unwrap()
}

#[test]
fn tiny_schmidt_values_are_clamped() {
    let mps = two_site_chain(nd::array![1.0, 1e-8]);
    let entropy = mps.entanglement_entropy().unwrap();
    assert!(entropy[0] > 0.0);

    let clamped = mps.with_config(MPSConfig::default().with_zero_clamp(1e-6));
    assert_eq!(clamped.config().zero_clamp, 1e-6);
    assert_eq!(clamped.entanglement_entropy().unwrap(), vec![0.0]);
    assert_eq!(clamped.entanglement_entropy_renyi(2.0).unwrap(), vec![0.0]);
}

#[test]
fn normalization_tolerance_is_configurable() {
    let mut mps = two_site_chain(nd::array![1.0 + 1e-10]);
    assert!(matches!(
        mps.entanglement_entropy(),
        Err(MPSError::NotNormalized { bond: 1, .. }),
    ));
    mps.config_mut().norm_tol = 1e-8;
    let entropy = mps.entanglement_entropy().unwrap();
    assert_abs_diff_eq!(entropy[0], 0.0, epsilon = 1e-8);
    mps.check_canonical().unwrap();
}

#[test]
fn operator_shape_is_checked() {
    let mps: MPS<f64> = MPS::init_fm(3, 3, BoundaryCondition::Finite).unwrap();
    assert!(matches!(
        mps.site_expectation_value(&pauli_z()),
        Err(MPSError::OperatorIncompatibleShape),
    ));
    let zz = kron_op(&pauli_z(), &pauli_z());
    assert!(matches!(
        mps.bond_expectation_value(&[zz.clone(), zz]),
        Err(MPSError::OperatorIncompatibleShape),
    ));
}

#[test]
fn complex_expectation_values() {
    let i = C64::new(0.0, 1.0);
    let one = C64::new(1.0, 0.0);
    let zero = C64::new(0.0, 0.0);
    let mps: MPS<C64> = MPS::init_neel(2, 2, BoundaryCondition::Finite).unwrap();

    let y: nd::Array2<C64> = nd::array![[zero, -i], [i, zero]];
    let evs = mps.site_expectation_value(&y).unwrap();
    evs.iter().for_each(|e| assert_abs_diff_eq!(*e, 0.0, epsilon = 1e-14));

    let z: nd::Array2<C64> = nd::array![[one, zero], [zero, -one]];
    assert_eq!(mps.site_expectation_value(&z).unwrap(), vec![1.0, -1.0]);

    // anti-Hermitian, so the expectation value is purely imaginary
    let iz = z.mapv(|x| x * i);
    assert!(matches!(
        mps.site_expectation_value(&iz),
        Err(MPSError::ComplexExpectation { at: 0, .. }),
    ));

    let loose = mps.with_config(MPSConfig::default().with_imag_tol(2.0));
    assert_eq!(loose.site_expectation_value(&iz).unwrap(), vec![0.0, 0.0]);
}
