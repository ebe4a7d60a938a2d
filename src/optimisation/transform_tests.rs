use approx;
use ndarray::{Array1, Array2};

use crate::auxiliary::template_systems::{gen_pair_rotation, gen_pseudo_random_system};
use crate::error::OrbOptError;
use crate::optimisation::rotation::fill_rot_matrix_with_parameters;
use crate::optimisation::transform::transform_twoe;
use crate::optimisation::{OrbitalOptimiser, UpdateSchemeParams};
use crate::orbital_space::OrbitalSpace;

fn random_rotation(n_orbs: usize) -> Array2<f64> {
    let indices = OrbitalSpace::all_active(n_orbs).parameter_indices();
    let params = Array1::from_iter((0..indices.len()).map(|i| 0.7 * (i as f64 + 1.0).sin()));
    let mut rot = Array2::<f64>::zeros((n_orbs, n_orbs));
    fill_rot_matrix_with_parameters(&mut rot, &params.view(), &indices, 1e-10).unwrap();
    rot
}

#[test]
fn test_transform_round_trip() {
    let (mut integrals, rdm) = gen_pseudo_random_system(4, 3);
    let original = integrals.clone();
    let rot = random_rotation(4);

    let rotated = {
        let optimiser = OrbitalOptimiser::new(
            &rdm,
            &mut integrals,
            OrbitalSpace::all_active(4),
            UpdateSchemeParams::default(),
        )
        .unwrap();
        optimiser.rotate_integrals(&rot.view()).unwrap()
    };
    assert_eq!(integrals, original);

    let mut rotated_store = rotated;
    let optimiser = OrbitalOptimiser::new(
        &rdm,
        &mut rotated_store,
        OrbitalSpace::all_active(4),
        UpdateSchemeParams::default(),
    )
    .unwrap();
    let back = optimiser.rotate_integrals(&rot.t()).unwrap();

    approx::assert_relative_eq!(
        (back.onee() - original.onee()).map(|x| x.abs()).sum(),
        0.0,
        epsilon = 1e-12
    );
    approx::assert_relative_eq!(
        (back.twoe().to_dense() - original.twoe().to_dense())
            .map(|x| x.abs())
            .sum(),
        0.0,
        epsilon = 1e-12
    );
    assert_eq!(back.core_energy(), original.core_energy());
}

#[test]
fn test_transform_energy_invariance() {
    let (mut integrals, rdm) = gen_pseudo_random_system(4, 5);
    let energy = integrals.energy(&rdm).unwrap();
    let rot = random_rotation(4);
    let optimiser = OrbitalOptimiser::new(
        &rdm,
        &mut integrals,
        OrbitalSpace::all_active(4),
        UpdateSchemeParams::default(),
    )
    .unwrap();
    let rotated_integrals = optimiser.rotate_integrals(&rot.view()).unwrap();
    let rotated_rdm = rdm.rotated(&rot.view()).unwrap();
    approx::assert_relative_eq!(
        rotated_integrals.energy(&rotated_rdm).unwrap(),
        energy,
        epsilon = 1e-10,
        max_relative = 1e-10
    );
}

#[test]
fn test_transform_twoe_single_index() {
    // A quarter transform on each index reproduces the explicit four-fold sum.
    let (integrals, _) = gen_pseudo_random_system(3, 9);
    let dense = integrals.twoe().to_dense();
    let rot = gen_pair_rotation(3, 1, 2, 0.4);
    let transformed = transform_twoe(dense.clone(), &rot.view()).unwrap();
    let (p, q, r, s) = (1, 2, 0, 1);
    let mut explicit = 0.0;
    for a in 0..3 {
        for b in 0..3 {
            for c in 0..3 {
                for d in 0..3 {
                    explicit += rot[(p, a)]
                        * rot[(q, b)]
                        * rot[(r, c)]
                        * rot[(s, d)]
                        * dense[(a, b, c, d)];
                }
            }
        }
    }
    approx::assert_relative_eq!(transformed[(p, q, r, s)], explicit, epsilon = 1e-12);
}

#[test]
fn test_transform_dimension_mismatch() {
    let (mut integrals, rdm) = gen_pseudo_random_system(3, 1);
    let optimiser = OrbitalOptimiser::new(
        &rdm,
        &mut integrals,
        OrbitalSpace::all_active(3),
        UpdateSchemeParams::default(),
    )
    .unwrap();
    let err = optimiser
        .rotate_integrals(&Array2::<f64>::eye(2).view())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OrbOptError>(),
        Some(OrbOptError::DimensionMismatch(_))
    ));
}
