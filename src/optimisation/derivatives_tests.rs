use approx;
use ndarray::{Array1, Array2};

use crate::auxiliary::template_systems::{
    gen_h2_sto3g_integrals, gen_pseudo_random_system, gen_rotated_integrals,
    gen_two_electron_pair_rdm,
};
use crate::integrals::Integrals;
use crate::optimisation::rotation::fill_rot_matrix_with_parameters;
use crate::optimisation::{OrbitalOptimiser, UpdateSchemeParams};
use crate::orbital_space::{OrbitalSpace, RotationIndex};
use crate::rdm::Rdm;

/// Energy of `rdm` with `integrals` rotated by $`\exp(\mathbf{K}(\boldsymbol{\theta}))`$.
fn rotated_energy(
    integrals: &Integrals,
    rdm: &Rdm,
    indices: &[RotationIndex],
    params: &Array1<f64>,
) -> f64 {
    let n_orbs = integrals.n_orbs();
    let mut rot = Array2::<f64>::zeros((n_orbs, n_orbs));
    fill_rot_matrix_with_parameters(&mut rot, &params.view(), indices, 1e-10).unwrap();
    gen_rotated_integrals(integrals, &rot).energy(rdm).unwrap()
}

#[test]
fn test_derivatives_h2_stationary() {
    let mut integrals = gen_h2_sto3g_integrals();
    let rdm = gen_two_electron_pair_rdm(0.99, -0.11);
    let optimiser = OrbitalOptimiser::new(
        &rdm,
        &mut integrals,
        OrbitalSpace::all_active(2),
        UpdateSchemeParams::default(),
    )
    .unwrap();
    let grad = optimiser.gradient().unwrap();
    assert_eq!(grad.len(), 1);
    approx::assert_relative_eq!(grad[0], 0.0, epsilon = 1e-14);

    // Rotating the occupied and virtual orbitals into each other raises the energy.
    let hess = optimiser.hessian().unwrap();
    assert!(hess[(0, 0)] > 0.0);
    approx::assert_relative_eq!(
        optimiser.hessian_diagonal().unwrap()[0],
        hess[(0, 0)],
        epsilon = 1e-12
    );
}

#[test]
fn test_derivatives_fock_matrix_trace() {
    // For any wavefunction, Σ_m F_mm = Σ hγ + Σ (pq|rs) Γ_pqrs = 2 E_el - Σ hγ.
    let (mut integrals, rdm) = gen_pseudo_random_system(4, 21);
    let electronic = integrals.energy(&rdm).unwrap() - integrals.core_energy();
    let onee_energy = (integrals.onee() * rdm.one_rdm()).sum();
    let optimiser = OrbitalOptimiser::new(
        &rdm,
        &mut integrals,
        OrbitalSpace::all_active(4),
        UpdateSchemeParams::default(),
    )
    .unwrap();
    let fock = optimiser.fock_matrix().unwrap();
    approx::assert_relative_eq!(
        fock.diag().sum(),
        2.0 * electronic - onee_energy,
        epsilon = 1e-10,
        max_relative = 1e-10
    );
}

#[test]
fn test_derivatives_gradient_finite_difference() {
    let (mut integrals, rdm) = gen_pseudo_random_system(4, 42);
    let reference = integrals.clone();
    let space = OrbitalSpace::all_active(4);
    let indices = space.parameter_indices();
    let optimiser =
        OrbitalOptimiser::new(&rdm, &mut integrals, space, UpdateSchemeParams::default())
            .unwrap();
    let grad = optimiser.gradient().unwrap();
    assert_eq!(grad.len(), 6);

    let eps = 1e-4;
    for i in 0..indices.len() {
        let mut plus = Array1::<f64>::zeros(indices.len());
        plus[i] = eps;
        let minus = -&plus;
        let fd = (rotated_energy(&reference, &rdm, &indices, &plus)
            - rotated_energy(&reference, &rdm, &indices, &minus))
            / (2.0 * eps);
        approx::assert_relative_eq!(grad[i], fd, epsilon = 1e-5, max_relative = 1e-5);
    }
}

#[test]
fn test_derivatives_hessian_finite_difference() {
    let (mut integrals, rdm) = gen_pseudo_random_system(4, 17);
    let reference = integrals.clone();
    let space = OrbitalSpace::all_active(4);
    let indices = space.parameter_indices();
    let optimiser =
        OrbitalOptimiser::new(&rdm, &mut integrals, space, UpdateSchemeParams::default())
            .unwrap();
    let hess = optimiser.hessian().unwrap();
    let hess_diag = optimiser.hessian_diagonal().unwrap();
    let n_params = indices.len();
    assert_eq!(hess.dim(), (n_params, n_params));

    let eps = 2e-4;
    let energy_at = |shifts: &[(usize, f64)]| {
        let mut params = Array1::<f64>::zeros(n_params);
        shifts.iter().for_each(|&(k, d)| params[k] += d);
        rotated_energy(&reference, &rdm, &indices, &params)
    };
    for i in 0..n_params {
        for j in 0..n_params {
            approx::assert_relative_eq!(hess[(i, j)], hess[(j, i)], epsilon = 1e-12);
            let fd = (energy_at(&[(i, eps), (j, eps)])
                - energy_at(&[(i, eps), (j, -eps)])
                - energy_at(&[(i, -eps), (j, eps)])
                + energy_at(&[(i, -eps), (j, -eps)]))
                / (4.0 * eps * eps);
            approx::assert_relative_eq!(hess[(i, j)], fd, epsilon = 1e-4, max_relative = 1e-4);
        }
        approx::assert_relative_eq!(hess_diag[i], hess[(i, i)], epsilon = 1e-12);
    }
}

#[test]
fn test_derivatives_restricted_parameter_set() {
    // Gradient components do not depend on which other parameters are enumerated.
    let (mut integrals, rdm) = gen_pseudo_random_system(4, 8);
    let optimiser = OrbitalOptimiser::new(
        &rdm,
        &mut integrals,
        OrbitalSpace::all_active(4),
        UpdateSchemeParams::default(),
    )
    .unwrap();
    let derivatives = optimiser.derivatives().unwrap();
    let all = OrbitalSpace::all_active(4).parameter_indices();
    let subset = [RotationIndex { p: 1, q: 3 }];
    let grad_all = derivatives.gradient(&all);
    let grad_subset = derivatives.gradient(&subset);
    let k = all.iter().position(|pq| *pq == subset[0]).unwrap();
    assert_eq!(grad_subset[0], grad_all[k]);
    approx::assert_relative_eq!(
        grad_subset[0],
        2.0 * (derivatives.generalised_fock(1, 3) - derivatives.generalised_fock(3, 1)),
        epsilon = 1e-14
    );
}
