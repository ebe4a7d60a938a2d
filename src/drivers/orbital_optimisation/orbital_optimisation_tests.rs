use std::fs;

use approx;

use crate::auxiliary::template_systems::{
    gen_closed_shell_rdm, gen_h2_sto3g_integrals, gen_pair_rotation, gen_pseudo_random_system,
    gen_rotated_integrals, gen_two_electron_pair_rdm,
};
use crate::drivers::orbital_optimisation::{
    OrbitalOptimisationDriver, OrbitalOptimisationParams,
};
use crate::drivers::OrbOptDriver;
use crate::io::dump::read_integrals_dump;
use crate::io::{read_orbopt_binary, OrbOptFileType};
use crate::optimisation::{AdaDeltaHistory, StepSummary, UpdateScheme};
use crate::orbital_space::OrbitalSpace;

#[test]
fn test_drivers_orbital_optimisation_newton_commit() {
    let rot = gen_pair_rotation(2, 0, 1, 0.2);
    let mut integrals = gen_rotated_integrals(&gen_h2_sto3g_integrals(), &rot);
    let original = integrals.clone();
    let rdm = gen_two_electron_pair_rdm(1.0, 0.0);
    let orbital_space = OrbitalSpace::all_active(2);
    let params = OrbitalOptimisationParams::builder()
        .update_scheme(UpdateScheme::Newton)
        .build()
        .unwrap();
    assert!(params.commit);

    let energy_after = {
        let mut driver = OrbitalOptimisationDriver::builder()
            .parameters(&params)
            .rdm(&rdm)
            .integrals(&mut integrals)
            .orbital_space(&orbital_space)
            .build()
            .unwrap();
        assert!(driver.run().is_ok());
        let result = driver.result().unwrap();
        assert!(result.committed);
        assert!(result.adadelta_history.is_none());
        assert_eq!(result.step_summary.scheme, UpdateScheme::Newton);
        assert!(result.energy_after < result.energy_before);
        result.energy_after
    };

    assert_ne!(integrals, original);
    approx::assert_relative_eq!(integrals.energy(&rdm).unwrap(), energy_after, epsilon = 1e-14);
}

#[test]
fn test_drivers_orbital_optimisation_dump_without_commit() {
    let (mut integrals, rdm) = gen_pseudo_random_system(3, 6);
    let original = integrals.clone();
    let orbital_space = OrbitalSpace::all_active(3);
    let dump_path = std::env::temp_dir().join("orbopt_test_driver_dump.dump");
    let params = OrbitalOptimisationParams::builder()
        .update_scheme(UpdateScheme::GradientDescent)
        .integrals_dump_path(Some(dump_path.clone()))
        .commit(false)
        .build()
        .unwrap();

    let energy_after = {
        let mut driver = OrbitalOptimisationDriver::builder()
            .parameters(&params)
            .rdm(&rdm)
            .integrals(&mut integrals)
            .orbital_space(&orbital_space)
            .build()
            .unwrap();
        assert!(driver.run().is_ok());
        assert!(!driver.result().unwrap().committed);
        driver.result().unwrap().energy_after
    };

    assert_eq!(integrals, original);
    let dumped = read_integrals_dump(&dump_path, original.core_energy()).unwrap();
    fs::remove_file(&dump_path).unwrap();
    approx::assert_relative_eq!(
        dumped.energy(&rdm).unwrap(),
        energy_after,
        epsilon = 1e-10,
        max_relative = 1e-10
    );
}

#[test]
fn test_drivers_orbital_optimisation_failed_dump_still_commits() {
    let rot = gen_pair_rotation(2, 0, 1, -0.1);
    let mut integrals = gen_rotated_integrals(&gen_h2_sto3g_integrals(), &rot);
    let original = integrals.clone();
    let rdm = gen_closed_shell_rdm(2, 1);
    let orbital_space = OrbitalSpace::all_active(2);
    let params = OrbitalOptimisationParams::builder()
        .update_scheme(UpdateScheme::ApproximateNewton(1.0))
        .integrals_dump_path(Some(
            std::env::temp_dir()
                .join("orbopt_nonexistent_directory")
                .join("rotated.dump"),
        ))
        .build()
        .unwrap();

    {
        let mut driver = OrbitalOptimisationDriver::builder()
            .parameters(&params)
            .rdm(&rdm)
            .integrals(&mut integrals)
            .orbital_space(&orbital_space)
            .build()
            .unwrap();
        assert!(driver.run().is_err());
        assert!(driver.result().unwrap().committed);
    }
    assert_ne!(integrals, original);
}

#[test]
fn test_drivers_orbital_optimisation_adadelta_history() {
    let rot = gen_pair_rotation(2, 0, 1, 0.3);
    let mut integrals = gen_rotated_integrals(&gen_h2_sto3g_integrals(), &rot);
    let rdm = gen_two_electron_pair_rdm(1.0, 0.0);
    let orbital_space = OrbitalSpace::all_active(2);
    let save_name = std::env::temp_dir().join("orbopt_test_driver_adadelta");
    let params = OrbitalOptimisationParams::builder()
        .update_scheme(UpdateScheme::AdaDelta)
        .result_save_name(Some(save_name.clone()))
        .build()
        .unwrap();

    // Without a supplied history, an all-zero one is used.
    let history = {
        let mut driver = OrbitalOptimisationDriver::builder()
            .parameters(&params)
            .rdm(&rdm)
            .integrals(&mut integrals)
            .orbital_space(&orbital_space)
            .build()
            .unwrap();
        driver.run().unwrap();
        driver.result().unwrap().adadelta_history.clone().unwrap()
    };
    assert_eq!(history.len(), 1);
    assert!(history.mean_sq_gradient[0] > 0.0);
    assert!(history.mean_sq_update[0] > 0.0);

    let saved_history: AdaDeltaHistory =
        read_orbopt_binary(&save_name, OrbOptFileType::Hst).unwrap();
    let saved_summary: StepSummary = read_orbopt_binary(&save_name, OrbOptFileType::Stp).unwrap();
    fs::remove_file(save_name.with_extension(OrbOptFileType::Hst.ext())).unwrap();
    fs::remove_file(save_name.with_extension(OrbOptFileType::Stp.ext())).unwrap();
    assert_eq!(saved_history, history);
    assert_eq!(saved_summary.scheme, UpdateScheme::AdaDelta);

    // The history is threaded into the next macro-iteration.
    let params = OrbitalOptimisationParams::builder()
        .update_scheme(UpdateScheme::AdaDelta)
        .build()
        .unwrap();
    let mut driver = OrbitalOptimisationDriver::builder()
        .parameters(&params)
        .rdm(&rdm)
        .integrals(&mut integrals)
        .orbital_space(&orbital_space)
        .adadelta_history(Some(&history))
        .build()
        .unwrap();
    driver.run().unwrap();
    let next = driver.result().unwrap().adadelta_history.as_ref().unwrap();
    assert!(next.mean_sq_update[0] > 0.95 * history.mean_sq_update[0]);
}

#[test]
fn test_drivers_orbital_optimisation_builder_validation() {
    let mut integrals = gen_h2_sto3g_integrals();
    let rdm = gen_closed_shell_rdm(2, 1);
    let params = OrbitalOptimisationParams::builder()
        .update_scheme(UpdateScheme::AdaDelta)
        .build()
        .unwrap();

    let wrong_space = OrbitalSpace::all_active(3);
    assert!(OrbitalOptimisationDriver::builder()
        .parameters(&params)
        .rdm(&rdm)
        .integrals(&mut integrals)
        .orbital_space(&wrong_space)
        .build()
        .is_err());

    let orbital_space = OrbitalSpace::all_active(2);
    let wrong_history = AdaDeltaHistory::zeros(4);
    assert!(OrbitalOptimisationDriver::builder()
        .parameters(&params)
        .rdm(&rdm)
        .integrals(&mut integrals)
        .orbital_space(&orbital_space)
        .adadelta_history(Some(&wrong_history))
        .build()
        .is_err());

    assert!(OrbitalOptimisationParams::builder()
        .update_scheme(UpdateScheme::ApproximateNewton(-1.0))
        .build()
        .is_err());
    assert!(OrbitalOptimisationParams::builder().build().is_err());
}

#[test]
fn test_drivers_orbital_optimisation_params_yaml_validation() {
    let params: OrbitalOptimisationParams =
        serde_yaml::from_str("update_scheme: AdaDelta\n").unwrap();
    assert_eq!(params.update_scheme, UpdateScheme::AdaDelta);
    assert!(params.commit);
    assert!(params.integrals_dump_path.is_none());

    for yaml in [
        "update_scheme: !ApproximateNewton -1.0\n",
        "update_scheme: !ApproximateNewton 0.0\n",
        "update_scheme: Newton\nscheme_params:\n  adadelta_decay_rate: 1.0\n",
        "update_scheme: GradientDescent\nscheme_params:\n  grad_descent_step_scale: -0.5\n",
        "commit: false\n",
    ] {
        assert!(
            serde_yaml::from_str::<OrbitalOptimisationParams>(yaml).is_err(),
            "`{yaml}` should be rejected."
        );
    }
}
