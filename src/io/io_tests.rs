use std::fs;

use crate::error::OrbOptError;
use crate::io::{
    read_orbopt_binary, read_orbopt_yaml, write_orbopt_binary, write_orbopt_yaml, OrbOptFileType,
};
use crate::optimisation::{AdaDeltaHistory, StepSummary, UpdateScheme, UpdateSchemeParams};

#[test]
fn test_io_binary_adadelta_history() {
    let mut history = AdaDeltaHistory::zeros(3);
    history.mean_sq_gradient[1] = 0.25;
    history.mean_sq_update[2] = 1e-6;
    let name = std::env::temp_dir().join("orbopt_test_history");
    write_orbopt_binary(&name, OrbOptFileType::Hst, &history).unwrap();
    let read: AdaDeltaHistory = read_orbopt_binary(&name, OrbOptFileType::Hst).unwrap();
    fs::remove_file(name.with_extension(OrbOptFileType::Hst.ext())).unwrap();
    assert_eq!(read, history);
}

#[test]
fn test_io_binary_step_summary() {
    let summary = StepSummary {
        scheme: UpdateScheme::ApproximateNewton(2.0),
        n_parameters: 5,
        gradient_norm: Some(0.125),
        step_norm: None,
    };
    let name = std::env::temp_dir().join("orbopt_test_step");
    write_orbopt_binary(&name, OrbOptFileType::Stp, &summary).unwrap();
    let read: StepSummary = read_orbopt_binary(&name, OrbOptFileType::Stp).unwrap();
    fs::remove_file(name.with_extension(OrbOptFileType::Stp.ext())).unwrap();
    assert_eq!(read, summary);

    let err = read_orbopt_binary::<StepSummary, _>(&name, OrbOptFileType::Stp).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OrbOptError>(),
        Some(OrbOptError::IoFailure(_))
    ));
}

#[test]
fn test_io_yaml_params() {
    let params = UpdateSchemeParams::builder()
        .adadelta_decay_rate(0.9)
        .max_step_norm(Some(0.2))
        .build()
        .unwrap();
    let name = std::env::temp_dir().join("orbopt_test_params");
    write_orbopt_yaml(&name, &params).unwrap();
    let path = name.with_extension("yml");
    let read: UpdateSchemeParams = read_orbopt_yaml(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(read, params);
}
