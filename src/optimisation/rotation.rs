//! Construction of orthogonal orbital rotations from rotation parameters.

use anyhow;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use ndarray_linalg::{Eigh, UPLO};

use crate::error::OrbOptError;
use crate::orbital_space::RotationIndex;

#[cfg(test)]
#[path = "rotation_tests.rs"]
mod rotation_tests;

/// Builds the skew-symmetric generator $`\mathbf{K}`$ with $`K_{pq} = \theta`$ and
/// $`K_{qp} = -\theta`$ for every parameter $`\theta`$ at $`(p, q)`$.
///
/// # Errors
///
/// Errors with [`OrbOptError::DimensionMismatch`] if the number of parameters differs from the
/// number of rotation indices, or if an index lies outside the orbital range.
pub fn build_generator(
    n_orbs: usize,
    parameters: &ArrayView1<f64>,
    parameter_indices: &[RotationIndex],
) -> Result<Array2<f64>, anyhow::Error> {
    if parameters.len() != parameter_indices.len() {
        return Err(OrbOptError::DimensionMismatch(format!(
            "{} rotation parameters supplied for {} rotation indices.",
            parameters.len(),
            parameter_indices.len()
        ))
        .into());
    }
    let mut kappa = Array2::<f64>::zeros((n_orbs, n_orbs));
    for (theta, pq) in parameters.iter().zip(parameter_indices.iter()) {
        if pq.q >= n_orbs {
            return Err(OrbOptError::DimensionMismatch(format!(
                "Rotation index {pq} lies outside the range of {n_orbs} orbitals."
            ))
            .into());
        }
        kappa[(pq.p, pq.q)] = *theta;
        kappa[(pq.q, pq.p)] = -*theta;
    }
    Ok(kappa)
}

/// Computes the exponential of a real skew-symmetric matrix exactly.
///
/// With the symmetric negative semi-definite matrix $`\mathbf{K}^2 = \mathbf{W}
/// \operatorname{diag}(-\tau_i^2) \mathbf{W}^{\mathsf{T}}`$,
/// ```math
///     \exp(\mathbf{K}) = \mathbf{W} \operatorname{diag}(\cos\tau_i) \mathbf{W}^{\mathsf{T}}
///         + \mathbf{W} \operatorname{diag}\left(\frac{\sin\tau_i}{\tau_i}\right)
///           \mathbf{W}^{\mathsf{T}} \mathbf{K}.
/// ```
pub fn exp_skew_symmetric(kappa: &ArrayView2<f64>) -> Result<Array2<f64>, anyhow::Error> {
    let kappa_sq = kappa.dot(kappa);
    let (eigvals, eigvecs) = kappa_sq.eigh(UPLO::Lower)?;
    let taus = eigvals.mapv(|lambda| (-lambda).max(0.0).sqrt());
    let cos_taus: Array1<f64> = taus.mapv(f64::cos);
    let sinc_taus: Array1<f64> = taus.mapv(|tau| if tau < 1e-12 { 1.0 } else { tau.sin() / tau });
    let even = (&eigvecs * &cos_taus).dot(&eigvecs.t());
    let odd = (&eigvecs * &sinc_taus).dot(&eigvecs.t()).dot(kappa);
    Ok(even + odd)
}

/// Returns the largest absolute element of $`\mathbf{R}^{\mathsf{T}}\mathbf{R} - \mathbf{I}`$.
pub fn orthogonality_deviation(rot: &ArrayView2<f64>) -> f64 {
    let rtr = rot.t().dot(rot);
    rtr.indexed_iter()
        .map(|((i, j), v)| (v - if i == j { 1.0 } else { 0.0 }).abs())
        .fold(0.0_f64, f64::max)
}

/// Fills `rot` with the orthogonal rotation $`\exp(\mathbf{K})`$ generated by a parameter vector.
///
/// # Arguments
///
/// * `rot` - The square matrix to be overwritten with the rotation. Its dimension gives the
///   number of orbitals.
/// * `parameters` - One rotation angle per rotation index.
/// * `parameter_indices` - The rotation indices.
/// * `orthogonality_threshold` - The largest tolerated element of
///   $`\mathbf{R}^{\mathsf{T}}\mathbf{R} - \mathbf{I}`$.
///
/// # Errors
///
/// Errors with [`OrbOptError::DimensionMismatch`] on inconsistent lengths, and with
/// [`OrbOptError::NumericalConditioning`] if the parameters are not finite or the resulting
/// rotation is not orthogonal to within the threshold.
pub fn fill_rot_matrix_with_parameters(
    rot: &mut Array2<f64>,
    parameters: &ArrayView1<f64>,
    parameter_indices: &[RotationIndex],
    orthogonality_threshold: f64,
) -> Result<(), anyhow::Error> {
    let (n_orbs, ncols) = rot.dim();
    if n_orbs != ncols {
        return Err(OrbOptError::DimensionMismatch(format!(
            "Rotation matrix must be square, but has shape ({n_orbs}, {ncols})."
        ))
        .into());
    }
    if parameters.iter().any(|theta| !theta.is_finite()) {
        return Err(OrbOptError::NumericalConditioning(
            "Non-finite rotation parameters encountered.".to_string(),
        )
        .into());
    }
    let kappa = build_generator(n_orbs, parameters, parameter_indices)?;
    let candidate = exp_skew_symmetric(&kappa.view())?;
    let deviation = orthogonality_deviation(&candidate.view());
    log::debug!("Rotation orthogonality deviation: {deviation:.3e}");
    if !(deviation < orthogonality_threshold) {
        return Err(OrbOptError::NumericalConditioning(format!(
            "Rotation matrix deviates from orthogonality by {deviation:.3e}, above the threshold {orthogonality_threshold:.3e}."
        ))
        .into());
    }
    rot.assign(&candidate);
    Ok(())
}
