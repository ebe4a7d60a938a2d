//! Transformation of integrals and density matrices under orthogonal orbital rotations.

use anyhow::{self, format_err};
use ndarray::{Array2, Array4, ArrayView2};

use crate::error::OrbOptError;
use crate::integrals::{EriTensor, Integrals};

use super::OrbitalOptimiser;

#[cfg(test)]
#[path = "transform_tests.rs"]
mod transform_tests;

/// Transforms a two-index quantity to a rotated orbital basis.
///
/// ```math
///     A'_{pq} = \sum_{ab} R_{pa} R_{qb} A_{ab}
/// ```
///
/// # Arguments
///
/// * `mat` - The matrix $`\mathbf{A}`$ in the current orbital basis.
/// * `rot` - The rotation $`\mathbf{R}`$ whose rows are the new orbitals.
pub(crate) fn transform_onee(mat: &ArrayView2<f64>, rot: &ArrayView2<f64>) -> Array2<f64> {
    rot.dot(mat).dot(&rot.t())
}

/// Transforms a four-index quantity to a rotated orbital basis by four successive one-index
/// (quarter) transformations.
///
/// ```math
///     A'_{pqrs} = \sum_{abcd} R_{pa} R_{qb} R_{rc} R_{sd} A_{abcd}
/// ```
///
/// Each quarter transformation contracts the leading index as a single matrix product over a
/// contiguous $`n \times n^3`$ reshaping, then cycles the axes so that the next untransformed
/// index leads. After four cycles the original index order is restored.
///
/// # Arguments
///
/// * `tensor` - The tensor $`\mathbf{A}`$ in the current orbital basis.
/// * `rot` - The rotation $`\mathbf{R}`$ whose rows are the new orbitals.
pub(crate) fn transform_twoe(
    tensor: Array4<f64>,
    rot: &ArrayView2<f64>,
) -> Result<Array4<f64>, anyhow::Error> {
    let n = rot.nrows();
    if rot.ncols() != n || tensor.shape().iter().any(|&d| d != n) {
        return Err(OrbOptError::DimensionMismatch(format!(
            "Rotation matrix of shape {:?} cannot act on a tensor of shape {:?}.",
            rot.shape(),
            tensor.shape()
        ))
        .into());
    }
    (0..4).try_fold(tensor, |acc, _| {
        let mat = acc
            .as_standard_layout()
            .into_owned()
            .into_shape((n, n * n * n))
            .map_err(|err| format_err!(err))?;
        let transformed = rot
            .dot(&mat)
            .into_shape((n, n, n, n))
            .map_err(|err| format_err!(err))?;
        Ok::<_, anyhow::Error>(transformed.permuted_axes([1, 2, 3, 0]))
    })
    .map(|t| t.as_standard_layout().into_owned())
}

impl<'a> OrbitalOptimiser<'a> {
    /// Applies an orthogonal rotation to the current integrals.
    ///
    /// The one-electron integrals cost $`O(n^3)`$ and the two-electron integrals $`O(n^5)`$. The
    /// externally owned integrals are left untouched.
    ///
    /// # Arguments
    ///
    /// * `rot` - The rotation whose rows are the new orbitals expanded in the current ones.
    ///
    /// # Returns
    ///
    /// The transformed integrals.
    pub fn rotate_integrals(&self, rot: &ArrayView2<f64>) -> Result<Integrals, anyhow::Error> {
        let n_orbs = self.n_orbs();
        if rot.dim() != (n_orbs, n_orbs) {
            return Err(OrbOptError::DimensionMismatch(format!(
                "Rotation matrix of shape {:?} cannot act on {n_orbs} orbitals.",
                rot.shape()
            ))
            .into());
        }
        log::debug!("Transforming one-electron integrals...");
        let onee = transform_onee(&self.integrals.onee().view(), rot);
        log::debug!("Transforming two-electron integrals...");
        let twoe_dense = transform_twoe(self.twoe_dense().clone(), rot)?;
        let twoe = EriTensor::symmetrised_from_dense(&twoe_dense.view())?;
        log::debug!("Transforming integrals... Done.");
        Integrals::new(
            self.integrals.core_energy(),
            (&onee + &onee.t()) * 0.5,
            twoe,
        )
    }
}
