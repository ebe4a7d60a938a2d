//! Analytic first and second derivatives of the energy with respect to orbital rotations.
//!
//! For the rotation $`\exp(\hat{\kappa})`$ with $`\hat{\kappa} = \sum_{p<q} \kappa_{pq}
//! (\hat{E}_{pq} - \hat{E}_{qp})`$, the derivatives at $`\boldsymbol{\kappa} = \mathbf{0}`$ are
//! assembled from the generalised Fock matrix
//! ```math
//!     F_{mn} = \sum_{q} \gamma_{mq} h_{nq} + \sum_{qrs} \Gamma_{mqrs} (nq|rs)
//! ```
//! and the two-particle intermediate
//! ```math
//!     Y_{pqrs} = \sum_{mn} \left[ (\Gamma_{pmrn} + \Gamma_{pmnr}) (qm|sn)
//!                               + \Gamma_{prmn} (qs|mn) \right].
//! ```

use anyhow::{self, format_err};
use ndarray::{s, Array1, Array2, ArrayView2, ArrayView4, Ix2, Zip};
use ndarray_einsum_beta::einsum;
use rayon::prelude::*;

use crate::orbital_space::RotationIndex;

#[cfg(test)]
#[path = "derivatives_tests.rs"]
mod derivatives_tests;

/// Computes the generalised Fock matrix.
///
/// # Arguments
///
/// * `onee` - The one-electron integrals $`h_{pq}`$.
/// * `twoe` - The dense two-electron integrals $`(pq|rs)`$.
/// * `one_rdm` - The one-particle density matrix $`\gamma_{pq}`$.
/// * `two_rdm` - The two-particle density matrix $`\Gamma_{pqrs}`$.
///
/// # Returns
///
/// The generalised Fock matrix $`\mathbf{F}`$, which is not symmetric in general.
pub(crate) fn calc_generalised_fock_matrix(
    onee: &ArrayView2<f64>,
    twoe: &ArrayView4<f64>,
    one_rdm: &ArrayView2<f64>,
    two_rdm: &ArrayView4<f64>,
) -> Result<Array2<f64>, anyhow::Error> {
    let onee_part = einsum("mq,nq->mn", &[one_rdm, onee])
        .map_err(|err| format_err!(err))?
        .into_dimensionality::<Ix2>()?;
    let twoe_part = einsum("mqrs,nqrs->mn", &[two_rdm, twoe])
        .map_err(|err| format_err!(err))?
        .into_dimensionality::<Ix2>()?;
    Ok(onee_part + twoe_part)
}

/// Structure gathering the quantities needed to evaluate orbital-rotation derivatives.
///
/// All fields are borrowed, so the structure can be shared across threads while the Hessian is
/// being built.
pub struct OrbitalDerivatives<'a> {
    /// The one-electron integrals.
    onee: ArrayView2<'a, f64>,

    /// The dense two-electron integrals.
    twoe: ArrayView4<'a, f64>,

    /// The one-particle density matrix.
    one_rdm: ArrayView2<'a, f64>,

    /// The two-particle density matrix.
    two_rdm: ArrayView4<'a, f64>,

    /// The generalised Fock matrix.
    fock: ArrayView2<'a, f64>,
}

impl<'a> OrbitalDerivatives<'a> {
    /// Collects the quantities needed to evaluate orbital-rotation derivatives. No arithmetic
    /// takes place here.
    pub(crate) fn new(
        onee: ArrayView2<'a, f64>,
        twoe: ArrayView4<'a, f64>,
        one_rdm: ArrayView2<'a, f64>,
        two_rdm: ArrayView4<'a, f64>,
        fock: ArrayView2<'a, f64>,
    ) -> Self {
        Self {
            onee,
            twoe,
            one_rdm,
            two_rdm,
            fock,
        }
    }

    /// Returns the generalised Fock matrix element $`F_{mn}`$.
    pub fn generalised_fock(&self, m: usize, n: usize) -> f64 {
        self.fock[(m, n)]
    }

    /// Evaluates the two-particle intermediate $`Y_{pqrs}`$ at a cost of $`O(n^2)`$.
    pub fn y_matrix(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        let exchange_like = &self.two_rdm.slice(s![p, .., r, ..]) + &self.two_rdm.slice(s![p, .., .., r]);
        let direct = Zip::from(&exchange_like)
            .and(&self.twoe.slice(s![q, .., s, ..]))
            .fold(0.0, |acc, d, g| acc + d * g);
        let coulomb_like = Zip::from(&self.two_rdm.slice(s![p, r, .., ..]))
            .and(&self.twoe.slice(s![q, s, .., ..]))
            .fold(0.0, |acc, d, g| acc + d * g);
        direct + coulomb_like
    }

    /// Evaluates the unsymmetrised second-derivative contribution
    /// ```math
    ///     2 \gamma_{pr} h_{qs} - (F_{pr} + F_{rp}) \delta_{qs} + 2 Y_{pqrs}.
    /// ```
    pub fn hessian_part(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        let fock_term = if q == s {
            self.fock[(p, r)] + self.fock[(r, p)]
        } else {
            0.0
        };
        2.0 * self.one_rdm[(p, r)] * self.onee[(q, s)] - fock_term + 2.0 * self.y_matrix(p, q, r, s)
    }

    /// Evaluates the Hessian element between the rotation parameters $`\kappa_{pq}`$ and
    /// $`\kappa_{rs}`$ by antisymmetrising [`Self::hessian_part`] in both index pairs.
    pub fn hessian_element(&self, pq: &RotationIndex, rs: &RotationIndex) -> f64 {
        let (p, q, r, s) = (pq.p, pq.q, rs.p, rs.q);
        self.hessian_part(p, q, r, s) - self.hessian_part(q, p, r, s)
            - self.hessian_part(p, q, s, r)
            + self.hessian_part(q, p, s, r)
    }

    /// Computes the orbital gradient $`g_{pq} = 2 (F_{pq} - F_{qp})`$.
    ///
    /// # Arguments
    ///
    /// * `parameter_indices` - The rotation parameters, in the order in which the gradient
    ///   components are to be returned.
    pub fn gradient(&self, parameter_indices: &[RotationIndex]) -> Array1<f64> {
        parameter_indices
            .iter()
            .map(|pq| 2.0 * (self.fock[(pq.p, pq.q)] - self.fock[(pq.q, pq.p)]))
            .collect()
    }

    /// Computes the full orbital Hessian.
    ///
    /// Rows are evaluated in parallel. The result is explicitly symmetrised, so that
    /// $`H_{ij} = H_{ji}`$ holds exactly.
    ///
    /// # Arguments
    ///
    /// * `parameter_indices` - The rotation parameters labelling the rows and columns.
    pub fn hessian(&self, parameter_indices: &[RotationIndex]) -> Array2<f64> {
        let n_params = parameter_indices.len();
        let mut hess = Array2::<f64>::zeros((n_params, n_params));
        hess.axis_iter_mut(ndarray::Axis(0))
            .into_par_iter()
            .zip(parameter_indices.par_iter())
            .for_each(|(mut row, pq)| {
                row.iter_mut()
                    .zip(parameter_indices.iter())
                    .for_each(|(elem, rs)| *elem = self.hessian_element(pq, rs));
            });
        (&hess + &hess.t()) * 0.5
    }

    /// Computes only the diagonal of the orbital Hessian.
    ///
    /// # Arguments
    ///
    /// * `parameter_indices` - The rotation parameters.
    pub fn hessian_diagonal(&self, parameter_indices: &[RotationIndex]) -> Array1<f64> {
        parameter_indices
            .iter()
            .map(|pq| self.hessian_element(pq, pq))
            .collect()
    }
}
