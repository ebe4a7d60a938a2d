//! Spin-summed one- and two-particle reduced density matrices.

use anyhow;
use ndarray::{Array2, Array4, ArrayView2};

use crate::error::OrbOptError;
use crate::integrals::max_asymmetry;
use crate::optimisation::transform::{transform_onee, transform_twoe};


/// Default threshold for verifying the permutational symmetry of reduced density matrices.
pub const RDM_SYMMETRY_THRESHOLD: f64 = 1e-8;

/// Structure holding the spin-summed reduced density matrices of a real wavefunction.
///
/// The one-particle reduced density matrix is
/// ```math
///     \gamma_{pq} = \sum_{\sigma} \braket{a^{\dagger}_{p\sigma} a_{q\sigma}},
/// ```
/// and the two-particle reduced density matrix is stored in the ordering matching chemists'
/// notation for the two-electron integrals,
/// ```math
///     \Gamma_{pqrs} = \sum_{\sigma\tau}
///         \braket{a^{\dagger}_{p\sigma} a^{\dagger}_{r\tau} a_{s\tau} a_{q\sigma}},
/// ```
/// which satisfies $`\Gamma_{pqrs} = \Gamma_{rspq} = \Gamma_{qpsr}`$ for real wavefunctions.
#[derive(Clone, Debug, PartialEq)]
pub struct Rdm {
    /// The one-particle reduced density matrix $`\gamma_{pq}`$.
    one_rdm: Array2<f64>,

    /// The two-particle reduced density matrix $`\Gamma_{pqrs}`$.
    two_rdm: Array4<f64>,
}

impl Rdm {
    /// Constructs a set of reduced density matrices after verifying their shapes and symmetries.
    ///
    /// # Arguments
    ///
    /// * `one_rdm` - The one-particle reduced density matrix.
    /// * `two_rdm` - The two-particle reduced density matrix.
    ///
    /// # Errors
    ///
    /// Errors with [`OrbOptError::DimensionMismatch`] if the two matrices do not span the same
    /// number of orbitals, and with [`OrbOptError::InvalidSymmetry`] if the permutational
    /// symmetries are violated.
    pub fn new(one_rdm: Array2<f64>, two_rdm: Array4<f64>) -> Result<Self, anyhow::Error> {
        let n_orbs = one_rdm.nrows();
        if one_rdm.ncols() != n_orbs || two_rdm.shape().iter().any(|&d| d != n_orbs) {
            return Err(OrbOptError::DimensionMismatch(format!(
                "One-particle density matrix of shape {:?} is inconsistent with two-particle density matrix of shape {:?}.",
                one_rdm.shape(),
                two_rdm.shape()
            ))
            .into());
        }

        let asym = max_asymmetry(&one_rdm.view());
        if asym > RDM_SYMMETRY_THRESHOLD {
            return Err(OrbOptError::InvalidSymmetry(format!(
                "One-particle density matrix is not symmetric (maximum deviation {asym:.3e})."
            ))
            .into());
        }
        let asym = two_rdm
            .indexed_iter()
            .map(|((p, q, r, s), &v)| {
                (v - two_rdm[(r, s, p, q)])
                    .abs()
                    .max((v - two_rdm[(q, p, s, r)]).abs())
            })
            .fold(0.0_f64, f64::max);
        if asym > RDM_SYMMETRY_THRESHOLD {
            return Err(OrbOptError::InvalidSymmetry(format!(
                "Two-particle density matrix violates Γ[p,q,r,s] = Γ[r,s,p,q] = Γ[q,p,s,r] (maximum deviation {asym:.3e})."
            ))
            .into());
        }

        Ok(Self { one_rdm, two_rdm })
    }

    /// Returns the number of orbitals.
    pub fn n_orbs(&self) -> usize {
        self.one_rdm.nrows()
    }

    /// Returns the one-particle reduced density matrix.
    pub fn one_rdm(&self) -> &Array2<f64> {
        &self.one_rdm
    }

    /// Returns the two-particle reduced density matrix.
    pub fn two_rdm(&self) -> &Array4<f64> {
        &self.two_rdm
    }

    /// Returns the number of electrons, *i.e.* the trace of the one-particle density matrix.
    pub fn n_electrons(&self) -> f64 {
        self.one_rdm.diag().sum()
    }

    /// Expresses the density matrices in a rotated orbital basis.
    ///
    /// # Arguments
    ///
    /// * `rot` - An orthogonal matrix whose rows are the new orbitals expanded in the current
    ///   orbitals.
    ///
    /// # Returns
    ///
    /// The rotated density matrices.
    pub fn rotated(&self, rot: &ArrayView2<f64>) -> Result<Self, anyhow::Error> {
        if rot.dim() != (self.n_orbs(), self.n_orbs()) {
            return Err(OrbOptError::DimensionMismatch(format!(
                "Rotation matrix of shape {:?} cannot act on {} orbitals.",
                rot.shape(),
                self.n_orbs()
            ))
            .into());
        }
        let one_rdm = transform_onee(&self.one_rdm.view(), rot);
        let two_rdm = transform_twoe(self.two_rdm.clone(), rot)?;
        Ok(Self {
            one_rdm: (&one_rdm + &one_rdm.t()) * 0.5,
            two_rdm,
        })
    }
}
