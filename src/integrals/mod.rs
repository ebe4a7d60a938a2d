//! One- and two-electron integrals in an orthonormal orbital basis.

use std::fmt;

use anyhow::{self, format_err};
use ndarray::{Array2, Array4, ArrayView2, ArrayView4, Zip};

use crate::error::OrbOptError;
use crate::rdm::Rdm;


/// Default threshold for verifying the permutational symmetry of integral tensors.
pub const INTEGRAL_SYMMETRY_THRESHOLD: f64 = 1e-8;

// ==================
// Struct definitions
// ==================

/// Structure storing real two-electron integrals $`(pq|rs)`$ in chemists' notation.
///
/// Only one representative of each set of elements related by the eightfold permutational
/// symmetry
/// ```math
///     (pq|rs) = (qp|rs) = (pq|sr) = (qp|sr) = (rs|pq) = (sr|pq) = (rs|qp) = (sr|qp)
/// ```
/// is held in a single contiguous buffer. Reads and writes always act on the whole symmetry class
/// of an element, so the symmetry cannot be broken through this structure.
#[derive(Clone, Debug, PartialEq)]
pub struct EriTensor {
    /// The number of orbitals.
    n_orbs: usize,

    /// The unique integrals, ordered by their compound index.
    data: Vec<f64>,
}

/// Returns the index of the unordered pair $`\{i, j\}`$ in the lower triangle.
fn pair_index(i: usize, j: usize) -> usize {
    let (hi, lo) = if i >= j { (i, j) } else { (j, i) };
    hi * (hi + 1) / 2 + lo
}

impl EriTensor {
    /// Constructs a two-electron integral tensor with all elements zero.
    ///
    /// # Arguments
    ///
    /// * `n_orbs` - The number of orbitals.
    pub fn zeros(n_orbs: usize) -> Self {
        let n_pairs = n_orbs * (n_orbs + 1) / 2;
        Self {
            n_orbs,
            data: vec![0.0; n_pairs * (n_pairs + 1) / 2],
        }
    }

    /// Constructs a two-electron integral tensor from a dense four-index array.
    ///
    /// Each stored element is the average over its symmetry class in `dense`.
    ///
    /// # Arguments
    ///
    /// * `dense` - The dense array $`(pq|rs)`$ indexed as `[p, q, r, s]`.
    /// * `thresh` - Maximum tolerated deviation between symmetry-related elements.
    ///
    /// # Errors
    ///
    /// Errors with [`OrbOptError::DimensionMismatch`] if the array is not hypercubic, and with
    /// [`OrbOptError::InvalidSymmetry`] if symmetry-related elements differ by more than `thresh`.
    pub fn from_dense(dense: &ArrayView4<f64>, thresh: f64) -> Result<Self, anyhow::Error> {
        let eri = Self::symmetrised_from_dense(dense)?;
        let (dev, (p, q, r, s)) = dense
            .indexed_iter()
            .map(|(pqrs, &v)| {
                let (p, q, r, s) = pqrs;
                ((v - eri.get(p, q, r, s)).abs(), pqrs)
            })
            .fold((0.0_f64, (0, 0, 0, 0)), |acc, item| {
                if item.0 > acc.0 {
                    item
                } else {
                    acc
                }
            });
        if dev > thresh {
            Err(OrbOptError::InvalidSymmetry(format!(
                "({p}{q}|{r}{s}) deviates from the average of its symmetry-equivalent elements by {dev:.3e}."
            ))
            .into())
        } else {
            Ok(eri)
        }
    }

    /// Constructs a two-electron integral tensor from a dense four-index array by averaging
    /// every symmetry class, without checking how far apart the averaged elements are.
    pub(crate) fn symmetrised_from_dense(dense: &ArrayView4<f64>) -> Result<Self, anyhow::Error> {
        let shape = dense.shape();
        let n_orbs = shape[0];
        if shape.iter().any(|&d| d != n_orbs) {
            return Err(OrbOptError::DimensionMismatch(format!(
                "Two-electron integrals must have four equal dimensions, but have shape {shape:?}."
            ))
            .into());
        }
        let mut eri = Self::zeros(n_orbs);
        let mut counts = vec![0_usize; eri.len()];
        for ((p, q, r, s), &v) in dense.indexed_iter() {
            let idx = Self::compound_index(p, q, r, s);
            eri.data[idx] += v;
            counts[idx] += 1;
        }
        eri.data
            .iter_mut()
            .zip(counts.iter())
            .filter(|(_, count)| **count > 0)
            .for_each(|(v, &count)| *v /= count as f64);
        Ok(eri)
    }

    /// Returns the number of orbitals.
    pub fn n_orbs(&self) -> usize {
        self.n_orbs
    }

    /// Returns the number of unique integrals stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no integrals are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the position of $`(pq|rs)`$ in the packed buffer.
    pub fn compound_index(p: usize, q: usize, r: usize, s: usize) -> usize {
        pair_index(pair_index(p, q), pair_index(r, s))
    }

    /// Returns the integral $`(pq|rs)`$.
    pub fn get(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        self.data[Self::compound_index(p, q, r, s)]
    }

    /// Sets the integral $`(pq|rs)`$ together with all its symmetry-equivalent elements.
    pub fn set(&mut self, p: usize, q: usize, r: usize, s: usize, value: f64) {
        self.data[Self::compound_index(p, q, r, s)] = value;
    }

    /// Expands the packed integrals into a dense four-index array.
    pub fn to_dense(&self) -> Array4<f64> {
        let n = self.n_orbs;
        Array4::from_shape_fn((n, n, n, n), |(p, q, r, s)| self.get(p, q, r, s))
    }
}

/// Structure managing the integrals defining the electronic Hamiltonian in an orthonormal
/// orbital basis.
///
/// The electronic energy of a state described by the reduced density matrices
/// $`\gamma_{pq}`$ and $`\Gamma_{pqrs}`$ (see [`Rdm`]) is
/// ```math
///     E = E_{\mathrm{core}} + \sum_{pq} h_{pq} \gamma_{pq}
///       + \frac{1}{2} \sum_{pqrs} (pq|rs) \Gamma_{pqrs}.
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Integrals {
    /// The constant energy contribution (nuclear repulsion and frozen-core energy). This is
    /// invariant under orbital rotations.
    core_energy: f64,

    /// The one-electron integrals $`h_{pq}`$.
    onee: Array2<f64>,

    /// The two-electron integrals $`(pq|rs)`$.
    twoe: EriTensor,
}

impl Integrals {
    /// Constructs a set of integrals.
    ///
    /// # Arguments
    ///
    /// * `core_energy` - The constant energy contribution.
    /// * `onee` - The one-electron integrals, which must be symmetric.
    /// * `twoe` - The two-electron integrals.
    ///
    /// # Errors
    ///
    /// Errors if the one-electron matrix is not square, is not symmetric, or does not have the
    /// same number of orbitals as `twoe`.
    pub fn new(core_energy: f64, onee: Array2<f64>, twoe: EriTensor) -> Result<Self, anyhow::Error> {
        let (nrows, ncols) = onee.dim();
        if nrows != ncols || nrows != twoe.n_orbs() {
            return Err(OrbOptError::DimensionMismatch(format!(
                "One-electron integrals of shape ({nrows}, {ncols}) are inconsistent with two-electron integrals over {} orbitals.",
                twoe.n_orbs()
            ))
            .into());
        }
        let asym = max_asymmetry(&onee.view());
        if asym > INTEGRAL_SYMMETRY_THRESHOLD {
            return Err(OrbOptError::InvalidSymmetry(format!(
                "One-electron integrals are not symmetric (maximum deviation {asym:.3e})."
            ))
            .into());
        }
        let onee = (&onee + &onee.t()) * 0.5;
        Ok(Self {
            core_energy,
            onee,
            twoe,
        })
    }

    /// Returns the number of orbitals.
    pub fn n_orbs(&self) -> usize {
        self.onee.nrows()
    }

    /// Returns the constant energy contribution.
    pub fn core_energy(&self) -> f64 {
        self.core_energy
    }

    /// Returns the one-electron integrals.
    pub fn onee(&self) -> &Array2<f64> {
        &self.onee
    }

    /// Returns the two-electron integrals.
    pub fn twoe(&self) -> &EriTensor {
        &self.twoe
    }

    /// Evaluates the energy of the state described by `rdm` with these integrals.
    ///
    /// # Errors
    ///
    /// Errors with [`OrbOptError::DimensionMismatch`] if `rdm` is defined over a different number
    /// of orbitals.
    pub fn energy(&self, rdm: &Rdm) -> Result<f64, anyhow::Error> {
        if rdm.n_orbs() != self.n_orbs() {
            return Err(OrbOptError::DimensionMismatch(format!(
                "The integrals span {} orbitals, but the reduced density matrices span {}.",
                self.n_orbs(),
                rdm.n_orbs()
            ))
            .into());
        }
        let onee_energy = Zip::from(&self.onee)
            .and(rdm.one_rdm())
            .fold(0.0, |acc, h, g| acc + h * g);
        let twoe_energy = Zip::from(&self.twoe.to_dense())
            .and(rdm.two_rdm())
            .fold(0.0, |acc, v, g| acc + v * g);
        let energy = self.core_energy + onee_energy + 0.5 * twoe_energy;
        if energy.is_finite() {
            Ok(energy)
        } else {
            Err(format_err!("Non-finite energy encountered: {energy}."))
        }
    }

    /// Replaces the contents of this set of integrals wholesale with `other`.
    pub fn replace_with(&mut self, other: Integrals) {
        *self = other;
    }
}

impl fmt::Display for Integrals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of orbitals: {}", self.n_orbs())?;
        writeln!(f, "Core energy: {:+.10}", self.core_energy)?;
        writeln!(f, "Unique two-electron integrals: {}", self.twoe.len())?;
        Ok(())
    }
}

/// Returns the largest absolute deviation of a square matrix from symmetry.
pub(crate) fn max_asymmetry(mat: &ArrayView2<f64>) -> f64 {
    Zip::from(mat)
        .and(&mat.t())
        .fold(0.0_f64, |acc, a, b| acc.max((a - b).abs()))
}
