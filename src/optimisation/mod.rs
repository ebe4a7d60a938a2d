//! Orbital optimisation for multiconfigurational wavefunctions.
//!
//! An [`OrbitalOptimiser`] is bound to one set of reduced density matrices and one set of
//! integrals for a single macro-iteration of an outer optimisation loop. It evaluates the orbital
//! gradient and Hessian, turns them into an orbital rotation through one of several update
//! schemes, and applies that rotation to the integrals. The rotated integrals can then be dumped
//! to disk or committed back to the borrowed integral store.

use std::cell::OnceCell;
use std::fmt;

use anyhow;
use derive_builder::Builder;
use ndarray::{Array1, Array2, Array4};
use serde::{Deserialize, Serialize};

use crate::error::OrbOptError;
use crate::integrals::Integrals;
use crate::orbital_space::{OrbitalSpace, RotationIndex};
use crate::rdm::Rdm;

pub mod derivatives;
pub(crate) mod output;
pub mod rotation;
pub(crate) mod schemes;
pub(crate) mod transform;

use derivatives::{calc_generalised_fock_matrix, OrbitalDerivatives};


// ================
// Enum definitions
// ================

/// Enumerated type for the orbital update schemes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum UpdateScheme {
    /// Variant for rotating to the natural orbitals of the one-particle density matrix.
    NaturalOrbitals,

    /// Variant for the full Newton step with a regularised Hessian.
    Newton,

    /// Variant for the diagonal-Hessian Newton step. The associated value is the descent
    /// parameter by which the curvature estimates are scaled.
    ApproximateNewton(f64),

    /// Variant for a fixed-scale steepest-descent step.
    GradientDescent,

    /// Variant for the AdaDelta adaptive step.
    AdaDelta,
}

impl fmt::Display for UpdateScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NaturalOrbitals => write!(f, "natural orbitals"),
            Self::Newton => write!(f, "Newton"),
            Self::ApproximateNewton(descent_param) => {
                write!(f, "approximate Newton (descent parameter {descent_param:.3e})")
            }
            Self::GradientDescent => write!(f, "gradient descent"),
            Self::AdaDelta => write!(f, "AdaDelta"),
        }
    }
}

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// Structure containing control parameters for the orbital update schemes.
#[derive(Clone, Builder, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
#[serde(try_from = "UncheckedUpdateSchemeParams")]
pub struct UpdateSchemeParams {
    /// The factor by which the negative gradient is scaled in gradient descent.
    #[builder(default = "0.01")]
    pub grad_descent_step_scale: f64,

    /// The decay rate $`\rho`$ of the AdaDelta moving averages.
    #[builder(default = "0.95")]
    pub adadelta_decay_rate: f64,

    /// The conditioning constant $`\epsilon`$ added inside the AdaDelta root-mean-squares.
    #[builder(default = "1e-8")]
    pub adadelta_epsilon: f64,

    /// Hessian eigenvalues with magnitudes below this threshold are discarded in the Newton
    /// step.
    #[builder(default = "1e-8")]
    pub hessian_eigenvalue_threshold: f64,

    /// The smallest magnitude a diagonal Hessian element may take in the approximate Newton
    /// step.
    #[builder(default = "1e-8")]
    pub curvature_floor: f64,

    /// Optional maximum norm of a step. Longer steps are scaled down to this norm.
    #[builder(default = "None")]
    pub max_step_norm: Option<f64>,

    /// The largest tolerated deviation of $`\mathbf{R}^{\mathsf{T}}\mathbf{R}`$ from the identity.
    #[builder(default = "1e-10")]
    pub orthogonality_threshold: f64,
}

impl UpdateSchemeParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        let positive = |name: &str, value: Option<f64>| match value {
            Some(v) if !(v.is_finite() && v > 0.0) => {
                Err(format!("`{name}` must be positive and finite, but is {v}."))
            }
            _ => Ok(()),
        };
        positive("grad_descent_step_scale", self.grad_descent_step_scale)?;
        positive("adadelta_epsilon", self.adadelta_epsilon)?;
        positive("hessian_eigenvalue_threshold", self.hessian_eigenvalue_threshold)?;
        positive("curvature_floor", self.curvature_floor)?;
        positive("orthogonality_threshold", self.orthogonality_threshold)?;
        positive("max_step_norm", self.max_step_norm.flatten())?;
        if let Some(rho) = self.adadelta_decay_rate {
            if !(0.0..1.0).contains(&rho) {
                return Err(format!("`adadelta_decay_rate` must lie in [0, 1), but is {rho}."));
            }
        }
        Ok(())
    }
}

impl UpdateSchemeParams {
    /// Returns a builder to construct an [`UpdateSchemeParams`] structure.
    pub fn builder() -> UpdateSchemeParamsBuilder {
        UpdateSchemeParamsBuilder::default()
    }
}

impl Default for UpdateSchemeParams {
    fn default() -> Self {
        Self {
            grad_descent_step_scale: 0.01,
            adadelta_decay_rate: 0.95,
            adadelta_epsilon: 1e-8,
            hessian_eigenvalue_threshold: 1e-8,
            curvature_floor: 1e-8,
            max_step_norm: None,
            orthogonality_threshold: 1e-10,
        }
    }
}

/// Deserialised form of [`UpdateSchemeParams`] whose values have not yet been checked by
/// [`UpdateSchemeParamsBuilder`].
#[derive(Deserialize)]
#[serde(default)]
struct UncheckedUpdateSchemeParams {
    grad_descent_step_scale: f64,
    adadelta_decay_rate: f64,
    adadelta_epsilon: f64,
    hessian_eigenvalue_threshold: f64,
    curvature_floor: f64,
    max_step_norm: Option<f64>,
    orthogonality_threshold: f64,
}

impl Default for UncheckedUpdateSchemeParams {
    fn default() -> Self {
        let params = UpdateSchemeParams::default();
        Self {
            grad_descent_step_scale: params.grad_descent_step_scale,
            adadelta_decay_rate: params.adadelta_decay_rate,
            adadelta_epsilon: params.adadelta_epsilon,
            hessian_eigenvalue_threshold: params.hessian_eigenvalue_threshold,
            curvature_floor: params.curvature_floor,
            max_step_norm: params.max_step_norm,
            orthogonality_threshold: params.orthogonality_threshold,
        }
    }
}

impl TryFrom<UncheckedUpdateSchemeParams> for UpdateSchemeParams {
    type Error = UpdateSchemeParamsBuilderError;

    fn try_from(unchecked: UncheckedUpdateSchemeParams) -> Result<Self, Self::Error> {
        Self::builder()
            .grad_descent_step_scale(unchecked.grad_descent_step_scale)
            .adadelta_decay_rate(unchecked.adadelta_decay_rate)
            .adadelta_epsilon(unchecked.adadelta_epsilon)
            .hessian_eigenvalue_threshold(unchecked.hessian_eigenvalue_threshold)
            .curvature_floor(unchecked.curvature_floor)
            .max_step_norm(unchecked.max_step_norm)
            .orthogonality_threshold(unchecked.orthogonality_threshold)
            .build()
    }
}

impl fmt::Display for UpdateSchemeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Gradient-descent step scale: {:.3e}",
            self.grad_descent_step_scale
        )?;
        writeln!(f, "AdaDelta decay rate: {:.3}", self.adadelta_decay_rate)?;
        writeln!(f, "AdaDelta epsilon: {:.3e}", self.adadelta_epsilon)?;
        writeln!(
            f,
            "Hessian eigenvalue threshold: {:.3e}",
            self.hessian_eigenvalue_threshold
        )?;
        writeln!(f, "Curvature floor: {:.3e}", self.curvature_floor)?;
        writeln!(
            f,
            "Maximum step norm: {}",
            self.max_step_norm
                .map(|v| format!("{v:.3e}"))
                .unwrap_or_else(|| "--".to_string())
        )?;
        writeln!(
            f,
            "Orthogonality threshold: {:.3e}",
            self.orthogonality_threshold
        )?;
        Ok(())
    }
}

// ----------------
// AdaDelta history
// ----------------

/// Structure holding the per-parameter moving averages of AdaDelta.
///
/// The history is owned by the caller and threaded through successive macro-iterations. It must
/// have one entry per rotation parameter, in the order of
/// [`OrbitalSpace::parameter_indices`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaDeltaHistory {
    /// The moving average of the squared gradient, $`E[g^2]`$.
    pub mean_sq_gradient: Array1<f64>,

    /// The moving average of the squared update, $`E[\Delta x^2]`$.
    pub mean_sq_update: Array1<f64>,
}

impl AdaDeltaHistory {
    /// Constructs an all-zero history for `n_params` rotation parameters.
    pub fn zeros(n_params: usize) -> Self {
        Self {
            mean_sq_gradient: Array1::zeros(n_params),
            mean_sq_update: Array1::zeros(n_params),
        }
    }

    /// Returns the number of rotation parameters covered by this history.
    pub fn len(&self) -> usize {
        self.mean_sq_gradient.len()
    }

    /// Returns `true` if the history covers no rotation parameters.
    pub fn is_empty(&self) -> bool {
        self.mean_sq_gradient.is_empty()
    }
}

// ------------
// Step summary
// ------------

/// Structure summarising the most recent orbital update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// The scheme used.
    pub scheme: UpdateScheme,

    /// The number of independent rotation parameters.
    pub n_parameters: usize,

    /// The Euclidean norm of the orbital gradient, if the scheme computed one.
    pub gradient_norm: Option<f64>,

    /// The Euclidean norm of the applied parameter vector, if the scheme produced one.
    pub step_norm: Option<f64>,
}

impl fmt::Display for StepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_norm = |norm: Option<f64>| {
            norm.map(|v| format!("{v:.6e}"))
                .unwrap_or_else(|| "--".to_string())
        };
        writeln!(f, "Update scheme: {}", self.scheme)?;
        writeln!(f, "Rotation parameters: {}", self.n_parameters)?;
        writeln!(f, "Gradient norm: {}", fmt_norm(self.gradient_norm))?;
        writeln!(f, "Step norm: {}", fmt_norm(self.step_norm))?;
        Ok(())
    }
}

// ---------
// Optimiser
// ---------

/// Structure performing one orbital update for a fixed set of reduced density matrices.
///
/// The optimiser never owns the integral or density-matrix stores. The density matrices are only
/// read. The integrals are only modified by [`Self::rewrite_integrals`], which consumes the
/// optimiser and replaces their contents wholesale.
pub struct OrbitalOptimiser<'a> {
    /// The reduced density matrices of the current wavefunction.
    rdm: &'a Rdm,

    /// The integral store.
    integrals: &'a mut Integrals,

    /// The orbital-space metadata determining the independent rotation parameters.
    orbital_space: OrbitalSpace,

    /// The control parameters for the update schemes.
    params: UpdateSchemeParams,

    /// The independent rotation parameters.
    parameter_indices: Vec<RotationIndex>,

    /// The dense two-electron integrals in the current orbital basis.
    twoe_dense: Array4<f64>,

    /// The generalised Fock matrix, computed on first use.
    fock: OnceCell<Array2<f64>>,

    /// The integrals in the rotated orbital basis produced by the most recent update.
    new_integrals: Option<Integrals>,

    /// The summary of the most recent update.
    step_summary: Option<StepSummary>,
}

impl<'a> OrbitalOptimiser<'a> {
    /// Binds an optimiser to a set of reduced density matrices and integrals.
    ///
    /// # Arguments
    ///
    /// * `rdm` - The reduced density matrices, which are only read.
    /// * `integrals` - The integral store, which is only modified by
    ///   [`Self::rewrite_integrals`].
    /// * `orbital_space` - The orbital-space metadata.
    /// * `params` - The control parameters.
    ///
    /// # Errors
    ///
    /// Errors with [`OrbOptError::DimensionMismatch`] if the density matrices, the integrals, and
    /// the orbital space do not all span the same number of orbitals.
    pub fn new(
        rdm: &'a Rdm,
        integrals: &'a mut Integrals,
        orbital_space: OrbitalSpace,
        params: UpdateSchemeParams,
    ) -> Result<Self, anyhow::Error> {
        let n_orbs = integrals.n_orbs();
        if rdm.n_orbs() != n_orbs || orbital_space.n_orbs() != n_orbs {
            return Err(OrbOptError::DimensionMismatch(format!(
                "The integrals span {n_orbs} orbitals, the reduced density matrices span {}, and the orbital space spans {}.",
                rdm.n_orbs(),
                orbital_space.n_orbs()
            ))
            .into());
        }
        let parameter_indices = orbital_space.parameter_indices();
        log::debug!(
            "Orbital optimiser over {n_orbs} orbitals with {} rotation parameters.",
            parameter_indices.len()
        );
        let twoe_dense = integrals.twoe().to_dense();
        Ok(Self {
            rdm,
            integrals,
            orbital_space,
            params,
            parameter_indices,
            twoe_dense,
            fock: OnceCell::new(),
            new_integrals: None,
            step_summary: None,
        })
    }

    /// Returns the number of orbitals.
    pub fn n_orbs(&self) -> usize {
        self.integrals.n_orbs()
    }

    /// Returns the orbital-space metadata.
    pub fn orbital_space(&self) -> &OrbitalSpace {
        &self.orbital_space
    }

    /// Returns the control parameters.
    pub fn params(&self) -> &UpdateSchemeParams {
        &self.params
    }

    /// Returns the independent rotation parameters, in the order used by all parameter vectors,
    /// gradients, and Hessians.
    pub fn parameter_indices(&self) -> &[RotationIndex] {
        &self.parameter_indices
    }

    /// Returns the dense two-electron integrals in the current orbital basis.
    pub(crate) fn twoe_dense(&self) -> &Array4<f64> {
        &self.twoe_dense
    }

    /// Returns the generalised Fock matrix in the current orbital basis, computing it on first
    /// use.
    pub fn fock_matrix(&self) -> Result<&Array2<f64>, anyhow::Error> {
        if let Some(fock) = self.fock.get() {
            return Ok(fock);
        }
        log::debug!("Building generalised Fock matrix...");
        let fock = calc_generalised_fock_matrix(
            &self.integrals.onee().view(),
            &self.twoe_dense.view(),
            &self.rdm.one_rdm().view(),
            &self.rdm.two_rdm().view(),
        )?;
        log::debug!("Building generalised Fock matrix... Done.");
        Ok(self.fock.get_or_init(|| fock))
    }

    /// Returns the derivative evaluator in the current orbital basis.
    pub fn derivatives(&self) -> Result<OrbitalDerivatives<'_>, anyhow::Error> {
        let fock = self.fock_matrix()?;
        Ok(OrbitalDerivatives::new(
            self.integrals.onee().view(),
            self.twoe_dense.view(),
            self.rdm.one_rdm().view(),
            self.rdm.two_rdm().view(),
            fock.view(),
        ))
    }

    /// Returns the orbital gradient over the independent rotation parameters.
    pub fn gradient(&self) -> Result<Array1<f64>, anyhow::Error> {
        Ok(self.derivatives()?.gradient(&self.parameter_indices))
    }

    /// Returns the full orbital Hessian over the independent rotation parameters.
    pub fn hessian(&self) -> Result<Array2<f64>, anyhow::Error> {
        Ok(self.derivatives()?.hessian(&self.parameter_indices))
    }

    /// Returns the diagonal of the orbital Hessian over the independent rotation parameters.
    pub fn hessian_diagonal(&self) -> Result<Array1<f64>, anyhow::Error> {
        Ok(self.derivatives()?.hessian_diagonal(&self.parameter_indices))
    }

    /// Returns the energy in the current orbital basis.
    pub fn energy(&self) -> Result<f64, anyhow::Error> {
        self.integrals.energy(self.rdm)
    }

    /// Returns the energy of the current density matrices with the most recently rotated
    /// integrals, if any. This is the energy at fixed wavefunction coefficients, before the
    /// wavefunction is reoptimised in the new orbital basis.
    pub fn new_energy(&self) -> Result<Option<f64>, anyhow::Error> {
        self.new_integrals
            .as_ref()
            .map(|ints| ints.energy(self.rdm))
            .transpose()
    }

    /// Returns the integrals produced by the most recent update, if any.
    pub fn new_integrals(&self) -> Option<&Integrals> {
        self.new_integrals.as_ref()
    }

    /// Returns the summary of the most recent update, if any.
    pub fn step_summary(&self) -> Option<&StepSummary> {
        self.step_summary.as_ref()
    }
}
