//! Orbital update schemes.
//!
//! Each scheme turns the orbital gradient and curvature information of the current orbital basis
//! into one orbital rotation, and stores the integrals transformed by that rotation in the
//! optimiser. Only one scheme is meant to be invoked per optimiser.

use std::cmp::Ordering;

use anyhow::{self, ensure};
use itertools::Itertools;
use ndarray::{Array1, Array2, Axis};
use ndarray_linalg::{Eigh, Norm, UPLO};

use crate::auxiliary::timer::PhaseTimer;
use crate::error::OrbOptError;
use crate::io::format::orbopt_warn;

use super::rotation::fill_rot_matrix_with_parameters;
use super::{AdaDeltaHistory, OrbitalOptimiser, StepSummary, UpdateScheme};

#[cfg(test)]
#[path = "schemes_tests.rs"]
mod schemes_tests;

impl<'a> OrbitalOptimiser<'a> {
    /// Rotates the integrals to the natural orbitals of the one-particle density matrix.
    ///
    /// The one-particle density matrix is diagonalised separately within each block of
    /// non-frozen orbitals sharing an irreducible representation, so that frozen orbitals and
    /// the symmetry of the orbitals are preserved. Within each block, the natural orbitals are
    /// placed in order of descending occupation number, and each is given the phase that makes
    /// its largest coefficient positive.
    pub fn generate_natorb_integrals(&mut self) -> Result<(), anyhow::Error> {
        let mut timer = PhaseTimer::new();
        timer.start("natural-orbital rotation");

        let n_orbs = self.n_orbs();
        let one_rdm = self.rdm.one_rdm();
        let mut rot = Array2::<f64>::eye(n_orbs);
        for block in self.orbital_space.mixing_blocks() {
            let block_rdm = one_rdm.select(Axis(0), &block).select(Axis(1), &block);
            let (occs, vecs) = block_rdm.eigh(UPLO::Lower)?;
            let order = (0..occs.len())
                .sorted_by(|&i, &j| {
                    occs[j]
                        .partial_cmp(&occs[i])
                        .unwrap_or(Ordering::Equal)
                })
                .collect::<Vec<_>>();
            log::debug!(
                "Natural occupation numbers in block {:?}: {:?}",
                block,
                order.iter().map(|&i| occs[i]).collect::<Vec<_>>()
            );
            for (target, &source) in block.iter().zip(order.iter()) {
                let mut vec = vecs.column(source).to_owned();
                let pivot = vec
                    .iter()
                    .copied()
                    .max_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(Ordering::Equal))
                    .unwrap_or(1.0);
                if pivot < 0.0 {
                    vec.mapv_inplace(|c| -c);
                }
                for (&orb, &c) in block.iter().zip(vec.iter()) {
                    rot[(*target, orb)] = c;
                }
            }
        }
        timer.checkpoint("diagonalisation");

        self.new_integrals = Some(self.rotate_integrals(&rot.view())?);
        self.step_summary = Some(StepSummary {
            scheme: UpdateScheme::NaturalOrbitals,
            n_parameters: self.parameter_indices.len(),
            gradient_norm: None,
            step_norm: None,
        });
        timer.end();
        Ok(())
    }

    /// Rotates the integrals along the Newton step $`\mathbf{x} = -\mathbf{H}^{-1}\mathbf{g}`$.
    ///
    /// The Hessian is inverted through its eigendecomposition. Directions whose eigenvalues have
    /// magnitudes below [`UpdateSchemeParams::hessian_eigenvalue_threshold`] are dropped,
    /// and negative eigenvalues are replaced by their magnitudes so that the step always points
    /// downhill.
    ///
    /// [`UpdateSchemeParams::hessian_eigenvalue_threshold`]: super::UpdateSchemeParams::hessian_eigenvalue_threshold
    pub fn generate_optorb_integrals_from_newton(&mut self) -> Result<(), anyhow::Error> {
        let mut timer = PhaseTimer::new();
        timer.start("Newton step");

        let derivatives = self.derivatives()?;
        let grad = derivatives.gradient(&self.parameter_indices);
        let hess = derivatives.hessian(&self.parameter_indices);
        timer.checkpoint("gradient and Hessian");

        let step = if grad.is_empty() {
            Array1::zeros(0)
        } else {
            let (eigvals, eigvecs) = hess.eigh(UPLO::Lower)?;
            let thresh = self.params.hessian_eigenvalue_threshold;
            let n_dropped = eigvals.iter().filter(|lambda| lambda.abs() < thresh).count();
            let n_negative = eigvals.iter().filter(|&&lambda| lambda <= -thresh).count();
            if n_dropped > 0 {
                orbopt_warn!(
                    "{n_dropped} near-singular Hessian direction(s) dropped from the Newton step."
                );
            }
            if n_negative > 0 {
                orbopt_warn!(
                    "{n_negative} negative Hessian eigenvalue(s) replaced by their magnitudes."
                );
            }
            let projected = eigvecs.t().dot(&grad);
            let scaled = Array1::from_iter(projected.iter().zip(eigvals.iter()).map(
                |(&gk, &lambda)| {
                    if lambda.abs() < thresh {
                        0.0
                    } else {
                        -gk / lambda.abs()
                    }
                },
            ));
            eigvecs.dot(&scaled)
        };
        timer.checkpoint("regularised solve");

        self.apply_step(UpdateScheme::Newton, &grad, step)?;
        timer.end();
        Ok(())
    }

    /// Rotates the integrals along the diagonal-Hessian step
    /// $`x_i = -g_i / (\max(|H_{ii}|, h_{\mathrm{min}}) \lambda)`$, where $`\lambda`$ is the
    /// descent parameter and $`h_{\mathrm{min}}`$ the curvature floor.
    ///
    /// # Arguments
    ///
    /// * `descent_param` - The positive factor by which the curvature estimates are scaled.
    ///   Values above one damp the step.
    pub fn generate_optorb_integrals_from_approximate_newton(
        &mut self,
        descent_param: f64,
    ) -> Result<(), anyhow::Error> {
        ensure!(
            descent_param.is_finite() && descent_param > 0.0,
            "The descent parameter must be positive and finite, but is {descent_param}."
        );
        let mut timer = PhaseTimer::new();
        timer.start("approximate Newton step");

        let derivatives = self.derivatives()?;
        let grad = derivatives.gradient(&self.parameter_indices);
        let hess_diag = derivatives.hessian_diagonal(&self.parameter_indices);
        timer.checkpoint("gradient and Hessian diagonal");

        let floor = self.params.curvature_floor;
        let step = Array1::from_iter(
            grad.iter()
                .zip(hess_diag.iter())
                .map(|(&g, &h)| -g / (h.abs().max(floor) * descent_param)),
        );
        self.apply_step(UpdateScheme::ApproximateNewton(descent_param), &grad, step)?;
        timer.end();
        Ok(())
    }

    /// Rotates the integrals along the scaled negative gradient.
    pub fn generate_optorb_integrals_from_grad_descent(&mut self) -> Result<(), anyhow::Error> {
        let mut timer = PhaseTimer::new();
        timer.start("gradient-descent step");

        let grad = self.gradient()?;
        let step = grad.mapv(|g| -g * self.params.grad_descent_step_scale);
        self.apply_step(UpdateScheme::GradientDescent, &grad, step)?;
        timer.end();
        Ok(())
    }

    /// Rotates the integrals along the AdaDelta step.
    ///
    /// With decay rate $`\rho`$ and conditioning constant $`\epsilon`$, for every parameter
    /// ```math
    ///     E[g^2] \leftarrow \rho E[g^2] + (1 - \rho) g^2, \qquad
    ///     \Delta x = -\frac{\sqrt{E[\Delta x^2] + \epsilon}}{\sqrt{E[g^2] + \epsilon}} g, \qquad
    ///     E[\Delta x^2] \leftarrow \rho E[\Delta x^2] + (1 - \rho) \Delta x^2.
    /// ```
    ///
    /// # Arguments
    ///
    /// * `history` - The moving averages from the previous macro-iteration, or
    ///   [`AdaDeltaHistory::zeros`] for the first one.
    ///
    /// # Returns
    ///
    /// The updated moving averages, to be passed to the next macro-iteration. The supplied
    /// history is left untouched, so it remains usable if this call fails.
    ///
    /// # Errors
    ///
    /// Errors with [`OrbOptError::DimensionMismatch`] if the history does not have one entry
    /// per rotation parameter.
    pub fn generate_optorb_integrals_from_adadelta(
        &mut self,
        history: &AdaDeltaHistory,
    ) -> Result<AdaDeltaHistory, anyhow::Error> {
        let n_params = self.parameter_indices.len();
        if history.mean_sq_gradient.len() != n_params || history.mean_sq_update.len() != n_params
        {
            return Err(OrbOptError::DimensionMismatch(format!(
                "AdaDelta history of lengths ({}, {}) supplied for {n_params} rotation parameters.",
                history.mean_sq_gradient.len(),
                history.mean_sq_update.len()
            ))
            .into());
        }
        let mut timer = PhaseTimer::new();
        timer.start("AdaDelta step");

        let rho = self.params.adadelta_decay_rate;
        let eps = self.params.adadelta_epsilon;
        let grad = self.gradient()?;
        let mean_sq_gradient = &history.mean_sq_gradient * rho + grad.mapv(|g| g * g) * (1.0 - rho);
        let step = Array1::from_iter(
            grad.iter()
                .zip(mean_sq_gradient.iter())
                .zip(history.mean_sq_update.iter())
                .map(|((&g, &eg2), &edx2)| -((edx2 + eps).sqrt() / (eg2 + eps).sqrt()) * g),
        );
        let applied = self.apply_step(UpdateScheme::AdaDelta, &grad, step)?;
        let mean_sq_update = &history.mean_sq_update * rho + applied.mapv(|x| x * x) * (1.0 - rho);
        timer.end();

        Ok(AdaDeltaHistory {
            mean_sq_gradient,
            mean_sq_update,
        })
    }

    /// Turns a parameter vector into a rotation, transforms the integrals, and records the step.
    ///
    /// # Returns
    ///
    /// The parameter vector actually applied, after any step-norm cap.
    fn apply_step(
        &mut self,
        scheme: UpdateScheme,
        grad: &Array1<f64>,
        mut step: Array1<f64>,
    ) -> Result<Array1<f64>, anyhow::Error> {
        if step.iter().any(|x| !x.is_finite()) {
            return Err(OrbOptError::NumericalConditioning(format!(
                "The {scheme} step contains non-finite rotation parameters."
            ))
            .into());
        }
        let mut step_norm = step.norm_l2();
        if let Some(max_norm) = self.params.max_step_norm {
            if step_norm > max_norm {
                log::debug!("Step norm {step_norm:.3e} capped at {max_norm:.3e}.");
                step *= max_norm / step_norm;
                step_norm = max_norm;
            }
        }
        let gradient_norm = grad.norm_l2();
        log::debug!(
            "{scheme} step: gradient norm {gradient_norm:.6e}, step norm {step_norm:.6e}."
        );

        let n_orbs = self.n_orbs();
        let mut rot = Array2::<f64>::zeros((n_orbs, n_orbs));
        fill_rot_matrix_with_parameters(
            &mut rot,
            &step.view(),
            &self.parameter_indices,
            self.params.orthogonality_threshold,
        )?;
        self.new_integrals = Some(self.rotate_integrals(&rot.view())?);
        self.step_summary = Some(StepSummary {
            scheme,
            n_parameters: self.parameter_indices.len(),
            gradient_norm: Some(gradient_norm),
            step_norm: Some(step_norm),
        });
        Ok(step)
    }
}
