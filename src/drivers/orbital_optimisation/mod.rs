//! Driver for a single orbital-optimisation macro-iteration.

use std::fmt;
use std::path::PathBuf;

use anyhow::{self, format_err};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::drivers::OrbOptDriver;
use crate::error::OrbOptError;
use crate::integrals::Integrals;
use crate::io::format::{
    log_macsec_begin, log_macsec_end, log_subtitle, log_title, nice_bool, orbopt_error,
    orbopt_output, OrbOptOutput,
};
use crate::io::{write_orbopt_binary, OrbOptFileType};
use crate::optimisation::{
    AdaDeltaHistory, OrbitalOptimiser, StepSummary, UpdateScheme, UpdateSchemeParams,
};
use crate::orbital_space::OrbitalSpace;
use crate::rdm::Rdm;

#[cfg(test)]
#[path = "orbital_optimisation_tests.rs"]
mod orbital_optimisation_tests;

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// Structure containing control parameters for one orbital-optimisation macro-iteration.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
#[serde(try_from = "UncheckedOrbitalOptimisationParams")]
pub struct OrbitalOptimisationParams {
    /// The orbital update scheme.
    pub update_scheme: UpdateScheme,

    /// The control parameters of the update schemes.
    #[builder(default = "UpdateSchemeParams::default()")]
    pub scheme_params: UpdateSchemeParams,

    /// Optional path to which the rotated integrals are dumped. If `None`, no dump is written.
    #[builder(default = "None")]
    pub integrals_dump_path: Option<PathBuf>,

    /// Boolean indicating if the rotated integrals are committed to the integral store.
    #[builder(default = "true")]
    pub commit: bool,

    /// Optional name for saving the step summary as a binary file of type
    /// [`OrbOptFileType::Stp`] and, for AdaDelta, the updated history as a binary file of type
    /// [`OrbOptFileType::Hst`]. If `None`, nothing will be saved.
    #[builder(default = "None")]
    pub result_save_name: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

/// Deserialised form of [`OrbitalOptimisationParams`] whose values have not yet been checked by
/// [`OrbitalOptimisationParamsBuilder`].
#[derive(Deserialize)]
struct UncheckedOrbitalOptimisationParams {
    update_scheme: UpdateScheme,

    #[serde(default)]
    scheme_params: UpdateSchemeParams,

    #[serde(default)]
    integrals_dump_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    commit: bool,

    #[serde(default)]
    result_save_name: Option<PathBuf>,
}

impl TryFrom<UncheckedOrbitalOptimisationParams> for OrbitalOptimisationParams {
    type Error = OrbitalOptimisationParamsBuilderError;

    fn try_from(unchecked: UncheckedOrbitalOptimisationParams) -> Result<Self, Self::Error> {
        Self::builder()
            .update_scheme(unchecked.update_scheme)
            .scheme_params(unchecked.scheme_params)
            .integrals_dump_path(unchecked.integrals_dump_path)
            .commit(unchecked.commit)
            .result_save_name(unchecked.result_save_name)
            .build()
    }
}

impl OrbitalOptimisationParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.update_scheme {
            Some(UpdateScheme::ApproximateNewton(descent_param))
                if !(descent_param.is_finite() && descent_param > 0.0) =>
            {
                Err(format!(
                    "The descent parameter must be positive and finite, but is {descent_param}."
                ))
            }
            Some(_) => Ok(()),
            None => Err("No orbital update scheme found.".to_string()),
        }
    }
}

impl OrbitalOptimisationParams {
    /// Returns a builder to construct an [`OrbitalOptimisationParams`] structure.
    pub fn builder() -> OrbitalOptimisationParamsBuilder {
        OrbitalOptimisationParamsBuilder::default()
    }
}

impl fmt::Display for OrbitalOptimisationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Update scheme: {}", self.update_scheme)?;
        write!(f, "{}", self.scheme_params)?;
        writeln!(
            f,
            "Dump rotated integrals to file: {}",
            self.integrals_dump_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| nice_bool(false))
        )?;
        writeln!(
            f,
            "Commit rotated integrals: {}",
            nice_bool(self.commit)
        )?;
        writeln!(
            f,
            "Save step summary to file: {}",
            self.result_save_name
                .as_ref()
                .map(|name| format!("{}.{}", name.display(), OrbOptFileType::Stp.ext()))
                .unwrap_or_else(|| nice_bool(false))
        )?;
        Ok(())
    }
}

// ------
// Result
// ------

/// Structure containing the outcome of one orbital-optimisation macro-iteration.
#[derive(Clone, Builder, Debug)]
pub struct OrbitalOptimisationResult<'a> {
    /// The control parameters used to obtain this result.
    parameters: &'a OrbitalOptimisationParams,

    /// The summary of the update step.
    pub step_summary: StepSummary,

    /// The energy in the orbital basis before the update.
    pub energy_before: f64,

    /// The energy of the unchanged density matrices in the rotated orbital basis.
    pub energy_after: f64,

    /// The updated AdaDelta history, for the AdaDelta scheme only.
    #[builder(default = "None")]
    pub adadelta_history: Option<AdaDeltaHistory>,

    /// Boolean indicating if the rotated integrals have been committed to the integral store.
    pub committed: bool,
}

impl<'a> OrbitalOptimisationResult<'a> {
    fn builder() -> OrbitalOptimisationResultBuilder<'a> {
        OrbitalOptimisationResultBuilder::default()
    }

    /// Returns the control parameters used to obtain this result.
    pub fn parameters(&self) -> &OrbitalOptimisationParams {
        self.parameters
    }
}

impl<'a> fmt::Display for OrbitalOptimisationResult<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step_summary)?;
        writeln!(f, "Energy before update: {:+.10}", self.energy_before)?;
        writeln!(f, "Energy after update:  {:+.10}", self.energy_after)?;
        writeln!(
            f,
            "Energy change:        {:+.4e}",
            self.energy_after - self.energy_before
        )?;
        writeln!(f, "Integrals committed: {}", nice_bool(self.committed))?;
        Ok(())
    }
}

// ------
// Driver
// ------

/// Driver for one orbital-optimisation macro-iteration.
///
/// The driver binds an [`OrbitalOptimiser`] to the supplied density matrices and integrals, runs
/// the requested update scheme once, and then optionally dumps and commits the rotated
/// integrals. Looping over macro-iterations, and reoptimising the wavefunction in between, is
/// left to the caller.
#[derive(Builder)]
#[builder(pattern = "owned", build_fn(validate = "Self::validate"))]
pub struct OrbitalOptimisationDriver<'a> {
    /// The control parameters.
    parameters: &'a OrbitalOptimisationParams,

    /// The reduced density matrices of the current wavefunction.
    rdm: &'a Rdm,

    /// The integral store, which receives the rotated integrals if
    /// [`OrbitalOptimisationParams::commit`] is set.
    integrals: &'a mut Integrals,

    /// The orbital-space metadata.
    orbital_space: &'a OrbitalSpace,

    /// The AdaDelta history from the previous macro-iteration. If `None`, an all-zero history is
    /// used.
    #[builder(default = "None")]
    adadelta_history: Option<&'a AdaDeltaHistory>,

    /// The result of the macro-iteration.
    #[builder(setter(skip), default = "None")]
    result: Option<OrbitalOptimisationResult<'a>>,
}

impl<'a> OrbitalOptimisationDriverBuilder<'a> {
    fn validate(&self) -> Result<(), String> {
        let rdm = self
            .rdm
            .ok_or("No reduced density matrices found.".to_string())?;
        let integrals = self
            .integrals
            .as_ref()
            .ok_or("No integrals found.".to_string())?;
        let orbital_space = self
            .orbital_space
            .ok_or("No orbital space found.".to_string())?;
        if rdm.n_orbs() != integrals.n_orbs() || orbital_space.n_orbs() != integrals.n_orbs() {
            return Err(format!(
                "Inconsistent numbers of orbitals: {} in the integrals, {} in the density matrices, {} in the orbital space.",
                integrals.n_orbs(),
                rdm.n_orbs(),
                orbital_space.n_orbs()
            ));
        }
        if let Some(Some(history)) = self.adadelta_history {
            let n_params = orbital_space.parameter_indices().len();
            if history.len() != n_params {
                return Err(format!(
                    "AdaDelta history of length {} supplied for {n_params} rotation parameters.",
                    history.len()
                ));
            }
        }
        Ok(())
    }
}

impl<'a> OrbitalOptimisationDriver<'a> {
    /// Returns a builder to construct an [`OrbitalOptimisationDriver`] structure.
    pub fn builder() -> OrbitalOptimisationDriverBuilder<'a> {
        OrbitalOptimisationDriverBuilder::default()
    }

    /// Executes one orbital update.
    fn optimise_orbitals(&mut self) -> Result<(), anyhow::Error> {
        log_title("Orbital Optimisation");
        orbopt_output!("");
        let params = self.parameters;
        params.log_output_display();
        orbopt_output!("");
        log_subtitle("Orbital space");
        orbopt_output!("");
        self.orbital_space.log_output_display();
        orbopt_output!("");

        let mut optimiser = OrbitalOptimiser::new(
            self.rdm,
            &mut *self.integrals,
            self.orbital_space.clone(),
            params.scheme_params.clone(),
        )?;
        let energy_before = optimiser.energy()?;

        log_macsec_begin("Orbital update");
        orbopt_output!("");
        let adadelta_history = match params.update_scheme {
            UpdateScheme::NaturalOrbitals => {
                optimiser.generate_natorb_integrals()?;
                None
            }
            UpdateScheme::Newton => {
                optimiser.generate_optorb_integrals_from_newton()?;
                None
            }
            UpdateScheme::ApproximateNewton(descent_param) => {
                optimiser.generate_optorb_integrals_from_approximate_newton(descent_param)?;
                None
            }
            UpdateScheme::GradientDescent => {
                optimiser.generate_optorb_integrals_from_grad_descent()?;
                None
            }
            UpdateScheme::AdaDelta => {
                let zeros = AdaDeltaHistory::zeros(optimiser.parameter_indices().len());
                let history = self.adadelta_history.unwrap_or(&zeros);
                Some(optimiser.generate_optorb_integrals_from_adadelta(history)?)
            }
        };
        let step_summary = optimiser
            .step_summary()
            .cloned()
            .ok_or_else(|| format_err!("No step summary found after the orbital update."))?;
        step_summary.log_output_display();
        let energy_after = optimiser
            .new_energy()?
            .ok_or(OrbOptError::MissingTransformedIntegrals)?;
        orbopt_output!("");
        log_macsec_end("Orbital update");
        orbopt_output!("");

        let dump_res = params
            .integrals_dump_path
            .as_ref()
            .map(|path| {
                optimiser.dump_integrals(path).map(|_| {
                    orbopt_output!("Rotated integrals dumped to `{}`.", path.display());
                })
            })
            .transpose();
        if let Err(err) = dump_res.as_ref() {
            orbopt_error!("{err}");
        }

        if params.commit {
            optimiser.rewrite_integrals()?;
            orbopt_output!("Rotated integrals committed.");
        }
        orbopt_output!("");

        if let Some(name) = params.result_save_name.as_ref() {
            write_orbopt_binary(name, OrbOptFileType::Stp, &step_summary)?;
            if let Some(history) = adadelta_history.as_ref() {
                write_orbopt_binary(name, OrbOptFileType::Hst, history)?;
            }
        }

        let result = OrbitalOptimisationResult::builder()
            .parameters(self.parameters)
            .step_summary(step_summary)
            .energy_before(energy_before)
            .energy_after(energy_after)
            .adadelta_history(adadelta_history)
            .committed(params.commit)
            .build()?;
        log_subtitle("Summary");
        orbopt_output!("");
        result.log_output_display();
        orbopt_output!("");
        self.result = Some(result);

        dump_res.map(|_| ())
    }
}

impl<'a> OrbOptDriver for OrbitalOptimisationDriver<'a> {
    type Params = OrbitalOptimisationParams;

    type Outcome = OrbitalOptimisationResult<'a>;

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.optimise_orbitals()
    }

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result.as_ref().ok_or_else(|| {
            format_err!("No orbital optimisation results found.")
        })
    }
}
