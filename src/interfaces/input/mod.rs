//! YAML input files for the `orbopt` binary.

use std::path::PathBuf;

use anyhow::{self, format_err};
use serde::{Deserialize, Serialize};

use crate::drivers::orbital_optimisation::{
    OrbitalOptimisationDriver, OrbitalOptimisationParams,
};
use crate::drivers::OrbOptDriver;
use crate::interfaces::InputHandle;
use crate::io::dump::{read_integrals_dump, read_rdm_dump, write_integrals_dump};
use crate::io::format::orbopt_output;
use crate::io::{read_orbopt_binary, OrbOptFileType};
use crate::optimisation::AdaDeltaHistory;
use crate::orbital_space::OrbitalSpace;


/// Structure specifying the orbital space in an input file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrbitalSpaceInput {
    /// The number of frozen orbitals.
    #[serde(default)]
    pub n_frozen: usize,

    /// The number of doubly occupied core orbitals.
    #[serde(default)]
    pub n_core: usize,

    /// The number of active orbitals.
    pub n_active: usize,

    /// The number of virtual orbitals.
    #[serde(default)]
    pub n_virtual: usize,

    /// Boolean indicating if rotations amongst active orbitals are independent parameters.
    #[serde(default = "default_true")]
    pub active_active_rotations: bool,

    /// Optional irreducible-representation label of every orbital.
    #[serde(default)]
    pub irreps: Option<Vec<usize>>,
}

fn default_true() -> bool {
    true
}

impl OrbitalSpaceInput {
    /// Constructs the orbital space described by this input.
    pub fn to_orbital_space(&self) -> Result<OrbitalSpace, anyhow::Error> {
        let orbital_space = OrbitalSpace::from_counts(
            self.n_frozen,
            self.n_core,
            self.n_active,
            self.n_virtual,
            self.active_active_rotations,
        );
        match self.irreps.as_ref() {
            Some(irreps) => orbital_space.with_irreps(irreps.clone()),
            None => Ok(orbital_space),
        }
    }
}

/// Structure containing `orbopt` input parameters which can be serialised into and deserialised
/// from a YAML input file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Input {
    /// Path to the integral dump in the current orbital basis. This file is overwritten with the
    /// rotated integrals if [`OrbitalOptimisationParams::commit`] is set.
    pub integrals_path: PathBuf,

    /// The constant energy contribution, which is not part of integral dumps.
    #[serde(default)]
    pub core_energy: f64,

    /// Path to the density-matrix dump in the current orbital basis.
    pub rdm_path: PathBuf,

    /// The orbital space.
    pub orbital_space: OrbitalSpaceInput,

    /// The control parameters for the orbital update.
    pub optimisation: OrbitalOptimisationParams,

    /// Optional name of a binary file of type [`OrbOptFileType::Hst`] (without its extension)
    /// holding the AdaDelta history from the previous macro-iteration.
    #[serde(default)]
    pub adadelta_history_name: Option<PathBuf>,
}

impl InputHandle for Input {
    fn handle(&self) -> Result<(), anyhow::Error> {
        let mut integrals = read_integrals_dump(&self.integrals_path, self.core_energy)?;
        orbopt_output!(
            "Integrals read in from `{}`.",
            self.integrals_path.display()
        );
        let rdm = read_rdm_dump(&self.rdm_path)?;
        orbopt_output!(
            "Density matrices read in from `{}` ({:.6} electrons).",
            self.rdm_path.display(),
            rdm.n_electrons()
        );
        let orbital_space = self.orbital_space.to_orbital_space()?;
        let history = self
            .adadelta_history_name
            .as_ref()
            .map(|name| read_orbopt_binary::<AdaDeltaHistory, _>(name, OrbOptFileType::Hst))
            .transpose()?;
        orbopt_output!("");

        let mut driver = OrbitalOptimisationDriver::builder()
            .parameters(&self.optimisation)
            .rdm(&rdm)
            .integrals(&mut integrals)
            .orbital_space(&orbital_space)
            .adadelta_history(history.as_ref())
            .build()
            .map_err(|err| format_err!(err))?;
        // A failed dump still leaves a committed result that must reach the integral store.
        let run_res = driver.run();
        let committed = driver
            .result()
            .map(|result| result.committed)
            .unwrap_or(false);
        drop(driver);

        if committed {
            write_integrals_dump(&self.integrals_path, &integrals)?;
            orbopt_output!(
                "Integral store `{}` updated with the rotated integrals.",
                self.integrals_path.display()
            );
        }
        run_res
    }
}
