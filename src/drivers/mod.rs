//! Drivers to carry out `orbopt` functionalities.

use anyhow;

pub mod orbital_optimisation;

// =================
// Trait definitions
// =================

/// Trait defining behaviours of `orbopt` drivers.
pub trait OrbOptDriver {
    /// The type of the parameter structure controlling the driver.
    type Params;

    /// The type of the successful outcome when executing the driver.
    type Outcome;

    /// Executes the driver and stores the result internally.
    fn run(&mut self) -> Result<(), anyhow::Error>;

    /// Returns the result of the driver execution.
    fn result(&self) -> Result<&Self::Outcome, anyhow::Error>;
}
