//! Persisting and committing rotated integrals.

use std::path::Path;

use anyhow;

use crate::error::OrbOptError;
use crate::io::dump::write_integrals_dump;

use super::OrbitalOptimiser;

impl<'a> OrbitalOptimiser<'a> {
    /// Writes the integrals produced by the most recent update to a binary dump file.
    ///
    /// See [`crate::io::dump`] for the layout. A failed write leaves the rotated integrals in
    /// place, so that [`Self::rewrite_integrals`] can still be called.
    ///
    /// # Errors
    ///
    /// Errors with [`OrbOptError::MissingTransformedIntegrals`] if no update has been run, and
    /// with [`OrbOptError::IoFailure`] if the file cannot be written.
    pub fn dump_integrals<P: AsRef<Path>>(&self, file_name: P) -> Result<(), anyhow::Error> {
        let new_integrals = self
            .new_integrals
            .as_ref()
            .ok_or(OrbOptError::MissingTransformedIntegrals)?;
        write_integrals_dump(file_name, new_integrals)
    }

    /// Commits the integrals produced by the most recent update to the borrowed integral store,
    /// replacing its contents wholesale. This ends the life of the optimiser.
    ///
    /// # Errors
    ///
    /// Errors with [`OrbOptError::MissingTransformedIntegrals`] if no update has been run, in
    /// which case the integral store is left untouched.
    pub fn rewrite_integrals(self) -> Result<(), anyhow::Error> {
        let new_integrals = self
            .new_integrals
            .ok_or(OrbOptError::MissingTransformedIntegrals)?;
        self.integrals.replace_with(new_integrals);
        log::debug!("Rotated integrals committed to the integral store.");
        Ok(())
    }
}
