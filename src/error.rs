//! Error kinds raised by the orbital-optimisation engine.
//!
//! Fallible functions in this crate return [`anyhow::Error`]. Whenever a failure belongs to one
//! of the categories below, the underlying error is an [`OrbOptError`] which can be recovered
//! with [`anyhow::Error::downcast_ref`].

use std::error::Error;
use std::fmt;

/// Enumerated type for the categories of failure of the orbital-optimisation engine.
#[derive(Debug, Clone, PartialEq)]
pub enum OrbOptError {
    /// Two collaborating objects disagree on a dimension, *e.g.* the number of orbitals of the
    /// integrals and of the reduced density matrices, or the length of a parameter vector and the
    /// number of rotation parameters.
    DimensionMismatch(String),

    /// A tensor does not possess a permutational symmetry that it is required to have.
    InvalidSymmetry(String),

    /// The curvature information is too ill-conditioned to yield a finite, orthogonality-preserving
    /// rotation.
    NumericalConditioning(String),

    /// Reading or writing a file has failed.
    IoFailure(String),

    /// An operation requires transformed integrals, but no update scheme has been run yet.
    MissingTransformedIntegrals,
}

impl fmt::Display for OrbOptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DimensionMismatch(msg) => write!(f, "Dimension mismatch: {msg}"),
            Self::InvalidSymmetry(msg) => write!(f, "Invalid tensor symmetry: {msg}"),
            Self::NumericalConditioning(msg) => write!(f, "Numerical conditioning failure: {msg}"),
            Self::IoFailure(msg) => write!(f, "I/O failure: {msg}"),
            Self::MissingTransformedIntegrals => write!(
                f,
                "No transformed integrals available. Run one of the orbital update schemes first."
            ),
        }
    }
}

impl Error for OrbOptError {}

impl From<std::io::Error> for OrbOptError {
    fn from(err: std::io::Error) -> Self {
        Self::IoFailure(err.to_string())
    }
}
