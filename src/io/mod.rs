//! File input and output.
//!
//! Integrals and density matrices travel through the raw dumps of [`dump`]. State carried between
//! macro-iterations (AdaDelta histories, step summaries) is stored with `bincode`, and input files
//! are YAML.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{self, format_err};
use bincode;
use serde::{de::DeserializeOwned, Serialize};
use serde_yaml;

use crate::error::OrbOptError;

pub mod dump;
pub(crate) mod format;
pub(crate) mod numeric;

#[cfg(test)]
#[path = "io_tests.rs"]
mod io_tests;

/// Enumerated type for the kinds of binary file kept between macro-iterations.
pub enum OrbOptFileType {
    /// Variant for AdaDelta moving averages.
    Hst,

    /// Variant for summaries of update steps.
    Stp,
}

impl OrbOptFileType {
    /// Returns the extension appended to file names of this kind.
    pub fn ext(&self) -> String {
        match self {
            OrbOptFileType::Hst => "orbopt.hst".to_string(),
            OrbOptFileType::Stp => "orbopt.stp".to_string(),
        }
    }
}

/// Appends the extension of `file_type` to `name`.
fn binary_path<P: AsRef<Path>>(name: P, file_type: &OrbOptFileType) -> PathBuf {
    let mut path = name.as_ref().to_path_buf();
    path.set_extension(file_type.ext());
    path
}

/// Reads back a value stored by [`write_orbopt_binary`].
///
/// # Arguments
///
/// * `name` - The file name without the extension of `file_type`.
/// * `file_type` - The kind of file, which fixes the extension.
///
/// # Errors
///
/// Errors with [`OrbOptError::IoFailure`] if the file cannot be opened.
pub fn read_orbopt_binary<T, P: AsRef<Path>>(
    name: P,
    file_type: OrbOptFileType,
) -> Result<T, anyhow::Error>
where
    T: DeserializeOwned,
{
    let path = binary_path(name, &file_type);
    let f = File::open(&path).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to open `{}`: {err}", path.display()))
    })?;
    bincode::deserialize_from(&mut BufReader::new(f)).map_err(|err| format_err!(err))
}

/// Stores a value with `bincode` under `name` and the extension of `file_type`.
///
/// # Errors
///
/// Errors with [`OrbOptError::IoFailure`] if the file cannot be created.
pub fn write_orbopt_binary<T, P: AsRef<Path>>(
    name: P,
    file_type: OrbOptFileType,
    value: &T,
) -> Result<(), anyhow::Error>
where
    T: Serialize,
{
    let path = binary_path(name, &file_type);
    let f = File::create(&path).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to create `{}`: {err}", path.display()))
    })?;
    bincode::serialize_into(&mut BufWriter::new(f), value).map_err(|err| format_err!(err))
}

/// Parses a YAML file, such as an input file for the `orbopt` binary.
///
/// # Arguments
///
/// * `name` - The path to the file, extension included.
pub fn read_orbopt_yaml<T, P: AsRef<Path>>(name: P) -> Result<T, anyhow::Error>
where
    T: DeserializeOwned,
{
    let path = name.as_ref();
    let f = File::open(path).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to open `{}`: {err}", path.display()))
    })?;
    serde_yaml::from_reader(BufReader::new(f)).map_err(|err| format_err!(err))
}

/// Writes a value as YAML to `name` with its extension replaced by `yml`.
pub fn write_orbopt_yaml<T, P: AsRef<Path>>(name: P, value: &T) -> Result<(), anyhow::Error>
where
    T: Serialize,
{
    let mut path = name.as_ref().to_path_buf();
    path.set_extension("yml");
    let f = File::create(&path).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to create `{}`: {err}", path.display()))
    })?;
    serde_yaml::to_writer(BufWriter::new(f), value).map_err(|err| format_err!(err))
}
