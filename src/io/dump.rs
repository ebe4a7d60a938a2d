//! Binary dumps of integrals and reduced density matrices.
//!
//! Both kinds of dump share one little-endian layout:
//!
//! | Block | Type  | Count          | Content                                         |
//! |-------|-------|----------------|-------------------------------------------------|
//! | 1     | `u64` | 1              | $`n`$, the number of orbitals                   |
//! | 2     | `f64` | $`n^2`$        | two-index block, row-major over `(p, q)`        |
//! | 3     | `f64` | $`n^4`$        | four-index block, row-major over `(p, q, r, s)` |
//!
//! For integrals, the two-index block holds $`h_{pq}`$ and the four-index block holds
//! $`(pq|rs)`$ in full, so that the shapes can be recovered from the header alone. The core
//! energy is not dumped. For density matrices, the blocks hold $`\gamma_{pq}`$ and
//! $`\Gamma_{pqrs}`$.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow;
use byteorder::LittleEndian;
use ndarray::{Array2, Array4};

use crate::error::OrbOptError;
use crate::integrals::{EriTensor, Integrals, INTEGRAL_SYMMETRY_THRESHOLD};
use crate::io::numeric::{write_numeric, NumericReader};
use crate::rdm::Rdm;

#[cfg(test)]
#[path = "dump_tests.rs"]
mod dump_tests;

/// Writes a two-index and a four-index block with their dimension header.
fn write_blocks<W: Write>(
    writer: &mut W,
    two_index: &Array2<f64>,
    four_index: &Array4<f64>,
) -> std::io::Result<()> {
    let n_orbs = two_index.nrows() as u64;
    write_numeric::<LittleEndian, _, _, _>(writer, &[n_orbs])?;
    write_numeric::<LittleEndian, _, _, _>(writer, two_index.iter())?;
    write_numeric::<LittleEndian, _, _, _>(writer, four_index.iter())?;
    writer.flush()
}

/// Returns the numbers of values in the two-index and four-index blocks for `n_orbs` orbitals,
/// after checking that a dump of `n_bytes` bytes holds exactly the header and both blocks.
fn block_sizes(n_orbs: u64, n_bytes: u64) -> Result<(usize, usize), anyhow::Error> {
    let too_large =
        || OrbOptError::IoFailure(format!("Dimension header {n_orbs} is too large for a dump."));
    let n_two = n_orbs.checked_pow(2).ok_or_else(too_large)?;
    let n_four = n_orbs.checked_pow(4).ok_or_else(too_large)?;
    let expected_bytes = n_two
        .checked_add(n_four)
        .and_then(|n_vals| n_vals.checked_add(1))
        .and_then(|n_vals| n_vals.checked_mul(8))
        .ok_or_else(too_large)?;
    if expected_bytes != n_bytes {
        return Err(OrbOptError::IoFailure(format!(
            "Dump for {n_orbs} orbitals should span {expected_bytes} bytes, but spans {n_bytes}."
        ))
        .into());
    }
    Ok((
        usize::try_from(n_two).map_err(|_| too_large())?,
        usize::try_from(n_four).map_err(|_| too_large())?,
    ))
}

/// Reads a two-index and a four-index block with their dimension header from a dump of
/// `n_bytes` bytes.
fn read_blocks<R: BufRead>(
    inner: R,
    n_bytes: u64,
) -> Result<(Array2<f64>, Array4<f64>), anyhow::Error> {
    let mut reader = NumericReader::<_, LittleEndian, u64>::new(inner);
    let n_orbs = reader.next().ok_or_else(|| {
        OrbOptError::IoFailure("Dump is too short to contain its dimension header.".to_string())
    })?;
    let (n_two, n_four) = block_sizes(n_orbs, n_bytes)?;
    let mut reader = reader.retype::<f64>();

    let two_index_vals = reader.by_ref().take(n_two).collect::<Vec<_>>();
    let four_index_vals = reader.by_ref().take(n_four).collect::<Vec<_>>();
    if two_index_vals.len() != n_two || four_index_vals.len() != n_four {
        return Err(OrbOptError::IoFailure(format!(
            "Dump for {n_orbs} orbitals is truncated: expected {n_two} + {n_four} values, found {} + {}.",
            two_index_vals.len(),
            four_index_vals.len()
        ))
        .into());
    }
    if !reader.is_exhausted()? {
        return Err(OrbOptError::IoFailure(format!(
            "Dump contains trailing data beyond the blocks for {n_orbs} orbitals."
        ))
        .into());
    }
    let n_orbs = usize::try_from(n_orbs)?;
    let two_index = Array2::from_shape_vec((n_orbs, n_orbs), two_index_vals)?;
    let four_index = Array4::from_shape_vec((n_orbs, n_orbs, n_orbs, n_orbs), four_index_vals)?;
    Ok((two_index, four_index))
}

/// Writes integrals to a binary dump file.
///
/// # Errors
///
/// Errors with [`OrbOptError::IoFailure`] if the file cannot be created or written.
pub fn write_integrals_dump<P: AsRef<Path>>(
    path: P,
    integrals: &Integrals,
) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    let f = File::create(path).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to create `{}`: {err}", path.display()))
    })?;
    let mut writer = BufWriter::new(f);
    write_blocks(&mut writer, integrals.onee(), &integrals.twoe().to_dense()).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to write `{}`: {err}", path.display()))
    })?;
    log::debug!("Integrals written to `{}`.", path.display());
    Ok(())
}

/// Reads integrals from a binary dump file.
///
/// # Arguments
///
/// * `path` - The dump file.
/// * `core_energy` - The constant energy contribution, which is not part of the dump.
pub fn read_integrals_dump<P: AsRef<Path>>(
    path: P,
    core_energy: f64,
) -> Result<Integrals, anyhow::Error> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to open `{}`: {err}", path.display()))
    })?;
    let n_bytes = f.metadata().map_err(OrbOptError::from)?.len();
    let (onee, twoe) = read_blocks(BufReader::new(f), n_bytes)?;
    let twoe = EriTensor::from_dense(&twoe.view(), INTEGRAL_SYMMETRY_THRESHOLD)?;
    Integrals::new(core_energy, onee, twoe)
}

/// Writes reduced density matrices to a binary dump file.
///
/// # Errors
///
/// Errors with [`OrbOptError::IoFailure`] if the file cannot be created or written.
pub fn write_rdm_dump<P: AsRef<Path>>(path: P, rdm: &Rdm) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    let f = File::create(path).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to create `{}`: {err}", path.display()))
    })?;
    let mut writer = BufWriter::new(f);
    write_blocks(&mut writer, rdm.one_rdm(), rdm.two_rdm()).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to write `{}`: {err}", path.display()))
    })?;
    Ok(())
}

/// Reads reduced density matrices from a binary dump file.
pub fn read_rdm_dump<P: AsRef<Path>>(path: P) -> Result<Rdm, anyhow::Error> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|err| {
        OrbOptError::IoFailure(format!("Unable to open `{}`: {err}", path.display()))
    })?;
    let n_bytes = f.metadata().map_err(OrbOptError::from)?.len();
    let (one_rdm, two_rdm) = read_blocks(BufReader::new(f), n_bytes)?;
    Rdm::new(one_rdm, two_rdm)
}
