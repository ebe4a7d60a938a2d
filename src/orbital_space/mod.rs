//! Orbital-space metadata and the enumeration of non-redundant rotation parameters.

use std::fmt;

use anyhow;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::OrbOptError;

#[cfg(test)]
#[path = "orbital_space_tests.rs"]
mod orbital_space_tests;

// ================
// Enum definitions
// ================

/// Enumerated type for the role an orbital plays in a multiconfigurational wavefunction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrbitalClass {
    /// Variant for orbitals that are excluded from the optimisation altogether.
    Frozen,

    /// Variant for doubly occupied inactive orbitals.
    Core,

    /// Variant for orbitals with variable occupations.
    Active,

    /// Variant for unoccupied orbitals.
    Virtual,
}

impl fmt::Display for OrbitalClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Frozen => write!(f, "frozen"),
            Self::Core => write!(f, "core"),
            Self::Active => write!(f, "active"),
            Self::Virtual => write!(f, "virtual"),
        }
    }
}

// ==================
// Struct definitions
// ==================

/// Structure identifying one independent orbital-rotation generator $`\hat{E}_{pq} -
/// \hat{E}_{qp}`$ with $`p < q`$.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RotationIndex {
    /// The lower orbital index.
    pub p: usize,

    /// The higher orbital index.
    pub q: usize,
}

impl RotationIndex {
    /// Constructs a rotation index from two distinct orbital indices in any order.
    pub fn new(a: usize, b: usize) -> Result<Self, anyhow::Error> {
        anyhow::ensure!(a != b, "A rotation index requires two distinct orbitals, got ({a}, {b}).");
        Ok(Self {
            p: a.min(b),
            q: a.max(b),
        })
    }
}

impl fmt::Display for RotationIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.p, self.q)
    }
}

/// Structure describing how the orbitals are partitioned, which determines the rotations that
/// change the energy.
#[derive(Clone, Builder, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
#[serde(try_from = "UncheckedOrbitalSpace")]
pub struct OrbitalSpace {
    /// The class of each orbital.
    classes: Vec<OrbitalClass>,

    /// The label of the irreducible representation spanned by each orbital. Rotations between
    /// orbitals of different irreducible representations are excluded. If not specified, all
    /// orbitals are taken to span the same representation.
    #[builder(default = "self.default_irreps()?")]
    irreps: Vec<usize>,

    /// Boolean indicating if rotations amongst active orbitals are independent parameters. This
    /// should be `false` when the active-space wavefunction is a complete CI expansion, in which
    /// case active–active rotations are redundant.
    #[builder(default = "true")]
    active_active_rotations: bool,
}

impl OrbitalSpaceBuilder {
    fn validate(&self) -> Result<(), String> {
        let classes = self
            .classes
            .as_ref()
            .ok_or("No orbital classes found.".to_string())?;
        if let Some(irreps) = self.irreps.as_ref() {
            if irreps.len() != classes.len() {
                return Err(format!(
                    "The number of irreducible-representation labels ({}) does not match the number of orbitals ({}).",
                    irreps.len(),
                    classes.len()
                ));
            }
        }
        Ok(())
    }

    fn default_irreps(&self) -> Result<Vec<usize>, String> {
        let classes = self
            .classes
            .as_ref()
            .ok_or("No orbital classes found.".to_string())?;
        Ok(vec![0; classes.len()])
    }
}

/// Deserialised form of [`OrbitalSpace`] whose labels have not yet been checked by
/// [`OrbitalSpaceBuilder`].
#[derive(Deserialize)]
struct UncheckedOrbitalSpace {
    classes: Vec<OrbitalClass>,

    #[serde(default)]
    irreps: Option<Vec<usize>>,

    #[serde(default = "default_true")]
    active_active_rotations: bool,
}

fn default_true() -> bool {
    true
}

impl TryFrom<UncheckedOrbitalSpace> for OrbitalSpace {
    type Error = OrbitalSpaceBuilderError;

    fn try_from(unchecked: UncheckedOrbitalSpace) -> Result<Self, Self::Error> {
        let mut builder = Self::builder();
        builder
            .classes(unchecked.classes)
            .active_active_rotations(unchecked.active_active_rotations);
        if let Some(irreps) = unchecked.irreps {
            builder.irreps(irreps);
        }
        builder.build()
    }
}

impl OrbitalSpace {
    /// Returns a builder to construct a new [`OrbitalSpace`].
    pub fn builder() -> OrbitalSpaceBuilder {
        OrbitalSpaceBuilder::default()
    }

    /// Constructs an orbital space in which every orbital is active and all orbitals span the
    /// same irreducible representation, so that every pair of orbitals can be rotated.
    pub fn all_active(n_orbs: usize) -> Self {
        Self {
            classes: vec![OrbitalClass::Active; n_orbs],
            irreps: vec![0; n_orbs],
            active_active_rotations: true,
        }
    }

    /// Constructs an orbital space from the number of orbitals in each class. Orbitals are
    /// ordered frozen, core, active, and virtual.
    ///
    /// # Arguments
    ///
    /// * `n_frozen` - The number of frozen orbitals.
    /// * `n_core` - The number of core orbitals.
    /// * `n_active` - The number of active orbitals.
    /// * `n_virtual` - The number of virtual orbitals.
    /// * `active_active_rotations` - Boolean indicating if active–active rotations are
    ///   independent parameters.
    pub fn from_counts(
        n_frozen: usize,
        n_core: usize,
        n_active: usize,
        n_virtual: usize,
        active_active_rotations: bool,
    ) -> Self {
        let classes = [
            (OrbitalClass::Frozen, n_frozen),
            (OrbitalClass::Core, n_core),
            (OrbitalClass::Active, n_active),
            (OrbitalClass::Virtual, n_virtual),
        ]
        .into_iter()
        .flat_map(|(class, count)| std::iter::repeat(class).take(count))
        .collect::<Vec<_>>();
        let n_orbs = classes.len();
        Self {
            classes,
            irreps: vec![0; n_orbs],
            active_active_rotations,
        }
    }

    /// Replaces the irreducible-representation labels of the orbitals.
    ///
    /// # Errors
    ///
    /// Errors with [`OrbOptError::DimensionMismatch`] if the number of labels differs from the
    /// number of orbitals.
    pub fn with_irreps(mut self, irreps: Vec<usize>) -> Result<Self, anyhow::Error> {
        if irreps.len() != self.n_orbs() {
            return Err(OrbOptError::DimensionMismatch(format!(
                "{} irreducible-representation labels supplied for {} orbitals.",
                irreps.len(),
                self.n_orbs()
            ))
            .into());
        }
        self.irreps = irreps;
        Ok(self)
    }

    /// Returns the number of orbitals.
    pub fn n_orbs(&self) -> usize {
        self.classes.len()
    }

    /// Returns the class of each orbital.
    pub fn classes(&self) -> &[OrbitalClass] {
        &self.classes
    }

    /// Returns the irreducible-representation label of each orbital.
    pub fn irreps(&self) -> &[usize] {
        &self.irreps
    }

    /// Returns the number of orbitals in a class.
    pub fn count(&self, class: OrbitalClass) -> usize {
        self.classes.iter().filter(|&&c| c == class).count()
    }

    /// Determines if rotating orbitals `p` and `q` into each other leaves the energy unchanged
    /// or is forbidden by symmetry.
    pub fn is_redundant(&self, p: usize, q: usize) -> bool {
        if p == q || self.irreps[p] != self.irreps[q] {
            return true;
        }
        match (self.classes[p], self.classes[q]) {
            (OrbitalClass::Frozen, _) | (_, OrbitalClass::Frozen) => true,
            (OrbitalClass::Core, OrbitalClass::Core) => true,
            (OrbitalClass::Virtual, OrbitalClass::Virtual) => true,
            (OrbitalClass::Active, OrbitalClass::Active) => !self.active_active_rotations,
            _ => false,
        }
    }

    /// Enumerates the independent rotation parameters.
    ///
    /// # Returns
    ///
    /// The non-redundant pairs $`(p, q)`$ with $`p < q`$, ordered lexicographically. Parameter
    /// vectors, gradients, and Hessians are all indexed in this order.
    pub fn parameter_indices(&self) -> Vec<RotationIndex> {
        let n_orbs = self.n_orbs();
        (0..n_orbs)
            .flat_map(|p| ((p + 1)..n_orbs).map(move |q| (p, q)))
            .filter(|&(p, q)| !self.is_redundant(p, q))
            .map(|(p, q)| RotationIndex { p, q })
            .collect()
    }

    /// Partitions the non-frozen orbitals into blocks within which orbitals may mix, *i.e.* by
    /// irreducible representation. Orbital indices within each block are ascending, and blocks
    /// are ordered by their first orbital.
    pub fn mixing_blocks(&self) -> Vec<Vec<usize>> {
        let mut blocks: Vec<(usize, Vec<usize>)> = vec![];
        for (i, (class, irrep)) in self.classes.iter().zip(self.irreps.iter()).enumerate() {
            if *class == OrbitalClass::Frozen {
                continue;
            }
            match blocks.iter_mut().find(|(label, _)| label == irrep) {
                Some((_, block)) => block.push(i),
                None => blocks.push((*irrep, vec![i])),
            }
        }
        blocks.into_iter().map(|(_, block)| block).collect()
    }
}

impl fmt::Display for OrbitalSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of orbitals: {}", self.n_orbs())?;
        for class in [
            OrbitalClass::Frozen,
            OrbitalClass::Core,
            OrbitalClass::Active,
            OrbitalClass::Virtual,
        ] {
            writeln!(f, "  {:<8}: {}", class.to_string(), self.count(class))?;
        }
        writeln!(
            f,
            "Active–active rotations: {}",
            if self.active_active_rotations {
                "included"
            } else {
                "redundant"
            }
        )?;
        writeln!(
            f,
            "Independent rotation parameters: {}",
            self.parameter_indices().len()
        )?;
        Ok(())
    }
}
