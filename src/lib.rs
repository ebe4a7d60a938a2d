//! # orbopt: Orbital-Rotation Optimisation for Multiconfigurational Wavefunctions
//!
//! `orbopt` is the orbital-optimisation engine of an MCSCF/CASSCF-style calculation. Given the
//! one- and two-particle reduced density matrices of a wavefunction and the one- and
//! two-electron integrals in the current orbital basis, it
//! - enumerates the non-redundant orbital-rotation parameters of an orbital space,
//! - evaluates the analytic orbital gradient and the full or diagonal orbital Hessian from the
//!   generalised Fock matrix,
//! - turns them into an orthogonal orbital rotation with one of several update schemes
//!   (natural orbitals, Newton, approximate Newton, gradient descent, AdaDelta),
//! - transforms the integrals to the rotated orbital basis, and
//! - dumps the rotated integrals to disk or commits them back to the integral store.
//!
//! The wavefunction solver that produces the density matrices, and the outer loop over
//! macro-iterations, are not part of this crate.
//!
//! ## Conventions
//!
//! Orbitals are real and spatial. Two-electron integrals $`(pq|rs)`$ are in chemists' notation
//! and the two-particle density matrix is stored in the matching order, so that
//! ```math
//!     E = E_{\mathrm{core}} + \sum_{pq} h_{pq} \gamma_{pq}
//!       + \frac{1}{2} \sum_{pqrs} (pq|rs) \Gamma_{pqrs}.
//! ```
//! A rotation $`\mathbf{R} = \exp(\mathbf{K})`$ is generated by the skew-symmetric matrix with
//! $`K_{pq} = \kappa_{pq} = -K_{qp}`$ for $`p < q`$. The rows of $`\mathbf{R}`$ are the new
//! orbitals expressed in the old ones.
//!
//! ## Getting started
//!
//! ### Linear algebra backend
//!
//! There are six features defining six different ways a linear algebra backend can be configured.
//! These are inherited from the
//! [`ndarray-linalg`](https://docs.rs/ndarray-linalg/latest/ndarray_linalg/) crate. One
//! (and only one) of these must be enabled:
//! - `openblas-static` (default): Downloads, builds OpenBLAS, and links statically
//! - `openblas-system`: Finds and links existing OpenBLAS in the system
//! - `netlib-static`: Downloads, builds LAPACK, and links statically
//! - `netlib-system`: Finds and links existing LAPACK in the system
//! - `intel-mkl-static`: Finds and links existing static Intel MKL in the system, or downloads and
//!   links statically if not found
//! - `intel-mkl-system`: Finds and links existing shared Intel MKL in the system
//!
//! ## Examples and usage
//!
//! For most items, their usages are illustrated in test functions. A typical macro-iteration
//! reads:
//!
//! ```no_run
//! use orbopt::auxiliary::template_systems::{gen_h2_sto3g_integrals, gen_two_electron_pair_rdm};
//! use orbopt::optimisation::{OrbitalOptimiser, UpdateSchemeParams};
//! use orbopt::orbital_space::OrbitalSpace;
//!
//! let mut integrals = gen_h2_sto3g_integrals();
//! let rdm = gen_two_electron_pair_rdm(0.99, -0.11);
//! let mut optimiser = OrbitalOptimiser::new(
//!     &rdm,
//!     &mut integrals,
//!     OrbitalSpace::all_active(2),
//!     UpdateSchemeParams::default(),
//! )
//! .unwrap();
//! optimiser.generate_optorb_integrals_from_newton().unwrap();
//! optimiser.rewrite_integrals().unwrap();
//! ```
//!
//! The `orbopt` binary runs one macro-iteration from a YAML input file:
//! `orbopt -c input.yml [-o output.txt]`.
//!
//! ## License
//!
//! GNU Lesser General Public License v3.0.

pub mod auxiliary;
pub mod drivers;
pub mod error;
pub mod integrals;
pub mod interfaces;
pub mod io;
pub mod optimisation;
pub mod orbital_space;
pub mod rdm;
