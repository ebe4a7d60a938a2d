//! Small model systems with known integrals and density matrices.

use ndarray::{Array2, Array4};

use crate::integrals::{EriTensor, Integrals};
use crate::optimisation::transform::{transform_onee, transform_twoe};
use crate::rdm::Rdm;

/// Nuclear repulsion energy of H₂ at 1.4 bohr.
pub const H2_NUCLEAR_REPULSION: f64 = 0.7143;

/// One-electron integral of the bonding $`\sigma_g`$ orbital of minimal-basis H₂.
pub const H2_H_GG: f64 = -1.2528;

/// One-electron integral of the antibonding $`\sigma_u`$ orbital of minimal-basis H₂.
pub const H2_H_UU: f64 = -0.4756;

/// Generates the integrals of H₂ at 1.4 bohr in the STO-3G basis, expressed in the
/// symmetry-adapted orbitals $`\sigma_g`$ (index 0) and $`\sigma_u`$ (index 1).
///
/// Every integral with an odd number of $`\sigma_u`$ indices vanishes by inversion symmetry.
pub fn gen_h2_sto3g_integrals() -> Integrals {
    let mut onee = Array2::<f64>::zeros((2, 2));
    onee[(0, 0)] = H2_H_GG;
    onee[(1, 1)] = H2_H_UU;
    let mut twoe = EriTensor::zeros(2);
    twoe.set(0, 0, 0, 0, 0.6746);
    twoe.set(1, 1, 1, 1, 0.6975);
    twoe.set(0, 0, 1, 1, 0.6636);
    twoe.set(0, 1, 0, 1, 0.1813);
    Integrals::new(H2_NUCLEAR_REPULSION, onee, twoe)
        .expect("Unable to construct the H₂ integrals.")
}

/// Generates the density matrices of the two-electron singlet
/// $`c_0 |0\bar{0}\rangle + c_1 |1\bar{1}\rangle`$ over two orbitals. The coefficients are
/// normalised before use.
pub fn gen_two_electron_pair_rdm(c0: f64, c1: f64) -> Rdm {
    let norm = (c0 * c0 + c1 * c1).sqrt();
    let (c0, c1) = (c0 / norm, c1 / norm);
    let mut one_rdm = Array2::<f64>::zeros((2, 2));
    one_rdm[(0, 0)] = 2.0 * c0 * c0;
    one_rdm[(1, 1)] = 2.0 * c1 * c1;
    let mut two_rdm = Array4::<f64>::zeros((2, 2, 2, 2));
    two_rdm[(0, 0, 0, 0)] = 2.0 * c0 * c0;
    two_rdm[(1, 1, 1, 1)] = 2.0 * c1 * c1;
    two_rdm[(0, 1, 0, 1)] = 2.0 * c0 * c1;
    two_rdm[(1, 0, 1, 0)] = 2.0 * c0 * c1;
    Rdm::new(one_rdm, two_rdm).expect("Unable to construct the pair density matrices.")
}

/// Generates the density matrices of a closed-shell single determinant in which the first
/// `n_occ` of `n_orbs` orbitals are doubly occupied.
///
/// ```math
///     \Gamma_{pqrs} = \gamma_{pq} \gamma_{rs} - \tfrac{1}{2} \gamma_{ps} \gamma_{rq}
/// ```
pub fn gen_closed_shell_rdm(n_orbs: usize, n_occ: usize) -> Rdm {
    let one_rdm = Array2::from_shape_fn((n_orbs, n_orbs), |(p, q)| {
        if p == q && p < n_occ {
            2.0
        } else {
            0.0
        }
    });
    let two_rdm = Array4::from_shape_fn((n_orbs, n_orbs, n_orbs, n_orbs), |(p, q, r, s)| {
        one_rdm[(p, q)] * one_rdm[(r, s)] - 0.5 * one_rdm[(p, s)] * one_rdm[(r, q)]
    });
    Rdm::new(one_rdm, two_rdm).expect("Unable to construct the closed-shell density matrices.")
}

/// Generates the rotation by `theta` between orbitals `p` and `q`, *i.e.* the exponential of
/// the generator with $`K_{pq} = \theta`$ and $`K_{qp} = -\theta`$.
pub fn gen_pair_rotation(n_orbs: usize, p: usize, q: usize, theta: f64) -> Array2<f64> {
    let mut rot = Array2::<f64>::eye(n_orbs);
    rot[(p, p)] = theta.cos();
    rot[(q, q)] = theta.cos();
    rot[(p, q)] = theta.sin();
    rot[(q, p)] = -theta.sin();
    rot
}

/// Expresses a set of integrals in a rotated orbital basis without going through an optimiser.
pub fn gen_rotated_integrals(integrals: &Integrals, rot: &Array2<f64>) -> Integrals {
    let onee = transform_onee(&integrals.onee().view(), &rot.view());
    let twoe = transform_twoe(integrals.twoe().to_dense(), &rot.view())
        .expect("Unable to transform the two-electron integrals.");
    Integrals::new(
        integrals.core_energy(),
        (&onee + &onee.t()) * 0.5,
        EriTensor::symmetrised_from_dense(&twoe.view())
            .expect("Unable to pack the two-electron integrals."),
    )
    .expect("Unable to construct the rotated integrals.")
}

/// Deterministic linear congruential generator for reproducible pseudo-random systems.
struct Lcg(u64);

impl Lcg {
    /// Returns the next value, uniformly distributed in $`[-1, 1)`$.
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64) / ((1_u64 << 53) as f64) * 2.0 - 1.0
    }
}

/// Generates pseudo-random integrals and density matrices over `n_orbs` orbitals.
///
/// The integrals possess the full eightfold permutational symmetry. The density matrices possess
/// the symmetries required by [`Rdm::new`] but do not correspond to any wavefunction, which is
/// sufficient for checking derivatives against finite differences of the energy.
pub fn gen_pseudo_random_system(n_orbs: usize, seed: u64) -> (Integrals, Rdm) {
    let mut lcg = Lcg(seed);
    let n = n_orbs;

    let raw = Array2::from_shape_fn((n, n), |_| lcg.next_f64());
    let onee = (&raw + &raw.t()) * 0.5;
    let mut twoe = EriTensor::zeros(n);
    for p in 0..n {
        for q in 0..=p {
            for r in 0..n {
                for s in 0..=r {
                    if (p * (p + 1) / 2 + q) >= (r * (r + 1) / 2 + s) {
                        twoe.set(p, q, r, s, 0.5 * lcg.next_f64());
                    }
                }
            }
        }
    }
    let integrals = Integrals::new(0.5, onee, twoe)
        .expect("Unable to construct the pseudo-random integrals.");

    let raw = Array2::from_shape_fn((n, n), |_| lcg.next_f64());
    let one_rdm = (&raw + &raw.t()) * 0.5;
    let raw = Array4::from_shape_fn((n, n, n, n), |_| lcg.next_f64());
    let two_rdm = Array4::from_shape_fn((n, n, n, n), |(p, q, r, s)| {
        0.25 * (raw[(p, q, r, s)] + raw[(r, s, p, q)] + raw[(q, p, s, r)] + raw[(s, r, q, p)])
    });
    let rdm = Rdm::new(one_rdm, two_rdm)
        .expect("Unable to construct the pseudo-random density matrices.");

    (integrals, rdm)
}
