//! Dense operator algebra on the joint system⊗apparatus space.
//!
//! Small, independently testable helpers shared by the information
//! functional and the collapse dissipator so the two never drift apart
//! on partial-trace or projector conventions. Joint-space operators are
//! dense `nalgebra` matrices over `Complex<f64>`; the joint index is
//! row-major `(system, apparatus)`, i.e. `i = k · d_A + a`.

use nalgebra::{DMatrix, SymmetricEigen};
use num_complex::Complex;
use num_traits::Zero;

use crate::error::{Result, SimulationError};

/// Dense complex operator.
pub type Operator = DMatrix<Complex<f64>>;

/// Rank-1 projector `|ψ⟩⟨ψ|` from a state vector.
pub fn outer(psi: &[Complex<f64>]) -> Operator {
    let n = psi.len();
    Operator::from_fn(n, n, |i, j| psi[i] * psi[j].conj())
}

/// System projector `|k⟩⟨k|_S ⊗ 1_A` on the joint space.
pub fn system_projector(k: usize, n_sys: usize, d_app: usize) -> Operator {
    let dim = n_sys * d_app;
    Operator::from_fn(dim, dim, |i, j| {
        if i == j && i / d_app == k {
            Complex::new(1.0, 0.0)
        } else {
            Complex::zero()
        }
    })
}

/// Trace out the apparatus index, returning the `n_sys × n_sys` reduced
/// system density matrix.
pub fn partial_trace_apparatus(rho: &Operator, n_sys: usize) -> Result<Operator> {
    let dim = rho.nrows();
    if rho.ncols() != dim || n_sys == 0 || dim % n_sys != 0 {
        return Err(SimulationError::DimensionMismatch {
            context: "partial trace expects a square joint operator divisible by the system dimension",
        });
    }
    let d_app = dim / n_sys;
    let mut reduced = Operator::zeros(n_sys, n_sys);
    for i in 0..n_sys {
        for j in 0..n_sys {
            let mut sum = Complex::zero();
            for a in 0..d_app {
                sum += rho[(i * d_app + a, j * d_app + a)];
            }
            reduced[(i, j)] = sum;
        }
    }
    Ok(reduced)
}

/// Block-diagonal part `Σ_k P_k ρ P_k` in the pointer-state basis:
/// entries coupling different system branches are zeroed.
pub fn block_diagonal_part(rho: &Operator, d_app: usize) -> Operator {
    let dim = rho.nrows();
    Operator::from_fn(dim, dim, |i, j| {
        if i / d_app == j / d_app {
            rho[(i, j)]
        } else {
            Complex::zero()
        }
    })
}

/// Commutator `[a, b] = ab - ba`.
pub fn commutator(a: &Operator, b: &Operator) -> Operator {
    a * b - b * a
}

/// Largest deviation from Hermiticity, `max_ij |m_ij - conj(m_ji)|`.
pub fn hermiticity_error(m: &Operator) -> f64 {
    let mut worst = 0.0_f64;
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            let dev = (m[(i, j)] - m[(j, i)].conj()).norm();
            if dev > worst {
                worst = dev;
            }
        }
    }
    worst
}

/// Smallest eigenvalue of a Hermitian operator.
pub fn min_eigenvalue(m: &Operator) -> f64 {
    let eigen = SymmetricEigen::new(m.clone());
    eigen.eigenvalues.iter().cloned().fold(f64::INFINITY, f64::min)
}

/// Purity `Tr(ρ²) = Σ_ij |ρ_ij|²` for Hermitian `ρ`.
pub fn purity(rho: &Operator) -> f64 {
    rho.iter().map(|e| e.norm_sqr()).sum()
}

/// Energy expectation `Re Tr(Hρ)`.
pub fn energy(h: &Operator, rho: &Operator) -> f64 {
    (h * rho).trace().re
}

/// True if any entry is NaN or infinite.
pub fn has_non_finite(m: &Operator) -> bool {
    m.iter().any(|e| !e.re.is_finite() || !e.im.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    #[test]
    fn outer_product_of_unit_vector_has_trace_one() {
        let s = 1.0 / 2.0_f64.sqrt();
        let psi = vec![c(s, 0.0), c(0.0, s)];
        let rho = outer(&psi);
        assert!((rho.trace().re - 1.0).abs() < 1e-12);
        assert!(hermiticity_error(&rho) < 1e-12);
    }

    #[test]
    fn system_projectors_are_orthogonal_and_idempotent() {
        let p0 = system_projector(0, 2, 3);
        let p1 = system_projector(1, 2, 3);
        assert!((&p0 * &p0 - &p0).iter().all(|e| e.norm() < 1e-12));
        assert!((&p0 * &p1).iter().all(|e| e.norm() < 1e-12));
        assert!((p0.trace().re - 3.0).abs() < 1e-12);
    }

    #[test]
    fn partial_trace_recovers_system_factor() {
        // ρ = ρ_S ⊗ ρ_A with Tr ρ_A = 1 → partial trace returns ρ_S.
        let s = 1.0 / 2.0_f64.sqrt();
        let rho_s = outer(&[c(s, 0.0), c(s, 0.0)]);
        let rho_a = outer(&[c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)]);
        let joint = rho_s.kronecker(&rho_a);
        let reduced = partial_trace_apparatus(&joint, 2).unwrap();
        assert!((&reduced - &rho_s).iter().all(|e| e.norm() < 1e-12));
    }

    #[test]
    fn partial_trace_rejects_bad_dimensions() {
        let rho = Operator::zeros(5, 5);
        assert!(partial_trace_apparatus(&rho, 2).is_err());
    }

    #[test]
    fn block_diagonal_kills_cross_branch_entries() {
        let dim = 4; // 2 branches × d_app = 2
        let rho = Operator::from_fn(dim, dim, |i, j| c((i * dim + j) as f64, 1.0));
        let diag = block_diagonal_part(&rho, 2);
        assert_eq!(diag[(0, 1)], rho[(0, 1)]);
        assert_eq!(diag[(0, 2)], c(0.0, 0.0));
        assert_eq!(diag[(3, 1)], c(0.0, 0.0));
        assert_eq!(diag[(2, 3)], rho[(2, 3)]);
    }

    #[test]
    fn commutator_of_commuting_operators_vanishes() {
        let a = Operator::from_diagonal(&nalgebra::DVector::from_vec(vec![
            c(1.0, 0.0),
            c(2.0, 0.0),
        ]));
        let b = Operator::from_diagonal(&nalgebra::DVector::from_vec(vec![
            c(3.0, 0.0),
            c(-1.0, 0.0),
        ]));
        let comm = commutator(&a, &b);
        assert!(comm.iter().all(|e| e.norm() < 1e-12));
    }

    #[test]
    fn min_eigenvalue_of_diagonal_matrix() {
        let m = Operator::from_diagonal(&nalgebra::DVector::from_vec(vec![
            c(0.25, 0.0),
            c(0.75, 0.0),
        ]));
        assert!((min_eigenvalue(&m) - 0.25).abs() < 1e-10);
    }

    #[test]
    fn purity_of_pure_state_is_one() {
        let s = 1.0 / 2.0_f64.sqrt();
        let rho = outer(&[c(s, 0.0), c(s, 0.0)]);
        assert!((purity(&rho) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn maximally_mixed_purity() {
        let rho = Operator::from_diagonal(&nalgebra::DVector::from_vec(vec![
            c(0.5, 0.0),
            c(0.5, 0.0),
        ]));
        assert!((purity(&rho) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn detects_non_finite_entries() {
        let mut m = Operator::zeros(2, 2);
        assert!(!has_non_finite(&m));
        m[(1, 0)] = c(f64::NAN, 0.0);
        assert!(has_non_finite(&m));
    }
}
