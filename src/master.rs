//! Joint-space master-equation evolution.
//!
//! Integrates
//!
//!   dρ/dt = -i[H, ρ] - γ(ρ - ρ_diag) + C[ρ]
//!
//! for the joint system⊗apparatus density matrix, where
//! `H = g Σ_k |k⟩⟨k|_S ⊗ |A_k⟩⟨A_k|` is the measurement interaction,
//! the dephasing term drives ρ toward its pointer-basis block diagonal,
//! and C is the information-switched collapse dissipator.
//!
//! Classical RK4 on a fixed step grid. The information functional is
//! refreshed at every right-hand-side evaluation — all four stage
//! points per step — so the history resolution tracks the integrator,
//! not just the output grid. Trace, Hermiticity, and positivity are
//! expected invariants of the continuous dynamics; the evolver records
//! them on the sample grid but never re-enforces them. NaN or Inf in
//! the evolved state aborts the trial.

use num_complex::Complex;

use crate::collapse::{collapse_dissipator, CollapseFunctional};
use crate::config::SimulationConfig;
use crate::error::{Result, SimulationError};
use crate::information::{InformationFunctional, InformationHistory};
use crate::linalg::{
    block_diagonal_part, commutator, energy, has_non_finite, hermiticity_error, min_eigenvalue,
    outer, purity, system_projector, Operator,
};
use crate::microstate::PointerStates;

/// Target number of recorded sample points per evolution.
const RECORD_POINTS: usize = 500;

/// Read-only evolution operator set, built once per configuration and
/// shared across trials.
#[derive(Debug, Clone)]
pub struct MasterEquationModel {
    n_sys: usize,
    d_app: usize,
    hamiltonian: Operator,
    projectors: Vec<Operator>,
    gamma: f64,
    collapse_rate: f64,
    switch: CollapseFunctional,
}

/// Observable trajectory of one evolution.
///
/// `traces`, `hermiticity_errors`, and `min_eigenvalues` exist so the
/// physical invariants can be asserted after the fact; the evolver
/// itself never projects the state back to physicality.
#[derive(Debug, Clone)]
pub struct MasterEquationRun {
    /// Recorded sample times.
    pub times: Vec<f64>,
    /// Re Tr(ρ) at each sample (should stay 1).
    pub traces: Vec<f64>,
    /// Hermiticity deviation at each sample.
    pub hermiticity_errors: Vec<f64>,
    /// Smallest eigenvalue at each sample (should stay ≥ 0).
    pub min_eigenvalues: Vec<f64>,
    /// Purity Tr(ρ²) at each sample.
    pub purities: Vec<f64>,
    /// Energy Tr(Hρ) at each sample.
    pub energies: Vec<f64>,
    /// Final density matrix.
    pub final_rho: Operator,
    /// Information history accumulated across all solver evaluations.
    pub information: InformationHistory,
}

impl MasterEquationModel {
    /// Build the Hamiltonian and projector set from a validated
    /// configuration and the shared pointer basis.
    pub fn new(config: &SimulationConfig, pointers: &PointerStates) -> Result<Self> {
        config.validate()?;
        let n_sys = config.system_dim;
        let d_app = config.apparatus_dim;
        if pointers.n_outcomes() != n_sys || pointers.dim() != d_app {
            return Err(SimulationError::DimensionMismatch {
                context: "pointer basis does not match configured dimensions",
            });
        }

        let g = Complex::new(config.coupling_strength, 0.0);
        let mut hamiltonian = Operator::zeros(n_sys * d_app, n_sys * d_app);
        for k in 0..n_sys {
            let mut sys_proj = Operator::zeros(n_sys, n_sys);
            sys_proj[(k, k)] = Complex::new(1.0, 0.0);
            let app_proj = outer(pointers.state(k));
            hamiltonian += sys_proj.kronecker(&app_proj) * g;
        }

        let projectors = (0..n_sys)
            .map(|k| system_projector(k, n_sys, d_app))
            .collect();

        Ok(Self {
            n_sys,
            d_app,
            hamiltonian,
            projectors,
            gamma: config.decoherence_rate,
            collapse_rate: config.collapse_rate,
            switch: CollapseFunctional::new(config.threshold)?,
        })
    }

    /// The interaction Hamiltonian.
    pub fn hamiltonian(&self) -> &Operator {
        &self.hamiltonian
    }

    /// Outcome projectors extended by the apparatus identity.
    pub fn projectors(&self) -> &[Operator] {
        &self.projectors
    }

    /// Initial joint state `ρ_S ⊗ |ψ_A⟩⟨ψ_A|`.
    pub fn initial_state(
        &self,
        amplitudes: &[Complex<f64>],
        apparatus_state: &[Complex<f64>],
    ) -> Result<Operator> {
        if amplitudes.len() != self.n_sys || apparatus_state.len() != self.d_app {
            return Err(SimulationError::DimensionMismatch {
                context: "initial state factors do not match configured dimensions",
            });
        }
        Ok(outer(amplitudes).kronecker(&outer(apparatus_state)))
    }

    /// One right-hand-side evaluation. Refreshes the information
    /// history before forming the collapse term, so the switch always
    /// sees the gap at this evaluation point.
    fn rhs(
        &self,
        rho: &Operator,
        t: f64,
        info: &mut InformationFunctional,
    ) -> Result<Operator> {
        let unitary = commutator(&self.hamiltonian, rho) * Complex::new(0.0, -1.0);

        let dephasing = (rho - block_diagonal_part(rho, self.d_app)).scale(-self.gamma);

        info.compute(rho, self.n_sys, t)?;
        let (gap, _) = info.gap();
        let switch = self.switch.evaluate(gap);
        let collapse = collapse_dissipator(rho, &self.projectors, self.collapse_rate, switch);

        Ok(unitary + dephasing + collapse)
    }

    /// Evolve `rho0` from t = 0 to `t_final` on a fixed grid of step
    /// `dt`, consuming a fresh per-trial information functional.
    ///
    /// Fails with [`SimulationError::NumericalInstability`] the moment
    /// a non-finite entry appears in the state.
    pub fn evolve(
        &self,
        rho0: Operator,
        mut info: InformationFunctional,
        dt: f64,
        t_final: f64,
    ) -> Result<MasterEquationRun> {
        for (name, value) in [("dt", dt), ("t_final", t_final)] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(SimulationError::NonPositiveParameter { name, value });
            }
        }
        let n_steps = (t_final / dt).ceil().max(1.0) as usize;
        let record_stride = (n_steps / RECORD_POINTS).max(1);

        let mut rho = rho0;
        let mut times = Vec::new();
        let mut traces = Vec::new();
        let mut hermiticity_errors = Vec::new();
        let mut min_eigenvalues = Vec::new();
        let mut purities = Vec::new();
        let mut energies = Vec::new();

        for step in 0..=n_steps {
            let t = step as f64 * dt;
            if step % record_stride == 0 || step == n_steps {
                if has_non_finite(&rho) {
                    return Err(SimulationError::NumericalInstability {
                        context: "density matrix",
                        t,
                    });
                }
                times.push(t);
                traces.push(rho.trace().re);
                hermiticity_errors.push(hermiticity_error(&rho));
                min_eigenvalues.push(min_eigenvalue(&rho));
                purities.push(purity(&rho));
                energies.push(energy(&self.hamiltonian, &rho));
            }
            if step < n_steps {
                rho = self.rk4_step(rho, t, dt, &mut info)?;
            }
        }

        Ok(MasterEquationRun {
            times,
            traces,
            hermiticity_errors,
            min_eigenvalues,
            purities,
            energies,
            final_rho: rho,
            information: info.into_history(),
        })
    }

    /// One classical RK4 step. Each stage evaluation appends one
    /// information-history record.
    fn rk4_step(
        &self,
        rho: Operator,
        t: f64,
        dt: f64,
        info: &mut InformationFunctional,
    ) -> Result<Operator> {
        let half = dt / 2.0;
        let k1 = self.rhs(&rho, t, info)?;
        let k2 = self.rhs(&(&rho + k1.scale(half)), t + half, info)?;
        let k3 = self.rhs(&(&rho + k2.scale(half)), t + half, info)?;
        let k4 = self.rhs(&(&rho + k3.scale(dt)), t + dt, info)?;
        Ok(rho + (k1 + k2.scale(2.0) + k3.scale(2.0) + k4).scale(dt / 6.0))
    }
}
