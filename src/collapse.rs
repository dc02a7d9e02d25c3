//! Collapse switching function and dissipator.
//!
//! The information gap between the leading and runner-up branch drives
//! a bounded smooth switch `F(Δ) = tanh(Δ/Δ_crit)`, which in turn
//! scales a Lindblad-form dissipator built from the outcome projectors:
//!
//!   C[ρ] = -λ F(Δ) Σ_k (P_k ρ + ρ P_k - 2 P_k ρ P_k)
//!
//! The winning branch's gap governs the whole term in each evolution
//! step. For orthogonal projectors the bracketed expression is
//! traceless and self-adjoint, so the term preserves trace and
//! Hermiticity of ρ.

use crate::error::{Result, SimulationError};
use crate::linalg::Operator;

/// Smooth switch `F(Δ) = tanh(Δ/Δ_crit)` mapping an information gap to
/// a collapse strength in [0, 1).
#[derive(Debug, Clone, Copy)]
pub struct CollapseFunctional {
    delta_crit: f64,
}

impl CollapseFunctional {
    /// Build with threshold `Δ_crit > 0`.
    pub fn new(delta_crit: f64) -> Result<Self> {
        if !(delta_crit > 0.0) || !delta_crit.is_finite() {
            return Err(SimulationError::NonPositiveParameter {
                name: "threshold",
                value: delta_crit,
            });
        }
        Ok(Self { delta_crit })
    }

    /// The configured threshold.
    pub fn delta_crit(&self) -> f64 {
        self.delta_crit
    }

    /// `F(Δ)`: zero at Δ = 0, monotonically increasing, approaching 1.
    pub fn evaluate(&self, delta: f64) -> f64 {
        (delta / self.delta_crit).tanh()
    }

    /// True once `F(Δ)` exceeds `factor` (collapse effectively complete).
    pub fn has_collapsed(&self, delta: f64, factor: f64) -> bool {
        self.evaluate(delta) > factor
    }
}

/// Collapse contribution to dρ/dt:
/// `-rate · switch · Σ_k (P_k ρ + ρ P_k - 2 P_k ρ P_k)`.
///
/// `switch` is the already-evaluated `F(Δ)` for the current winning gap.
pub fn collapse_dissipator(
    rho: &Operator,
    projectors: &[Operator],
    rate: f64,
    switch: f64,
) -> Operator {
    let mut sum = Operator::zeros(rho.nrows(), rho.ncols());
    for p in projectors {
        let p_rho = p * rho;
        let rho_p = rho * p;
        let sandwich = &p_rho * p;
        sum += p_rho + rho_p - sandwich.scale(2.0);
    }
    sum.scale(-rate * switch)
}
