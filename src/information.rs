//! Information functional.
//!
//! A per-branch scalar measuring how much of a record the environment
//! holds about each outcome at time t. Two formulations:
//!
//! - **Closed form** (reduced variant): constant overlaps give
//!   `I_k(t) = |c_k|² X_k Γ t`, so the threshold crossing time follows
//!   analytically from the weight gap.
//! - **Density-matrix form** (full variant): partial-trace the joint
//!   state, then score each branch by its diagonal population
//!   discounted by residual off-diagonal coherence. Fully coherent
//!   superposition → no record → zero information; fully dephased →
//!   information equals the population.

use crate::config::InformationPolicy;
use crate::error::{Result, SimulationError};
use crate::linalg::{partial_trace_apparatus, Operator};
use crate::selector::weight_margin;

/// Append-only record of (time, per-branch information) pairs.
///
/// Owned by one functional instance for the duration of a single trial.
#[derive(Debug, Clone, Default)]
pub struct InformationHistory {
    entries: Vec<(f64, Vec<f64>)>,
}

impl InformationHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. Entries are never rewritten.
    pub fn push(&mut self, t: f64, info: Vec<f64>) {
        self.entries.push((t, info));
    }

    /// All recorded entries in insertion order.
    pub fn entries(&self) -> &[(f64, Vec<f64>)] {
        &self.entries
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&(f64, Vec<f64>)> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current information gap and winning branch from the latest
    /// record: largest minus second-largest component.
    ///
    /// An empty history yields the neutral result (gap 0, winner 0)
    /// rather than failing.
    pub fn gap(&self) -> (f64, usize) {
        match self.entries.last() {
            None => (0.0, 0),
            Some((_, info)) => match weight_margin(info) {
                Ok((top, second, winner)) => (top - second, winner),
                Err(_) => (0.0, 0),
            },
        }
    }

    /// First recorded time at which the gap reached `delta_crit`, or
    /// infinity if it never did.
    pub fn crossing_time(&self, delta_crit: f64) -> f64 {
        for (t, info) in &self.entries {
            if let Ok((top, second, _)) = weight_margin(info) {
                if top - second >= delta_crit {
                    return *t;
                }
            }
        }
        f64::INFINITY
    }
}

/// Closed-form information at time t: `I_k = w_k Γ t`.
pub fn information_at(weights: &[f64], gamma: f64, t: f64) -> Vec<f64> {
    weights.iter().map(|w| w * gamma * t).collect()
}

/// Time at which the winner's information lead reaches `delta_crit`:
/// `t = Δ_crit / ((w_winner - w_second) Γ)`.
///
/// Returns infinity when the weight gap is non-positive or Γ = 0 — the
/// threshold is never reached.
pub fn threshold_crossing_time(weights: &[f64], gamma: f64, delta_crit: f64) -> Result<f64> {
    if !(delta_crit > 0.0) || !delta_crit.is_finite() {
        return Err(SimulationError::NonPositiveParameter {
            name: "threshold",
            value: delta_crit,
        });
    }
    if !(gamma >= 0.0) || !gamma.is_finite() {
        return Err(SimulationError::NegativeParameter {
            name: "decoherence_rate",
            value: gamma,
        });
    }
    let (top, second, _) = weight_margin(weights)?;
    let delta_w = top - second;
    if delta_w <= 0.0 || gamma == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(delta_crit / (delta_w * gamma))
}

/// Density-matrix information functional with an append-only history.
///
/// `compute` is called from inside the master-equation right-hand side,
/// so the history accumulates once per solver evaluation — including
/// the integrator's intermediate stage points.
#[derive(Debug, Clone)]
pub struct InformationFunctional {
    policy: InformationPolicy,
    history: InformationHistory,
}

impl InformationFunctional {
    pub fn new(policy: InformationPolicy) -> Self {
        Self {
            policy,
            history: InformationHistory::new(),
        }
    }

    /// Accumulated history for this trial.
    pub fn history(&self) -> &InformationHistory {
        &self.history
    }

    /// Consume the functional, yielding its history.
    pub fn into_history(self) -> InformationHistory {
        self.history
    }

    /// Gap and winner from the latest record (neutral when empty).
    pub fn gap(&self) -> (f64, usize) {
        self.history.gap()
    }

    /// Per-branch information from the joint density matrix at time t.
    /// Appends one history record.
    pub fn compute(&mut self, rho: &Operator, n_sys: usize, t: f64) -> Result<Vec<f64>> {
        let rho_sys = partial_trace_apparatus(rho, n_sys)?;
        let info = match self.policy {
            InformationPolicy::CoherenceDeficit => coherence_deficit(&rho_sys),
            InformationPolicy::PopulationGated => population_gated(&rho_sys),
        };
        if info.iter().any(|x| !x.is_finite()) {
            return Err(SimulationError::NumericalInstability {
                context: "information functional",
                t,
            });
        }
        self.history.push(t, info.clone());
        Ok(info)
    }
}

/// `I_k = ρ_kk (1 - C_k)` with `C_k = Σ_{j≠k}|ρ_kj| / Σ_{j≠k}√(ρ_kk ρ_jj)`.
///
/// The denominator is the Cauchy-Schwarz bound on the branch coherence,
/// so C_k ∈ [0, 1] for any positive-semidefinite ρ: C_k = 1 exactly for
/// a pure superposition, C_k = 0 once the row has dephased.
fn coherence_deficit(rho_sys: &Operator) -> Vec<f64> {
    let n = rho_sys.nrows();
    (0..n)
        .map(|k| {
            let pop = rho_sys[(k, k)].re.max(0.0);
            let mut coherence = 0.0;
            let mut bound = 0.0;
            for j in 0..n {
                if j == k {
                    continue;
                }
                coherence += rho_sys[(k, j)].norm();
                bound += (pop * rho_sys[(j, j)].re.max(0.0)).sqrt();
            }
            if bound <= f64::EPSILON {
                return pop;
            }
            let deficit = 1.0 - (coherence / bound).min(1.0);
            pop * deficit
        })
        .collect()
}

/// `I_k = ρ_kk (1 - Σ_{j≠k}|ρ_kj| / (n-1))`, clamped at zero.
fn population_gated(rho_sys: &Operator) -> Vec<f64> {
    let n = rho_sys.nrows();
    (0..n)
        .map(|k| {
            let pop = rho_sys[(k, k)].re.max(0.0);
            let off: f64 = (0..n)
                .filter(|&j| j != k)
                .map(|j| rho_sys[(k, j)].norm())
                .sum();
            (pop * (1.0 - off / (n as f64 - 1.0))).max(0.0)
        })
        .collect()
}
