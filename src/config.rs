//! Simulation configuration.
//!
//! One immutable parameter set per ensemble run. Every entry point
//! validates the configuration up front so malformed rates or dimensions
//! fail fast instead of producing degenerate statistics.

use crate::error::{Result, SimulationError};

/// Which evolution strategy a trial runs.
///
/// Both strategies share the sampler, selector, and ensemble components;
/// they differ only in whether the joint density matrix is integrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionModel {
    /// Closed-form information growth `I_k(t) = |c_k|² X_k Γ t`.
    /// No ODE integration; threshold crossing is computed analytically.
    ClosedForm,
    /// Full joint-space master equation
    /// `dρ/dt = -i[H,ρ] - γ(ρ - ρ_diag) + C[ρ]` on a fixed time grid.
    MasterEquation,
}

/// Functional form used to extract per-branch information from the
/// reduced system density matrix.
///
/// The exact form is a modeling choice, not a physical law, so it is
/// exposed as a policy rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformationPolicy {
    /// `I_k = ρ_kk (1 - C_k)` where `C_k` is the branch coherence
    /// normalized by its Cauchy-Schwarz bound. Exactly zero for a fully
    /// coherent pure superposition, tends to the diagonal population as
    /// the off-diagonals die.
    CoherenceDeficit,
    /// `I_k = ρ_kk (1 - Σ_{j≠k}|ρ_kj| / (n-1))`: diagonal population
    /// gated by the mean off-diagonal magnitude.
    PopulationGated,
}

/// How the ensemble responds to a failed trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the whole ensemble on the first trial failure.
    #[default]
    Strict,
    /// Skip failed trials, count them, and exclude them from statistics.
    Lenient,
}

/// Parameters for a collapse-measurement simulation.
///
/// Constructed once per ensemble run and shared read-only by every
/// trial. Randomness comes from a per-trial generator derived from
/// `seed`, never from global state.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Hilbert dimension of the measured system (number of outcome branches).
    pub system_dim: usize,
    /// Effective apparatus Hilbert dimension d_A. Must be at least 2;
    /// the Exp(1) overlap law is an asymptotic statement, accurate for
    /// d_A of a few hundred or more.
    pub apparatus_dim: usize,
    /// System-apparatus coupling g in the interaction Hamiltonian.
    pub coupling_strength: f64,
    /// Dephasing rate γ toward the pointer-state block diagonal.
    pub decoherence_rate: f64,
    /// Collapse rate λ multiplying the switched dissipator.
    pub collapse_rate: f64,
    /// Information threshold Δ_crit of the collapse switch.
    pub threshold: f64,
    /// Integration step size.
    pub dt: f64,
    /// Final evolution time.
    pub t_final: f64,
    /// Base random seed. `None` means non-reproducible sampling.
    pub seed: Option<u64>,
    /// Apparatus squeezing strength r. Zero disables squeezing; positive
    /// values rescale sampled overlaps by e^{-r} before renormalization.
    pub squeezing: f64,
    /// Evolution strategy for each trial.
    pub model: EvolutionModel,
    /// Information-functional form for the master-equation strategy.
    pub info_policy: InformationPolicy,
    /// Trial-failure handling for ensemble runs.
    pub failure_policy: FailurePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            system_dim: 2,
            apparatus_dim: 100,
            coupling_strength: 1.0,
            decoherence_rate: 0.1,
            collapse_rate: 1.0,
            threshold: 0.5,
            dt: 0.01,
            t_final: 10.0,
            seed: None,
            squeezing: 0.0,
            model: EvolutionModel::ClosedForm,
            info_policy: InformationPolicy::CoherenceDeficit,
            failure_policy: FailurePolicy::Strict,
        }
    }
}

impl SimulationConfig {
    /// Check every parameter range. Called by the entry points before
    /// any trial runs.
    pub fn validate(&self) -> Result<()> {
        if self.system_dim < 2 {
            return Err(SimulationError::SystemDimension(self.system_dim));
        }
        if self.apparatus_dim < 2 {
            return Err(SimulationError::ApparatusDimension(self.apparatus_dim));
        }
        for (name, value) in [
            ("threshold", self.threshold),
            ("dt", self.dt),
            ("t_final", self.t_final),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(SimulationError::NonPositiveParameter { name, value });
            }
        }
        for (name, value) in [
            ("coupling_strength", self.coupling_strength),
            ("decoherence_rate", self.decoherence_rate),
            ("collapse_rate", self.collapse_rate),
            ("squeezing", self.squeezing),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(SimulationError::NegativeParameter { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_small_apparatus() {
        let config = SimulationConfig {
            apparatus_dim: 1,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimulationError::ApparatusDimension(1))
        );
    }

    #[test]
    fn rejects_single_branch_system() {
        let config = SimulationConfig {
            system_dim: 1,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(SimulationError::SystemDimension(1)));
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let config = SimulationConfig {
            threshold: 0.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::NonPositiveParameter { name: "threshold", .. })
        ));
    }

    #[test]
    fn rejects_nan_rate() {
        let config = SimulationConfig {
            decoherence_rate: f64::NAN,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_rates_allowed_for_unitary_regime() {
        // γ = λ = 0 is the pure-unitary check used by the evolution tests.
        let config = SimulationConfig {
            decoherence_rate: 0.0,
            collapse_rate: 0.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
