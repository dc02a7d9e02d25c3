//! Evolution strategies and per-trial execution.
//!
//! The closed-form and master-equation variants share the sampler,
//! selector, and statistics components; a [`Simulation`] value holds
//! everything that is fixed for a configuration (amplitudes, pointer
//! basis, Hamiltonian) and runs independent trials against
//! caller-supplied generators.

use rand::Rng;

use crate::amplitudes::SystemAmplitudes;
use crate::collapse::CollapseFunctional;
use crate::config::{EvolutionModel, SimulationConfig};
use crate::error::{Result, SimulationError};
use crate::information::{
    information_at, threshold_crossing_time, InformationFunctional, InformationHistory,
};
use crate::linalg::Operator;
use crate::master::MasterEquationModel;
use crate::microstate::{ApparatusMicrostate, PointerStates};
use crate::selector::{argmax, selection_weights, weight_margin};

/// Sample-grid points recorded by a closed-form trial.
const CLOSED_FORM_RECORD_POINTS: usize = 500;

/// Immutable record of one completed measurement trial.
#[derive(Debug, Clone)]
pub struct TrialResult {
    /// Selected outcome branch.
    pub outcome: usize,
    /// Apparatus overlaps used for selection.
    pub overlaps: Vec<f64>,
    /// Selection weights `|c_k|² X_k`.
    pub weights: Vec<f64>,
    /// Collapse decisiveness `F(Δ)` for this trial.
    pub collapse_strength: f64,
    /// Time at which the information gap reaches the threshold
    /// (infinite if it never does).
    pub crossing_time: f64,
    /// Recorded sample times.
    pub times: Vec<f64>,
    /// Information history over the trial.
    pub information: InformationHistory,
    /// Final joint density matrix (master-equation variant only).
    pub final_rho: Option<Operator>,
}

/// One simulation configuration, ready to run independent trials.
///
/// The pointer basis and Hamiltonian are built once here and shared
/// read-only by every trial; each trial owns its own microstate,
/// density matrix, and information history.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    amplitudes: SystemAmplitudes,
    switch: CollapseFunctional,
    pointers: Option<PointerStates>,
    master: Option<MasterEquationModel>,
}

impl Simulation {
    /// Validate the configuration and build the shared operator set.
    pub fn new(config: SimulationConfig, amplitudes: SystemAmplitudes) -> Result<Self> {
        config.validate()?;
        if amplitudes.len() != config.system_dim {
            return Err(SimulationError::DimensionMismatch {
                context: "amplitude branch count differs from configured system dimension",
            });
        }
        let switch = CollapseFunctional::new(config.threshold)?;
        let (pointers, master) = match config.model {
            EvolutionModel::ClosedForm => (None, None),
            EvolutionModel::MasterEquation => {
                let pointers = PointerStates::basis(config.system_dim, config.apparatus_dim)?;
                let master = MasterEquationModel::new(&config, &pointers)?;
                (Some(pointers), Some(master))
            }
        };
        Ok(Self {
            config,
            amplitudes,
            switch,
            pointers,
            master,
        })
    }

    /// The configuration this simulation was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The normalized system amplitudes.
    pub fn amplitudes(&self) -> &SystemAmplitudes {
        &self.amplitudes
    }

    /// Run one measurement trial against the supplied generator.
    ///
    /// Samples a fresh apparatus microstate, evolves per the configured
    /// strategy, and applies the deterministic selection rule.
    pub fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TrialResult> {
        match self.config.model {
            EvolutionModel::ClosedForm => self.run_closed_form(rng),
            EvolutionModel::MasterEquation => self.run_master_equation(rng),
        }
    }

    fn sample_reduced<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f64>> {
        let mut micro = ApparatusMicrostate::new(self.config.apparatus_dim)?;
        micro.sample_overlaps(self.config.system_dim, rng)?;
        if self.config.squeezing > 0.0 {
            micro.apply_squeezing(self.config.squeezing)?;
        }
        micro
            .overlaps()
            .map(<[f64]>::to_vec)
            .ok_or(SimulationError::MicrostateNotSampled)
    }

    fn run_closed_form<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TrialResult> {
        let overlaps = self.sample_reduced(rng)?;
        let weights = selection_weights(&self.amplitudes, &overlaps)?;
        let outcome = argmax(&weights)?;
        let (top, second, _) = weight_margin(&weights)?;

        let gamma = self.config.decoherence_rate;
        let crossing_time = threshold_crossing_time(&weights, gamma, self.config.threshold)?;

        // Linear-growth history on the output grid.
        let n_steps = (self.config.t_final / self.config.dt).ceil().max(1.0) as usize;
        let stride = (n_steps / CLOSED_FORM_RECORD_POINTS).max(1);
        let mut times = Vec::new();
        let mut information = InformationHistory::new();
        let mut step = 0;
        while step <= n_steps {
            let t = step as f64 * self.config.dt;
            times.push(t);
            information.push(t, information_at(&weights, gamma, t));
            if step == n_steps {
                break;
            }
            step = (step + stride).min(n_steps);
        }

        Ok(TrialResult {
            outcome,
            overlaps,
            weights,
            collapse_strength: self.switch.evaluate(top - second),
            crossing_time,
            times,
            information,
            final_rho: None,
        })
    }

    fn run_master_equation<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TrialResult> {
        let pointers = self
            .pointers
            .as_ref()
            .ok_or(SimulationError::MicrostateNotSampled)?;
        let model = self
            .master
            .as_ref()
            .ok_or(SimulationError::MicrostateNotSampled)?;

        let mut micro = ApparatusMicrostate::new(self.config.apparatus_dim)?;
        micro.sample_haar(rng);
        micro.project_onto(pointers)?;
        if self.config.squeezing > 0.0 {
            micro.apply_squeezing(self.config.squeezing)?;
        }
        let overlaps = micro
            .overlaps()
            .map(<[f64]>::to_vec)
            .ok_or(SimulationError::MicrostateNotSampled)?;
        let apparatus_state = micro
            .state()
            .map(<[num_complex::Complex<f64>]>::to_vec)
            .ok_or(SimulationError::MicrostateNotSampled)?;

        let rho0 = model.initial_state(self.amplitudes.as_slice(), &apparatus_state)?;
        let info = InformationFunctional::new(self.config.info_policy);
        let run = model.evolve(rho0, info, self.config.dt, self.config.t_final)?;

        let weights = selection_weights(&self.amplitudes, &overlaps)?;
        let outcome = argmax(&weights)?;
        let (gap, _) = run.information.gap();

        Ok(TrialResult {
            outcome,
            overlaps,
            weights,
            collapse_strength: self.switch.evaluate(gap),
            crossing_time: run.information.crossing_time(self.config.threshold),
            times: run.times,
            information: run.information,
            final_rho: Some(run.final_rho),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn closed_form_config() -> SimulationConfig {
        SimulationConfig {
            apparatus_dim: 500,
            seed: Some(42),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn rejects_amplitude_dimension_mismatch() {
        let config = SimulationConfig {
            system_dim: 3,
            ..closed_form_config()
        };
        let amps = SystemAmplitudes::uniform(2).unwrap();
        assert!(Simulation::new(config, amps).is_err());
    }

    #[test]
    fn closed_form_trial_is_deterministic_per_seed() {
        let sim = Simulation::new(
            closed_form_config(),
            SystemAmplitudes::uniform(2).unwrap(),
        )
        .unwrap();
        let a = sim.run_trial(&mut StdRng::seed_from_u64(7)).unwrap();
        let b = sim.run_trial(&mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.overlaps, b.overlaps);
        assert_eq!(a.crossing_time, b.crossing_time);
    }

    #[test]
    fn closed_form_history_grows_linearly() {
        let sim = Simulation::new(
            closed_form_config(),
            SystemAmplitudes::uniform(2).unwrap(),
        )
        .unwrap();
        let trial = sim.run_trial(&mut StdRng::seed_from_u64(1)).unwrap();
        let entries = trial.information.entries();
        assert!(entries.len() >= 2);
        let (t1, info1) = &entries[1];
        let last = entries.last().unwrap();
        // I_k(t) = w_k Γ t: doubling t doubles the information.
        for k in 0..2 {
            let rate1 = info1[k] / t1;
            let rate_last = last.1[k] / last.0;
            assert!((rate1 - rate_last).abs() < 1e-9);
        }
    }

    #[test]
    fn certain_amplitude_always_selects_branch_zero() {
        let config = closed_form_config();
        let amps = SystemAmplitudes::from_real(&[1.0, 0.0]).unwrap();
        let sim = Simulation::new(config, amps).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            assert_eq!(sim.run_trial(&mut rng).unwrap().outcome, 0);
        }
    }

    #[test]
    fn collapse_strength_lies_in_unit_interval() {
        let sim = Simulation::new(
            closed_form_config(),
            SystemAmplitudes::uniform(2).unwrap(),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let trial = sim.run_trial(&mut rng).unwrap();
            assert!((0.0..1.0).contains(&trial.collapse_strength));
        }
    }

    #[test]
    fn master_equation_trial_produces_final_state() {
        let config = SimulationConfig {
            apparatus_dim: 8,
            t_final: 1.0,
            model: EvolutionModel::MasterEquation,
            failure_policy: FailurePolicy::Strict,
            ..SimulationConfig::default()
        };
        let sim = Simulation::new(config, SystemAmplitudes::uniform(2).unwrap()).unwrap();
        let trial = sim.run_trial(&mut StdRng::seed_from_u64(42)).unwrap();
        assert!(trial.final_rho.is_some());
        assert!(!trial.information.is_empty());
        assert!(trial.outcome < 2);
        let sum: f64 = trial.overlaps.iter().sum();
        assert!(sum > 0.0);
    }

    #[test]
    fn squeezing_keeps_overlaps_normalized() {
        let config = SimulationConfig {
            squeezing: 0.4,
            ..closed_form_config()
        };
        let sim = Simulation::new(config, SystemAmplitudes::uniform(2).unwrap()).unwrap();
        let trial = sim.run_trial(&mut StdRng::seed_from_u64(3)).unwrap();
        let sum: f64 = trial.overlaps.iter().sum();
        assert!((sum - 2.0).abs() < 1e-10);
    }
}
