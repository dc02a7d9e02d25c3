//! Ensemble runner and Born-rule statistics.
//!
//! Repeats independent measurement trials — a fresh apparatus
//! microstate and a fresh per-trial generator each time — and compares
//! the outcome frequencies against the Born reference `|c_k|²`. Trials
//! share only read-only state, so the loop parallelizes cleanly when
//! the `parallel` feature is enabled.

#[cfg(not(feature = "parallel"))]
use log::debug;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::amplitudes::SystemAmplitudes;
use crate::config::{FailurePolicy, SimulationConfig};
use crate::error::{Result, SimulationError};
use crate::model::{Simulation, TrialResult};
use crate::stats::{binomial_variance, chi_squared, chi_squared_p_value, least_squares_slope};

/// Prime stride between per-trial seeds, so trial generators never
/// share a stream.
const SEED_STRIDE: u64 = 7919;

/// Aggregated outcome statistics of one ensemble run.
///
/// Rebuilt fully on each run; not incrementally updatable.
#[derive(Debug, Clone)]
pub struct EnsembleStatistics {
    /// Trials that completed and entered the statistics.
    pub n_trials: usize,
    /// Trials skipped under the lenient failure policy.
    pub failed_trials: usize,
    /// Raw outcome counts per branch.
    pub counts: Vec<usize>,
    /// Empirical outcome frequencies.
    pub frequencies: Vec<f64>,
    /// Born-rule reference `|c_k|²`.
    pub born_reference: Vec<f64>,
    /// Per-branch statistical error `√(p_k (1 - p_k) / N)`. Wide bars
    /// flag a low-confidence run; a small trial count is reported, not
    /// treated as a failure.
    pub statistical_error: Vec<f64>,
    /// Chi-squared distance between frequencies and the Born reference.
    pub chi_squared: f64,
    /// Upper-tail p-value of the chi-squared statistic
    /// (n_branches - 1 degrees of freedom).
    pub p_value: f64,
    /// Largest |frequency - reference| over the branches.
    pub max_deviation: f64,
    /// Mean collapse decisiveness `F(Δ)` across completed trials.
    pub mean_collapse_strength: f64,
}

/// One row of an apparatus-dimension convergence sweep.
#[derive(Debug, Clone)]
pub struct ConvergenceEntry {
    pub apparatus_dim: usize,
    pub chi_squared: f64,
    pub p_value: f64,
    pub max_deviation: f64,
    /// Reference deviation scale `1/√d` the max deviation should track.
    pub reference_scale: f64,
    pub frequencies: Vec<f64>,
}

/// One row of a squeezed-apparatus sweep.
#[derive(Debug, Clone)]
pub struct SqueezingEntry {
    /// Squeezing strength r.
    pub squeezing: f64,
    pub frequencies: Vec<f64>,
    /// Binomial outcome variance `Σ f(1-f)`.
    pub variance: f64,
    /// Variance relative to the unsqueezed baseline.
    pub variance_ratio: f64,
}

/// Squeezed-apparatus sweep with the fitted mode-count estimate.
#[derive(Debug, Clone)]
pub struct SqueezingSweep {
    pub entries: Vec<SqueezingEntry>,
    /// Effective apparatus mode count from the variance-reduction
    /// scaling `Var(r)/Var(0) = exp(-4 N_eff r)`, when enough squeezed
    /// points exist to fit a slope.
    pub effective_modes: Option<f64>,
}

fn trial_rng(base: Option<u64>, trial: usize) -> StdRng {
    match base {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(trial as u64 * SEED_STRIDE)),
        None => StdRng::from_entropy(),
    }
}

/// Run `n_trials` independent measurements and aggregate their outcomes.
///
/// Under [`FailurePolicy::Strict`] (the default) the first trial error
/// aborts the whole ensemble; under [`FailurePolicy::Lenient`] failed
/// trials are logged, counted, and excluded from the statistics.
pub fn run_ensemble(sim: &Simulation, n_trials: usize) -> Result<EnsembleStatistics> {
    if n_trials == 0 {
        return Err(SimulationError::EmptyEnsemble);
    }
    let config = sim.config();
    info!(
        "running {} trials (apparatus dim {}, {:?})",
        n_trials, config.apparatus_dim, config.model
    );

    let seed = config.seed;

    #[cfg(feature = "parallel")]
    let results: Vec<Result<TrialResult>> = (0..n_trials)
        .into_par_iter()
        .map(|trial| {
            let mut rng = trial_rng(seed, trial);
            sim.run_trial(&mut rng)
        })
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<TrialResult>> = {
        let progress = (n_trials / 10).max(1);
        let mut acc = Vec::with_capacity(n_trials);
        for trial in 0..n_trials {
            let mut rng = trial_rng(seed, trial);
            acc.push(sim.run_trial(&mut rng));
            if (trial + 1) % progress == 0 {
                debug!("completed {}/{} trials", trial + 1, n_trials);
            }
        }
        acc
    };

    let n_branches = config.system_dim;
    let mut counts = vec![0usize; n_branches];
    let mut failed_trials = 0usize;
    let mut strength_sum = 0.0;

    for (trial, result) in results.into_iter().enumerate() {
        match result {
            Ok(trial_result) => {
                counts[trial_result.outcome] += 1;
                strength_sum += trial_result.collapse_strength;
            }
            Err(source) => match config.failure_policy {
                FailurePolicy::Strict => {
                    return Err(SimulationError::TrialFailed {
                        trial,
                        source: Box::new(source),
                    });
                }
                FailurePolicy::Lenient => {
                    warn!("skipping failed trial {}: {}", trial, source);
                    failed_trials += 1;
                }
            },
        }
    }

    let completed = n_trials - failed_trials;
    if completed == 0 {
        return Err(SimulationError::Statistics(
            "every trial of the ensemble failed".into(),
        ));
    }

    let frequencies: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 / completed as f64)
        .collect();
    let born_reference = sim.amplitudes().born_weights();
    let statistical_error: Vec<f64> = born_reference
        .iter()
        .map(|p| (p * (1.0 - p) / completed as f64).sqrt())
        .collect();
    let chi2 = chi_squared(&frequencies, &born_reference)?;
    let p_value = chi_squared_p_value(chi2, n_branches - 1)?;
    let max_deviation = frequencies
        .iter()
        .zip(born_reference.iter())
        .map(|(f, p)| (f - p).abs())
        .fold(0.0, f64::max);

    info!(
        "ensemble complete: {} trials ({} failed), chi² = {:.4}, max deviation = {:.4}",
        completed, failed_trials, chi2, max_deviation
    );

    Ok(EnsembleStatistics {
        n_trials: completed,
        failed_trials,
        counts,
        frequencies,
        born_reference,
        statistical_error,
        chi_squared: chi2,
        p_value,
        max_deviation,
        mean_collapse_strength: strength_sum / completed as f64,
    })
}

/// Convergence sweep over apparatus dimensions: the maximum deviation
/// from the Born reference should shrink like `1/√d`.
pub fn dimension_sweep(
    config: &SimulationConfig,
    amplitudes: &SystemAmplitudes,
    dims: &[usize],
    n_trials: usize,
) -> Result<Vec<ConvergenceEntry>> {
    let mut entries = Vec::with_capacity(dims.len());
    for &dim in dims {
        let swept = SimulationConfig {
            apparatus_dim: dim,
            ..config.clone()
        };
        let sim = Simulation::new(swept, amplitudes.clone())?;
        let stats = run_ensemble(&sim, n_trials)?;
        entries.push(ConvergenceEntry {
            apparatus_dim: dim,
            chi_squared: stats.chi_squared,
            p_value: stats.p_value,
            max_deviation: stats.max_deviation,
            reference_scale: 1.0 / (dim as f64).sqrt(),
            frequencies: stats.frequencies,
        });
    }
    Ok(entries)
}

/// Squeezed-apparatus sweep: rerun the ensemble for each squeezing
/// strength and fit the variance-reduction scaling.
pub fn squeezing_sweep(
    config: &SimulationConfig,
    amplitudes: &SystemAmplitudes,
    squeezings: &[f64],
    n_trials: usize,
) -> Result<SqueezingSweep> {
    let mut raw = Vec::with_capacity(squeezings.len());
    for &r in squeezings {
        let swept = SimulationConfig {
            squeezing: r,
            ..config.clone()
        };
        let sim = Simulation::new(swept, amplitudes.clone())?;
        let stats = run_ensemble(&sim, n_trials)?;
        let variance = binomial_variance(&stats.frequencies);
        raw.push((r, stats.frequencies, variance));
    }

    // Baseline: the r = 0 entry if present, else the first.
    let baseline = raw
        .iter()
        .find(|(r, _, _)| *r == 0.0)
        .map(|(_, _, v)| *v)
        .or_else(|| raw.first().map(|(_, _, v)| *v))
        .ok_or(SimulationError::EmptyEnsemble)?;

    let entries: Vec<SqueezingEntry> = raw
        .into_iter()
        .map(|(squeezing, frequencies, variance)| SqueezingEntry {
            squeezing,
            frequencies,
            variance,
            variance_ratio: if baseline > 0.0 {
                variance / baseline
            } else {
                f64::NAN
            },
        })
        .collect();

    // Var(r)/Var(0) = exp(-4 N r) → N_eff = -slope/4 on log ratios.
    let (xs, ys): (Vec<f64>, Vec<f64>) = entries
        .iter()
        .filter(|e| e.squeezing > 0.01 && e.variance_ratio.is_finite())
        .map(|e| (e.squeezing, (e.variance_ratio + 1e-10).ln()))
        .unzip();
    let effective_modes = least_squares_slope(&xs, &ys).map(|slope| -slope / 4.0);

    Ok(SqueezingSweep {
        entries,
        effective_modes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvolutionModel;

    fn base_config() -> SimulationConfig {
        SimulationConfig {
            apparatus_dim: 1000,
            seed: Some(42),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn empty_ensemble_is_rejected() {
        let sim = Simulation::new(base_config(), SystemAmplitudes::uniform(2).unwrap()).unwrap();
        let err = run_ensemble(&sim, 0).unwrap_err();
        assert_eq!(err, SimulationError::EmptyEnsemble);
    }

    #[test]
    fn balanced_superposition_reproduces_born_rule() {
        let sim = Simulation::new(base_config(), SystemAmplitudes::uniform(2).unwrap()).unwrap();
        let stats = run_ensemble(&sim, 4000).unwrap();
        assert_eq!(stats.n_trials, 4000);
        for (f, p) in stats.frequencies.iter().zip(stats.born_reference.iter()) {
            assert!((f - p).abs() < 0.05, "frequency {} vs reference {}", f, p);
        }
        assert!(stats.chi_squared < 10.0, "chi² = {}", stats.chi_squared);
    }

    #[test]
    fn asymmetric_superposition_tracks_amplitudes() {
        let amps = SystemAmplitudes::from_real(&[0.6, 0.8]).unwrap();
        let sim = Simulation::new(base_config(), amps).unwrap();
        let stats = run_ensemble(&sim, 4000).unwrap();
        assert!((stats.frequencies[0] - 0.36).abs() < 0.05);
        assert!((stats.frequencies[1] - 0.64).abs() < 0.05);
    }

    #[test]
    fn seeded_ensembles_are_reproducible() {
        let sim = Simulation::new(base_config(), SystemAmplitudes::uniform(2).unwrap()).unwrap();
        let a = run_ensemble(&sim, 500).unwrap();
        let b = run_ensemble(&sim, 500).unwrap();
        assert_eq!(a.counts, b.counts);
        assert_eq!(a.chi_squared, b.chi_squared);
    }

    #[test]
    fn statistical_error_shrinks_with_trials() {
        let sim = Simulation::new(base_config(), SystemAmplitudes::uniform(2).unwrap()).unwrap();
        let small = run_ensemble(&sim, 100).unwrap();
        let large = run_ensemble(&sim, 1600).unwrap();
        // √(p(1-p)/N): 16× the trials → 4× tighter bars.
        assert!((small.statistical_error[0] / large.statistical_error[0] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn dimension_sweep_reports_reference_scale() {
        let entries = dimension_sweep(
            &base_config(),
            &SystemAmplitudes::uniform(2).unwrap(),
            &[100, 400],
            300,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert!((entries[0].reference_scale - 0.1).abs() < 1e-12);
        assert!((entries[1].reference_scale - 0.05).abs() < 1e-12);
    }

    #[test]
    fn squeezing_sweep_has_unit_baseline_ratio() {
        let sweep = squeezing_sweep(
            &base_config(),
            &SystemAmplitudes::uniform(2).unwrap(),
            &[0.0, 0.2, 0.4],
            400,
        )
        .unwrap();
        assert_eq!(sweep.entries.len(), 3);
        assert!((sweep.entries[0].variance_ratio - 1.0).abs() < 1e-12);
        for entry in &sweep.entries {
            assert!(entry.variance >= 0.0 && entry.variance <= 0.5 + 1e-12);
        }
    }

    #[test]
    fn master_equation_ensemble_completes() {
        let config = SimulationConfig {
            apparatus_dim: 6,
            t_final: 0.5,
            dt: 0.01,
            seed: Some(11),
            model: EvolutionModel::MasterEquation,
            ..SimulationConfig::default()
        };
        let sim = Simulation::new(config, SystemAmplitudes::uniform(2).unwrap()).unwrap();
        let stats = run_ensemble(&sim, 8).unwrap();
        assert_eq!(stats.n_trials, 8);
        assert_eq!(stats.counts.iter().sum::<usize>(), 8);
    }
}
