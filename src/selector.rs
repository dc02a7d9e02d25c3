//! Deterministic outcome selection.
//!
//! The central modeling claim: once the apparatus microstate is fixed,
//! the measurement outcome is a pure function of the system amplitudes
//! and the sampled overlaps. All apparent randomness lives in the
//! microstate draw, none in the selection rule.

use crate::amplitudes::SystemAmplitudes;
use crate::error::{Result, SimulationError};

/// Selection weights `w_k = |c_k|² X_k`.
pub fn selection_weights(amps: &SystemAmplitudes, overlaps: &[f64]) -> Result<Vec<f64>> {
    if overlaps.len() != amps.len() {
        return Err(SimulationError::DimensionMismatch {
            context: "overlap vector length differs from amplitude branch count",
        });
    }
    if overlaps.iter().any(|x| !x.is_finite() || *x < 0.0) {
        return Err(SimulationError::NonFinite("overlap vector"));
    }
    Ok(amps
        .born_weights()
        .iter()
        .zip(overlaps.iter())
        .map(|(p, x)| p * x)
        .collect())
}

/// Index of the largest weight; ties resolve to the first index.
pub fn argmax(weights: &[f64]) -> Result<usize> {
    if weights.is_empty() {
        return Err(SimulationError::AmplitudeCount(0));
    }
    if weights.iter().any(|w| !w.is_finite()) {
        return Err(SimulationError::NonFinite("selection weights"));
    }
    let mut best = 0;
    for (k, &w) in weights.iter().enumerate().skip(1) {
        if w > weights[best] {
            best = k;
        }
    }
    Ok(best)
}

/// The deterministic selection rule `outcome = argmax_k |c_k|² X_k`.
///
/// Identical `(amplitudes, overlaps)` input always yields the identical
/// outcome, independent of invocation order or prior trials.
pub fn select_outcome(amps: &SystemAmplitudes, overlaps: &[f64]) -> Result<usize> {
    argmax(&selection_weights(amps, overlaps)?)
}

/// Winning and runner-up weights, `(w_winner, w_second, winner_index)`.
pub fn weight_margin(weights: &[f64]) -> Result<(f64, f64, usize)> {
    let winner = argmax(weights)?;
    if weights.len() < 2 {
        return Err(SimulationError::AmplitudeCount(weights.len()));
    }
    let second = weights
        .iter()
        .enumerate()
        .filter(|&(k, _)| k != winner)
        .map(|(_, &w)| w)
        .fold(f64::NEG_INFINITY, f64::max);
    Ok((weights[winner], second, winner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_amplitudes_follow_overlaps() {
        let amps = SystemAmplitudes::uniform(2).unwrap();
        assert_eq!(select_outcome(&amps, &[0.4, 1.6]).unwrap(), 1);
        assert_eq!(select_outcome(&amps, &[1.6, 0.4]).unwrap(), 0);
    }

    #[test]
    fn zero_amplitude_branch_never_wins() {
        // |c_1|² = 0 forces weight 0 regardless of its overlap.
        let amps = SystemAmplitudes::from_real(&[1.0, 0.0]).unwrap();
        for overlaps in [[0.1, 1.9], [1.0, 1.0], [0.0, 2.0]] {
            assert_eq!(select_outcome(&amps, &overlaps).unwrap(), 0);
        }
    }

    #[test]
    fn exact_ties_resolve_to_first_index() {
        let amps = SystemAmplitudes::uniform(3).unwrap();
        assert_eq!(select_outcome(&amps, &[1.0, 1.0, 1.0]).unwrap(), 0);
        assert_eq!(select_outcome(&amps, &[0.5, 1.25, 1.25]).unwrap(), 1);
    }

    #[test]
    fn repeated_invocation_is_reproducible() {
        let amps = SystemAmplitudes::from_real(&[0.6, 0.8]).unwrap();
        let overlaps = [1.3, 0.7];
        let first = select_outcome(&amps, &overlaps).unwrap();
        for _ in 0..100 {
            assert_eq!(select_outcome(&amps, &overlaps).unwrap(), first);
        }
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let amps = SystemAmplitudes::uniform(2).unwrap();
        assert!(select_outcome(&amps, &[1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn rejects_negative_overlap() {
        let amps = SystemAmplitudes::uniform(2).unwrap();
        assert!(select_outcome(&amps, &[-0.1, 2.1]).is_err());
    }

    #[test]
    fn weight_margin_orders_winner_and_second() {
        let (w1, w2, k) = weight_margin(&[0.1, 0.4, 0.25]).unwrap();
        assert_eq!(k, 1);
        assert!((w1 - 0.4).abs() < 1e-12);
        assert!((w2 - 0.25).abs() < 1e-12);
    }
}
