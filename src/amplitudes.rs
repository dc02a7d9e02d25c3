//! System state amplitudes.

use num_complex::Complex;

use crate::error::{Result, SimulationError};

/// Normalized amplitude vector `c_k` over the outcome branches of the
/// measured system.
///
/// Construction normalizes to unit norm; the value is immutable
/// afterwards. A new instance is built per experiment configuration,
/// never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemAmplitudes {
    amps: Vec<Complex<f64>>,
}

impl SystemAmplitudes {
    /// Build from raw complex amplitudes, normalizing to unit norm.
    ///
    /// Fails on fewer than two branches, non-finite entries, or a
    /// zero-norm vector.
    pub fn new(raw: Vec<Complex<f64>>) -> Result<Self> {
        if raw.len() < 2 {
            return Err(SimulationError::AmplitudeCount(raw.len()));
        }
        if raw.iter().any(|a| !a.re.is_finite() || !a.im.is_finite()) {
            return Err(SimulationError::NonFinite("amplitude vector"));
        }
        let norm = raw.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        if norm <= 0.0 {
            return Err(SimulationError::ZeroNormAmplitudes);
        }
        let amps = raw.into_iter().map(|a| a / norm).collect();
        Ok(Self { amps })
    }

    /// Build from real amplitudes.
    pub fn from_real(raw: &[f64]) -> Result<Self> {
        Self::new(raw.iter().map(|&x| Complex::new(x, 0.0)).collect())
    }

    /// Uniform superposition over `n` branches.
    pub fn uniform(n: usize) -> Result<Self> {
        Self::from_real(&vec![1.0; n])
    }

    /// Number of outcome branches.
    pub fn len(&self) -> usize {
        self.amps.len()
    }

    /// Always false; a constructed value holds at least two branches.
    pub fn is_empty(&self) -> bool {
        self.amps.is_empty()
    }

    /// Amplitude of branch `k`.
    pub fn get(&self, k: usize) -> Complex<f64> {
        self.amps[k]
    }

    /// The normalized amplitudes.
    pub fn as_slice(&self) -> &[Complex<f64>] {
        &self.amps
    }

    /// Born-rule weights `|c_k|²`. Sums to 1 by construction.
    pub fn born_weights(&self) -> Vec<f64> {
        self.amps.iter().map(|a| a.norm_sqr()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_on_construction() {
        let amps = SystemAmplitudes::from_real(&[3.0, 4.0]).unwrap();
        let norm: f64 = amps.born_weights().iter().sum();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!((amps.get(0).re - 0.6).abs() < 1e-12);
        assert!((amps.get(1).re - 0.8).abs() < 1e-12);
    }

    #[test]
    fn rejects_short_vector() {
        assert_eq!(
            SystemAmplitudes::from_real(&[1.0]),
            Err(SimulationError::AmplitudeCount(1))
        );
    }

    #[test]
    fn rejects_zero_norm() {
        assert_eq!(
            SystemAmplitudes::from_real(&[0.0, 0.0]),
            Err(SimulationError::ZeroNormAmplitudes)
        );
    }

    #[test]
    fn rejects_nan_entry() {
        assert!(SystemAmplitudes::from_real(&[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn uniform_superposition_weights() {
        let amps = SystemAmplitudes::uniform(4).unwrap();
        for w in amps.born_weights() {
            assert!((w - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn complex_phases_preserved() {
        let amps = SystemAmplitudes::new(vec![
            Complex::new(0.0, 1.0),
            Complex::new(1.0, 0.0),
        ])
        .unwrap();
        let w = amps.born_weights();
        assert!((w[0] - 0.5).abs() < 1e-12);
        assert!((w[1] - 0.5).abs() < 1e-12);
    }
}
