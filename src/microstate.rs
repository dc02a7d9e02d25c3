//! Apparatus microstate sampling.
//!
//! A measurement apparatus has far more degrees of freedom than the
//! system it measures; thermal fluctuation makes its microstate differ
//! from run to run. Two sampling routes model this:
//!
//! - **Reduced**: draw each squared overlap directly from Beta(1, d-1),
//!   the exact marginal of one coordinate of a Haar-random point on the
//!   complex d-sphere, then rescale the vector to sum to the number of
//!   outcome branches. For d → ∞ this converges to Exp(1), the
//!   Porter-Thomas law.
//! - **Full**: draw a Ginibre vector (i.i.d. complex standard normals,
//!   normalized) and project it onto a fixed orthonormal pointer basis.
//!
//! Both are pure functions of the caller-supplied generator; a fresh
//! microstate is sampled per trial so measurement events carry
//! independent thermal fluctuation.

use num_complex::Complex;
use rand::Rng;
use rand_distr::{Beta, Distribution, StandardNormal};

use crate::error::{Result, SimulationError};

/// Fixed orthonormal apparatus states, one per outcome branch.
///
/// Built once per simulation configuration and shared read-only across
/// trials; the Hamiltonian builder consumes the same basis.
#[derive(Debug, Clone)]
pub struct PointerStates {
    dim: usize,
    states: Vec<Vec<Complex<f64>>>,
}

impl PointerStates {
    /// The first `n_outcomes` computational basis vectors of the
    /// apparatus space.
    pub fn basis(n_outcomes: usize, dim: usize) -> Result<Self> {
        if dim < 2 {
            return Err(SimulationError::ApparatusDimension(dim));
        }
        if n_outcomes > dim {
            return Err(SimulationError::PointerBasisTooLarge {
                needed: n_outcomes,
                dim,
            });
        }
        let states = (0..n_outcomes)
            .map(|k| {
                let mut v = vec![Complex::new(0.0, 0.0); dim];
                v[k] = Complex::new(1.0, 0.0);
                v
            })
            .collect();
        Ok(Self { dim, states })
    }

    /// Apparatus Hilbert dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of pointer states (outcome branches).
    pub fn n_outcomes(&self) -> usize {
        self.states.len()
    }

    /// The `k`-th pointer state.
    pub fn state(&self, k: usize) -> &[Complex<f64>] {
        &self.states[k]
    }
}

/// Raw overlap-marginal samples rescaled by the dimension.
///
/// Each draw is one Beta(1, d-1) coordinate multiplied by `d`, the
/// quantity whose distribution converges to Exp(1) as d grows. Used to
/// validate the sampler in isolation, independent of outcome selection.
pub fn rescaled_overlap_samples<R: Rng + ?Sized>(
    dim: usize,
    n_samples: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    if dim < 2 {
        return Err(SimulationError::ApparatusDimension(dim));
    }
    let beta = Beta::new(1.0, (dim - 1) as f64)
        .map_err(|_| SimulationError::ApparatusDimension(dim))?;
    Ok((0..n_samples)
        .map(|_| beta.sample(rng) * dim as f64)
        .collect())
}

/// One thermally sampled apparatus microstate.
///
/// Sampling is an explicit operation that overwrites internal state and
/// invalidates previously cached overlaps.
#[derive(Debug, Clone)]
pub struct ApparatusMicrostate {
    dim: usize,
    state: Option<Vec<Complex<f64>>>,
    overlaps: Option<Vec<f64>>,
}

impl ApparatusMicrostate {
    /// New unsampled microstate of dimension `dim` (at least 2).
    pub fn new(dim: usize) -> Result<Self> {
        if dim < 2 {
            return Err(SimulationError::ApparatusDimension(dim));
        }
        Ok(Self {
            dim,
            state: None,
            overlaps: None,
        })
    }

    /// Apparatus Hilbert dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Reduced-variant sampling: `n_outcomes` i.i.d. Beta(1, d-1) draws,
    /// rescaled so the overlap vector sums to `n_outcomes` (mean 1,
    /// matching the Exp(1) limit). Overwrites any previous sample.
    pub fn sample_overlaps<R: Rng + ?Sized>(
        &mut self,
        n_outcomes: usize,
        rng: &mut R,
    ) -> Result<&[f64]> {
        if n_outcomes < 2 {
            return Err(SimulationError::SystemDimension(n_outcomes));
        }
        let beta = Beta::new(1.0, (self.dim - 1) as f64)
            .map_err(|_| SimulationError::ApparatusDimension(self.dim))?;
        let mut draws: Vec<f64> = (0..n_outcomes).map(|_| beta.sample(rng)).collect();
        let sum: f64 = draws.iter().sum();
        if !(sum > 0.0) {
            return Err(SimulationError::NonFinite("sampled overlaps"));
        }
        let scale = n_outcomes as f64 / sum;
        for x in &mut draws {
            *x *= scale;
        }
        self.state = None;
        Ok(self.overlaps.insert(draws))
    }

    /// Full-variant sampling: Haar-random apparatus vector via the
    /// Ginibre construction. Invalidates cached overlaps.
    pub fn sample_haar<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &[Complex<f64>] {
        let mut v: Vec<Complex<f64>> = (0..self.dim)
            .map(|_| Complex::new(rng.sample(StandardNormal), rng.sample(StandardNormal)))
            .collect();
        let norm = v.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        for a in &mut v {
            *a /= norm;
        }
        self.overlaps = None;
        self.state.insert(v)
    }

    /// Squared projections `X_k = |⟨A_k|ψ⟩|²` of the sampled Haar state
    /// onto each pointer state. Caches and returns the overlap vector.
    pub fn project_onto(&mut self, pointers: &PointerStates) -> Result<&[f64]> {
        let state = self
            .state
            .as_ref()
            .ok_or(SimulationError::MicrostateNotSampled)?;
        if pointers.dim() != self.dim {
            return Err(SimulationError::DimensionMismatch {
                context: "pointer basis dimension differs from apparatus dimension",
            });
        }
        let overlaps: Vec<f64> = (0..pointers.n_outcomes())
            .map(|k| {
                let inner: Complex<f64> = pointers
                    .state(k)
                    .iter()
                    .zip(state.iter())
                    .map(|(a, s)| a.conj() * s)
                    .sum();
                inner.norm_sqr()
            })
            .collect();
        Ok(self.overlaps.insert(overlaps))
    }

    /// Apparatus-engineering rescale: multiply every overlap by `e^{-r}`
    /// and renormalize the vector to sum to the number of branches.
    pub fn apply_squeezing(&mut self, r: f64) -> Result<&[f64]> {
        if !(r >= 0.0) || !r.is_finite() {
            return Err(SimulationError::NegativeParameter {
                name: "squeezing",
                value: r,
            });
        }
        let overlaps = self
            .overlaps
            .as_mut()
            .ok_or(SimulationError::MicrostateNotSampled)?;
        let damp = (-r).exp();
        for x in overlaps.iter_mut() {
            *x *= damp;
        }
        let sum: f64 = overlaps.iter().sum();
        if !(sum > 0.0) {
            return Err(SimulationError::NonFinite("squeezed overlaps"));
        }
        let scale = overlaps.len() as f64 / sum;
        for x in overlaps.iter_mut() {
            *x *= scale;
        }
        Ok(overlaps)
    }

    /// Cached overlaps from the most recent sampling, if any.
    pub fn overlaps(&self) -> Option<&[f64]> {
        self.overlaps.as_deref()
    }

    /// Sampled Haar state, if the full variant was used.
    pub fn state(&self) -> Option<&[Complex<f64>]> {
        self.state.as_deref()
    }
}
