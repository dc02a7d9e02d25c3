//! Goodness-of-fit statistics.
//!
//! Chi-squared comparison of empirical outcome frequencies against the
//! Born reference, a one-sample Kolmogorov-Smirnov test validating the
//! sampler against the Exp(1) Porter-Thomas law, and the variance
//! analysis for squeezed-apparatus sweeps.

use statrs::distribution::{ChiSquared, ContinuousCDF, Exp};

use crate::error::{Result, SimulationError};

/// Floor applied to expected frequencies to avoid division by zero.
const EXPECTED_FLOOR: f64 = 1e-10;

/// `Σ_k (f_k - p_k)² / p_k` with expectations floored at a small epsilon.
pub fn chi_squared(observed: &[f64], expected: &[f64]) -> Result<f64> {
    if observed.len() != expected.len() || observed.is_empty() {
        return Err(SimulationError::DimensionMismatch {
            context: "observed and expected frequency vectors must have equal nonzero length",
        });
    }
    Ok(observed
        .iter()
        .zip(expected.iter())
        .map(|(f, p)| {
            let p = p.max(EXPECTED_FLOOR);
            (f - p).powi(2) / p
        })
        .sum())
}

/// Upper-tail p-value of a chi-squared statistic with `dof` degrees of
/// freedom.
pub fn chi_squared_p_value(statistic: f64, dof: usize) -> Result<f64> {
    if dof == 0 {
        return Err(SimulationError::Statistics(
            "chi-squared test needs at least one degree of freedom".into(),
        ));
    }
    if !statistic.is_finite() || statistic < 0.0 {
        return Err(SimulationError::Statistics(format!(
            "chi-squared statistic out of range: {statistic}"
        )));
    }
    let dist = ChiSquared::new(dof as f64)
        .map_err(|e| SimulationError::Statistics(e.to_string()))?;
    Ok(1.0 - dist.cdf(statistic))
}

/// Result of a one-sample Kolmogorov-Smirnov test.
#[derive(Debug, Clone, Copy)]
pub struct KsTest {
    /// Supremum distance between empirical and reference CDF.
    pub statistic: f64,
    /// Asymptotic p-value of the statistic.
    pub p_value: f64,
}

/// One-sample KS test of `samples` against Exponential(`rate`).
///
/// Rescaled overlap coordinates (overlap × apparatus dimension) from a
/// Haar-typical microstate should pass against Exp(1) for dimensions of
/// a few hundred or more.
pub fn ks_exponential(samples: &[f64], rate: f64) -> Result<KsTest> {
    if samples.len() < 2 {
        return Err(SimulationError::Statistics(
            "KS test needs at least two samples".into(),
        ));
    }
    if !(rate > 0.0) || !rate.is_finite() {
        return Err(SimulationError::NonPositiveParameter {
            name: "rate",
            value: rate,
        });
    }
    if samples.iter().any(|x| !x.is_finite()) {
        return Err(SimulationError::NonFinite("KS samples"));
    }
    let dist = Exp::new(rate).map_err(|e| SimulationError::Statistics(e.to_string()))?;

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;
    let mut statistic = 0.0_f64;
    for (i, &x) in sorted.iter().enumerate() {
        let cdf = dist.cdf(x);
        let above = (i + 1) as f64 / n - cdf;
        let below = cdf - i as f64 / n;
        statistic = statistic.max(above).max(below);
    }
    Ok(KsTest {
        statistic,
        p_value: kolmogorov_p_value(statistic, sorted.len()),
    })
}

/// Asymptotic Kolmogorov distribution tail
/// `p = 2 Σ_{k≥1} (-1)^{k-1} exp(-2 k² λ²)` with the finite-sample
/// correction `λ = (√n + 0.12 + 0.11/√n) D`.
fn kolmogorov_p_value(d: f64, n: usize) -> f64 {
    let sqrt_n = (n as f64).sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;
    if lambda < 1e-8 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 1..=100 {
        let term = (-2.0 * (k as f64).powi(2) * lambda * lambda).exp();
        sum += sign * term;
        sign = -sign;
        if term < 1e-12 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Binomial outcome variance `Σ_k f_k (1 - f_k)` of a frequency vector.
pub fn binomial_variance(frequencies: &[f64]) -> f64 {
    frequencies.iter().map(|f| f * (1.0 - f)).sum()
}

/// Least-squares slope of `ys` against `xs`. `None` for fewer than two
/// points or degenerate abscissae.
pub fn least_squares_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if sxx <= f64::EPSILON {
        return None;
    }
    let sxy: f64 = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    Some(sxy / sxx)
}
