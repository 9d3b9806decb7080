//! Extreme-value statistics for the diffusion front.
//!
//! Converts a tail distribution (the probability that a single walker lies
//! beyond each lattice position) plus a particle-count scale into the
//! variance of the front's limiting extreme-value (Gumbel) distribution.
//!
//! The maximum of `scale` independent walkers satisfies
//! `P(max <= x) = (1 - S(x))^scale` where `S` is the single-walker tail.
//! The power is evaluated in log space, `exp(scale * ln1p(-S))`, so particle
//! counts up to ~10^50 stay inside f64 range even when `S` is tiny.

use crate::types::{DiffusionError, Result};

/// Probability that the maximum of `scale` walkers lies at or below a site
/// with single-walker tail probability `s`.
#[inline]
fn max_cdf(s: f64, scale: f64) -> f64 {
    // Clamp against float drift just above 1; ln1p(-1) is -inf and the
    // result collapses to 0 as required.
    let s = s.min(1.0);
    if s <= 0.0 {
        1.0
    } else {
        (scale * (-s).ln_1p()).exp()
    }
}

/// Gumbel variance of the front position for a single particle-count scale.
///
/// `tail_cdf` is an ordered, non-increasing sequence of tail probabilities
/// paired 1:1 with `positions`, closed with a trailing 0 (the distribution
/// must be complete). Returns `E[x^2] - E[x]^2` of the maximum-walker
/// position.
///
/// # Errors
///
/// - [`DiffusionError::StateShape`] if the arrays differ in length
/// - [`DiffusionError::InvalidParticleCount`] if `scale` is not positive
///   and finite
///
/// # Examples
///
/// ```rust
/// use diffusion_core::stats::gumbel_variance;
///
/// // Mass splits evenly between positions 1 and 2 for a single walker.
/// let var = gumbel_variance(&[0, 1, 2], &[1.0, 0.5, 0.0], 1.0).unwrap();
/// assert!((var - 0.25).abs() < 1e-12);
/// ```
pub fn gumbel_variance(positions: &[i64], tail_cdf: &[f64], scale: f64) -> Result<f64> {
    if positions.len() != tail_cdf.len() {
        return Err(DiffusionError::StateShape {
            expected: positions.len(),
            got: tail_cdf.len(),
        });
    }
    if !(scale > 0.0) || !scale.is_finite() {
        return Err(DiffusionError::InvalidParticleCount(scale));
    }

    let mut mean = 0.0;
    let mut second = 0.0;
    let mut prev = 0.0;
    for (&x, &s) in positions.iter().zip(tail_cdf.iter()) {
        let g = max_cdf(s, scale);
        let p = g - prev;
        prev = g;

        let x = x as f64;
        mean += x * p;
        second += x * x * p;
    }
    Ok(second - mean * mean)
}

/// Batch form of [`gumbel_variance`] over multiple particle-count scales.
///
/// The returned variances follow the input scale order. Fails fast: the
/// first invalid scale aborts the whole batch.
pub fn gumbel_variance_batch(
    positions: &[i64],
    tail_cdf: &[f64],
    scales: &[f64],
) -> Result<Vec<f64>> {
    scales
        .iter()
        .map(|&n| gumbel_variance(positions, tail_cdf, n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_mass_has_zero_variance() {
        // The whole population sits beyond position 1 and nothing beyond 2:
        // the maximum is always at position 2.
        let var = gumbel_variance(&[0, 1, 2], &[1.0, 1.0, 0.0], 5.0).unwrap();
        assert_relative_eq!(var, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_two_point_single_walker() {
        let var = gumbel_variance(&[0, 1, 2], &[1.0, 0.5, 0.0], 1.0).unwrap();
        // Bernoulli over positions {1, 2}: variance 1/4.
        assert_relative_eq!(var, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_more_particles_push_the_max_up() {
        let positions = [0, 1, 2, 3];
        let tail = [1.0, 0.5, 0.25, 0.0];
        let mean_of = |scale: f64| {
            let mut mean = 0.0;
            let mut prev = 0.0;
            for (&x, &s) in positions.iter().zip(tail.iter()) {
                let g = super::max_cdf(s, scale);
                mean += x as f64 * (g - prev);
                prev = g;
            }
            mean
        };
        assert!(mean_of(100.0) > mean_of(1.0));
    }

    #[test]
    fn test_huge_scale_stays_finite() {
        let var = gumbel_variance(&[0, 1, 2], &[1.0, 1e-30, 0.0], 1e50).unwrap();
        assert!(var.is_finite());
        assert!(var >= 0.0);
    }

    #[test]
    fn test_batch_matches_singles() {
        let positions = [-2, 0, 2, 4];
        let tail = [1.0, 0.7, 0.2, 0.0];
        let scales = [1.0, 10.0, 1e6];
        let batch = gumbel_variance_batch(&positions, &tail, &scales).unwrap();
        for (i, &n) in scales.iter().enumerate() {
            let single = gumbel_variance(&positions, &tail, n).unwrap();
            assert_relative_eq!(batch[i], single);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            gumbel_variance(&[0, 1], &[1.0], 2.0),
            Err(DiffusionError::StateShape { .. })
        ));
        assert!(matches!(
            gumbel_variance(&[0], &[0.0], 0.0),
            Err(DiffusionError::InvalidParticleCount(_))
        ));
        assert!(gumbel_variance(&[0], &[0.0], f64::INFINITY).is_err());
    }
}
