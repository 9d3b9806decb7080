//! Cumulative-distribution evolution indexed by occupancy count.
//!
//! [`DiffusionTimeCdf`] advances the recurrence
//!
//! ```text
//! Z(0, t+1)   = 1
//! Z(n, t+1)   = b_n * Z(n-1, t) + (1 - b_n) * Z(n, t)     0 < n <= t
//! Z(t+1, t+1) = b * Z(t, t)
//! ```
//!
//! where each `b_n` is a fresh mixing coefficient. `Z(n, t)` is the
//! probability that the front has not retreated past the n-th reachable
//! site; index n maps to lattice position `2n - t`.
//!
//! Quantile searches compare against the reciprocal target (`Z > 1/q`)
//! so that 1-in-10^50 tail events never require representing probabilities
//! next to 1.

use diffusion_core::rng::BiasGenerator;
use diffusion_core::stats;
use diffusion_core::{DiffusionError, Result};

use crate::state::TimeCdfState;

/// Time-evolution engine for the CDF-over-occupancy recurrence.
///
/// Owns the CDF array (allocated once to the `t_max` horizon), the time
/// counter, and an exclusive random stream.
///
/// # Examples
///
/// ```rust
/// use diffusion_sim::DiffusionTimeCdf;
///
/// let mut engine = DiffusionTimeCdf::with_seed(1.0, 16, 7).unwrap();
/// engine.evolve_steps(4).unwrap();
///
/// let cdf = engine.cdf();
/// assert_eq!(cdf[0], 1.0);
/// assert_eq!(engine.time(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct DiffusionTimeCdf {
    cdf: Vec<f64>,
    t: u64,
    t_max: u64,
    bias: BiasGenerator,
}

impl DiffusionTimeCdf {
    /// Creates an engine at time 0 with `cdf[0] = 1`, seeded from entropy.
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::InvalidBeta`] for negative or NaN `beta`.
    pub fn new(beta: f64, t_max: u64) -> Result<Self> {
        Ok(Self::with_generator(BiasGenerator::new(beta)?, t_max))
    }

    /// Creates a deterministically seeded engine.
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::InvalidBeta`] for negative or NaN `beta`.
    pub fn with_seed(beta: f64, t_max: u64, seed: u64) -> Result<Self> {
        Ok(Self::with_generator(
            BiasGenerator::from_seed(beta, seed)?,
            t_max,
        ))
    }

    fn with_generator(bias: BiasGenerator, t_max: u64) -> Self {
        let mut cdf = vec![0.0; t_max as usize + 1];
        cdf[0] = 1.0;
        Self {
            cdf,
            t: 0,
            t_max,
            bias,
        }
    }

    /// Returns the disorder parameter.
    #[inline]
    pub fn beta(&self) -> f64 {
        self.bias.beta()
    }

    /// Replaces the disorder parameter for subsequent steps.
    pub fn set_beta(&mut self, beta: f64) -> Result<()> {
        self.bias.set_beta(beta)
    }

    /// Reseeds the owned random stream.
    #[inline]
    pub fn reseed(&mut self, seed: u64) {
        self.bias.reseed(seed);
    }

    /// Current time (number of completed steps).
    #[inline]
    pub fn time(&self) -> u64 {
        self.t
    }

    /// Overrides the time counter (checkpoint restore).
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::HorizonExceeded`] if `t > t_max`.
    pub fn set_time(&mut self, t: u64) -> Result<()> {
        if t > self.t_max {
            return Err(DiffusionError::HorizonExceeded {
                t,
                t_max: self.t_max,
            });
        }
        self.t = t;
        Ok(())
    }

    /// Allocated time horizon.
    #[inline]
    pub fn t_max(&self) -> u64 {
        self.t_max
    }

    /// Full backing array (length `t_max + 1`; entries past `time()` are 0).
    #[inline]
    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    /// Meaningful prefix of the CDF, indices `0..=t`.
    pub fn save_cdf(&self) -> Vec<f64> {
        self.cdf[..=self.t as usize].to_vec()
    }

    /// Replaces the backing array (checkpoint restore).
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::StateShape`] unless the supplied array has
    /// the allocated length `t_max + 1`.
    pub fn set_cdf(&mut self, cdf: Vec<f64>) -> Result<()> {
        if cdf.len() != self.cdf.len() {
            return Err(DiffusionError::StateShape {
                expected: self.cdf.len(),
                got: cdf.len(),
            });
        }
        self.cdf = cdf;
        Ok(())
    }

    /// Advances the recurrence by one timestep (build-then-swap).
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::HorizonExceeded`] at the horizon; the
    /// state is not mutated on failure.
    pub fn advance(&mut self) -> Result<()> {
        if self.t >= self.t_max {
            return Err(DiffusionError::HorizonExceeded {
                t: self.t,
                t_max: self.t_max,
            });
        }
        let t = self.t as usize;
        let mut next = vec![0.0; self.cdf.len()];
        next[0] = 1.0;
        for n in 1..=t + 1 {
            let b = self.bias.draw();
            next[n] = if n == t + 1 {
                // A fresh site can only inherit mass leaking off the
                // previous frontier.
                b * self.cdf[n - 1]
            } else {
                b * self.cdf[n - 1] + (1.0 - b) * self.cdf[n]
            };
        }
        self.cdf = next;
        self.t += 1;
        Ok(())
    }

    /// Evolves until `time() == t` (no-op when already past).
    pub fn evolve_to(&mut self, t: u64) -> Result<()> {
        while self.t < t {
            self.advance()?;
        }
        Ok(())
    }

    /// Evolves forward a fixed number of timesteps.
    pub fn evolve_steps(&mut self, num: u64) -> Result<()> {
        for _ in 0..num {
            self.advance()?;
        }
        Ok(())
    }

    /// Position of the 1-in-`quantile` tail event.
    ///
    /// Scans n = t down to 0 for the first `cdf[n] > 1/quantile` and maps
    /// the crossing index to the lattice via `2n + 2 - t`.
    ///
    /// # Errors
    ///
    /// - [`DiffusionError::InvalidQuantile`] unless `quantile > 1`
    /// - [`DiffusionError::QuantileNotFound`] if no index crosses the
    ///   threshold (possible only for caller-installed CDF arrays)
    pub fn find_quantile(&self, quantile: f64) -> Result<i64> {
        let threshold = reciprocal_threshold(quantile)?;
        let t = self.t as usize;
        for n in (0..=t).rev() {
            if self.cdf[n] > threshold {
                return Ok(2 * n as i64 + 2 - self.t as i64);
            }
        }
        Err(DiffusionError::QuantileNotFound {
            quantile,
            t: self.t,
        })
    }

    /// Batch quantile search: one descending pass services every target.
    ///
    /// The incoming quantiles are sorted internally (largest first, the
    /// order the scan requires); results are reported in the caller's
    /// original order, `None` marking targets the scan could not resolve.
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::InvalidQuantile`] if any target is <= 1.
    pub fn find_quantiles(&self, quantiles: &[f64]) -> Result<Vec<Option<i64>>> {
        let thresholds = descending_thresholds(quantiles)?;
        let mut out = vec![None; quantiles.len()];
        let mut k = 0;
        let t = self.t as usize;
        for n in (0..=t).rev() {
            while k < thresholds.len() && self.cdf[n] > thresholds[k].1 {
                out[thresholds[k].0] = Some(2 * n as i64 + 2 - self.t as i64);
                k += 1;
            }
            if k == thresholds.len() {
                break;
            }
        }
        Ok(out)
    }

    /// Trailing-edge analogue of [`DiffusionTimeCdf::find_quantile`]: the
    /// first index
    /// (ascending) whose CDF drops below `1 - 1/quantile`, mapped to
    /// position `2n - 2 - t`.
    ///
    /// Note that f64 cannot resolve `1 - 1/quantile` from 1 once
    /// `quantile` exceeds ~2^53; beyond that the search degenerates to the
    /// first index strictly below 1.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`DiffusionTimeCdf::find_quantile`].
    pub fn find_lower_quantile(&self, quantile: f64) -> Result<i64> {
        let threshold = reciprocal_threshold(quantile)?;
        let t = self.t as usize;
        for n in 0..=t {
            if self.cdf[n] < 1.0 - threshold {
                return Ok(2 * n as i64 - 2 - self.t as i64);
            }
        }
        Err(DiffusionError::QuantileNotFound {
            quantile,
            t: self.t,
        })
    }

    /// Lattice positions `2n - t` for every retained index.
    pub fn positions(&self) -> Vec<i64> {
        let t = self.t as i64;
        (0..=t).map(|n| 2 * n - t).collect()
    }

    /// Probability and front velocity at the quantile crossing.
    ///
    /// The velocity is `position / t` with position `2n - t` (0 at t = 0).
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`DiffusionTimeCdf::find_quantile`].
    pub fn prob_and_velocity(&self, quantile: f64) -> Result<(f64, f64)> {
        let threshold = reciprocal_threshold(quantile)?;
        let t = self.t as usize;
        for n in (0..=t).rev() {
            if self.cdf[n] > threshold {
                let position = 2 * n as i64 - self.t as i64;
                let v = if self.t == 0 {
                    0.0
                } else {
                    position as f64 / self.t as f64
                };
                return Ok((self.cdf[n], v));
            }
        }
        Err(DiffusionError::QuantileNotFound {
            quantile,
            t: self.t,
        })
    }

    /// Gumbel variance of the front for `n_particles` walkers.
    ///
    /// Slices the CDF to the current horizon, closes it with a trailing 0,
    /// and delegates to [`diffusion_core::stats::gumbel_variance`].
    pub fn gumbel_variance(&self, n_particles: f64) -> Result<f64> {
        let (positions, tail) = self.closed_tail();
        stats::gumbel_variance(&positions, &tail, n_particles)
    }

    /// Batch Gumbel variance over several particle-count scales.
    pub fn gumbel_variance_batch(&self, n_particles: &[f64]) -> Result<Vec<f64>> {
        let (positions, tail) = self.closed_tail();
        stats::gumbel_variance_batch(&positions, &tail, n_particles)
    }

    fn closed_tail(&self) -> (Vec<i64>, Vec<f64>) {
        let t = self.t as usize;
        let mut tail = self.cdf[..=t].to_vec();
        tail.push(0.0);
        let ti = self.t as i64;
        let positions = (0..=ti + 1).map(|n| 2 * n - ti).collect();
        (positions, tail)
    }

    /// Captures an owned snapshot for external checkpointing.
    ///
    /// The snapshot stores the meaningful CDF prefix; the random stream is
    /// not captured; reseed after [`DiffusionTimeCdf::from_snapshot`] for
    /// reproducible continuation.
    pub fn snapshot(&self) -> TimeCdfState {
        TimeCdfState {
            beta: self.beta(),
            t: self.t,
            t_max: self.t_max,
            cdf: self.save_cdf(),
        }
    }

    /// Rebuilds an engine from a snapshot (entropy-seeded stream).
    ///
    /// Accepts either a full `t_max + 1` array or the saved `t + 1` prefix,
    /// which is zero-padded back to the allocated horizon.
    ///
    /// # Errors
    ///
    /// - [`DiffusionError::InvalidBeta`] for an invalid stored beta
    /// - [`DiffusionError::HorizonExceeded`] if `t > t_max`
    /// - [`DiffusionError::StateShape`] for an array of any other length
    pub fn from_snapshot(state: TimeCdfState) -> Result<Self> {
        let mut engine = Self::with_generator(BiasGenerator::new(state.beta)?, state.t_max);
        if state.t > state.t_max {
            return Err(DiffusionError::HorizonExceeded {
                t: state.t,
                t_max: state.t_max,
            });
        }
        let full = state.t_max as usize + 1;
        let prefix = state.t as usize + 1;
        let cdf = if state.cdf.len() == full {
            state.cdf
        } else if state.cdf.len() == prefix {
            let mut padded = vec![0.0; full];
            padded[..prefix].copy_from_slice(&state.cdf);
            padded
        } else {
            return Err(DiffusionError::StateShape {
                expected: full,
                got: state.cdf.len(),
            });
        };
        engine.cdf = cdf;
        engine.t = state.t;
        Ok(engine)
    }
}

/// Validates a "1 in N" quantile and returns the reciprocal threshold.
pub(crate) fn reciprocal_threshold(quantile: f64) -> Result<f64> {
    if !(quantile > 1.0) {
        return Err(DiffusionError::InvalidQuantile(quantile));
    }
    Ok(1.0 / quantile)
}

/// Validates a batch of quantiles and pairs each original index with its
/// reciprocal threshold, ordered largest quantile (smallest threshold)
/// first, the order a single descending scan requires.
pub(crate) fn descending_thresholds(quantiles: &[f64]) -> Result<Vec<(usize, f64)>> {
    let mut thresholds = Vec::with_capacity(quantiles.len());
    for (i, &q) in quantiles.iter().enumerate() {
        thresholds.push((i, reciprocal_threshold(q)?));
    }
    thresholds.sort_by(|a, b| a.1.total_cmp(&b.1));
    Ok(thresholds)
}
