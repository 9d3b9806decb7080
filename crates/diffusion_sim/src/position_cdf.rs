//! Cumulative-distribution evolution with live quantile tracking.
//!
//! [`DiffusionPositionCdf`] advances the same mixing recurrence as
//! [`DiffusionTimeCdf`](crate::DiffusionTimeCdf), reindexed to position
//! space, and keeps a fixed set of requested quantile positions up to date
//! on every step. Long simulations that only need a handful of quantile
//! trajectories avoid retaining the full distribution history.

use diffusion_core::rng::BiasGenerator;
use diffusion_core::{DiffusionError, Result};

use crate::state::PositionCdfState;
use crate::time_cdf::descending_thresholds;

/// Position-indexed CDF engine with incremental quantile tracking.
///
/// Constructed with the ordered set of "1 in N" quantile targets to track;
/// the set is fixed for the engine's lifetime.
///
/// # Examples
///
/// ```rust
/// use diffusion_sim::DiffusionPositionCdf;
///
/// let mut engine =
///     DiffusionPositionCdf::with_seed(1.0, 64, vec![1e3, 1e9], 5).unwrap();
/// for _ in 0..32 {
///     engine.step_position().unwrap();
/// }
/// let positions = engine.quantile_positions();
/// assert_eq!(positions.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct DiffusionPositionCdf {
    cdf: Vec<f64>,
    t: u64,
    t_max: u64,
    bias: BiasGenerator,
    /// Requested targets, caller order.
    quantiles: Vec<f64>,
    /// (caller index, reciprocal threshold), largest quantile first.
    scan: Vec<(usize, f64)>,
    /// Current tracked position per quantile, caller order.
    tracked: Vec<i64>,
    /// Tracked position after each elapsed step, caller order.
    trajectories: Vec<Vec<i64>>,
}

impl DiffusionPositionCdf {
    /// Creates an engine at time 0, seeded from entropy.
    ///
    /// # Errors
    ///
    /// - [`DiffusionError::InvalidBeta`] for negative or NaN `beta`
    /// - [`DiffusionError::InvalidQuantile`] if any target is <= 1
    pub fn new(beta: f64, t_max: u64, quantiles: Vec<f64>) -> Result<Self> {
        Self::with_generator(BiasGenerator::new(beta)?, t_max, quantiles)
    }

    /// Creates a deterministically seeded engine.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`DiffusionPositionCdf::new`].
    pub fn with_seed(beta: f64, t_max: u64, quantiles: Vec<f64>, seed: u64) -> Result<Self> {
        Self::with_generator(BiasGenerator::from_seed(beta, seed)?, t_max, quantiles)
    }

    fn with_generator(bias: BiasGenerator, t_max: u64, quantiles: Vec<f64>) -> Result<Self> {
        let scan = descending_thresholds(&quantiles)?;
        let mut cdf = vec![0.0; t_max as usize + 1];
        cdf[0] = 1.0;
        // At t = 0 every threshold is crossed at n = 0 (cdf[0] = 1).
        let tracked = vec![2; quantiles.len()];
        let trajectories = vec![Vec::new(); quantiles.len()];
        Ok(Self {
            cdf,
            t: 0,
            t_max,
            bias,
            quantiles,
            scan,
            tracked,
            trajectories,
        })
    }

    /// Returns the disorder parameter.
    #[inline]
    pub fn beta(&self) -> f64 {
        self.bias.beta()
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

    /// Allocated time horizon.
    #[inline]
    pub fn t_max(&self) -> u64 {
        self.t_max
    }

    /// Full backing array (entries past `time()` are 0).
    #[inline]
    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    /// The requested quantile targets, in the caller's original order.
    #[inline]
    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    /// Current tracked position per quantile, caller order.
    pub fn quantile_positions(&self) -> Vec<i64> {
        self.tracked.clone()
    }

    /// Per-step position history of every tracked quantile, caller order.
    ///
    /// Each trajectory holds one entry per elapsed step.
    #[inline]
    pub fn quantile_trajectories(&self) -> &[Vec<i64>] {
        &self.trajectories
    }

    /// Advances the recurrence one step and refreshes every tracked
    /// quantile position in a single descending pass.
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::HorizonExceeded`] at the horizon; the
    /// state is not mutated on failure.
    pub fn step_position(&mut self) -> Result<()> {
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
                b * self.cdf[n - 1]
            } else {
                b * self.cdf[n - 1] + (1.0 - b) * self.cdf[n]
            };
        }
        self.cdf = next;
        self.t += 1;

        self.refresh_tracked();
        Ok(())
    }

    /// Reverse-threshold-crossing update of the tracked positions, one
    /// descending pass over the current array for all targets.
    fn refresh_tracked(&mut self) {
        let t = self.t as usize;
        let mut k = 0;
        for n in (0..=t).rev() {
            while k < self.scan.len() && self.cdf[n] > self.scan[k].1 {
                let caller_idx = self.scan[k].0;
                self.tracked[caller_idx] = 2 * n as i64 + 2 - self.t as i64;
                k += 1;
            }
            if k == self.scan.len() {
                break;
            }
        }
        for (traj, &pos) in self.trajectories.iter_mut().zip(self.tracked.iter()) {
            traj.push(pos);
        }
    }

    /// Captures an owned snapshot for external checkpointing.
    ///
    /// The random stream is not captured; reseed after
    /// [`DiffusionPositionCdf::from_snapshot`] for reproducible
    /// continuation.
    pub fn snapshot(&self) -> PositionCdfState {
        PositionCdfState {
            beta: self.beta(),
            t: self.t,
            t_max: self.t_max,
            quantiles: self.quantiles.clone(),
            cdf: self.cdf[..=self.t as usize].to_vec(),
            trajectories: self.trajectories.clone(),
        }
    }

    /// Rebuilds an engine from a snapshot (entropy-seeded stream).
    ///
    /// # Errors
    ///
    /// - [`DiffusionError::InvalidBeta`] / [`DiffusionError::InvalidQuantile`]
    ///   for invalid stored parameters
    /// - [`DiffusionError::HorizonExceeded`] if `t > t_max`
    /// - [`DiffusionError::StateShape`] for a CDF prefix of the wrong length
    pub fn from_snapshot(state: PositionCdfState) -> Result<Self> {
        if state.t > state.t_max {
            return Err(DiffusionError::HorizonExceeded {
                t: state.t,
                t_max: state.t_max,
            });
        }
        let prefix = state.t as usize + 1;
        if state.cdf.len() != prefix {
            return Err(DiffusionError::StateShape {
                expected: prefix,
                got: state.cdf.len(),
            });
        }
        let mut engine = Self::with_generator(
            BiasGenerator::new(state.beta)?,
            state.t_max,
            state.quantiles,
        )?;
        engine.cdf[..prefix].copy_from_slice(&state.cdf);
        engine.t = state.t;
        engine.trajectories = state.trajectories;
        for (traj, tracked) in engine.trajectories.iter().zip(engine.tracked.iter_mut()) {
            if let Some(&last) = traj.last() {
                *tracked = last;
            }
        }
        Ok(engine)
    }
}
