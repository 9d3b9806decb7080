//! Explicit particle-occupancy evolution with precision-tiered splits.
//!
//! [`DiffusionPdf`] carries an occupancy array, one extended-range value
//! per reachable lattice site (index n maps to position `2n - t`). Each
//! step every occupied site splits into a staying part and a right-moving
//! part governed by a fresh mixing coefficient; the carry from site n
//! lands on site n + 1. How the split is computed depends on the site's
//! magnitude; see [`SplitRegime`].
//!
//! With `prob_dist_mode` enabled the engine instead evolves the
//! single-walker probability distribution scaled by the particle count:
//! every split collapses to the deterministic mass-conserving mixing
//! `site * b`, the same form as the CDF recurrence.

mod regime;

pub use regime::SplitRegime;

use diffusion_core::rng::BiasGenerator;
use diffusion_core::stats;
use diffusion_core::{DiffusionError, Result};

use crate::state::PdfState;
use crate::time_cdf::{descending_thresholds, reciprocal_threshold};

/// Default small-count cutoff, 2^31 - 2: below this a split is sampled as
/// an exact binomial.
pub const DEFAULT_SMALL_CUTOFF: f64 = 2_147_483_646.0;

/// Default large-count cutoff: above this a split is deterministic.
pub const DEFAULT_LARGE_CUTOFF: f64 = 1e64;

/// Occupancy-indexed particle-distribution engine.
///
/// Owns the occupancy array, the per-timestep edge records, the time
/// counter, the precision-tier cutoffs, and an exclusive random stream.
///
/// # Examples
///
/// ```rust
/// use diffusion_sim::DiffusionPdf;
///
/// let mut engine = DiffusionPdf::with_seed(100.0, 1.0, 50, false, 7).unwrap();
/// engine.evolve_steps(10).unwrap();
///
/// // Exact regime: integral conservation, no floating drift.
/// let total: f64 = engine.occupancy().iter().sum();
/// assert_eq!(total, 100.0);
/// ```
#[derive(Clone, Debug)]
pub struct DiffusionPdf {
    occupancy: Vec<f64>,
    n_particles: f64,
    prob_dist_mode: bool,
    small_cutoff: f64,
    large_cutoff: f64,
    /// Minimum occupied index, one entry per elapsed timestep.
    min_edges: Vec<usize>,
    /// Maximum occupied index, one entry per elapsed timestep.
    max_edges: Vec<usize>,
    time: u64,
    bias: BiasGenerator,
}

impl DiffusionPdf {
    /// Creates an engine with the whole population on site 0, seeded from
    /// entropy.
    ///
    /// `occupancy_size` is the time/size horizon hint: the engine can take
    /// that many steps before [`DiffusionPdf::resize`] is required. With
    /// `prob_dist_mode` the small-count regime behaves continuously (the
    /// engine evolves a probability distribution, not sampled particles).
    ///
    /// # Errors
    ///
    /// - [`DiffusionError::InvalidParticleCount`] unless `n_particles` is
    ///   positive and finite
    /// - [`DiffusionError::InvalidBeta`] for negative or NaN `beta`
    pub fn new(
        n_particles: f64,
        beta: f64,
        occupancy_size: usize,
        prob_dist_mode: bool,
    ) -> Result<Self> {
        Self::with_generator(
            n_particles,
            BiasGenerator::new(beta)?,
            occupancy_size,
            prob_dist_mode,
        )
    }

    /// Creates a deterministically seeded engine.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`DiffusionPdf::new`].
    pub fn with_seed(
        n_particles: f64,
        beta: f64,
        occupancy_size: usize,
        prob_dist_mode: bool,
        seed: u64,
    ) -> Result<Self> {
        Self::with_generator(
            n_particles,
            BiasGenerator::from_seed(beta, seed)?,
            occupancy_size,
            prob_dist_mode,
        )
    }

    fn with_generator(
        n_particles: f64,
        bias: BiasGenerator,
        occupancy_size: usize,
        prob_dist_mode: bool,
    ) -> Result<Self> {
        if !(n_particles > 0.0) || !n_particles.is_finite() {
            return Err(DiffusionError::InvalidParticleCount(n_particles));
        }
        let alloc = occupancy_size + 1;
        let mut occupancy = vec![0.0; alloc];
        occupancy[0] = n_particles;
        Ok(Self {
            occupancy,
            n_particles,
            prob_dist_mode,
            small_cutoff: DEFAULT_SMALL_CUTOFF,
            large_cutoff: DEFAULT_LARGE_CUTOFF,
            min_edges: vec![0; alloc],
            max_edges: vec![0; alloc],
            time: 0,
            bias,
        })
    }

    /// Total particle count the engine was constructed with.
    #[inline]
    pub fn n_particles(&self) -> f64 {
        self.n_particles
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

    /// Whether the engine evolves a probability distribution (continuous
    /// splits everywhere) rather than sampled particles.
    #[inline]
    pub fn prob_dist_mode(&self) -> bool {
        self.prob_dist_mode
    }

    /// Switches between probability-distribution and particle modes.
    #[inline]
    pub fn set_prob_dist_mode(&mut self, on: bool) {
        self.prob_dist_mode = on;
    }

    /// Small-count cutoff below which splits are exact binomial samples.
    #[inline]
    pub fn small_cutoff(&self) -> f64 {
        self.small_cutoff
    }

    /// Replaces the small-count cutoff.
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::InvalidCutoff`] if the new value is
    /// negative, NaN, or above the large cutoff.
    pub fn set_small_cutoff(&mut self, small_cutoff: f64) -> Result<()> {
        if !(small_cutoff >= 0.0) || small_cutoff > self.large_cutoff {
            return Err(DiffusionError::InvalidCutoff {
                small: small_cutoff,
                large: self.large_cutoff,
            });
        }
        self.small_cutoff = small_cutoff;
        Ok(())
    }

    /// Large-count cutoff above which splits are deterministic.
    #[inline]
    pub fn large_cutoff(&self) -> f64 {
        self.large_cutoff
    }

    /// Replaces the large-count cutoff.
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::InvalidCutoff`] if the new value is NaN
    /// or below the small cutoff.
    pub fn set_large_cutoff(&mut self, large_cutoff: f64) -> Result<()> {
        if large_cutoff.is_nan() || large_cutoff < self.small_cutoff {
            return Err(DiffusionError::InvalidCutoff {
                small: self.small_cutoff,
                large: large_cutoff,
            });
        }
        self.large_cutoff = large_cutoff;
        Ok(())
    }

    /// Current time (number of completed steps).
    #[inline]
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Overrides the time counter (checkpoint restore).
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::HorizonExceeded`] if `time` is past the
    /// allocated horizon.
    pub fn set_time(&mut self, time: u64) -> Result<()> {
        if time as usize >= self.min_edges.len() {
            return Err(DiffusionError::HorizonExceeded {
                t: time,
                t_max: self.horizon(),
            });
        }
        self.time = time;
        Ok(())
    }

    /// Number of sites the engine can currently reach (allocated length).
    #[inline]
    pub fn occupancy_size(&self) -> usize {
        self.occupancy.len()
    }

    /// Full backing occupancy array.
    #[inline]
    pub fn occupancy(&self) -> &[f64] {
        &self.occupancy
    }

    /// Occupied slice, indices `min_idx()..=max_idx()`.
    pub fn save_occupancy(&self) -> Vec<f64> {
        self.occupancy[self.min_idx()..=self.max_idx()].to_vec()
    }

    /// Replaces the backing occupancy array (checkpoint restore).
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::StateShape`] unless the supplied array
    /// matches the allocated length.
    pub fn set_occupancy(&mut self, occupancy: Vec<f64>) -> Result<()> {
        if occupancy.len() != self.occupancy.len() {
            return Err(DiffusionError::StateShape {
                expected: self.occupancy.len(),
                got: occupancy.len(),
            });
        }
        self.occupancy = occupancy;
        Ok(())
    }

    /// Per-timestep edge records `(min, max)`, full backing arrays.
    pub fn edges(&self) -> (&[usize], &[usize]) {
        (&self.min_edges, &self.max_edges)
    }

    /// Edge records for the elapsed steps only, indices `0..=t`.
    pub fn save_edges(&self) -> (Vec<usize>, Vec<usize>) {
        let t = self.time as usize;
        (self.min_edges[..=t].to_vec(), self.max_edges[..=t].to_vec())
    }

    /// Replaces both edge records (checkpoint restore).
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::StateShape`] unless both arrays match the
    /// allocated length.
    pub fn set_edges(&mut self, min_edges: Vec<usize>, max_edges: Vec<usize>) -> Result<()> {
        for edges in [&min_edges, &max_edges] {
            if edges.len() != self.min_edges.len() {
                return Err(DiffusionError::StateShape {
                    expected: self.min_edges.len(),
                    got: edges.len(),
                });
            }
        }
        self.min_edges = min_edges;
        self.max_edges = max_edges;
        Ok(())
    }

    /// Minimum occupied index at the current time.
    #[inline]
    pub fn min_idx(&self) -> usize {
        self.min_edges[self.time as usize]
    }

    /// Maximum occupied index at the current time.
    #[inline]
    pub fn max_idx(&self) -> usize {
        self.max_edges[self.time as usize]
    }

    fn horizon(&self) -> u64 {
        (self.occupancy.len() - 1) as u64
    }

    /// Pre-grows the occupancy and edge arrays by `extra` zero-filled
    /// entries, amortising reallocation for long runs.
    pub fn resize(&mut self, extra: usize) {
        self.occupancy.extend(std::iter::repeat(0.0).take(extra));
        self.min_edges.extend(std::iter::repeat(0).take(extra));
        self.max_edges.extend(std::iter::repeat(0).take(extra));
    }

    /// Particles moving from a site to its right neighbour this step.
    ///
    /// The regime is selected per update from the site magnitude; in
    /// `prob_dist_mode` every regime collapses to the deterministic mean
    /// split. In the exact regime the binomial uses the integral part of
    /// the site population; any fractional residue stays put, so mass is
    /// conserved bit-exactly. (Sites above ~2^53 only keep integrality if
    /// the cutoffs still route them away from the exact regime.)
    fn split_right(&mut self, site: f64, b: f64) -> Result<f64> {
        if site == 0.0 {
            return Ok(0.0);
        }
        if self.prob_dist_mode {
            return Ok(site * b);
        }
        match SplitRegime::select(site, self.small_cutoff, self.large_cutoff) {
            SplitRegime::Exact => {
                let k = self.bias.draw_binomial(site as u64, b)?;
                Ok(k as f64)
            }
            SplitRegime::Continuous => {
                let mean = site * b;
                let sd = (site * b * (1.0 - b)).sqrt();
                let draw = self.bias.draw_normal(mean, sd)?;
                Ok(draw.clamp(0.0, site))
            }
            SplitRegime::Approximate => Ok(site * b),
        }
    }

    /// Advances the occupancy one timestep (build-then-swap).
    ///
    /// Every site in `[min_idx, max_idx]` receives a fresh coefficient
    /// draw and the split regime is chosen per site; the final carry lands
    /// on `max_idx + 1` without a draw of its own, so the draw count per
    /// step equals the occupied width (the same count the CDF recurrence
    /// consumes, keeping equally seeded engines stream-aligned).
    /// Afterwards the new `(min, max)` occupied indices are recorded;
    /// each can widen by at most one site per step.
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::HorizonExceeded`] when the frontier or
    /// the edge record would run past the allocated arrays; the state is
    /// not mutated on failure.
    pub fn advance(&mut self) -> Result<()> {
        let t = self.time as usize;
        let lo = self.min_edges[t];
        let hi = self.max_edges[t];
        if hi + 1 >= self.occupancy.len() || t + 1 >= self.min_edges.len() {
            return Err(DiffusionError::HorizonExceeded {
                t: self.time,
                t_max: self.horizon(),
            });
        }

        let mut next = self.occupancy.clone();
        let mut carry = 0.0;
        for i in lo..=hi {
            let site = self.occupancy[i];
            let b = self.bias.draw();
            let to_next = self.split_right(site, b)?;
            next[i] = site - to_next + carry;
            carry = to_next;
        }
        // Sites beyond max_idx hold no mass; the frontier site is the carry.
        next[hi + 1] = carry;
        self.occupancy = next;
        self.time += 1;

        let mut new_min = lo;
        let mut new_max = hi + 1;
        while new_min < new_max && self.occupancy[new_min] == 0.0 {
            new_min += 1;
        }
        while new_max > new_min && self.occupancy[new_max] == 0.0 {
            new_max -= 1;
        }
        self.min_edges[t + 1] = new_min;
        self.max_edges[t + 1] = new_max;
        Ok(())
    }

    /// Evolves until `time() == t` (no-op when already past).
    pub fn evolve_to(&mut self, t: u64) -> Result<()> {
        while self.time < t {
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

    /// Normalized mass strictly beyond index `idx` (a tail-probability
    /// query). O(size) per call; any cached value is invalidated by
    /// [`DiffusionPdf::advance`].
    pub fn p_greater_than(&self, idx: usize) -> f64 {
        let hi = self.max_idx();
        if idx >= hi {
            return 0.0;
        }
        let from = idx.max(self.min_idx().saturating_sub(1)) + 1;
        self.occupancy[from..=hi].iter().sum::<f64>() / self.n_particles
    }

    /// Continuous position of the 1-in-`quantile` tail event.
    ///
    /// Reverse scan over the occupancy tail mass; the crossing site is
    /// interpolated linearly in mass, returning a fractional position
    /// rather than only lattice integers.
    ///
    /// # Errors
    ///
    /// - [`DiffusionError::InvalidQuantile`] unless `quantile > 1`
    /// - [`DiffusionError::QuantileNotFound`] if the accumulated mass
    ///   never crosses the target (numerically degenerate states)
    pub fn find_quantile(&self, quantile: f64) -> Result<f64> {
        let target = self.n_particles * reciprocal_threshold(quantile)?;
        let t = self.time as i64;
        let mut cum = 0.0;
        for i in (self.min_idx()..=self.max_idx()).rev() {
            let occ = self.occupancy[i];
            if occ > 0.0 && cum + occ > target {
                let frac = (target - cum) / occ;
                return Ok(2.0 * (i as f64 + 1.0) - t as f64 - 2.0 * frac);
            }
            cum += occ;
        }
        Err(DiffusionError::QuantileNotFound {
            quantile,
            t: self.time,
        })
    }

    /// Batch quantile search: one reverse pass over the occupancy services
    /// every target. Results follow the caller's original order; `None`
    /// marks targets the scan could not resolve.
    ///
    /// # Errors
    ///
    /// Returns [`DiffusionError::InvalidQuantile`] if any target is <= 1.
    pub fn find_quantiles(&self, quantiles: &[f64]) -> Result<Vec<Option<f64>>> {
        let thresholds = descending_thresholds(quantiles)?;
        let mut out = vec![None; quantiles.len()];
        let t = self.time as i64;
        let mut cum = 0.0;
        let mut k = 0;
        for i in (self.min_idx()..=self.max_idx()).rev() {
            let occ = self.occupancy[i];
            if occ > 0.0 {
                while k < thresholds.len() {
                    let target = self.n_particles * thresholds[k].1;
                    if cum + occ <= target {
                        break;
                    }
                    let frac = (target - cum) / occ;
                    out[thresholds[k].0] =
                        Some(2.0 * (i as f64 + 1.0) - t as f64 - 2.0 * frac);
                    k += 1;
                }
            }
            if k == thresholds.len() {
                break;
            }
            cum += occ;
        }
        Ok(out)
    }

    /// Paired (velocity, tail-probability) samples along the front.
    ///
    /// Samples `num` indices evenly spaced between the site at
    /// nonnegative position and the leading edge; each yields
    /// `v = (2i - t)/t` and `Pb = p_greater_than(i)`. Empty when fewer
    /// than two sites span that range (or at t = 0).
    pub fn calc_vs_and_pb(&self, num: usize) -> (Vec<f64>, Vec<f64>) {
        if self.time == 0 || num == 0 {
            return (Vec::new(), Vec::new());
        }
        let t = self.time;
        let lo = ((t + 1) / 2) as usize;
        let hi = self.max_idx();
        if hi <= lo {
            return (Vec::new(), Vec::new());
        }
        let mut vs = Vec::with_capacity(num);
        let mut pbs = Vec::with_capacity(num);
        for j in 0..num {
            let idx = if num == 1 {
                hi
            } else {
                lo + j * (hi - lo) / (num - 1)
            };
            vs.push((2 * idx as i64 - t as i64) as f64 / t as f64);
            pbs.push(self.p_greater_than(idx));
        }
        (vs, pbs)
    }

    /// The (velocity, tail-probability) sample nearest a requested front
    /// velocity `v` (position/time). Returns the achieved velocity, which
    /// sits on the lattice, together with the tail probability beyond it.
    pub fn vs_and_pb(&self, v: f64) -> (f64, f64) {
        if self.time == 0 {
            return (0.0, 0.0);
        }
        let t = self.time as f64;
        let idx = (((v + 1.0) * t / 2.0).ceil() as usize)
            .clamp(self.min_idx(), self.max_idx());
        let achieved = (2 * idx as i64 - self.time as i64) as f64 / t;
        (achieved, self.p_greater_than(idx))
    }

    /// Tail distribution over the occupied range, closed with a trailing 0.
    ///
    /// Returns `(positions, tail)` where `tail[k]` is the normalized mass
    /// at or beyond the k-th occupied site; `tail[0]` is 1 up to float
    /// error and the final entry is exactly 0.
    pub fn tail_distribution(&self) -> (Vec<i64>, Vec<f64>) {
        let lo = self.min_idx();
        let hi = self.max_idx();
        let t = self.time as i64;
        let len = hi - lo + 2;

        let mut tail = vec![0.0; len];
        let mut acc = 0.0;
        for (k, i) in (lo..hi + 1).enumerate().rev() {
            acc += self.occupancy[i] / self.n_particles;
            tail[k] = acc;
        }
        let positions = (lo..=hi + 1).map(|i| 2 * i as i64 - t).collect();
        (positions, tail)
    }

    /// The tail values of [`DiffusionPdf::tail_distribution`] alone.
    pub fn cdf(&self) -> Vec<f64> {
        self.tail_distribution().1
    }

    /// Positions and normalized occupancy over the occupied range.
    pub fn positions_and_pdf(&self) -> (Vec<i64>, Vec<f64>) {
        let lo = self.min_idx();
        let hi = self.max_idx();
        let t = self.time as i64;
        let positions = (lo..=hi).map(|i| 2 * i as i64 - t).collect();
        let pdf = self.occupancy[lo..=hi]
            .iter()
            .map(|&o| o / self.n_particles)
            .collect();
        (positions, pdf)
    }

    /// Gumbel variance of the front for `scale` walkers, from the
    /// occupancy-derived tail.
    pub fn gumbel_variance(&self, scale: f64) -> Result<f64> {
        let (positions, tail) = self.tail_distribution();
        stats::gumbel_variance(&positions, &tail, scale)
    }

    /// Batch Gumbel variance over several particle-count scales.
    pub fn gumbel_variance_batch(&self, scales: &[f64]) -> Result<Vec<f64>> {
        let (positions, tail) = self.tail_distribution();
        stats::gumbel_variance_batch(&positions, &tail, scales)
    }

    /// Captures an owned snapshot for external checkpointing.
    ///
    /// The random stream is not captured; reseed after
    /// [`DiffusionPdf::from_snapshot`] for reproducible continuation.
    pub fn snapshot(&self) -> PdfState {
        let (min_edges, max_edges) = self.save_edges();
        PdfState {
            n_particles: self.n_particles,
            beta: self.beta(),
            prob_dist_mode: self.prob_dist_mode,
            small_cutoff: self.small_cutoff,
            large_cutoff: self.large_cutoff,
            time: self.time,
            occupancy: self.occupancy.clone(),
            min_edges,
            max_edges,
        }
    }

    /// Rebuilds an engine from a snapshot (entropy-seeded stream).
    ///
    /// # Errors
    ///
    /// - [`DiffusionError::InvalidParticleCount`] /
    ///   [`DiffusionError::InvalidBeta`] / [`DiffusionError::InvalidCutoff`]
    ///   for invalid stored parameters
    /// - [`DiffusionError::HorizonExceeded`] if the stored time is past
    ///   the stored occupancy's horizon
    /// - [`DiffusionError::StateShape`] if the edge prefixes do not hold
    ///   `time + 1` entries
    pub fn from_snapshot(state: PdfState) -> Result<Self> {
        let alloc = state.occupancy.len();
        if alloc == 0 || state.time as usize >= alloc {
            return Err(DiffusionError::HorizonExceeded {
                t: state.time,
                t_max: alloc.saturating_sub(1) as u64,
            });
        }
        let prefix = state.time as usize + 1;
        for edges in [&state.min_edges, &state.max_edges] {
            if edges.len() != prefix {
                return Err(DiffusionError::StateShape {
                    expected: prefix,
                    got: edges.len(),
                });
            }
        }

        let mut engine = Self::with_generator(
            state.n_particles,
            BiasGenerator::new(state.beta)?,
            alloc - 1,
            state.prob_dist_mode,
        )?;
        // Clear the default small cutoff first so any valid stored pair
        // (small <= large) restores regardless of where it sits relative
        // to the defaults.
        engine.set_small_cutoff(0.0)?;
        engine.set_large_cutoff(state.large_cutoff)?;
        engine.set_small_cutoff(state.small_cutoff)?;
        engine.occupancy = state.occupancy;
        engine.min_edges[..prefix].copy_from_slice(&state.min_edges);
        engine.max_edges[..prefix].copy_from_slice(&state.max_edges);
        engine.time = state.time;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn exact_engine(n: f64, steps: u64, seed: u64) -> DiffusionPdf {
        let mut engine = DiffusionPdf::with_seed(n, 1.0, 64, false, seed).unwrap();
        engine.evolve_steps(steps).unwrap();
        engine
    }

    #[test]
    fn test_construction_validates_inputs() {
        assert!(matches!(
            DiffusionPdf::new(0.0, 1.0, 8, true),
            Err(DiffusionError::InvalidParticleCount(_))
        ));
        assert!(DiffusionPdf::new(-5.0, 1.0, 8, true).is_err());
        assert!(DiffusionPdf::new(f64::INFINITY, 1.0, 8, true).is_err());
        assert!(DiffusionPdf::new(100.0, -1.0, 8, true).is_err());
    }

    #[test]
    fn test_initial_state() {
        let engine = DiffusionPdf::with_seed(1e6, 1.0, 16, true, 1).unwrap();
        assert_eq!(engine.occupancy()[0], 1e6);
        assert_eq!(engine.min_idx(), 0);
        assert_eq!(engine.max_idx(), 0);
        assert_eq!(engine.time(), 0);
        assert_eq!(engine.small_cutoff(), DEFAULT_SMALL_CUTOFF);
        assert_eq!(engine.large_cutoff(), DEFAULT_LARGE_CUTOFF);
    }

    #[test]
    fn test_exact_regime_conserves_integral_mass() {
        // Default cutoffs keep a 100-particle population in the exact
        // regime on every step.
        let engine = exact_engine(100.0, 10, 42);
        let total: f64 = engine.occupancy().iter().sum();
        assert_eq!(total, 100.0);
        for &o in engine.occupancy() {
            assert_eq!(o, o.trunc(), "non-integral occupancy {}", o);
            assert!(o >= 0.0);
        }
    }

    #[test]
    fn test_prob_dist_mode_conserves_mass_within_tolerance() {
        let mut engine = DiffusionPdf::with_seed(1e30, 0.5, 64, true, 9).unwrap();
        engine.evolve_steps(50).unwrap();
        let total: f64 = engine.occupancy().iter().sum();
        assert_relative_eq!(total, 1e30, max_relative = 1e-10);
    }

    #[test]
    fn test_continuous_regime_conserves_mass_within_tolerance() {
        let mut engine = DiffusionPdf::with_seed(1e12, 1.0, 64, false, 17).unwrap();
        // Force the whole population through the continuous tier.
        engine.set_small_cutoff(10.0).unwrap();
        engine.evolve_steps(30).unwrap();
        let total: f64 = engine.occupancy().iter().sum();
        assert_relative_eq!(total, 1e12, max_relative = 1e-9);
    }

    #[test]
    fn test_approximate_regime_matches_prob_dist_evolution() {
        // Above the large cutoff the split is the deterministic mean, the
        // same rule prob_dist_mode applies everywhere; identical seeds
        // must give identical arrays.
        let mut a = DiffusionPdf::with_seed(1e40, 1.0, 32, false, 23).unwrap();
        a.set_small_cutoff(0.0).unwrap();
        a.set_large_cutoff(0.0).unwrap();
        let mut b = DiffusionPdf::with_seed(1e40, 1.0, 32, true, 23).unwrap();
        a.evolve_steps(20).unwrap();
        b.evolve_steps(20).unwrap();
        assert_eq!(a.occupancy(), b.occupancy());
    }

    #[test]
    fn test_edges_widen_by_at_most_one() {
        let engine = exact_engine(500.0, 40, 3);
        let (min_edges, max_edges) = engine.save_edges();
        assert_eq!(min_edges.len(), 41);
        for t in 1..=40 {
            let dmax = max_edges[t] as i64 - max_edges[t - 1] as i64;
            let dmin = min_edges[t] as i64 - min_edges[t - 1] as i64;
            assert!((0..=1).contains(&dmax), "max edge jumped by {}", dmax);
            assert!((0..=1).contains(&dmin), "min edge jumped by {}", dmin);
            assert!(min_edges[t] <= max_edges[t]);
        }
    }

    #[test]
    fn test_horizon_guard_without_mutation() {
        let mut engine = DiffusionPdf::with_seed(10.0, 1.0, 3, true, 5).unwrap();
        engine.evolve_steps(3).unwrap();
        let before = engine.occupancy().to_vec();
        assert!(matches!(
            engine.advance(),
            Err(DiffusionError::HorizonExceeded { .. })
        ));
        assert_eq!(engine.time(), 3);
        assert_eq!(engine.occupancy(), &before[..]);

        engine.resize(16);
        engine.evolve_steps(10).unwrap();
        assert_eq!(engine.time(), 13);
    }

    #[test]
    fn test_p_greater_than() {
        let mut engine = DiffusionPdf::with_seed(100.0, 1.0, 16, true, 7).unwrap();
        engine.evolve_steps(5).unwrap();
        // Nothing lies beyond the leading edge.
        assert_eq!(engine.p_greater_than(engine.max_idx()), 0.0);
        // Beyond the origin site sits everything except the origin itself.
        let beyond_origin = engine.p_greater_than(0);
        let expected = 1.0 - engine.occupancy()[0] / engine.n_particles();
        assert_relative_eq!(beyond_origin, expected, max_relative = 1e-12);
        // Tail probability decreases with the index.
        let mid = (engine.min_idx() + engine.max_idx()) / 2;
        assert!(engine.p_greater_than(mid) <= beyond_origin);
    }

    #[test]
    fn test_find_quantile_median_stays_behind_front() {
        let mut engine = DiffusionPdf::with_seed(1e9, 1.0, 128, true, 13).unwrap();
        engine.evolve_steps(100).unwrap();
        let x = engine.find_quantile(2.0).unwrap();
        // The typical walker lags far behind the ballistic front.
        assert!(x.abs() < 50.0, "median-like position {} too extreme", x);
        // And the returned position lies on the reachable interval.
        assert!(x >= -100.0 && x <= 100.0);
    }

    #[test]
    fn test_find_quantile_validates_input() {
        let engine = DiffusionPdf::with_seed(10.0, 1.0, 8, true, 1).unwrap();
        assert!(matches!(
            engine.find_quantile(1.0),
            Err(DiffusionError::InvalidQuantile(_))
        ));
    }

    #[test]
    fn test_find_quantiles_matches_singles_in_caller_order() {
        let mut engine = DiffusionPdf::with_seed(1e12, 1.0, 64, true, 19).unwrap();
        engine.evolve_steps(50).unwrap();
        let quantiles = [1e6, 2.0, 1e10, 40.0];
        let batch = engine.find_quantiles(&quantiles).unwrap();
        for (i, &q) in quantiles.iter().enumerate() {
            let single = engine.find_quantile(q).unwrap();
            let got = batch[i].expect("batch target unresolved");
            assert_relative_eq!(got, single, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_calc_vs_and_pb_shapes() {
        let mut engine = DiffusionPdf::with_seed(1e9, 1.0, 64, true, 29).unwrap();
        engine.evolve_steps(40).unwrap();
        let (vs, pbs) = engine.calc_vs_and_pb(8);
        assert_eq!(vs.len(), 8);
        assert_eq!(pbs.len(), 8);
        for (&v, &pb) in vs.iter().zip(pbs.iter()) {
            assert!((-1.0..=1.0).contains(&v));
            assert!((0.0..=1.0 + 1e-12).contains(&pb));
        }
        // Velocities are sampled in increasing order toward the front and
        // tail probabilities shrink accordingly.
        assert!(vs.windows(2).all(|w| w[0] <= w[1]));
        assert!(pbs.windows(2).all(|w| w[0] >= w[1] - 1e-12));

        let (v, pb) = engine.vs_and_pb(0.5);
        assert!((0.0..=1.0).contains(&v));
        assert!((0.0..=1.0).contains(&pb));
    }

    #[test]
    fn test_tail_distribution_is_closed_and_monotone() {
        let mut engine = DiffusionPdf::with_seed(1e6, 1.0, 32, true, 31).unwrap();
        engine.evolve_steps(20).unwrap();
        let (positions, tail) = engine.tail_distribution();
        assert_eq!(positions.len(), tail.len());
        assert_relative_eq!(tail[0], 1.0, max_relative = 1e-10);
        assert_eq!(*tail.last().unwrap(), 0.0);
        assert!(tail.windows(2).all(|w| w[1] <= w[0] + 1e-15));

        let var = engine.gumbel_variance(1e20).unwrap();
        assert!(var.is_finite());
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_evolution() {
        let mut original = DiffusionPdf::with_seed(1000.0, 0.5, 64, false, 37).unwrap();
        original.evolve_steps(15).unwrap();

        let mut restored = DiffusionPdf::from_snapshot(original.snapshot()).unwrap();
        assert_eq!(restored.time(), 15);
        assert_eq!(restored.occupancy(), original.occupancy());
        assert_eq!(restored.save_edges(), original.save_edges());

        original.reseed(404);
        restored.reseed(404);
        original.evolve_steps(5).unwrap();
        restored.evolve_steps(5).unwrap();
        assert_eq!(restored.occupancy(), original.occupancy());

        // Cutoffs below the defaults restore too.
        let mut tiered = DiffusionPdf::with_seed(10.0, 1.0, 8, false, 2).unwrap();
        tiered.set_small_cutoff(0.0).unwrap();
        tiered.set_large_cutoff(0.0).unwrap();
        let back = DiffusionPdf::from_snapshot(tiered.snapshot()).unwrap();
        assert_eq!(back.small_cutoff(), 0.0);
        assert_eq!(back.large_cutoff(), 0.0);
    }

    #[test]
    fn test_cutoff_setters_reject_inverted_order() {
        let mut engine = DiffusionPdf::with_seed(10.0, 1.0, 8, true, 1).unwrap();
        assert!(matches!(
            engine.set_small_cutoff(1e80),
            Err(DiffusionError::InvalidCutoff { .. })
        ));
        assert!(engine.set_large_cutoff(1.0).is_err());
        engine.set_small_cutoff(100.0).unwrap();
        engine.set_large_cutoff(200.0).unwrap();
        assert_eq!(engine.small_cutoff(), 100.0);
        assert_eq!(engine.large_cutoff(), 200.0);
    }

    proptest! {
        #[test]
        fn prop_mass_conserved_across_regimes(
            seed in any::<u64>(),
            beta in prop_oneof![Just(0.0), Just(1.0), Just(f64::INFINITY), 0.1f64..10.0],
            small in 1.0f64..1e3,
        ) {
            let mut engine = DiffusionPdf::with_seed(1e6, beta, 24, false, seed).unwrap();
            engine.set_small_cutoff(small).unwrap();
            engine.evolve_steps(16).unwrap();
            let total: f64 = engine.occupancy().iter().sum();
            prop_assert!((total - 1e6).abs() / 1e6 < 1e-9, "total = {}", total);
            prop_assert!(engine.occupancy().iter().all(|&o| o >= 0.0));
        }
    }
}
