//! Serializable engine snapshots.
//!
//! Each engine exposes `snapshot()`/`from_snapshot()` built on the plain
//! data structs here. The structs derive serde traits so callers can
//! persist checkpoints in whatever format they choose (the bundled CLI
//! writes JSON); none of them capture the random stream, so restored
//! engines draw from a fresh entropy seed unless explicitly reseeded.

use serde::{Deserialize, Serialize};

/// Snapshot of a [`DiffusionTimeCdf`](crate::DiffusionTimeCdf).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeCdfState {
    /// Disorder parameter.
    pub beta: f64,
    /// Completed timesteps.
    pub t: u64,
    /// Allocated time horizon.
    pub t_max: u64,
    /// CDF values; either the meaningful prefix (`t + 1` entries) or the
    /// full backing array (`t_max + 1` entries).
    pub cdf: Vec<f64>,
}

/// Snapshot of a [`DiffusionPositionCdf`](crate::DiffusionPositionCdf).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionCdfState {
    /// Disorder parameter.
    pub beta: f64,
    /// Completed timesteps.
    pub t: u64,
    /// Allocated time horizon.
    pub t_max: u64,
    /// Tracked quantile targets, caller order.
    pub quantiles: Vec<f64>,
    /// CDF prefix, `t + 1` entries.
    pub cdf: Vec<f64>,
    /// Per-quantile position history, one entry per elapsed step.
    pub trajectories: Vec<Vec<i64>>,
}

/// Snapshot of a [`DiffusionPdf`](crate::DiffusionPdf).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PdfState {
    /// Total particle count.
    pub n_particles: f64,
    /// Disorder parameter.
    pub beta: f64,
    /// Whether the engine evolves a scaled probability distribution.
    pub prob_dist_mode: bool,
    /// Small-count cutoff for the exact split regime.
    pub small_cutoff: f64,
    /// Large-count cutoff for the deterministic split regime.
    pub large_cutoff: f64,
    /// Completed timesteps.
    pub time: u64,
    /// Full backing occupancy array.
    pub occupancy: Vec<f64>,
    /// Minimum occupied index per elapsed step, `time + 1` entries.
    pub min_edges: Vec<usize>,
    /// Maximum occupied index per elapsed step, `time + 1` entries.
    pub max_edges: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_cdf_state_json_roundtrip() {
        let state = TimeCdfState {
            beta: 1.0,
            t: 2,
            t_max: 8,
            cdf: vec![1.0, 0.5, 0.25],
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: TimeCdfState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_pdf_state_json_roundtrip() {
        let state = PdfState {
            n_particles: 1e30,
            beta: 0.5,
            prob_dist_mode: true,
            small_cutoff: 2_147_483_646.0,
            large_cutoff: 1e64,
            time: 1,
            occupancy: vec![5e29, 5e29, 0.0, 0.0],
            min_edges: vec![0, 0],
            max_edges: vec![0, 1],
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: PdfState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
