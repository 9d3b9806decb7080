//! Error types for structured error handling.
//!
//! All configuration and runtime failures across the diffusion engines are
//! reported through [`DiffusionError`]. Invalid configuration is rejected at
//! construction (or at the call that receives the bad value) with no partial
//! mutation; unsatisfiable searches surface as a distinguishable variant
//! rather than a silently wrong default.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DiffusionError>;

/// Categorised diffusion-engine errors.
///
/// # Variants
/// - `InvalidBeta`: disorder parameter outside [0, +inf]
/// - `InvalidQuantile`: quantile target not > 1
/// - `InvalidParticleCount`: non-positive or non-finite particle count
/// - `QuantileNotFound`: no array index crosses the requested threshold
/// - `HorizonExceeded`: advancing past the allocated time/size horizon
/// - `InvalidCutoff`: precision-tier cutoffs out of order
/// - `StateShape`: snapshot restore with mismatched array length
/// - `Distribution`: invalid parameters reaching a sampling distribution
///
/// # Examples
/// ```
/// use diffusion_core::DiffusionError;
///
/// let err = DiffusionError::InvalidBeta(-0.5);
/// assert_eq!(
///     format!("{}", err),
///     "Invalid disorder parameter beta = -0.5: must be >= 0"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiffusionError {
    /// Disorder parameter is negative or NaN.
    #[error("Invalid disorder parameter beta = {0}: must be >= 0")]
    InvalidBeta(f64),

    /// Quantile target does not represent a "1 in N" tail event.
    #[error("Invalid quantile {0}: must be > 1")]
    InvalidQuantile(f64),

    /// Particle count is zero, negative, or non-finite.
    #[error("Invalid particle count {0}: must be positive and finite")]
    InvalidParticleCount(f64),

    /// No index satisfies the quantile threshold within the current horizon.
    #[error("Quantile {quantile} not reachable at time t = {t}")]
    QuantileNotFound {
        /// The requested "1 in N" quantile.
        quantile: f64,
        /// The engine time at which the search was exhausted.
        t: u64,
    },

    /// Attempted to advance past the allocated horizon.
    #[error("Time horizon exceeded: t = {t}, allocated horizon = {t_max}")]
    HorizonExceeded {
        /// Current engine time.
        t: u64,
        /// Allocated horizon (tMax or occupancy size).
        t_max: u64,
    },

    /// Precision-tier cutoffs out of order or negative.
    #[error("Invalid cutoffs: small = {small}, large = {large}")]
    InvalidCutoff {
        /// Small-count cutoff below which splits are sampled exactly.
        small: f64,
        /// Large-count cutoff above which splits are deterministic.
        large: f64,
    },

    /// A restored array does not match the engine's allocated shape.
    #[error("State shape mismatch: expected {expected} entries, got {got}")]
    StateShape {
        /// Expected number of entries.
        expected: usize,
        /// Number of entries supplied.
        got: usize,
    },

    /// Parameters rejected by a sampling distribution constructor.
    #[error("Sampling distribution error: {0}")]
    Distribution(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiffusionError::InvalidQuantile(0.5);
        assert!(err.to_string().contains("must be > 1"));

        let err = DiffusionError::QuantileNotFound {
            quantile: 1e50,
            t: 10,
        };
        assert!(err.to_string().contains("t = 10"));

        let err = DiffusionError::HorizonExceeded { t: 100, t_max: 100 };
        assert!(err.to_string().contains("allocated horizon = 100"));
    }

    #[test]
    fn test_error_equality() {
        let a = DiffusionError::StateShape {
            expected: 5,
            got: 3,
        };
        let b = DiffusionError::StateShape {
            expected: 5,
            got: 3,
        };
        assert_eq!(a, b);
    }
}
