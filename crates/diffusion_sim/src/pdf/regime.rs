//! Precision-tier selection for the occupancy split.
//!
//! A site's population magnitude decides how its left/right split is
//! computed. The tiering is the central performance/precision trade-off of
//! the engine: it keeps per-step cost low while preserving correctness
//! across ~60+ orders of magnitude of local population.

/// Numeric-handling regime for one site's split, selected per update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitRegime {
    /// Below the small cutoff: the occupancy is a genuinely small count and
    /// the split is a binomial sample, preserving integrality and full
    /// statistical fidelity at low population.
    Exact,
    /// Between the cutoffs: the binomial is replaced by its Gaussian limit
    /// (mean `n*b`, sd `sqrt(n*b*(1-b))`), where exact sampling would be
    /// too slow or overflow-prone.
    Continuous,
    /// Above the large cutoff: stochastic fluctuation is negligible
    /// relative to float error and the split collapses to the
    /// deterministic mean `n*b`.
    Approximate,
}

impl SplitRegime {
    /// Selects the regime for a site population against the two cutoffs.
    #[inline]
    pub fn select(site: f64, small_cutoff: f64, large_cutoff: f64) -> Self {
        if site < small_cutoff {
            Self::Exact
        } else if site > large_cutoff {
            Self::Approximate
        } else {
            Self::Continuous
        }
    }
}
