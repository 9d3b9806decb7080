//! # diffusion_sim: RWRE Diffusion Recurrence Engines
//!
//! ## Engine Layer Role
//!
//! diffusion_sim hosts the stochastic recurrence engines that advance a
//! distribution of random walkers through a disordered 1-D lattice, one
//! timestep at a time:
//!
//! - [`DiffusionTimeCdf`]: cumulative distribution indexed by occupancy
//!   count, evolved across discrete time steps, with quantile search and
//!   Gumbel-variance queries
//! - [`DiffusionPositionCdf`]: cumulative distribution indexed by lattice
//!   position, incrementally tracking a fixed set of quantile trajectories
//! - [`DiffusionPdf`]: explicit particle-occupancy array with
//!   precision-tiered split rules and leading/trailing edge bookkeeping
//!
//! Every engine composes its own [`BiasGenerator`](diffusion_core::rng::BiasGenerator)
//! (exclusive random stream) and owns its state array; a step commits
//! atomically by building the next array and swapping it in.
//!
//! ## Usage Example
//!
//! ```rust
//! use diffusion_sim::DiffusionTimeCdf;
//!
//! let mut engine = DiffusionTimeCdf::with_seed(1.0, 100, 42).unwrap();
//! engine.evolve_to(50).unwrap();
//!
//! // Position of the 1-in-10^9 tail event.
//! let x = engine.find_quantile(1e9).unwrap();
//! assert!(x.abs() as u64 <= 52);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

mod pdf;
mod position_cdf;
mod state;
mod time_cdf;

pub use pdf::{DiffusionPdf, SplitRegime};
pub use position_cdf::DiffusionPositionCdf;
pub use state::{PdfState, PositionCdfState, TimeCdfState};
pub use time_cdf::DiffusionTimeCdf;
