//! # diffusion_core: Foundation for the RWRE Diffusion Engines
//!
//! ## Foundation Layer Role
//!
//! diffusion_core is the bottom layer of the workspace, providing:
//! - The random mixing-coefficient sampler (`rng::BiasGenerator`)
//! - Structured error types (`types::DiffusionError`)
//! - The extreme-value statistics formulas (`stats::gumbel_variance`)
//!
//! ## Zero Dependency Principle
//!
//! The foundation layer has no dependencies on other diffusion_* crates,
//! with minimal external dependencies:
//! - rand / rand_distr: seeded random streams and the Beta distribution
//! - thiserror: structured error handling
//!
//! ## Usage Example
//!
//! ```rust
//! use diffusion_core::rng::BiasGenerator;
//!
//! // A uniform environment (beta = 1), deterministically seeded.
//! let mut bias = BiasGenerator::from_seed(1.0, 42).unwrap();
//! let b = bias.draw();
//! assert!((0.0..=1.0).contains(&b));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod rng;
pub mod stats;
pub mod types;

pub use types::{DiffusionError, Result};
