//! Shared types for the diffusion engines.
//!
//! Currently this module hosts the error taxonomy; every engine in the
//! workspace reports failures through [`DiffusionError`].

mod error;

pub use error::{DiffusionError, Result};
