//! CLI error type wrapping engine and I/O failures.

use thiserror::Error;

/// Convenience alias for CLI command results.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced by the command-line drivers.
#[derive(Debug, Error)]
pub enum CliError {
    /// An engine operation failed.
    #[error("Engine error: {0}")]
    Engine(#[from] diffusion_core::DiffusionError),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Checkpoint (de)serialisation failed.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] serde_json::Error),

    /// A command-line argument failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
