//! diffusion CLI - Command Line Drivers for RWRE Simulations
//!
//! Operational entry point for the diffusion engine workspace.
//!
//! # Commands
//!
//! - `diffusion quantiles` - Evolve a CDF engine and record quantile
//!   position trajectories to CSV
//! - `diffusion variance` - Evolve a CDF engine and record the Gumbel
//!   variance of the front per timestep to CSV
//!
//! Both commands support periodic JSON checkpointing and resumption, so
//! multi-day horizons survive interruption.

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;

pub use error::{CliError, Result};

/// RWRE diffusion simulation CLI
#[derive(Parser)]
#[command(name = "diffusion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a CDF engine, recording quantile positions per timestep
    Quantiles {
        /// Disorder parameter (0 = Bernoulli, 1 = uniform, inf = constant)
        #[arg(short, long, default_value = "1.0")]
        beta: f64,

        /// Number of timesteps to simulate
        #[arg(short, long)]
        t_max: u64,

        /// "1 in N" quantile targets, comma separated (e.g. 1e3,1e9,1e15)
        #[arg(short, long, value_delimiter = ',', required = true)]
        quantiles: Vec<f64>,

        /// Seed for the random stream (entropy-seeded when omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output CSV path (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Record a CSV row every N timesteps
        #[arg(long, default_value = "1")]
        record_every: u64,

        /// JSON checkpoint path; written periodically and resumed from if
        /// present
        #[arg(long)]
        checkpoint: Option<String>,

        /// Checkpoint every N timesteps
        #[arg(long, default_value = "10000")]
        checkpoint_every: u64,
    },

    /// Evolve a CDF engine, recording the front's Gumbel variance per
    /// timestep
    Variance {
        /// Disorder parameter (0 = Bernoulli, 1 = uniform, inf = constant)
        #[arg(short, long, default_value = "1.0")]
        beta: f64,

        /// Number of timesteps to simulate
        #[arg(short, long)]
        t_max: u64,

        /// Particle-count scales, comma separated (e.g. 1e10,1e30,1e50)
        #[arg(short = 'n', long, value_delimiter = ',', required = true)]
        scales: Vec<f64>,

        /// Seed for the random stream (entropy-seeded when omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output CSV path (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Record a CSV row every N timesteps
        #[arg(long, default_value = "1")]
        record_every: u64,

        /// JSON checkpoint path; written periodically and resumed from if
        /// present
        #[arg(long)]
        checkpoint: Option<String>,

        /// Checkpoint every N timesteps
        #[arg(long, default_value = "10000")]
        checkpoint_every: u64,
    },
}

fn main() -> Result<()> {
    // Initialise tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Quantiles {
            beta,
            t_max,
            quantiles,
            seed,
            output,
            record_every,
            checkpoint,
            checkpoint_every,
        } => commands::quantiles::run(&commands::RunConfig {
            beta,
            t_max,
            targets: quantiles,
            seed,
            output,
            record_every,
            checkpoint,
            checkpoint_every,
        }),
        Commands::Variance {
            beta,
            t_max,
            scales,
            seed,
            output,
            record_every,
            checkpoint,
            checkpoint_every,
        } => commands::variance::run(&commands::RunConfig {
            beta,
            t_max,
            targets: scales,
            seed,
            output,
            record_every,
            checkpoint,
            checkpoint_every,
        }),
    }
}
