//! CLI command implementations
//!
//! Each submodule implements a specific CLI command; the shared run
//! plumbing (engine construction, checkpoint resume, CSV output) lives
//! here.

pub mod quantiles;
pub mod variance;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use diffusion_sim::{DiffusionTimeCdf, TimeCdfState};

use crate::{CliError, Result};

/// Parameters shared by every evolution driver.
pub struct RunConfig {
    /// Disorder parameter.
    pub beta: f64,
    /// Number of timesteps to simulate.
    pub t_max: u64,
    /// Per-command numeric targets (quantiles or particle-count scales).
    pub targets: Vec<f64>,
    /// Optional deterministic seed.
    pub seed: Option<u64>,
    /// Output CSV path, stdout when `None`.
    pub output: Option<String>,
    /// Record a row every N steps.
    pub record_every: u64,
    /// Optional JSON checkpoint path.
    pub checkpoint: Option<String>,
    /// Checkpoint every N steps.
    pub checkpoint_every: u64,
}

impl RunConfig {
    fn validate(&self) -> Result<()> {
        if self.record_every == 0 {
            return Err(CliError::InvalidArgument(
                "--record-every must be at least 1".into(),
            ));
        }
        if self.checkpoint_every == 0 {
            return Err(CliError::InvalidArgument(
                "--checkpoint-every must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builds the engine, resuming from the checkpoint file when one exists.
///
/// On resume the stored seed semantics cannot be reconstructed; the
/// continuation draws from a fresh entropy seed regardless of `--seed`.
pub(crate) fn build_engine(cfg: &RunConfig) -> Result<DiffusionTimeCdf> {
    cfg.validate()?;
    if let Some(path) = &cfg.checkpoint {
        if Path::new(path).exists() {
            let file = File::open(path)?;
            let state: TimeCdfState = serde_json::from_reader(file)?;
            let engine = DiffusionTimeCdf::from_snapshot(state)?;
            info!("Resumed from checkpoint {} at t = {}", path, engine.time());
            return Ok(engine);
        }
    }
    match cfg.seed {
        Some(seed) => DiffusionTimeCdf::with_seed(cfg.beta, cfg.t_max, seed),
        None => DiffusionTimeCdf::new(cfg.beta, cfg.t_max),
    }
    .map_err(CliError::from)
}

/// Writes the engine snapshot to the configured checkpoint path, if any.
pub(crate) fn save_checkpoint(engine: &DiffusionTimeCdf, cfg: &RunConfig) -> Result<()> {
    if let Some(path) = &cfg.checkpoint {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &engine.snapshot())?;
        info!("Checkpoint written to {} at t = {}", path, engine.time());
    }
    Ok(())
}

/// Opens the CSV writer on the configured path, stdout otherwise.
pub(crate) fn open_writer(cfg: &RunConfig) -> Result<csv::Writer<Box<dyn Write>>> {
    let inner: Box<dyn Write> = match &cfg.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    Ok(csv::Writer::from_writer(inner))
}

/// Shared evolution loop: advance to the horizon, recording a row every
/// `record_every` steps and checkpointing every `checkpoint_every` steps.
pub(crate) fn evolve_and_record<F>(cfg: &RunConfig, mut record: F) -> Result<()>
where
    F: FnMut(&DiffusionTimeCdf, &mut csv::Writer<Box<dyn Write>>) -> Result<()>,
{
    let mut engine = build_engine(cfg)?;
    if engine.t_max() < cfg.t_max {
        return Err(CliError::InvalidArgument(format!(
            "checkpoint horizon {} is below the requested t_max {}",
            engine.t_max(),
            cfg.t_max
        )));
    }
    let mut writer = open_writer(cfg)?;

    info!(
        "Evolving beta = {} from t = {} to t = {}",
        cfg.beta,
        engine.time(),
        cfg.t_max
    );
    while engine.time() < cfg.t_max {
        engine.advance()?;
        let t = engine.time();
        if t % cfg.record_every == 0 || t == cfg.t_max {
            record(&engine, &mut writer)?;
        }
        if t % cfg.checkpoint_every == 0 {
            save_checkpoint(&engine, cfg)?;
        }
    }
    writer.flush()?;
    save_checkpoint(&engine, cfg)?;
    info!("Evolution complete at t = {}", engine.time());
    Ok(())
}
