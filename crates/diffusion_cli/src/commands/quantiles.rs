//! Quantiles command implementation
//!
//! Evolves a CDF engine and records the lattice position of each "1 in N"
//! quantile at every recorded timestep.

use tracing::info;

use super::{evolve_and_record, RunConfig};
use crate::Result;

/// Run the quantiles command
pub fn run(cfg: &RunConfig) -> Result<()> {
    info!("Tracking {} quantile targets", cfg.targets.len());

    let mut header = vec!["t".to_string()];
    header.extend(cfg.targets.iter().map(|q| format!("q_{}", q)));

    let mut wrote_header = false;
    evolve_and_record(cfg, |engine, writer| {
        if !wrote_header {
            writer.write_record(&header)?;
            wrote_header = true;
        }
        let positions = engine.find_quantiles(&cfg.targets)?;
        let mut row = vec![engine.time().to_string()];
        row.extend(
            positions
                .iter()
                .map(|p| p.map(|x| x.to_string()).unwrap_or_default()),
        );
        writer.write_record(&row)?;
        Ok(())
    })
}
