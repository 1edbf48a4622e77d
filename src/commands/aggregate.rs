use anyhow::Result;
use tracing::info;

use crate::{cli::Cli, pipeline::run_aggregation};

pub fn run(cli: &Cli) -> Result<()> {
    let config = super::load_config(cli)?;

    if cli.verbose > 0 {
        info!(
            "[aggregate] periods={} input={} -> {}",
            config.periods.len(),
            config.input_dir.display(),
            config.output_dir.display(),
        );
    }

    let output = run_aggregation(&config)?;
    info!(
        "[aggregate] done: {} city rows, {} province rows ({} period(s) skipped)",
        output.city.len(),
        output.province.len(),
        output.skipped.len(),
    );
    Ok(())
}
