use anyhow::Result;
use tracing::info;

use crate::{cli::Cli, render::run_rendering};

pub fn run(cli: &Cli) -> Result<()> {
    let config = super::load_config(cli)?;

    let output = run_rendering(&config)?;
    for path in output.files() {
        info!("[render] wrote {}", path.display());
    }
    Ok(())
}
