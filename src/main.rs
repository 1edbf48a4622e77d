use anyhow::Result;
use clap::Parser;

use uvatlas::cli::{Cli, Commands};
use uvatlas::commands::{aggregate, render};

fn main() -> Result<()> {
    let cli = Cli::parse();
    uvatlas::init_tracing(cli.verbose);

    match &cli.command {
        Commands::Aggregate => aggregate::run(&cli),
        Commands::Render => render::run(&cli),
        Commands::Run => {
            aggregate::run(&cli)?;
            render::run(&cli)
        }
    }
}
