use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// UV radiation atlas CLI (argument schema only)
/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "uvatlas.json";

#[derive(Parser, Debug)]
#[command(name = "uvatlas", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Pipeline configuration file (JSON) [default: uvatlas.json, or built-in defaults if that is absent]
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Attribute measurement points to regions and write the city/province panels
    Aggregate,

    /// Render choropleth grids and the trend box-plot from previously written panels
    Render,

    /// Run `aggregate` followed by `render`
    Run,
}
