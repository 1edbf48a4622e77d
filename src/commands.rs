pub mod aggregate;
pub mod render;

use std::path::Path;

use anyhow::{Context, Result};

use crate::{cli::{Cli, DEFAULT_CONFIG}, config::Config};

/// Load the configuration named on the command line.
/// Only the implicit default file may be absent, in which case the built-in defaults apply.
fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("[commands] failed to load configuration {}", path.display())),
        None => Config::load_or_default(Path::new(DEFAULT_CONFIG))
            .with_context(|| format!("[commands] failed to load configuration {DEFAULT_CONFIG}")),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("uvatlas").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn named_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let cli = parse(&["--config", missing.to_str().unwrap(), "aggregate"]);

        let err = load_config(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));
    }

    #[test]
    fn named_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.json");
        fs::write(&path, r#"{ "output_dir": "out" }"#).unwrap();
        let cli = parse(&["render", "-c", path.to_str().unwrap()]);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.output_dir, dir.path().join("out"));
    }

    #[test]
    fn config_flag_is_optional() {
        assert!(parse(&["run"]).config.is_none());
    }
}
