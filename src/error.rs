use thiserror::Error;

use crate::boundary::Granularity;

/// Run-aborting failures. Everything else travels as a plain `anyhow::Error`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("region-name attribute {column:?} not found in {layer}; available attributes: {available:?}")]
    MissingRegionColumn {
        layer: String,
        column: String,
        available: Vec<String>,
    },

    #[error("duplicate region name {name:?} in {layer}")]
    DuplicateRegionName { layer: String, name: String },

    #[error("no aggregated results were produced for the {granularity} panel; check the input files")]
    NoResults { granularity: Granularity },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
