#![doc = "uvatlas public API"]
mod boundary;
mod common;
mod config;
mod error;
mod geom;
mod io;
mod pipeline;
mod render;

pub mod cli;
pub mod commands;

#[doc(inline)]
pub use boundary::{BoundaryLayer, Granularity};

#[doc(inline)]
pub use config::{BoundaryConfig, Boundaries, ColumnMapping, Config, OutputNames, PeriodFile, RenderConfig};

#[doc(inline)]
pub use error::PipelineError;

#[doc(inline)]
pub use geom::Crs;

#[doc(inline)]
pub use pipeline::{
    aggregate, attribute, load_period_points, run_aggregation, AggregationOutput, AttributedPoint,
    MeasurementPoint, Panel, PanelRecord, Period,
};

#[doc(inline)]
pub use render::{run_rendering, BoxStats, RenderOutput};

pub use common::init_tracing;
