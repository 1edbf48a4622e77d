//! Stage A: points in, per-region period means out.

mod aggregate;
mod attribute;
mod panel;
mod period;
mod points;
mod stage;

pub use aggregate::aggregate;
pub use attribute::{attribute, AttributedPoint};
pub use panel::{Panel, PanelRecord};
pub use period::Period;
pub use points::{load_period_points, MeasurementPoint};
pub use stage::{run_aggregation, AggregationOutput};
