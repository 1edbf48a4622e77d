mod granularity;
mod io;
mod layer;

pub use granularity::Granularity;
pub use layer::BoundaryLayer;
