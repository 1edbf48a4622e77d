mod fs;
mod log;

pub(crate) use fs::*;
pub use log::init_tracing;
