pub mod config;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod math;
pub mod operations;
pub mod slicer;
pub mod topology;

pub use config::SliceParams;
pub use error::{Result, SkeinError};
pub use layer::Layer;
pub use slicer::Slicer;
