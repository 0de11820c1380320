//! Spatial estimation: grid interpolation of sparse samples and
//! distance-weighted blending with local observations.

mod blend;
pub mod delaunay;
mod interpolate;

pub use blend::{Observation, blend};
pub use interpolate::{Sample, interpolate};
