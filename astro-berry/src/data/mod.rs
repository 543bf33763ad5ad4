mod grid;
pub mod neighbour;
mod scalar;
pub mod stats;
mod volume;

pub(crate) use grid::with_grid;
pub use grid::{AnyGrid, VoxelGrid};
pub use scalar::{HostBuffer, Precision, Scalar, ScalarType};
pub use volume::{AstroVolume, Volume};
