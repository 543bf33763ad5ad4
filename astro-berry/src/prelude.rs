//! 常用类型一次性导入.
//!
//! ```
//! use astro_berry::prelude::*;
//!
//! let input = AstroVolume::new(VoxelGrid::<f32>::filled((4, 4, 4), 1.0).unwrap());
//! let mut output = input.zeros_like();
//! let status = ExecutionStatus::new();
//! let outcome = SmoothingEngine::new()
//!     .apply(
//!         &SmoothingConfig::box_filter([3.0; 3]),
//!         &input,
//!         &mut output,
//!         &status,
//!         RenderContext::none(),
//!     )
//!     .unwrap();
//! assert!(outcome.is_completed());
//! ```

pub use crate::config::{DiffusionParams, FilterKind, Hardware, SmoothingConfig};
pub use crate::data::{AnyGrid, AstroVolume, HostBuffer, Precision, Scalar, Volume, VoxelGrid};
pub use crate::engine::{Algorithm, SmoothingEngine, Strategy};
pub use crate::filter::{GpuBackend, GpuCapabilities, GpuFailure, GpuJob, RenderContext};
pub use crate::kernel::KernelTable;
pub use crate::parallel::{ExecutionStatus, ParallelExecutor};
pub use crate::{Outcome, SmoothError, SmoothResult};
