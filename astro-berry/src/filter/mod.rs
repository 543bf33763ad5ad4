//! 平滑滤波算法.
//!
//! 每个算法只针对 [`Scalar`] 编写一次. 所有 CPU 算法都先写入临时网格,
//! 只有在正常完成后才把结果提交到输出网格, 因此被取消的调用不会修改输出网格.

use crate::data::{Scalar, VoxelGrid};
use crate::parallel::{ExecutionStatus, ParallelExecutor};
use crate::{Outcome, SmoothError, SmoothResult};

mod diffusion;
mod full;
mod gpu;
mod separable;

pub use diffusion::{subtract_noise_mean, GradientDiffusion};
pub use full::FullConvolution;
pub use gpu::{GpuBackend, GpuCapabilities, GpuFailure, GpuJob, RenderContext};
pub use separable::SeparableConvolution;

/// CPU 滤波算法.
pub trait Filter {
    /// 算法名称, 用于日志.
    fn name(&self) -> &'static str;

    /// 读取 `input`, 将结果写入 `output`.
    ///
    /// 所有工作线程结束后才返回. 返回 `Outcome::Cancelled` 时 `output` 保持原样.
    fn apply<T: Scalar>(
        &self,
        input: &VoxelGrid<T>,
        output: &mut VoxelGrid<T>,
        status: &ExecutionStatus,
        executor: &ParallelExecutor,
    ) -> SmoothResult<Outcome>;
}

/// 检查输入与输出网格尺寸是否一致.
pub fn check_pair<T: Scalar, U: Scalar>(
    input: &VoxelGrid<T>,
    output: &VoxelGrid<U>,
) -> SmoothResult<()> {
    if input.same_shape(output) {
        Ok(())
    } else {
        Err(SmoothError::DimensionMismatch {
            input: input.dimensions(),
            output: output.dimensions(),
        })
    }
}
