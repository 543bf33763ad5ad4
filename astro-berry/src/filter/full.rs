use super::{check_pair, Filter};
use crate::data::neighbour::AxisWindow;
use crate::data::{Scalar, VoxelGrid};
use crate::kernel::Kernel3d;
use crate::parallel::{ExecutionStatus, ParallelExecutor, ProgressSpan};
use crate::{Outcome, SmoothResult};

/// 完整三维卷积, 用于各向异性或旋转的核.
///
/// 只做一次并行扫描, 每个体素累加整个足迹. 边界处理与可分离卷积相同:
/// 超出网格的邻居被排除, 并按实际参与的权重归一化.
#[derive(Copy, Clone, Debug)]
pub struct FullConvolution<'k> {
    kernel: &'k Kernel3d,
}

impl<'k> FullConvolution<'k> {
    /// 以三维核构造.
    pub fn new(kernel: &'k Kernel3d) -> Self {
        Self { kernel }
    }

    fn convolve_voxel<T: Scalar>(&self, src: &VoxelGrid<T>, idx: usize) -> T {
        let (nx, ny, nz) = src.dimensions();
        let (i, j, k) = src.coords(idx);
        let [rx, ry, rz] = self.kernel.radii();
        let wx = AxisWindow::new(i, rx, nx);
        let wy = AxisWindow::new(j, ry, ny);
        let wz = AxisWindow::new(k, rz, nz);

        let (mut acc, mut norm) = (0.0, 0.0);
        for (z, tz) in wz.taps() {
            for (y, ty) in wy.taps() {
                for (x, tx) in wx.taps() {
                    let w = self.kernel.weight(tx, ty, tz);
                    acc += w * src.at(x, y, z).as_f64();
                    norm += w;
                }
            }
        }
        if norm > 0.0 {
            T::from_f64_c(acc / norm)
        } else {
            src.at(i, j, k)
        }
    }
}

impl Filter for FullConvolution<'_> {
    fn name(&self) -> &'static str {
        "full 3-D convolution"
    }

    fn apply<T: Scalar>(
        &self,
        input: &VoxelGrid<T>,
        output: &mut VoxelGrid<T>,
        status: &ExecutionStatus,
        executor: &ParallelExecutor,
    ) -> SmoothResult<Outcome> {
        check_pair(input, output)?;
        if status.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let mut scratch = VoxelGrid::zeros(input.dimensions())?;
        let outcome = executor.run_parallel_for(
            scratch.as_slice_mut(),
            |idx| self.convolve_voxel(input, idx),
            status,
            ProgressSpan::FULL,
        );
        if outcome.is_completed() {
            output.assign(&scratch);
        }
        Ok(outcome)
    }
}
