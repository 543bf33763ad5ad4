use log::trace;

use super::{check_pair, Filter};
use crate::config::DiffusionParams;
use crate::data::neighbour::neumann_pair;
use crate::data::{stats, Scalar, VoxelGrid};
use crate::parallel::{ExecutionStatus, ParallelExecutor, ProgressSpan};
use crate::{Outcome, SmoothResult};

/// 梯度扩散 (Perona-Malik 风格的保边平滑).
///
/// 显式迭代格式. 每次迭代对每个体素:
///
/// ```text
/// Σ    = Σ_axis c_axis * ((I[prev] - I) + (I[next] - I))
/// norm = 1 + I² / (K * RMS)²
/// I'   = I + dt * Σ / norm
/// ```
///
/// 邻居越界时使用诺伊曼边界 (零梯度). 所有迭代结束后, 以结果网格的噪声均值作为直流偏置扣除.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GradientDiffusion {
    conductance: [f64; 3],
    params: DiffusionParams,
}

impl GradientDiffusion {
    /// 以三个轴的传导系数与迭代参数构造.
    pub fn new(conductance: [f64; 3], params: DiffusionParams) -> Self {
        Self {
            conductance,
            params,
        }
    }

    /// 第 `iteration` 次迭代 (从 1 开始) 所占的进度区间.
    fn iteration_span(&self, iteration: usize) -> ProgressSpan {
        let acc = self.params.accuracy.max(1);
        let pct = |i: usize| ((i * 100 / acc) as i32).min(99);
        ProgressSpan::new(pct(iteration - 1), pct(iteration))
    }

    fn diffuse_voxel<T: Scalar>(&self, src: &VoxelGrid<T>, idx: usize, noise2: f64) -> T {
        let (nx, ny, nz) = src.dimensions();
        let (i, j, k) = src.coords(idx);
        let c = src.at(i, j, k).as_f64();
        let [cx, cy, cz] = self.conductance;

        let (x1, x2) = neumann_pair(i, nx);
        let (y1, y2) = neumann_pair(j, ny);
        let (z1, z2) = neumann_pair(k, nz);
        let dx = (src.at(x1, j, k).as_f64() - c) + (src.at(x2, j, k).as_f64() - c);
        let dy = (src.at(i, y1, k).as_f64() - c) + (src.at(i, y2, k).as_f64() - c);
        let dz = (src.at(i, j, z1).as_f64() - c) + (src.at(i, j, z2).as_f64() - c);

        let norm = 1.0 + c * c / noise2;
        T::from_f64_c(c + self.params.time_step * (dx * cx + dy * cy + dz * cz) / norm)
    }
}

/// 以网格自身的噪声均值作为直流偏置扣除, 返回被扣除的值.
pub fn subtract_noise_mean<T: Scalar>(grid: &mut VoxelGrid<T>) -> f64 {
    let mean = stats::noise(grid).mean;
    grid.view_mut()
        .mapv_inplace(|v| T::from_f64_c(v.as_f64() - mean));
    mean
}

impl Filter for GradientDiffusion {
    fn name(&self) -> &'static str {
        "gradient diffusion"
    }

    fn apply<T: Scalar>(
        &self,
        input: &VoxelGrid<T>,
        output: &mut VoxelGrid<T>,
        status: &ExecutionStatus,
        executor: &ParallelExecutor,
    ) -> SmoothResult<Outcome> {
        check_pair(input, output)?;
        self.params.validate()?;
        if status.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let noise2 = self.params.noise_scale().powi(2);
        let mut cur = input.deep_copy();
        let mut next = VoxelGrid::zeros(input.dimensions())?;
        for it in 1..=self.params.accuracy {
            let span = self.iteration_span(it);
            let outcome = executor.run_parallel_for(
                next.as_slice_mut(),
                |idx| self.diffuse_voxel(&cur, idx, noise2),
                status,
                span,
            );
            if outcome.is_cancelled() {
                return Ok(outcome);
            }
            std::mem::swap(&mut cur, &mut next);
            status.advance_to(span.to);
        }

        let bias = subtract_noise_mean(&mut cur);
        trace!(
            "{}: {} iterations, bias {bias:.6e} removed",
            self.name(),
            self.params.accuracy
        );
        output.assign(&cur);
        Ok(Outcome::Completed)
    }
}
