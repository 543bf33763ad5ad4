use log::trace;

use super::{check_pair, Filter};
use crate::data::neighbour::AxisWindow;
use crate::data::{Scalar, VoxelGrid};
use crate::parallel::{ExecutionStatus, ParallelExecutor, ProgressSpan};
use crate::{Outcome, SmoothResult};

/// X / Y / Z 三次扫描各自占用的进度区间.
const PASS_SPANS: [ProgressSpan; 3] = [
    ProgressSpan::new(10, 40),
    ProgressSpan::new(40, 70),
    ProgressSpan::new(70, 99),
];

const AXIS_NAMES: [char; 3] = ['x', 'y', 'z'];

/// 可分离卷积: 依次沿 X, Y, Z 做一维卷积.
///
/// 每次扫描读取上一次扫描的结果, 写入另一块临时网格, 然后交换.
/// 长度为 1 的轴 (恒等核) 直接跳过.
#[derive(Copy, Clone, Debug)]
pub struct SeparableConvolution<'k> {
    axes: &'k [Vec<f64>; 3],
}

impl<'k> SeparableConvolution<'k> {
    /// 以三个一维核构造.
    pub fn new(axes: &'k [Vec<f64>; 3]) -> Self {
        Self { axes }
    }

    /// 需要扫描的轴.
    pub fn active_axes(&self) -> impl Iterator<Item = usize> + 'k {
        let axes = self.axes;
        (0..3).filter(move |&a| axes[a].len() > 1)
    }
}

/// 沿 `axis` 做一次一维卷积. 超出网格的邻居被排除, 结果按实际参与的权重归一化.
fn convolve_axis<T: Scalar>(
    src: &VoxelGrid<T>,
    dst: &mut VoxelGrid<T>,
    weights: &[f64],
    axis: usize,
    status: &ExecutionStatus,
    executor: &ParallelExecutor,
    span: ProgressSpan,
) -> Outcome {
    let (nx, ny, nz) = src.dimensions();
    let extent = [nx, ny, nz][axis];
    let stride = [1, nx, nx * ny][axis];
    let radius = weights.len() / 2;
    let data = src.as_slice();

    executor.run_parallel_for(
        dst.as_slice_mut(),
        |idx| {
            let c = (idx / stride) % extent;
            let base = idx - c * stride;
            let (acc, norm) = AxisWindow::new(c, radius, extent).taps().fold(
                (0.0, 0.0),
                |(acc, norm), (p, tap)| {
                    let w = weights[tap];
                    (acc + w * data[base + p * stride].as_f64(), norm + w)
                },
            );
            T::from_f64_c(acc / norm)
        },
        status,
        span,
    )
}

impl Filter for SeparableConvolution<'_> {
    fn name(&self) -> &'static str {
        "separable convolution"
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

        let mut cur = input.deep_copy();
        let mut next = VoxelGrid::zeros(input.dimensions())?;
        for axis in self.active_axes() {
            let span = PASS_SPANS[axis];
            status.advance_to(span.from);
            trace!("{}: pass along {}", self.name(), AXIS_NAMES[axis]);
            let outcome = convolve_axis(
                &cur,
                &mut next,
                &self.axes[axis],
                axis,
                status,
                executor,
                span,
            );
            if outcome.is_cancelled() {
                return Ok(outcome);
            }
            std::mem::swap(&mut cur, &mut next);
        }
        output.assign(&cur);
        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{build_box_weights, build_gaussian_separable, KernelTable};
    use crate::SmoothError;

    fn axes_of(table: KernelTable) -> [Vec<f64>; 3] {
        match table {
            KernelTable::Separable { axes } => axes,
            KernelTable::Full(_) => panic!("期望可分离核"),
        }
    }

    #[test]
    fn test_constant_box_4x4x4() {
        let axes = axes_of(build_box_weights([3, 3, 3]));
        let input = VoxelGrid::<f32>::filled((4, 4, 4), 1.0).unwrap();
        let mut output = VoxelGrid::zeros((4, 4, 4)).unwrap();
        let status = ExecutionStatus::new();
        let r = SeparableConvolution::new(&axes)
            .apply(&input, &mut output, &status, &ParallelExecutor::new(3))
            .unwrap();
        assert_eq!(r, Outcome::Completed);
        assert!(output.iter().all(|&v| v == 1.0), "常数场平滑后应保持不变");
    }

    #[test]
    fn test_constant_field_any_box_length() {
        let exec = ParallelExecutor::new(4);
        for (dims, len) in [((1, 1, 1), 3), ((7, 2, 5), 5), ((3, 9, 4), 9), ((6, 6, 6), 13)] {
            let axes = axes_of(build_box_weights([len; 3]));
            let input = VoxelGrid::<f64>::filled(dims, 2.5).unwrap();
            let mut output = VoxelGrid::zeros(dims).unwrap();
            SeparableConvolution::new(&axes)
                .apply(&input, &mut output, &ExecutionStatus::new(), &exec)
                .unwrap();
            assert!(
                output.iter().all(|v| (v - 2.5).abs() < 1e-12),
                "尺寸 {dims:?}, 核长 {len}"
            );
        }
    }

    #[test]
    fn test_impulse_box_5x5x5() {
        let axes = axes_of(build_box_weights([3, 3, 3]));
        let mut input = VoxelGrid::<f64>::zeros((5, 5, 5)).unwrap();
        *input.at_mut(2, 2, 2) = 1.0;
        let mut output = VoxelGrid::zeros((5, 5, 5)).unwrap();
        SeparableConvolution::new(&axes)
            .apply(&input, &mut output, &ExecutionStatus::new(), &ParallelExecutor::new(2))
            .unwrap();
        let expect = 1.0 / 27.0;
        for (i, j, k) in [(2, 2, 2), (1, 2, 2), (3, 2, 2), (2, 1, 2), (2, 3, 2), (2, 2, 1), (2, 2, 3)] {
            assert!((output.at(i, j, k) - expect).abs() < 1e-12, "({i}, {j}, {k})");
        }
        assert_eq!(output.at(0, 0, 0), 0.0);
    }

    #[test]
    fn test_no_op_axes() {
        // 只沿 X 滤波, 而数据只沿 Y 变化, 结果应不变.
        let axes = axes_of(build_gaussian_separable([3.0, 0.0, 0.0], [0; 3]));
        assert_eq!(
            SeparableConvolution::new(&axes).active_axes().collect::<Vec<_>>(),
            vec![0]
        );
        let input = VoxelGrid::<f64>::from_fn((6, 7, 3), |(_, j, _)| (j * j) as f64).unwrap();
        let mut output = VoxelGrid::zeros((6, 7, 3)).unwrap();
        SeparableConvolution::new(&axes)
            .apply(&input, &mut output, &ExecutionStatus::new(), &ParallelExecutor::new(4))
            .unwrap();
        for (a, b) in input.iter().zip(output.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dimension_mismatch_writes_nothing() {
        let axes = axes_of(build_box_weights([3, 3, 3]));
        let input = VoxelGrid::<f32>::filled((4, 4, 4), 1.0).unwrap();
        let mut output = VoxelGrid::<f32>::filled((4, 4, 8), -7.0).unwrap();
        let e = SeparableConvolution::new(&axes)
            .apply(&input, &mut output, &ExecutionStatus::new(), &ParallelExecutor::new(2))
            .unwrap_err();
        assert_eq!(
            e,
            SmoothError::DimensionMismatch {
                input: (4, 4, 4),
                output: (4, 4, 8)
            }
        );
        assert!(output.iter().all(|&v| v == -7.0));
    }

    #[test]
    fn test_cancelled_leaves_output() {
        let axes = axes_of(build_box_weights([5, 5, 5]));
        let input = VoxelGrid::<f32>::from_fn((8, 8, 8), |(i, _, _)| i as f32).unwrap();
        let mut output = VoxelGrid::<f32>::filled((8, 8, 8), 42.0).unwrap();
        let status = ExecutionStatus::new();
        status.cancel();
        let r = SeparableConvolution::new(&axes)
            .apply(&input, &mut output, &status, &ParallelExecutor::new(2))
            .unwrap();
        assert_eq!(r, Outcome::Cancelled);
        assert!(output.iter().all(|&v| v == 42.0));
        assert!(status.is_cancelled());
    }
}
