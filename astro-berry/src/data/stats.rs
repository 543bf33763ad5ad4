//! 值域与噪声统计.

use itertools::{Itertools, MinMaxResult};
use ndarray::Axis;
use ordered_float::OrderedFloat;

use super::grid::VoxelGrid;
use super::scalar::Scalar;
use crate::consts::NOISE_EDGE_SLICES;

/// 所有有限体素值的 `(min, max)`. 不存在有限值时返回 `None`.
pub fn range<T: Scalar>(grid: &VoxelGrid<T>) -> Option<(f64, f64)> {
    match grid
        .iter()
        .map(|v| v.as_f64())
        .filter(|v| v.is_finite())
        .minmax_by_key(|&v| OrderedFloat(v))
    {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    }
}

/// 噪声估计.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct NoiseEstimate {
    /// 噪声均值 (直流偏置).
    pub mean: f64,
    /// 噪声均方根 (相对均值).
    pub rms: f64,
}

/// 参与噪声估计的 z 切片.
///
/// 数据立方体两端的通道通常不含源, 因此取前后各 [`NOISE_EDGE_SLICES`] 层;
/// 层数不足以区分两端时使用整个网格.
fn noise_slices(nz: usize) -> impl Iterator<Item = usize> {
    let edge = NOISE_EDGE_SLICES;
    let (head, tail) = if nz <= 2 * edge {
        (0..nz, nz..nz)
    } else {
        (0..edge, nz - edge..nz)
    };
    head.chain(tail)
}

/// 从网格两端的 z 切片估计噪声. 非有限值不参与统计.
pub fn noise<T: Scalar>(grid: &VoxelGrid<T>) -> NoiseEstimate {
    let (_, _, nz) = grid.dimensions();
    let view = grid.view();
    let samples = || {
        noise_slices(nz)
            .flat_map(move |k| view.index_axis_move(Axis(0), k))
            .map(|v| v.as_f64())
            .filter(|v| v.is_finite())
    };

    let (count, sum) = samples().fold((0usize, 0.0), |(c, s), v| (c + 1, s + v));
    if count == 0 {
        return NoiseEstimate::default();
    }
    let mean = sum / count as f64;
    let var = samples().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    NoiseEstimate {
        mean,
        rms: var.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_range_skips_non_finite() {
        let mut g = VoxelGrid::<f32>::from_fn((3, 3, 3), |(i, j, k)| (i + j + k) as f32).unwrap();
        *g.at_mut(1, 1, 1) = f32::NAN;
        *g.at_mut(0, 0, 1) = f32::INFINITY;
        assert_eq!(range(&g), Some((0.0, 6.0)));

        let g = VoxelGrid::<f64>::filled((2, 1, 1), f64::NAN).unwrap();
        assert_eq!(range(&g), None);
    }

    #[test]
    fn test_noise_uses_edge_slices() {
        // 中间层为强信号, 两端层为 +-1 交替的噪声.
        let g = VoxelGrid::<f64>::from_fn((4, 4, 8), |(i, j, k)| {
            if (2..6).contains(&k) {
                100.0
            } else if (i + j) % 2 == 0 {
                1.5
            } else {
                -0.5
            }
        })
        .unwrap();
        let est = noise(&g);
        assert!(f64_eq(est.mean, 0.5), "噪声均值错误: {}", est.mean);
        assert!(f64_eq(est.rms, 1.0), "噪声均方根错误: {}", est.rms);
    }

    #[test]
    fn test_noise_small_cube() {
        let g = VoxelGrid::<f32>::filled((2, 2, 3), 2.0).unwrap();
        let est = noise(&g);
        assert!(f64_eq(est.mean, 2.0));
        assert!(f64_eq(est.rms, 0.0));
    }
}
