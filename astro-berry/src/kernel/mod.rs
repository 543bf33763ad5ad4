//! 卷积核构建.
//!
//! 所有核在一次调用中只构建一次, 之后在并行阶段只读. 权重总以 `f64` 保存,
//! 与网格精度无关.

use ndarray::Array3;

use crate::consts::{AXIS_OFF_THRESHOLD, FWHM_PER_SIGMA, GAUSSIAN_TRUNCATE};

/// 三维旋转角度的最小有效值 (度). 小于该值的角度视为 0.
const ROTATION_EPS: f64 = 1e-9;

/// 退化 sigma 的下限, 用于避免除零.
const SIGMA_FLOOR: f64 = 1e-3;

/// 将核长度强制为奇数: `0 -> 1`, 偶数 `L -> L + 1`.
#[inline]
pub fn odd_length(len: usize) -> usize {
    if len == 0 {
        1
    } else {
        len | 1
    }
}

/// 由半高全宽计算高斯标准差.
#[inline]
pub fn fwhm_to_sigma(fwhm: f64) -> f64 {
    fwhm / FWHM_PER_SIGMA
}

/// 标准差为 `sigma` 时的自动核长度 `2 * ceil(4 * sigma) + 1`.
#[inline]
pub fn auto_length(sigma: f64) -> usize {
    2 * (GAUSSIAN_TRUNCATE * sigma).ceil().max(0.0) as usize + 1
}

/// 将权重归一化, 使其和为 1.
fn normalize(weights: &mut [f64]) {
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        weights.iter_mut().for_each(|w| *w /= sum);
    }
}

/// 构建一维高斯核.
///
/// `length_hint == 0` 时自动选择长度; 偶数长度会被加一.
/// `fwhm <= 0.001` 时返回恒等核 `[1.0]`.
pub fn build_gaussian_1d(fwhm: f64, length_hint: usize) -> Vec<f64> {
    if fwhm <= AXIS_OFF_THRESHOLD {
        return vec![1.0];
    }
    let sigma = fwhm_to_sigma(fwhm);
    let len = match length_hint {
        0 => auto_length(sigma),
        hint => odd_length(hint),
    };
    let r = (len / 2) as f64;
    let mut w: Vec<f64> = (0..len)
        .map(|t| {
            let d = t as f64 - r;
            (-0.5 * d * d / (sigma * sigma)).exp()
        })
        .collect();
    normalize(&mut w);
    w
}

/// 构建长度为 `len` 的一维 box 核 (长度强制为奇数).
pub fn build_box_1d(len: usize) -> Vec<f64> {
    let len = odd_length(len);
    vec![1.0 / len as f64; len]
}

/// 构建三轴 box 核.
pub fn build_box_weights(lengths: [usize; 3]) -> KernelTable {
    KernelTable::Separable {
        axes: lengths.map(build_box_1d),
    }
}

/// 构建三轴可分离高斯核.
pub fn build_gaussian_separable(fwhm: [f64; 3], length_hints: [usize; 3]) -> KernelTable {
    KernelTable::Separable {
        axes: [0, 1, 2].map(|a| build_gaussian_1d(fwhm[a], length_hints[a])),
    }
}

/// 旋转矩阵 `R = Rz * Ry * Rx`, 角度单位为度.
pub fn rotation_matrix(rotation_deg: [f64; 3]) -> [[f64; 3]; 3] {
    let [ax, ay, az] = rotation_deg.map(f64::to_radians);
    let (sx, cx) = ax.sin_cos();
    let (sy, cy) = ay.sin_cos();
    let (sz, cz) = az.sin_cos();
    let rx = [[1.0, 0.0, 0.0], [0.0, cx, -sx], [0.0, sx, cx]];
    let ry = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
    let rz = [[cz, -sz, 0.0], [sz, cz, 0.0], [0.0, 0.0, 1.0]];
    mat_mul(&mat_mul(&rz, &ry), &rx)
}

fn mat_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut m = [[0.0; 3]; 3];
    for (i, row) in m.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    m
}

/// 构建 (可旋转的) 三维高斯核.
///
/// 对足迹内每个偏移 `d` 计算 `exp(-0.5 * d^T Σ^-1 d)`, 其中
/// `Σ = R diag(σ²) R^T`. 等价地, `d^T Σ^-1 d = Σ_i (R_i · d)² / σ_i²`, `R_i` 为 `R` 的第 i 列.
///
/// 旋转为零时, 结果等于三个一维核的外积. 有旋转时, 自动长度按最大的 sigma 选取.
pub fn build_gaussian_3d(fwhm: [f64; 3], rotation_deg: [f64; 3], length_hints: [usize; 3]) -> Kernel3d {
    let active = fwhm.map(|f| f > AXIS_OFF_THRESHOLD);
    let sigma = fwhm.map(|f| fwhm_to_sigma(f).max(SIGMA_FLOOR));
    let rotated = rotation_deg.iter().any(|a| a.abs() > ROTATION_EPS);
    let max_sigma = (0..3)
        .filter(|&a| active[a])
        .map(|a| sigma[a])
        .fold(0.0, f64::max);

    let lengths = [0, 1, 2].map(|a| match length_hints[a] {
        0 if rotated => auto_length(max_sigma),
        0 if active[a] => auto_length(sigma[a]),
        0 => 1,
        hint => odd_length(hint),
    });
    let [lx, ly, lz] = lengths;
    let (rx, ry, rz) = ((lx / 2) as f64, (ly / 2) as f64, (lz / 2) as f64);

    let r = rotation_matrix(rotation_deg);
    let inv_var = sigma.map(|s| 1.0 / (s * s));

    let mut weights = Array3::from_shape_fn((lz, ly, lx), |(tz, ty, tx)| {
        let d = [tx as f64 - rx, ty as f64 - ry, tz as f64 - rz];
        let q: f64 = (0..3)
            .map(|i| {
                let proj = r[0][i] * d[0] + r[1][i] * d[1] + r[2][i] * d[2];
                proj * proj * inv_var[i]
            })
            .sum();
        (-0.5 * q).exp()
    });
    // 由 `from_shape_fn` 构造, 为标准布局, 可直接 unwrap.
    normalize(weights.as_slice_mut().unwrap());
    Kernel3d { weights }
}

/// 三维卷积核, 形状为 `(lz, ly, lx)`, 各维长度均为奇数.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel3d {
    weights: Array3<f64>,
}

impl Kernel3d {
    /// 以三个一维核的外积构造三维核.
    pub fn outer(axes: &[Vec<f64>; 3]) -> Self {
        let [wx, wy, wz] = axes;
        Self {
            weights: Array3::from_shape_fn((wz.len(), wy.len(), wx.len()), |(tz, ty, tx)| {
                wx[tx] * wy[ty] * wz[tz]
            }),
        }
    }

    /// 各轴核长度 `[lx, ly, lz]`.
    #[inline]
    pub fn lengths(&self) -> [usize; 3] {
        let (lz, ly, lx) = self.weights.dim();
        [lx, ly, lz]
    }

    /// 各轴核半径.
    #[inline]
    pub fn radii(&self) -> [usize; 3] {
        self.lengths().map(|l| l / 2)
    }

    /// 核下标 `(tx, ty, tz)` 处的权重.
    #[inline]
    pub fn weight(&self, tx: usize, ty: usize, tz: usize) -> f64 {
        self.weights[(tz, ty, tx)]
    }

    /// 所有权重, 按 `(tz * ly + ty) * lx + tx` 排列.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        // 由 `from_shape_fn` 构造, 总为标准布局.
        self.weights.as_slice().unwrap()
    }

    /// 权重之和.
    #[inline]
    pub fn sum(&self) -> f64 {
        self.weights.sum()
    }
}

/// 一次调用所使用的卷积核.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelTable {
    /// 可分离核: 每个轴一个一维核, 顺序为 `[x, y, z]`.
    Separable {
        /// 三个轴的一维核.
        axes: [Vec<f64>; 3],
    },

    /// 不可分离的完整三维核.
    Full(Kernel3d),
}

impl KernelTable {
    /// 是否为可分离核.
    #[inline]
    pub fn is_separable(&self) -> bool {
        matches!(self, Self::Separable { .. })
    }

    /// 各轴核半径.
    pub fn radii(&self) -> [usize; 3] {
        match self {
            Self::Separable { axes } => [0, 1, 2].map(|a| axes[a].len() / 2),
            Self::Full(k) => k.radii(),
        }
    }

    /// 等效三维核的权重之和.
    pub fn sum(&self) -> f64 {
        match self {
            Self::Separable { axes } => axes.iter().map(|w| w.iter().sum::<f64>()).product(),
            Self::Full(k) => k.sum(),
        }
    }

    /// 展开为等效的完整三维核.
    pub fn to_full(&self) -> Kernel3d {
        match self {
            Self::Separable { axes } => Kernel3d::outer(axes),
            Self::Full(k) => k.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_odd_length() {
        assert_eq!(odd_length(0), 1);
        assert_eq!(odd_length(1), 1);
        assert_eq!(odd_length(4), 5);
        assert_eq!(odd_length(7), 7);
        assert_eq!(build_gaussian_1d(3.0, 6).len(), 7);
        assert_eq!(build_box_1d(4).len(), 5);
        if let KernelTable::Separable { axes } = build_box_weights([2, 3, 0]) {
            assert_eq!(axes.map(|w| w.len()), [3, 3, 1]);
        } else {
            panic!("box 核应为可分离核");
        }
    }

    #[test]
    fn test_normalization() {
        for fwhm in [0.5, 1.0, 2.0, 3.7, 10.0] {
            let w = build_gaussian_1d(fwhm, 0);
            assert!(f64_eq(w.iter().sum(), 1.0), "fwhm = {fwhm}");
            assert_eq!(w.len() % 2, 1);
        }
        assert!(f64_eq(build_box_weights([3, 5, 7]).sum(), 1.0));
        assert!(f64_eq(build_gaussian_separable([2.0, 3.0, 4.0], [0; 3]).sum(), 1.0));
        let k = build_gaussian_3d([2.0, 3.0, 4.0], [30.0, 10.0, 45.0], [0; 3]);
        assert!(f64_eq(k.sum(), 1.0));
        assert!(f64_eq(KernelTable::Full(k).sum(), 1.0));
    }

    #[test]
    fn test_gaussian_1d_shape() {
        let fwhm = 1.9 * FWHM_PER_SIGMA;
        let w = build_gaussian_1d(fwhm, 0);
        // sigma = 1.9, 半径 = ceil(7.6) = 8.
        assert_eq!(w.len(), 17);
        for i in 0..8 {
            assert!(f64_eq(w[i], w[16 - i]), "高斯核不对称");
            assert!(w[i] < w[i + 1]);
        }
        assert_eq!(build_gaussian_1d(0.0005, 0), vec![1.0]);
        assert_eq!(build_gaussian_1d(0.0, 9), vec![1.0]);
    }

    #[test]
    fn test_gaussian_3d_without_rotation_is_outer_product() {
        let fwhm = [2.0, 3.0, 1.5];
        let sep = build_gaussian_separable(fwhm, [0; 3]);
        let outer = sep.to_full();
        let full = build_gaussian_3d(fwhm, [0.0; 3], [0; 3]);
        assert_eq!(outer.lengths(), full.lengths());
        for (a, b) in outer.as_slice().iter().zip(full.as_slice()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gaussian_3d_rotation() {
        // 绕 z 轴旋转 90 度, 等价于交换 x / y 的 sigma.
        let lengths = [9, 9, 5];
        let rotated = build_gaussian_3d([4.0, 2.0, 1.0], [0.0, 0.0, 90.0], lengths);
        let swapped = build_gaussian_3d([2.0, 4.0, 1.0], [0.0; 3], lengths);
        assert_eq!(rotated.lengths(), lengths);
        for (a, b) in rotated.as_slice().iter().zip(swapped.as_slice()) {
            assert!((a - b).abs() < 1e-12);
        }

        // 有旋转时, 自动长度按最大 sigma 选取.
        let k = build_gaussian_3d([4.0, 2.0, 1.0], [0.0, 0.0, 30.0], [0; 3]);
        let l = auto_length(fwhm_to_sigma(4.0));
        assert_eq!(k.lengths(), [l, l, l]);
    }

    #[test]
    fn test_gaussian_3d_degenerate_axis() {
        let k = build_gaussian_3d([3.0, 3.0, 0.0], [0.0; 3], [0; 3]);
        assert_eq!(k.lengths()[2], 1);
        // 给定长度时, 退化轴上只有中心层有权重.
        let k = build_gaussian_3d([3.0, 3.0, 0.0], [0.0; 3], [5, 5, 3]);
        assert_eq!(k.weight(2, 2, 0), 0.0);
        assert!(k.weight(2, 2, 1) > 0.0);
        assert!(f64_eq(k.sum(), 1.0));
    }

    #[test]
    fn test_rotation_matrix_identity() {
        let r = rotation_matrix([0.0; 3]);
        for (i, row) in r.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                assert!(f64_eq(*v, if i == j { 1.0 } else { 0.0 }));
            }
        }
    }
}
