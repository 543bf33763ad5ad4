//! 三维体素网格.

use std::ops::{Index, IndexMut};

use ndarray::{Array3, ArrayView3, ArrayViewMut3};

use super::scalar::{HostBuffer, Precision, Scalar, ScalarType};
use crate::{Dims, Idx3d, SmoothError, SmoothResult};

/// 单分量三维标量网格.
///
/// 内部以 `(nz, ny, nx)` 形状的标准布局 `Array3` 保存,
/// 因此体素 `(i, j, k)` 的线性索引恰好是 `i + j * nx + k * nx * ny`.
/// 对外一律使用 `(x, y, z)` 顺序.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid<T: Scalar> {
    data: Array3<T>,
}

/// 检查尺寸, 并返回体素个数.
fn check_dims((nx, ny, nz): Dims, len: usize) -> SmoothResult<usize> {
    let n = nx
        .checked_mul(ny)
        .and_then(|s| s.checked_mul(nz))
        .ok_or(SmoothError::Dimension((nx, ny, nz), len))?;
    if n == 0 || n != len {
        return Err(SmoothError::Dimension((nx, ny, nz), len));
    }
    Ok(n)
}

impl<T: Scalar> VoxelGrid<T> {
    /// 以行优先 (x 最快) 的缓冲区 `data` 构造网格.
    ///
    /// 任一维为 0, 或 `data.len() != nx * ny * nz` 时返回 `Err(SmoothError::Dimension)`.
    pub fn from_vec(dims: Dims, data: Vec<T>) -> SmoothResult<Self> {
        check_dims(dims, data.len())?;
        let (nx, ny, nz) = dims;
        let data = Array3::from_shape_vec((nz, ny, nx), data)
            .map_err(|_| SmoothError::Dimension(dims, nx * ny * nz))?;
        debug_assert!(data.is_standard_layout());
        Ok(Self { data })
    }

    /// 构造所有体素均为 `value` 的网格.
    pub fn filled(dims: Dims, value: T) -> SmoothResult<Self> {
        let (nx, ny, nz) = dims;
        let n = nx.saturating_mul(ny).saturating_mul(nz);
        check_dims(dims, n)?;
        Ok(Self {
            data: Array3::from_elem((nz, ny, nx), value),
        })
    }

    /// 构造全零网格.
    #[inline]
    pub fn zeros(dims: Dims) -> SmoothResult<Self> {
        Self::filled(dims, T::zero())
    }

    /// 以 `f((x, y, z))` 逐体素构造网格.
    pub fn from_fn<F: FnMut(Idx3d) -> T>(dims: Dims, mut f: F) -> SmoothResult<Self> {
        let (nx, ny, nz) = dims;
        let n = nx.saturating_mul(ny).saturating_mul(nz);
        check_dims(dims, n)?;
        Ok(Self {
            data: Array3::from_shape_fn((nz, ny, nx), |(k, j, i)| f((i, j, k))),
        })
    }

    /// 网格尺寸 `(nx, ny, nz)`.
    #[inline]
    pub fn dimensions(&self) -> Dims {
        let (nz, ny, nx) = self.data.dim();
        (nx, ny, nz)
    }

    /// 体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 网格是否为空. 由构造保证, 该值总为 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 两个网格尺寸是否相同.
    #[inline]
    pub fn same_shape<U: Scalar>(&self, other: &VoxelGrid<U>) -> bool {
        self.dimensions() == other.dimensions()
    }

    /// 获取体素 `(i, j, k)` 的值. 越界时 panic.
    #[inline]
    pub fn at(&self, i: usize, j: usize, k: usize) -> T {
        self.data[(k, j, i)]
    }

    /// 获取体素 `(i, j, k)` 的可变引用. 越界时 panic.
    #[inline]
    pub fn at_mut(&mut self, i: usize, j: usize, k: usize) -> &mut T {
        &mut self.data[(k, j, i)]
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, (i, j, k): Idx3d) -> bool {
        let (nx, ny, nz) = self.dimensions();
        i < nx && j < ny && k < nz
    }

    /// 体素 `(i, j, k)` 的线性索引. 不检查越界.
    #[inline]
    pub fn linear_index(&self, (i, j, k): Idx3d) -> usize {
        let (nx, ny, _) = self.dimensions();
        i + j * nx + k * nx * ny
    }

    /// 线性索引对应的 `(i, j, k)`. 不检查越界.
    #[inline]
    pub fn coords(&self, index: usize) -> Idx3d {
        let (nx, ny, _) = self.dimensions();
        (index % nx, (index / nx) % ny, index / (nx * ny))
    }

    /// 按线性索引顺序访问底层缓冲区.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // 构造与 `assign` 都保持标准布局, 可直接 unwrap.
        self.data.as_slice().unwrap()
    }

    /// 按线性索引顺序可变地访问底层缓冲区.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        self.data.as_slice_mut().unwrap()
    }

    /// 获得数据的一份不可变 shallow copy, 形状为 `(nz, ny, nx)`.
    #[inline]
    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy, 形状为 `(nz, ny, nx)`.
    #[inline]
    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, T> {
        self.data.view_mut()
    }

    /// 复制整个缓冲区, 作为独立的临时网格.
    #[inline]
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// 将 `other` 的内容写入自身, 不重新分配内存.
    ///
    /// 两者形状不同时 panic.
    pub fn assign(&mut self, other: &Self) {
        assert!(self.same_shape(other), "网格形状不一致");
        self.as_slice_mut().copy_from_slice(other.as_slice());
    }

    /// 将所有体素设置为 `value`.
    #[inline]
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// 按线性索引顺序迭代所有体素.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> {
        self.as_slice().iter()
    }

    /// 所有体素的平均值.
    pub fn mean(&self) -> f64 {
        self.iter().map(|v| v.as_f64()).sum::<f64>() / self.len() as f64
    }
}

impl<T: Scalar> Index<Idx3d> for VoxelGrid<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j, k): Idx3d) -> &Self::Output {
        &self.data[(k, j, i)]
    }
}

impl<T: Scalar> IndexMut<Idx3d> for VoxelGrid<T> {
    #[inline]
    fn index_mut(&mut self, (i, j, k): Idx3d) -> &mut Self::Output {
        &mut self.data[(k, j, i)]
    }
}

/// 精度在构造时确定的网格.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyGrid {
    /// 单精度网格.
    F32(VoxelGrid<f32>),
    /// 双精度网格.
    F64(VoxelGrid<f64>),
}

/// 对 `AnyGrid` 的两种精度分别展开同一段代码.
macro_rules! with_grid {
    ($any: expr, $g: ident => $body: expr) => {
        match $any {
            $crate::data::AnyGrid::F32($g) => $body,
            $crate::data::AnyGrid::F64($g) => $body,
        }
    };
}

pub(crate) use with_grid;

impl AnyGrid {
    /// 从宿主缓冲区摄入网格.
    ///
    /// # 返回值
    ///
    /// - `components != 1` 时, 返回 `Err(SmoothError::UnsupportedComponentCount)`;
    /// - 缓冲区不是 `f32` / `f64` 时, 返回 `Err(SmoothError::UnsupportedScalarType)`;
    /// - 尺寸非法或长度不符时, 返回 `Err(SmoothError::Dimension)`.
    pub fn from_raw(dims: Dims, components: usize, buffer: HostBuffer) -> SmoothResult<Self> {
        if components != 1 {
            return Err(SmoothError::UnsupportedComponentCount(components));
        }
        match buffer {
            HostBuffer::F32(v) => VoxelGrid::from_vec(dims, v).map(Self::F32),
            HostBuffer::F64(v) => VoxelGrid::from_vec(dims, v).map(Self::F64),
            other => Err(SmoothError::UnsupportedScalarType(other.scalar_type())),
        }
    }

    /// 构造指定精度的全零网格.
    pub fn zeros(dims: Dims, precision: Precision) -> SmoothResult<Self> {
        Ok(match precision {
            Precision::Single => Self::F32(VoxelGrid::zeros(dims)?),
            Precision::Double => Self::F64(VoxelGrid::zeros(dims)?),
        })
    }

    /// 构造与自身尺寸、精度相同的全零网格.
    pub fn zeros_like(&self) -> Self {
        // 自身尺寸必然合法.
        Self::zeros(self.dimensions(), self.precision()).unwrap()
    }

    /// 网格尺寸 `(nx, ny, nz)`.
    #[inline]
    pub fn dimensions(&self) -> Dims {
        with_grid!(self, g => g.dimensions())
    }

    /// 体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        with_grid!(self, g => g.len())
    }

    /// 网格是否为空. 由构造保证, 该值总为 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 精度.
    #[inline]
    pub fn precision(&self) -> Precision {
        match self {
            Self::F32(_) => Precision::Single,
            Self::F64(_) => Precision::Double,
        }
    }

    /// 标量存储类型.
    #[inline]
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::F32(_) => ScalarType::F32,
            Self::F64(_) => ScalarType::F64,
        }
    }

    /// 以 `f64` 读取体素 `(i, j, k)`. 越界时 panic.
    #[inline]
    pub fn at_f64(&self, i: usize, j: usize, k: usize) -> f64 {
        with_grid!(self, g => g.at(i, j, k).as_f64())
    }

    /// 将 `other` 的内容写入自身, 不重新分配内存.
    ///
    /// 精度不同时返回 `Err(SmoothError::PrecisionMismatch)`; 形状不同时返回
    /// `Err(SmoothError::DimensionMismatch)`.
    pub fn assign(&mut self, other: &AnyGrid) -> SmoothResult<()> {
        if self.dimensions() != other.dimensions() {
            return Err(SmoothError::DimensionMismatch {
                input: other.dimensions(),
                output: self.dimensions(),
            });
        }
        match (self, other) {
            (Self::F32(dst), Self::F32(src)) => dst.assign(src),
            (Self::F64(dst), Self::F64(src)) => dst.assign(src),
            (dst, src) => {
                return Err(SmoothError::PrecisionMismatch {
                    expected: dst.precision(),
                    found: src.precision(),
                })
            }
        }
        Ok(())
    }

    /// 对每个体素减去 `offset`.
    pub fn subtract(&mut self, offset: f64) {
        with_grid!(self, g => {
            g.view_mut().mapv_inplace(|v| Scalar::from_f64_c(v.as_f64() - offset))
        })
    }

    /// 单精度网格的引用.
    #[inline]
    pub fn as_f32(&self) -> Option<&VoxelGrid<f32>> {
        match self {
            Self::F32(g) => Some(g),
            Self::F64(_) => None,
        }
    }

    /// 双精度网格的引用.
    #[inline]
    pub fn as_f64(&self) -> Option<&VoxelGrid<f64>> {
        match self {
            Self::F64(g) => Some(g),
            Self::F32(_) => None,
        }
    }
}

impl From<VoxelGrid<f32>> for AnyGrid {
    #[inline]
    fn from(value: VoxelGrid<f32>) -> Self {
        Self::F32(value)
    }
}

impl From<VoxelGrid<f64>> for AnyGrid {
    #[inline]
    fn from(value: VoxelGrid<f64>) -> Self {
        Self::F64(value)
    }
}
