//! 体素标量类型.

use num::traits::NumAssign;
use num::{Float, FromPrimitive};
use std::fmt::Debug;
use std::iter::Sum;

/// 宿主程序可能提供的标量存储类型.
///
/// 只有 `F32` 和 `F64` 能被滤波, 其余类型在摄入时即被拒绝.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarType {
    /// 8 位无符号整数.
    U8,
    /// 16 位有符号整数.
    I16,
    /// 32 位有符号整数.
    I32,
    /// 单精度浮点.
    F32,
    /// 双精度浮点.
    F64,
}

impl ScalarType {
    /// 单个标量占用的字节数.
    #[inline]
    pub const fn width(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// 对应的浮点精度. 非浮点类型返回 `None`.
    #[inline]
    pub const fn precision(&self) -> Option<Precision> {
        match self {
            Self::F32 => Some(Precision::Single),
            Self::F64 => Some(Precision::Double),
            _ => None,
        }
    }
}

/// 浮点精度. 在配置时选定, 同一网格内不会混用.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Precision {
    /// `f32`.
    #[default]
    Single,
    /// `f64`.
    Double,
}

/// 可被滤波的体素标量, 即 `f32` 与 `f64`.
///
/// 所有滤波算法都只针对该 trait 编写一次. 累加统一在 `f64` 上进行.
pub trait Scalar:
    Float + FromPrimitive + NumAssign + Sum + Debug + Default + Send + Sync + 'static
{
    /// 该类型对应的存储类型标签.
    const SCALAR_TYPE: ScalarType;

    /// 该类型对应的精度.
    const PRECISION: Precision;

    /// 从 `f64` 转换 (可能损失精度).
    fn from_f64_c(val: f64) -> Self;

    /// 转换为 `f64`.
    fn as_f64(self) -> f64;
}

macro_rules! impl_scalar {
    ($fp: ty, $tag: expr, $precision: expr) => {
        impl Scalar for $fp {
            const SCALAR_TYPE: ScalarType = $tag;
            const PRECISION: Precision = $precision;

            #[inline]
            fn from_f64_c(val: f64) -> Self {
                val as $fp
            }

            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_scalar!(f32, ScalarType::F32, Precision::Single);
impl_scalar!(f64, ScalarType::F64, Precision::Double);

/// 宿主程序交给引擎的裸缓冲区. 标量类型由变体决定.
#[derive(Clone, Debug, PartialEq)]
pub enum HostBuffer {
    /// `u8` 缓冲区.
    U8(Vec<u8>),
    /// `i16` 缓冲区.
    I16(Vec<i16>),
    /// `i32` 缓冲区.
    I32(Vec<i32>),
    /// `f32` 缓冲区.
    F32(Vec<f32>),
    /// `f64` 缓冲区.
    F64(Vec<f64>),
}

impl HostBuffer {
    /// 缓冲区的标量类型.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::U8(_) => ScalarType::U8,
            Self::I16(_) => ScalarType::I16,
            Self::I32(_) => ScalarType::I32,
            Self::F32(_) => ScalarType::F32,
            Self::F64(_) => ScalarType::F64,
        }
    }

    /// 缓冲区中的标量个数 (不是体素个数).
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    /// 缓冲区是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions() {
        let v: f32 = Scalar::from_f64_c(std::f64::consts::PI);
        assert!((v - std::f32::consts::PI).abs() < 1e-6);
        assert_eq!(2.5f64.as_f64(), 2.5);
        assert_eq!(f32::PRECISION, Precision::Single);
        assert_eq!(f64::SCALAR_TYPE, ScalarType::F64);
    }

    #[test]
    fn test_scalar_type_precision() {
        assert_eq!(ScalarType::F32.precision(), Some(Precision::Single));
        assert_eq!(ScalarType::F64.precision(), Some(Precision::Double));
        assert_eq!(ScalarType::I16.precision(), None);
        assert_eq!(ScalarType::F64.width(), 8);
        assert_eq!(HostBuffer::I16(vec![1, 2, 3]).scalar_type(), ScalarType::I16);
    }
}
