//! 运行时错误.

use std::fmt;

use crate::data::{Precision, ScalarType};
use crate::Dims;

/// 平滑滤波的错误.
///
/// 除 `BackendUnavailable` 以外, 所有错误都在启动工作线程之前被检测到,
/// 此时输出网格不会被写入任何体素.
#[derive(Clone, Debug, PartialEq)]
pub enum SmoothError {
    /// 网格尺寸非法: 某一维为 0, 或缓冲区长度与尺寸不一致.
    ///
    /// 第一个参数是请求的尺寸, 第二个参数是实际缓冲区长度.
    Dimension(Dims, usize),

    /// 输入网格与输出网格尺寸不一致.
    DimensionMismatch {
        /// 输入网格尺寸.
        input: Dims,
        /// 输出网格尺寸.
        output: Dims,
    },

    /// 每个体素的标量分量数不为 1.
    UnsupportedComponentCount(usize),

    /// 不支持的标量存储类型. 目前只支持 `f32` 和 `f64`.
    UnsupportedScalarType(ScalarType),

    /// 网格精度与配置 (或另一网格) 的精度不一致.
    PrecisionMismatch {
        /// 期望的精度.
        expected: Precision,
        /// 实际的精度.
        found: Precision,
    },

    /// 数值参数非法. 参数为出错的参数名.
    InvalidParameter(&'static str),

    /// GPU 后端不可用或执行失败. 调用方应自行回退到 CPU 路径.
    BackendUnavailable(String),
}

impl fmt::Display for SmoothError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dimension(dims, len) => {
                write!(f, "invalid grid dimensions {dims:?} for a buffer of {len} samples")
            }
            Self::DimensionMismatch { input, output } => {
                write!(f, "input grid {input:?} and output grid {output:?} differ")
            }
            Self::UnsupportedComponentCount(n) => {
                write!(f, "imageData with {n} scalar components, expected exactly 1")
            }
            Self::UnsupportedScalarType(t) => write!(f, "scalar type {t:?} is not supported"),
            Self::PrecisionMismatch { expected, found } => {
                write!(f, "expected {expected:?} precision, found {found:?}")
            }
            Self::InvalidParameter(name) => write!(f, "invalid parameter `{name}`"),
            Self::BackendUnavailable(why) => write!(f, "GPU backend unavailable: {why}"),
        }
    }
}

impl std::error::Error for SmoothError {}

/// 平滑滤波运行时结果.
pub type SmoothResult<T> = Result<T, SmoothError>;

/// 一次滤波的结局. 取消不是错误, 而是一种可识别的提前退出.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// 所有体素均已处理.
    Completed,

    /// 观察到了取消请求. 部分结果已被丢弃.
    Cancelled,
}

impl Outcome {
    /// 是否正常完成.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// 是否被取消.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        !self.is_completed()
    }
}
