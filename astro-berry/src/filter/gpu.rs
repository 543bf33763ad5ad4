//! GPU 后端接口. 具体实现由宿主程序提供.

use std::any::Any;
use std::fmt;

use crate::config::DiffusionParams;
use crate::data::AnyGrid;
use crate::kernel::KernelTable;

/// 宿主的渲染上下文 (如 OpenGL 窗口), 对引擎不透明.
///
/// 引擎原样转交给 [`GpuBackend`], CPU 路径忽略它.
#[derive(Copy, Clone, Default)]
pub struct RenderContext<'a>(Option<&'a dyn Any>);

impl<'a> RenderContext<'a> {
    /// 没有渲染上下文.
    #[inline]
    pub const fn none() -> Self {
        Self(None)
    }

    /// 包装宿主的渲染上下文.
    #[inline]
    pub fn new(ctx: &'a dyn Any) -> Self {
        Self(Some(ctx))
    }

    /// 是否携带上下文.
    #[inline]
    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    /// 尝试还原为宿主的具体类型.
    #[inline]
    pub fn downcast_ref<C: Any>(&self) -> Option<&'a C> {
        self.0.and_then(|c| c.downcast_ref::<C>())
    }
}

impl fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("RenderContext(..)"),
            None => f.write_str("RenderContext(None)"),
        }
    }
}

/// 后端在给定上下文中的能力.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct GpuCapabilities {
    /// 能否运行多次扫描 (可分离卷积) 或迭代 (梯度扩散) 的滤波.
    ///
    /// 为 `false` 时, 卷积只会收到完整三维核.
    pub multi_pass: bool,
}

/// 交给 GPU 后端的一次任务.
#[derive(Copy, Clone, Debug)]
pub enum GpuJob<'a> {
    /// 卷积. 核可能是可分离的, 也可能是完整三维核.
    Convolution {
        /// 卷积核.
        kernel: &'a KernelTable,
    },

    /// 梯度扩散.
    Diffusion {
        /// 三个轴的传导系数.
        conductance: [f64; 3],
        /// 迭代参数.
        params: &'a DiffusionParams,
    },
}

/// GPU 后端执行失败.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GpuFailure(pub String);

impl fmt::Display for GpuFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for GpuFailure {}

/// GPU 后端. 数学语义与 CPU 路径相同.
pub trait GpuBackend: Send + Sync {
    /// 后端名称, 用于日志.
    fn name(&self) -> &str;

    /// 在 `ctx` 中的能力. 不可用时返回 `None`.
    fn capabilities(&self, ctx: &RenderContext<'_>) -> Option<GpuCapabilities>;

    /// 读取 `input`, 将结果写入 `output`. 两者尺寸与精度相同.
    fn smooth(
        &self,
        job: &GpuJob<'_>,
        input: &AnyGrid,
        output: &mut AnyGrid,
        ctx: &RenderContext<'_>,
    ) -> Result<(), GpuFailure>;
}
