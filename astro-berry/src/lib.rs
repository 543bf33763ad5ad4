#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 为射电干涉数据立方体 (3D 体素网格) 提供并行平滑滤波引擎.
//!
//! 该 crate 目前仅提供 `safe` 接口. 体素数据按索引区间划分给各个工作线程,
//! 线程之间唯一共享的可变状态是一个原子整数 [`ExecutionStatus`].
//!
//! # 注意
//!
//! 1. 该 crate 不负责任何文件读写 (FITS 等), 体素网格由调用方 (宿主程序) 提供.
//! 2. 在非期望情况下 (如索引越界), 程序会直接 panic, 而不会导致内存错误.
//!   配置错误则总是以 `Err` 的形式在启动任何工作线程之前返回.
//!
//! # 开发计划
//!
//! ### 体素网格与标量抽象 ✅
//!
//! `f32` / `f64` 两种精度, 由 [`AnyGrid`] 在构造时确定, 算法只编写一次.
//!
//! 实现位于 `astro-berry/src/data`.
//!
//! ### 卷积核构建 ✅
//!
//! 一维 / 三维 (可旋转) 高斯核, box 核. 所有核均归一化, 长度强制为奇数.
//!
//! 实现位于 `astro-berry/src/kernel`.
//!
//! ### 滤波算法 ✅
//!
//! 1. 各向同性 box / gaussian: 三次一维卷积 (X -> Y -> Z). ✅
//! 2. 各向异性 box / gaussian: 完整三维卷积. ✅
//! 3. 梯度扩散 (Perona-Malik 风格的保边平滑). ✅
//! 4. GPU 后端: 仅提供接口 ([`GpuBackend`]), 由宿主实现. ✅
//!
//! 边界处理: 超出当前行/列/层的邻居直接排除, 并按实际参与的权重重新归一化.
//!
//! 实现位于 `astro-berry/src/filter`.
//!
//! ### 并行执行器与协作式取消 ✅
//!
//! 线性索引区间按工作线程数切分, 每个线程处理每个体素前检查一次状态.
//! 持有索引 0 的线程负责粗粒度地汇报进度.
//!
//! 实现位于 `astro-berry/src/parallel`.
//!
//! ### 平滑引擎 ✅
//!
//! 根据配置选择策略, 驱动执行器, 并在成功后更新输出体的值域与噪声属性.
//!
//! 实现位于 `astro-berry/src/engine`.

/// 三维索引 `(x, y, z)`, 即 `(i, j, k)`. 同时也用作网格尺寸 `(nx, ny, nz)`.
pub type Idx3d = (usize, usize, usize);

/// 网格尺寸 `(nx, ny, nz)`.
pub type Dims = Idx3d;

pub mod consts;

mod error;

pub use error::{Outcome, SmoothError, SmoothResult};

/// 体素网格, 体数据及统计量.
pub mod data;

pub use data::{AnyGrid, AstroVolume, HostBuffer, Precision, Scalar, ScalarType, VoxelGrid, Volume};

pub mod config;

pub use config::{DiffusionParams, FilterKind, Hardware, SmoothingConfig};

pub mod kernel;

pub use kernel::{Kernel3d, KernelTable};

pub mod filter;

pub use filter::{GpuBackend, GpuCapabilities, GpuFailure, GpuJob, RenderContext};

pub mod parallel;

pub use parallel::{ExecutionStatus, ParallelExecutor, ProgressSpan};

pub mod engine;

pub use engine::{Algorithm, SmoothingEngine, Strategy};

pub mod prelude;
