//! 平滑引擎: 策略选择与调度.

use std::time::Instant;

use log::{debug, warn};

use crate::config::{FilterKind, Hardware, SmoothingConfig};
use crate::data::{with_grid, AnyGrid, Scalar, Volume, VoxelGrid};
use crate::filter::{
    subtract_noise_mean, Filter, FullConvolution, GpuBackend, GpuCapabilities, GpuJob,
    GradientDiffusion, RenderContext, SeparableConvolution,
};
use crate::kernel::{build_box_weights, build_gaussian_3d, build_gaussian_separable, KernelTable};
use crate::parallel::{ExecutionStatus, ParallelExecutor};
use crate::{Outcome, SmoothError, SmoothResult};

/// GPU 任务启动前汇报的进度.
const GPU_LAUNCH_PERCENT: i32 = 20;

/// 平滑算法.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Algorithm {
    /// 各向同性 box: 三次一维卷积.
    IsotropicBox,
    /// 各向异性 box: 完整三维卷积.
    AnisotropicBox,
    /// 各向同性高斯: 三次一维卷积.
    IsotropicGaussian,
    /// 各向异性 (或旋转的) 高斯: 完整三维卷积.
    AnisotropicGaussian,
    /// 梯度扩散.
    GradientDiffusion,
}

impl Algorithm {
    /// 算法名称.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsotropicBox => "isotropic box",
            Self::AnisotropicBox => "anisotropic box",
            Self::IsotropicGaussian => "isotropic gaussian",
            Self::AnisotropicGaussian => "anisotropic gaussian",
            Self::GradientDiffusion => "gradient diffusion",
        }
    }

    /// 构建该算法使用的卷积核. 梯度扩散不需要卷积核, 返回 `None`.
    pub fn build_kernel(&self, config: &SmoothingConfig) -> Option<KernelTable> {
        Some(match self {
            Self::IsotropicBox => build_box_weights(config.box_lengths()),
            Self::AnisotropicBox => KernelTable::Full(build_box_weights(config.box_lengths()).to_full()),
            Self::IsotropicGaussian => {
                build_gaussian_separable(config.parameters, config.kernel_lengths)
            }
            Self::AnisotropicGaussian => KernelTable::Full(build_gaussian_3d(
                config.parameters,
                config.rotation,
                config.kernel_lengths,
            )),
            Self::GradientDiffusion => return None,
        })
    }
}

/// 一次调用的执行策略: 算法与后端.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Strategy {
    /// 算法.
    pub algorithm: Algorithm,
    /// 后端.
    pub hardware: Hardware,
}

impl Strategy {
    /// 根据配置选择策略. 这是配置的纯函数.
    pub fn select(config: &SmoothingConfig) -> Self {
        let isotropic = config.is_isotropic();
        let algorithm = match config.kind {
            FilterKind::Box if isotropic => Algorithm::IsotropicBox,
            FilterKind::Box => Algorithm::AnisotropicBox,
            FilterKind::Gaussian if isotropic => Algorithm::IsotropicGaussian,
            FilterKind::Gaussian => Algorithm::AnisotropicGaussian,
            FilterKind::GradientDiffusion => Algorithm::GradientDiffusion,
        };
        Self {
            algorithm,
            hardware: config.hardware,
        }
    }
}

/// 平滑引擎.
///
/// 除了可选的 GPU 后端之外不保存任何状态, 因此可以在多个线程中同时调用,
/// 只要每次调用使用各自的 [`ExecutionStatus`] 与输出体数据.
#[derive(Default)]
pub struct SmoothingEngine {
    gpu: Option<Box<dyn GpuBackend>>,
}

impl std::fmt::Debug for SmoothingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmoothingEngine")
            .field("gpu", &self.gpu.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl SmoothingEngine {
    /// 只有 CPU 后端的引擎.
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 GPU 后端.
    pub fn with_gpu_backend(mut self, backend: impl GpuBackend + 'static) -> Self {
        self.gpu = Some(Box::new(backend));
        self
    }

    /// 对 `input` 做平滑, 结果写入 `output`.
    ///
    /// # 状态
    ///
    /// 开始时 `status` 被置为 1, 运行中为 `1..=99` 的百分比.
    ///
    /// - 正常完成: 输出网格被写入, 输出体的值域与噪声属性各更新一次, `status` 归零;
    /// - 被取消: 返回 `Ok(Outcome::Cancelled)`, 输出体保持原样, `status` 保持 `-1`.
    ///
    /// # 错误
    ///
    /// 配置错误, 尺寸或精度不一致都在启动工作线程之前以 `Err` 返回, 输出体保持原样.
    /// GPU 后端缺失或不可用时返回 `Err(SmoothError::BackendUnavailable)`, 引擎不会自行回退到 CPU.
    pub fn apply<V: Volume>(
        &self,
        config: &SmoothingConfig,
        input: &V,
        output: &mut V,
        status: &ExecutionStatus,
        ctx: RenderContext<'_>,
    ) -> SmoothResult<Outcome> {
        config.validate()?;
        check_grids(config, input.grid(), output.grid())?;

        let strategy = Strategy::select(config);
        let caps = match strategy.hardware {
            Hardware::Cpu => None,
            Hardware::Gpu => Some(self.negotiate_gpu(strategy, &ctx)?),
        };

        let timer = Instant::now();
        let kernel = strategy.algorithm.build_kernel(config);
        debug!(
            "{} on {:?}: kernel built in {:?}",
            strategy.algorithm.name(),
            strategy.hardware,
            timer.elapsed()
        );

        if !status.start() {
            return Ok(Outcome::Cancelled);
        }
        let timer = Instant::now();
        let result = match (strategy.hardware, caps) {
            (Hardware::Gpu, Some((backend, caps))) => {
                run_gpu(backend, caps, config, kernel, input.grid(), output.grid_mut(), status, &ctx)
            }
            _ => {
                let executor = ParallelExecutor::new(config.workers);
                debug!("running on {} workers", executor.workers());
                run_cpu(config, kernel.as_ref(), input.grid(), output.grid_mut(), status, &executor)
            }
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if !status.is_cancelled() {
                    status.reset();
                }
                return Err(e);
            }
        };
        debug!(
            "{} finished as {outcome:?} in {:?}",
            strategy.algorithm.name(),
            timer.elapsed()
        );

        if outcome.is_completed() {
            let timer = Instant::now();
            output.update_range_attributes();
            output.update_noise_attributes();
            debug!("statistics updated in {:?}", timer.elapsed());
            status.reset();
        }
        Ok(outcome)
    }

    /// 确认 GPU 后端可用, 返回后端及其能力.
    fn negotiate_gpu(
        &self,
        strategy: Strategy,
        ctx: &RenderContext<'_>,
    ) -> SmoothResult<(&dyn GpuBackend, GpuCapabilities)> {
        let Some(backend) = self.gpu.as_deref() else {
            warn!("no GPU backend registered, {} not run", strategy.algorithm.name());
            return Err(SmoothError::BackendUnavailable("no GPU backend registered".into()));
        };
        let Some(caps) = backend.capabilities(ctx) else {
            warn!("GPU backend `{}` is unavailable for this render context", backend.name());
            return Err(SmoothError::BackendUnavailable(format!(
                "`{}` unavailable for this render context",
                backend.name()
            )));
        };
        if !caps.multi_pass && strategy.algorithm == Algorithm::GradientDiffusion {
            warn!("GPU backend `{}` cannot run iterative filters", backend.name());
            return Err(SmoothError::BackendUnavailable(format!(
                "`{}` cannot run iterative filters",
                backend.name()
            )));
        }
        Ok((backend, caps))
    }
}

/// 检查输入 / 输出网格的尺寸与精度.
fn check_grids(config: &SmoothingConfig, input: &AnyGrid, output: &AnyGrid) -> SmoothResult<()> {
    if input.dimensions() != output.dimensions() {
        return Err(SmoothError::DimensionMismatch {
            input: input.dimensions(),
            output: output.dimensions(),
        });
    }
    for grid in [input, output] {
        if grid.precision() != config.precision {
            return Err(SmoothError::PrecisionMismatch {
                expected: config.precision,
                found: grid.precision(),
            });
        }
    }
    Ok(())
}

fn run_cpu(
    config: &SmoothingConfig,
    kernel: Option<&KernelTable>,
    input: &AnyGrid,
    output: &mut AnyGrid,
    status: &ExecutionStatus,
    executor: &ParallelExecutor,
) -> SmoothResult<Outcome> {
    match (input, output) {
        (AnyGrid::F32(i), AnyGrid::F32(o)) => run_typed(config, kernel, i, o, status, executor),
        (AnyGrid::F64(i), AnyGrid::F64(o)) => run_typed(config, kernel, i, o, status, executor),
        (i, o) => Err(SmoothError::PrecisionMismatch {
            expected: i.precision(),
            found: o.precision(),
        }),
    }
}

fn run_typed<T: Scalar>(
    config: &SmoothingConfig,
    kernel: Option<&KernelTable>,
    input: &VoxelGrid<T>,
    output: &mut VoxelGrid<T>,
    status: &ExecutionStatus,
    executor: &ParallelExecutor,
) -> SmoothResult<Outcome> {
    match kernel {
        Some(KernelTable::Separable { axes }) => {
            SeparableConvolution::new(axes).apply(input, output, status, executor)
        }
        Some(KernelTable::Full(k)) => FullConvolution::new(k).apply(input, output, status, executor),
        None => GradientDiffusion::new(config.parameters, config.diffusion)
            .apply(input, output, status, executor),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_gpu(
    backend: &dyn GpuBackend,
    caps: GpuCapabilities,
    config: &SmoothingConfig,
    kernel: Option<KernelTable>,
    input: &AnyGrid,
    output: &mut AnyGrid,
    status: &ExecutionStatus,
    ctx: &RenderContext<'_>,
) -> SmoothResult<Outcome> {
    let kernel = match kernel {
        Some(table @ KernelTable::Separable { .. }) if !caps.multi_pass => {
            warn!(
                "GPU backend `{}` cannot run multi-pass filters, using the full 3-D kernel",
                backend.name()
            );
            Some(KernelTable::Full(table.to_full()))
        }
        other => other,
    };
    let job = match &kernel {
        Some(kernel) => GpuJob::Convolution { kernel },
        None => GpuJob::Diffusion {
            conductance: config.parameters,
            params: &config.diffusion,
        },
    };

    status.advance_to(GPU_LAUNCH_PERCENT);
    if status.is_cancelled() {
        return Ok(Outcome::Cancelled);
    }

    let mut scratch = input.zeros_like();
    backend
        .smooth(&job, input, &mut scratch, ctx)
        .map_err(|e| {
            warn!("GPU backend `{}` failed: {e}", backend.name());
            SmoothError::BackendUnavailable(e.0)
        })?;
    if status.is_cancelled() {
        return Ok(Outcome::Cancelled);
    }
    if let GpuJob::Diffusion { .. } = job {
        with_grid!(&mut scratch, g => subtract_noise_mean(g));
    }
    output.assign(&scratch)?;
    Ok(Outcome::Completed)
}
