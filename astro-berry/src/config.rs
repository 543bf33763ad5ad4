//! 平滑配置.

use log::warn;

use crate::consts::{attr, AXIS_OFF_THRESHOLD, ISOTROPIC_TOLERANCE};
use crate::data::{Precision, Volume};
use crate::{SmoothError, SmoothResult};

/// 滤波类型.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterKind {
    /// box 滤波. 轴参数为核长度 (体素).
    Box,
    /// 高斯滤波. 轴参数为半高全宽 (体素).
    #[default]
    Gaussian,
    /// 梯度扩散. 轴参数为传导系数.
    GradientDiffusion,
}

/// 执行后端.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Hardware {
    /// 多线程 CPU.
    #[default]
    Cpu,
    /// 外部 GPU 后端.
    Gpu,
}

/// 梯度扩散的迭代参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffusionParams {
    /// 传导常数 `K`. 梯度相对 `K * RMS` 越大, 平滑越弱.
    pub k: f64,
    /// 迭代次数.
    pub accuracy: usize,
    /// 时间步长.
    pub time_step: f64,
    /// 输入数据的噪声均方根, 通常读自体数据的 `RMS` 属性.
    pub noise_rms: f64,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            k: 2.0,
            accuracy: 20,
            time_step: 0.0325,
            noise_rms: 0.0,
        }
    }
}

impl DiffusionParams {
    /// `K * RMS`.
    #[inline]
    pub fn noise_scale(&self) -> f64 {
        self.k * self.noise_rms
    }

    /// 检查参数. `K * RMS` 必须为正, 迭代次数必须非零, 时间步长必须为正.
    pub fn validate(&self) -> SmoothResult<()> {
        if !self.k.is_finite() || !self.noise_rms.is_finite() || self.noise_scale() <= 0.0 {
            return Err(SmoothError::InvalidParameter("K * RMS"));
        }
        if self.accuracy == 0 {
            return Err(SmoothError::InvalidParameter("accuracy"));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(SmoothError::InvalidParameter("time_step"));
        }
        Ok(())
    }
}

/// 一次调用的完整配置. 构造后不再改变.
///
/// # 示例
///
/// ```
/// use astro_berry::{Hardware, Precision, SmoothingConfig};
///
/// let cfg = SmoothingConfig::gaussian([3.0, 3.0, 1.5])
///     .with_rotation([0.0, 0.0, 30.0])
///     .with_precision(Precision::Double)
///     .with_workers(4);
/// assert!(cfg.validate().is_ok());
/// assert!(!cfg.is_isotropic());
/// assert_eq!(cfg.hardware, Hardware::Cpu);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmoothingConfig {
    /// 滤波类型.
    pub kind: FilterKind,
    /// 三个轴的参数 `[x, y, z]`. 含义由 `kind` 决定. 不大于 0.001 的轴不做滤波.
    pub parameters: [f64; 3],
    /// 高斯核各轴长度提示. `0` 表示自动选择.
    pub kernel_lengths: [usize; 3],
    /// 高斯核旋转角 `[x, y, z]` (度).
    pub rotation: [f64; 3],
    /// 数值精度, 必须与网格精度一致.
    pub precision: Precision,
    /// 工作线程数提示. `0` 表示使用全部硬件线程.
    pub workers: usize,
    /// 执行后端.
    pub hardware: Hardware,
    /// 梯度扩散参数. 其它滤波类型忽略它.
    pub diffusion: DiffusionParams,
}

impl SmoothingConfig {
    fn with_kind(kind: FilterKind, parameters: [f64; 3]) -> Self {
        Self {
            kind,
            parameters,
            kernel_lengths: [0; 3],
            rotation: [0.0; 3],
            precision: Precision::default(),
            workers: 0,
            hardware: Hardware::default(),
            diffusion: DiffusionParams::default(),
        }
    }

    /// box 滤波, 参数为各轴核长度.
    pub fn box_filter(lengths: [f64; 3]) -> Self {
        Self::with_kind(FilterKind::Box, lengths)
    }

    /// 高斯滤波, 参数为各轴半高全宽.
    pub fn gaussian(fwhm: [f64; 3]) -> Self {
        Self::with_kind(FilterKind::Gaussian, fwhm)
    }

    /// 梯度扩散, 参数为各轴传导系数.
    pub fn gradient(conductance: [f64; 3]) -> Self {
        Self::with_kind(FilterKind::GradientDiffusion, conductance)
    }

    /// 设置高斯核各轴长度提示.
    pub fn with_kernel_lengths(mut self, lengths: [usize; 3]) -> Self {
        self.kernel_lengths = lengths;
        self
    }

    /// 设置高斯核旋转角 (度).
    pub fn with_rotation(mut self, rotation: [f64; 3]) -> Self {
        self.rotation = rotation;
        self
    }

    /// 设置数值精度.
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// 设置工作线程数提示.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// 设置执行后端.
    pub fn with_hardware(mut self, hardware: Hardware) -> Self {
        self.hardware = hardware;
        self
    }

    /// 设置梯度扩散参数.
    pub fn with_diffusion(mut self, diffusion: DiffusionParams) -> Self {
        self.diffusion = diffusion;
        self
    }

    /// 设置噪声均方根.
    pub fn with_noise_rms(mut self, rms: f64) -> Self {
        self.diffusion.noise_rms = rms;
        self
    }

    /// 从体数据的 `RMS` 属性读取噪声均方根 (缺失时为 0).
    pub fn with_noise_rms_from(self, volume: &impl Volume) -> Self {
        let rms = volume.attribute_f64(attr::RMS);
        self.with_noise_rms(rms)
    }

    /// 三个轴参数两两之差是否都小于 0.001.
    ///
    /// 三轴宽度相同的高斯核旋转后不变, 因此不考虑旋转角.
    pub fn is_isotropic(&self) -> bool {
        let [px, py, pz] = self.parameters;
        (px - py).abs() < ISOTROPIC_TOLERANCE && (py - pz).abs() < ISOTROPIC_TOLERANCE
    }

    /// 需要滤波的轴.
    #[inline]
    pub fn active_axes(&self) -> [bool; 3] {
        self.parameters.map(|p| p > AXIS_OFF_THRESHOLD)
    }

    /// box 滤波各轴核长度. 不做滤波的轴为 1.
    pub fn box_lengths(&self) -> [usize; 3] {
        let active = self.active_axes();
        [0, 1, 2].map(|a| match active[a] {
            true => (self.parameters[a] as usize).max(1),
            false => 1,
        })
    }

    /// 检查配置. 所有错误都在启动工作线程之前返回.
    pub fn validate(&self) -> SmoothResult<()> {
        if self.parameters.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(SmoothError::InvalidParameter("parameters"));
        }
        if self.rotation.iter().any(|a| !a.is_finite()) {
            return Err(SmoothError::InvalidParameter("rotation"));
        }
        if self.kind == FilterKind::GradientDiffusion {
            self.diffusion.validate()?;
            let total: f64 = self.parameters.iter().sum();
            if self.diffusion.time_step * 2.0 * total > 1.0 {
                warn!(
                    "gradient diffusion with time step {} and conductance {:?} may be unstable",
                    self.diffusion.time_step, self.parameters
                );
            }
        }
        Ok(())
    }
}
