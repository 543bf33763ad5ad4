//! 通用常量.

/// 体数据属性键. 属性值以字符串形式保存在体数据上.
pub mod attr {
    /// 噪声均方根.
    pub const RMS: &str = "RMS";

    /// 噪声均值. 梯度扩散滤波结束后会以此作为直流偏置扣除.
    pub const RMS_MEAN: &str = "RMSMEAN";

    /// 数据最小值.
    pub const DATA_MIN: &str = "DATAMIN";

    /// 数据最大值.
    pub const DATA_MAX: &str = "DATAMAX";
}

/// 执行状态取值.
pub mod status {
    /// 空闲或已结束.
    pub const IDLE: i32 = 0;

    /// 已开始运行, 尚无进度.
    pub const RUNNING: i32 = 1;

    /// 运行中能汇报的最大百分比. 100 不会出现, 完成时状态直接归零.
    pub const MAX_PERCENT: i32 = 99;

    /// 外部请求取消.
    pub const CANCELLED: i32 = -1;
}

/// 三个轴参数之差均小于该值时, 视为各向同性, 走可分离 (三次一维) 路径.
pub const ISOTROPIC_TOLERANCE: f64 = 0.001;

/// 轴参数不大于该值时, 该轴不做滤波 (恒等).
pub const AXIS_OFF_THRESHOLD: f64 = 0.001;

/// 高斯核自动长度的截断倍数: 半径为 `ceil(GAUSSIAN_TRUNCATE * sigma)`.
pub const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// `FWHM = FWHM_PER_SIGMA * sigma`, 即 `2 * sqrt(2 * ln 2)`.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3;

/// 估计噪声时, 沿 z 方向在两端各取的切片数.
pub const NOISE_EDGE_SLICES: usize = 2;

/// 当工作线程数提示为 0 时, 优先读取的环境变量.
pub const WORKERS_ENV: &str = "ASTRO_BERRY_WORKERS";
