//! 策略运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 累计时间 (毫秒).
    #[inline]
    pub fn get_total_ms(&self) -> f64 {
        self.consumed.as_secs_f64() * 1e3
    }
}

/// 单个策略的运行统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 正常完成的次数.
    completed: u64,

    /// 被取消的次数.
    cancelled: u64,

    /// 返回错误的次数.
    failed: u64,

    /// 引擎调用花费的总时间.
    run_time: AccTimer,

    /// 整个任务花费的总时间 (包括生成配置, 分配输出等).
    real_time: AccTimer,

    /// 最耗时的一次调用.
    most: Option<Duration>,

    /// 最近一次完成时输出体的噪声均方根.
    output_rms: Option<f64>,

    /// 可分离路径与完整三维路径之间的最大绝对误差.
    max_deviation: Option<f64>,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            completed: 0,
            cancelled: 0,
            failed: 0,
            run_time: AccTimer::new(),
            real_time: AccTimer::new(),
            most: None,
            output_rms: None,
            max_deviation: None,
        }
    }

    /// 开始一次调用计时.
    #[inline]
    pub fn run_start(&mut self) {
        self.run_time.start();
    }

    /// 结束一次调用计时.
    #[inline]
    pub fn run_elapsed(&mut self) {
        let d = self.run_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 记录一次正常完成.
    #[inline]
    pub fn count_completed(&mut self, output_rms: f64) {
        self.completed += 1;
        self.output_rms = Some(output_rms);
    }

    /// 记录一次取消.
    #[inline]
    pub fn count_cancelled(&mut self) {
        self.cancelled += 1;
    }

    /// 记录一次错误.
    #[inline]
    pub fn count_failed(&mut self) {
        self.failed += 1;
    }

    /// 记录一次误差, 保留最大值.
    #[inline]
    pub fn record_deviation(&mut self, dev: f64) {
        self.max_deviation = Some(self.max_deviation.map_or(dev, |m| m.max(dev)));
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 正常完成的次数.
    #[inline]
    pub fn get_completed(&self) -> u64 {
        self.completed
    }

    /// 被取消的次数.
    #[inline]
    pub fn get_cancelled(&self) -> u64 {
        self.cancelled
    }

    /// 返回错误的次数.
    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    /// 引擎调用的总时间 (毫秒).
    #[inline]
    pub fn get_run_time_ms(&self) -> f64 {
        self.run_time.get_total_ms()
    }

    /// 整个任务的总时间 (毫秒).
    #[inline]
    pub fn get_real_time_ms(&self) -> f64 {
        self.real_time.get_total_ms()
    }

    /// 平均每次调用的时间 (毫秒). 没有任何调用时返回 `None`.
    pub fn get_avg_run_time_ms(&self) -> Option<f64> {
        match self.completed + self.cancelled + self.failed {
            0 => None,
            n => Some(self.get_run_time_ms() / n as f64),
        }
    }

    /// 最耗时的一次调用.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }

    /// 最近一次完成时输出体的噪声均方根.
    #[inline]
    pub fn get_output_rms(&self) -> Option<f64> {
        self.output_rms
    }

    /// 最大误差.
    #[inline]
    pub fn get_max_deviation(&self) -> Option<f64> {
        self.max_deviation
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
