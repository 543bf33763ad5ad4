//! 共享执行状态.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::consts::status::{CANCELLED, IDLE, MAX_PERCENT, RUNNING};

/// 一次调用的执行状态, 是工作线程之间唯一共享的可变数据.
///
/// - `0`: 空闲或已结束;
/// - `1..=99`: 完成百分比;
/// - `-1`: 已请求取消.
///
/// 任何持有引用的线程都可以读取进度或调用 [`cancel`](Self::cancel).
/// 进度更新永远不会覆盖 `-1`.
#[derive(Debug, Default)]
pub struct ExecutionStatus(AtomicI32);

impl ExecutionStatus {
    /// 构造空闲状态.
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicI32::new(IDLE))
    }

    /// 当前状态值.
    #[inline]
    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Acquire)
    }

    /// 直接写入状态值.
    #[inline]
    pub fn set(&self, value: i32) {
        self.0.store(value, Ordering::Release);
    }

    /// 请求取消.
    #[inline]
    pub fn cancel(&self) {
        self.set(CANCELLED);
    }

    /// 是否已请求取消.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.get() == CANCELLED
    }

    /// 回到空闲状态 (同时清除取消请求).
    #[inline]
    pub fn reset(&self) {
        self.set(IDLE);
    }

    /// 进入运行状态. 若已请求取消则保持 `-1` 并返回 `false`.
    pub fn start(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s != CANCELLED).then_some(RUNNING)
            })
            .is_ok()
    }

    /// 将进度更新为 `percent` (限制在 `1..=99`). 已请求取消时不做任何事.
    pub fn advance_to(&self, percent: i32) {
        let percent = percent.clamp(RUNNING, MAX_PERCENT);
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s != CANCELLED).then_some(percent)
            });
    }

    /// 完成百分比. 已请求取消时返回 `None`.
    #[inline]
    pub fn percent(&self) -> Option<i32> {
        match self.get() {
            CANCELLED => None,
            p => Some(p),
        }
    }
}

/// 一次并行扫描在总进度中所占的区间 `[from, to]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProgressSpan {
    /// 扫描开始时的进度.
    pub from: i32,
    /// 扫描结束时的进度.
    pub to: i32,
}

impl ProgressSpan {
    /// 整个调用只有一次扫描时使用的区间.
    pub const FULL: Self = Self {
        from: RUNNING,
        to: MAX_PERCENT,
    };

    /// 构造进度区间.
    #[inline]
    pub const fn new(from: i32, to: i32) -> Self {
        Self { from, to }
    }

    /// 完成 `done / len` 时对应的进度.
    #[inline]
    pub fn at(&self, done: usize, len: usize) -> i32 {
        if len == 0 {
            return self.to;
        }
        let frac = done.min(len) as f64 / len as f64;
        self.from + ((self.to - self.from) as f64 * frac) as i32
    }
}
