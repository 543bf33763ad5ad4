//! 并行执行器.
//!
//! 线性索引区间 `[0, n)` 被切分为 `workers` 个连续的分区, 每个工作线程独占一个分区的输出,
//! 因此不需要任何锁. 启用 `rayon` feature 时分区运行在专用的 `rayon` 线程池上,
//! 否则运行在 `std::thread::scope` 线程上.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::{trace, warn};
use once_cell::sync::Lazy;

use crate::consts::WORKERS_ENV;
use crate::Outcome;

mod status;

pub use status::{ExecutionStatus, ProgressSpan};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, ParallelIterator};
        use rayon::slice::ParallelSliceMut;
    } else {
        use std::sync::Once;

        static NO_RAYON_WARNING: Once = Once::new();
    }
}

/// 本机可用的硬件线程数.
static HARDWARE_THREADS: Lazy<usize> = Lazy::new(|| {
    thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
});

/// 解析工作线程数.
///
/// `hint > 0` 时直接使用; 否则读取环境变量 `ASTRO_BERRY_WORKERS`,
/// 该变量不存在或无法解析时使用全部硬件线程.
pub fn resolve_workers(hint: usize) -> usize {
    if hint > 0 {
        return hint;
    }
    std::env::var(WORKERS_ENV)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(*HARDWARE_THREADS)
}

/// 固定大小的并行执行器. 每次调用创建一个, 调用线程阻塞直到所有分区结束.
#[derive(Debug)]
pub struct ParallelExecutor {
    workers: usize,
    #[cfg(feature = "rayon")]
    pool: Option<rayon::ThreadPool>,
}

impl ParallelExecutor {
    /// 构造执行器. `workers_hint == 0` 表示使用 [`resolve_workers`] 的结果.
    pub fn new(workers_hint: usize) -> Self {
        let workers = resolve_workers(workers_hint);
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("astro-berry-{i}"))
                    .build()
                    .map_err(|e| warn!("failed to build a rayon pool of {workers} threads: {e}"))
                    .ok();
                Self { workers, pool }
            } else {
                NO_RAYON_WARNING.call_once(|| {
                    warn!("astro-berry built without `rayon`, partitions run on scoped std threads");
                });
                Self { workers }
            }
        }
    }

    /// 工作线程数.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 对 `out` 的每个下标 `i` 并行地计算 `out[i] = f(i)`.
    ///
    /// 每个工作线程在处理每个下标之前检查一次 `status`, 观察到 `-1` 时放弃自己剩余的分区.
    /// 持有下标 0 的工作线程大约每完成分区的 1% 汇报一次进度, 进度映射到 `span` 中.
    ///
    /// # 返回值
    ///
    /// 若某个分区提前结束, 或结束时 `status` 为 `-1`, 返回 `Outcome::Cancelled`,
    /// 此时 `out` 只有部分被写入.
    pub fn run_parallel_for<T, F>(
        &self,
        out: &mut [T],
        f: F,
        status: &ExecutionStatus,
        span: ProgressSpan,
    ) -> Outcome
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        let n = out.len();
        if n > 0 {
            let chunk = n.div_ceil(self.workers);
            let stopped = AtomicBool::new(false);
            let work = |(p, part): (usize, &mut [T])| {
                let base = p * chunk;
                let len = part.len();
                let step = (len / 100).max(1);
                for (off, slot) in part.iter_mut().enumerate() {
                    if status.is_cancelled() {
                        stopped.store(true, Ordering::Release);
                        return;
                    }
                    *slot = f(base + off);
                    if p == 0 && ((off + 1) % step == 0 || off + 1 == len) {
                        status.advance_to(span.at(off + 1, len));
                    }
                }
            };

            cfg_if::cfg_if! {
                if #[cfg(feature = "rayon")] {
                    match &self.pool {
                        Some(pool) => pool.install(|| out.par_chunks_mut(chunk).enumerate().for_each(&work)),
                        None => run_scoped(out, chunk, &work),
                    }
                } else {
                    run_scoped(out, chunk, &work);
                }
            }

            if stopped.load(Ordering::Acquire) {
                trace!("parallel sweep of {n} items stopped early");
                return Outcome::Cancelled;
            }
        }
        match status.is_cancelled() {
            true => Outcome::Cancelled,
            false => Outcome::Completed,
        }
    }

    /// 对 `[0, num)` 中的每个下标并行地执行 `f`. 取消语义同 [`run_parallel_for`](Self::run_parallel_for).
    pub fn run_parallel_for_each<F>(
        &self,
        num: usize,
        f: F,
        status: &ExecutionStatus,
        span: ProgressSpan,
    ) -> Outcome
    where
        F: Fn(usize) + Sync,
    {
        let mut units = vec![(); num];
        self.run_parallel_for(&mut units, f, status, span)
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(0)
    }
}

/// 每个分区一个 scoped 线程. 工作线程 panic 时在调用线程上重新 panic.
fn run_scoped<T, W>(out: &mut [T], chunk: usize, work: &W)
where
    T: Send,
    W: Fn((usize, &mut [T])) + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = out
            .chunks_mut(chunk)
            .enumerate()
            .map(|job| s.spawn(move || work(job)))
            .collect();
        for h in handles {
            if let Err(e) = h.join() {
                std::panic::resume_unwind(e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_every_index_written_once() {
        for workers in [1, 3, 8, 64] {
            let exec = ParallelExecutor::new(workers);
            assert_eq!(exec.workers(), workers);
            let status = ExecutionStatus::new();
            let mut out = vec![0usize; 1001];
            let r = exec.run_parallel_for(&mut out, |i| i * 2, &status, ProgressSpan::FULL);
            assert_eq!(r, Outcome::Completed);
            assert!(out.iter().enumerate().all(|(i, &v)| v == i * 2));
            // 下标 0 所在的分区最后汇报了区间终点.
            assert_eq!(status.get(), 99);
        }
    }

    #[test]
    fn test_scoped_fallback() {
        let mut out = vec![0u32; 37];
        let work = |(p, part): (usize, &mut [u32])| {
            part.iter_mut().for_each(|v| *v = p as u32);
        };
        run_scoped(&mut out, 10, &work);
        assert_eq!(out[0], 0);
        assert_eq!(out[36], 3);
    }

    #[test]
    fn test_empty_range() {
        let exec = ParallelExecutor::new(4);
        let status = ExecutionStatus::new();
        let r = exec.run_parallel_for_each(0, |_| unreachable!(), &status, ProgressSpan::FULL);
        assert!(r.is_completed());
    }

    #[test]
    fn test_cancel_before_start() {
        let exec = ParallelExecutor::new(4);
        let status = ExecutionStatus::new();
        status.cancel();
        let calls = AtomicUsize::new(0);
        let r = exec.run_parallel_for_each(
            1000,
            |_| {
                calls.fetch_add(1, Ordering::Relaxed);
            },
            &status,
            ProgressSpan::FULL,
        );
        assert_eq!(r, Outcome::Cancelled);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert!(status.is_cancelled());
    }

    #[test]
    fn test_cancel_while_running() {
        let exec = ParallelExecutor::new(2);
        let status = ExecutionStatus::new();
        status.start();
        let calls = AtomicUsize::new(0);
        let n = 400;
        let r = exec.run_parallel_for_each(
            n,
            |_| {
                if calls.fetch_add(1, Ordering::Relaxed) == 20 {
                    status.cancel();
                }
                std::thread::sleep(Duration::from_millis(1));
            },
            &status,
            ProgressSpan::FULL,
        );
        assert_eq!(r, Outcome::Cancelled);
        let done = calls.load(Ordering::Relaxed);
        assert!(done < n, "取消后仍处理了全部 {done} 个下标");
    }

    #[test]
    fn test_resolve_workers() {
        assert_eq!(resolve_workers(5), 5);
        assert!(resolve_workers(0) >= 1);
    }
}
