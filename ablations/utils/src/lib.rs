//! 消融实验依赖的通用组件.

use std::time::{Duration, Instant};

pub mod synth;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 从环境变量 `key` 读取正整数, 不存在或无法解析时返回 `default`.
pub fn usize_from_env_or(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or(default)
}

/// 运行 `f` 并返回其结果与耗时.
#[inline]
pub fn timed<T, F: FnOnce() -> T>(f: F) -> (T, Duration) {
    let start = Instant::now();
    let r = f();
    (r, start.elapsed())
}
