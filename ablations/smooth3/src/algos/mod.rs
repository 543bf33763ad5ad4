mod profile;

use astro_berry::consts::attr;
use astro_berry::filter::{Filter, FullConvolution, SeparableConvolution};
use astro_berry::kernel::{build_gaussian_separable, KernelTable};
use astro_berry::prelude::*;
use log::error;

pub use profile::Profile;

/// 同时运行的策略个数.
const CONCURRENT_STRATEGIES: usize = 6;

/// 每个策略重复运行的次数. 可通过 `$SMOOTH3_ROUNDS` 修改.
fn rounds() -> usize {
    utils::usize_from_env_or("SMOOTH3_ROUNDS", 3)
}

/// 每个策略分到的工作线程数.
fn workers() -> usize {
    (utils::cpus() / CONCURRENT_STRATEGIES).max(1)
}

/// 以 `config` 在 `cube` 上重复调用引擎.
fn run_engine(name: &str, cube: &AstroVolume, config: SmoothingConfig) -> Profile {
    let engine = SmoothingEngine::new();
    let config = config.with_workers(workers());
    let mut profile = Profile::new();
    for round in 0..rounds() {
        println!("{name}: round {round}...");
        let mut output = cube.zeros_like();
        let status = ExecutionStatus::new();

        profile.run_start();
        let r = engine.apply(&config, cube, &mut output, &status, RenderContext::none());
        profile.run_elapsed();

        match r {
            Ok(Outcome::Completed) => profile.count_completed(output.attribute_f64(attr::RMS)),
            Ok(Outcome::Cancelled) => profile.count_cancelled(),
            Err(e) => {
                error!("{name}: {e}");
                profile.count_failed();
            }
        }
    }
    profile.finish()
}

pub fn isotropic_box(cube: &AstroVolume) -> Profile {
    run_engine("Isotropic box", cube, SmoothingConfig::box_filter([3.0; 3]))
}

pub fn anisotropic_box(cube: &AstroVolume) -> Profile {
    run_engine("Anisotropic box", cube, SmoothingConfig::box_filter([3.0, 5.0, 1.0]))
}

pub fn isotropic_gaussian(cube: &AstroVolume) -> Profile {
    run_engine("Isotropic gaussian", cube, SmoothingConfig::gaussian([3.0; 3]))
}

pub fn anisotropic_gaussian(cube: &AstroVolume) -> Profile {
    let config = SmoothingConfig::gaussian([3.0, 2.0, 1.5]).with_rotation([0.0, 0.0, 30.0]);
    run_engine("Anisotropic gaussian", cube, config)
}

pub fn gradient(cube: &AstroVolume) -> Profile {
    let config = SmoothingConfig::gradient([1.0; 3]).with_noise_rms_from(cube);
    run_engine("Gradient", cube, config)
}

/// 同一个各向同性高斯核分别走三次一维卷积与完整三维卷积, 记录两者的最大误差.
pub fn separable_vs_full(cube: &AstroVolume) -> Profile {
    let input = cube.grid().as_f32().expect("single precision cube");
    let table = build_gaussian_separable([3.0; 3], [0; 3]);
    let full = table.to_full();
    let KernelTable::Separable { axes } = &table else {
        unreachable!("gaussian table is separable");
    };
    let exec = ParallelExecutor::new(workers());

    let mut profile = Profile::new();
    for round in 0..rounds() {
        println!("Separable vs full: round {round}...");
        let mut by_pass = input.deep_copy();
        let mut by_full = input.deep_copy();
        let status = ExecutionStatus::new();

        profile.run_start();
        let r = SeparableConvolution::new(axes)
            .apply(input, &mut by_pass, &status, &exec)
            .and_then(|_| FullConvolution::new(&full).apply(input, &mut by_full, &status, &exec));
        profile.run_elapsed();

        match r {
            Ok(Outcome::Completed) => {
                let dev = by_pass
                    .iter()
                    .zip(by_full.iter())
                    .map(|(a, b)| (a - b).abs() as f64)
                    .fold(0.0, f64::max);
                profile.record_deviation(dev);
                profile.count_completed(astro_berry::data::stats::noise(&by_pass).rms);
            }
            Ok(Outcome::Cancelled) => profile.count_cancelled(),
            Err(e) => {
                error!("separable vs full: {e}");
                profile.count_failed();
            }
        }
    }
    profile.finish()
}
