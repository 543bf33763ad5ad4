//! 程序运行函数.

use crate::result::AblationResult;
use std::thread;
use utils::synth::{self, CubeSpec};

/// 实际运行.
///
/// 立方体边长可通过 `$SMOOTH3_SIDE` 修改.
pub fn run() -> AblationResult {
    let side = utils::usize_from_env_or("SMOOTH3_SIDE", 64);
    let spec = CubeSpec {
        dims: (side, side, side * 3 / 4),
        ..Default::default()
    };
    let (cube, cost) = utils::timed(|| synth::noisy_cube(&spec));
    let c = &cube;

    println!("Synthetic {:?} cube generated in {cost:?}", spec.dims);
    println!("Running ablation studies...");
    thread::scope(|s| {
        use super::algos::*;

        let handles = [
            isotropic_box,
            anisotropic_box,
            isotropic_gaussian,
            anisotropic_gaussian,
            gradient,
            separable_vs_full,
        ]
        .map(|t| s.spawn(move || t(c)));

        AblationResult::from_iter(
            [
                "isotropic box",
                "anisotropic box",
                "isotropic gaussian",
                "anisotropic gaussian",
                "gradient diffusion",
                "separable vs full",
            ]
            .into_iter()
            .zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            ),
        )
    })
}
