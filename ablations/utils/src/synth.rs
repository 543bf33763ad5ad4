//! 合成数据立方体.
//!
//! 两端 z 切片只含噪声, 点源只放在中间切片上, 与噪声估计的约定一致.

use astro_berry::consts::{FWHM_PER_SIGMA, NOISE_EDGE_SLICES};
use astro_berry::{AstroVolume, Dims, Volume, VoxelGrid};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 合成立方体的参数.
#[derive(Clone, Debug)]
pub struct CubeSpec {
    /// 尺寸 `(nx, ny, nz)`.
    pub dims: Dims,
    /// 高斯噪声的均方根.
    pub noise_rms: f64,
    /// 点源个数.
    pub sources: usize,
    /// 点源峰值.
    pub peak: f64,
    /// 点源的半高全宽 (体素).
    pub source_fwhm: f64,
    /// 随机种子.
    pub seed: u64,
}

impl Default for CubeSpec {
    fn default() -> Self {
        Self {
            dims: (64, 64, 48),
            noise_rms: 0.01,
            sources: 12,
            peak: 0.5,
            source_fwhm: 3.0,
            seed: 0x5eed,
        }
    }
}

/// Box-Muller 变换得到的标准正态分布样本.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// 生成带噪声与点源的单精度立方体. 返回的体数据已写入 `RMS` 等属性.
pub fn noisy_cube(spec: &CubeSpec) -> AstroVolume {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let (nx, ny, nz) = spec.dims;
    let mut grid = VoxelGrid::<f32>::from_fn(spec.dims, |_| {
        (standard_normal(&mut rng) * spec.noise_rms) as f32
    })
    .unwrap();

    let inner = NOISE_EDGE_SLICES..nz.saturating_sub(NOISE_EDGE_SLICES);
    if !inner.is_empty() {
        let sigma = spec.source_fwhm / FWHM_PER_SIGMA;
        let reach = (4.0 * sigma).ceil() as isize;
        for _ in 0..spec.sources {
            let cx = rng.random_range(0..nx) as isize;
            let cy = rng.random_range(0..ny) as isize;
            let cz = rng.random_range(inner.clone()) as isize;
            for dz in -reach..=reach {
                let z = cz + dz;
                if z < 0 || !inner.contains(&(z as usize)) {
                    continue;
                }
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        let (x, y) = (cx + dx, cy + dy);
                        if x < 0 || y < 0 || x >= nx as isize || y >= ny as isize {
                            continue;
                        }
                        let r2 = (dx * dx + dy * dy + dz * dz) as f64;
                        let v = spec.peak * (-0.5 * r2 / (sigma * sigma)).exp();
                        *grid.at_mut(x as usize, y as usize, z as usize) += v as f32;
                    }
                }
            }
        }
    }

    let mut volume = AstroVolume::new(grid);
    volume.update_range_attributes();
    volume.update_noise_attributes();
    volume
}
