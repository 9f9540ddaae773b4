//! Density field - tileable multi-channel noise sampled with bilinear
//! interpolation.
//!
//! The rasterizer reads every channel as a byte in `[0, 255]`:
//! channel 1 drives the plant/no-plant decision, channels 2 and 3 are used as
//! signed jitter offsets. Channel 0 is unused by the stock plotter.

use rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Number of channels returned per query.
pub const DENSITY_CHANNELS: usize = 4;

/// One density query result.
pub type DensitySample = [u8; DENSITY_CHANNELS];

/// Continuous 2D pseudo-random field queried at world `(x, z)`.
///
/// Implementations must be pure: the same coordinates always return the same
/// sample, so zones can be built concurrently and stay deterministic.
pub trait DensityField: Send + Sync {
  fn sample(&self, x: f64, z: f64) -> DensitySample;
}

impl DensityField for Box<dyn DensityField> {
  fn sample(&self, x: f64, z: f64) -> DensitySample {
    (**self).sample(x, z)
  }
}

/// Byte lattice that wraps at its edges and interpolates between cells.
#[derive(Clone, Debug, PartialEq)]
pub struct BilinearNoise {
  width: usize,
  depth: usize,
  data: Vec<u8>,
}

impl BilinearNoise {
  /// Random lattice generated from a seed. Same seed, same field.
  pub fn random(width: usize, depth: usize, seed: u64) -> Self {
    let width = width.max(1);
    let depth = depth.max(1);
    let mut data = vec![0u8; width * depth * DENSITY_CHANNELS];
    ChaCha8Rng::seed_from_u64(seed).fill_bytes(&mut data);
    Self { width, depth, data }
  }

  /// Lattice from explicit cell values (row-major, `x` fastest).
  ///
  /// Returns `None` when the cell count does not match `width * depth`.
  pub fn from_cells(width: usize, depth: usize, cells: &[DensitySample]) -> Option<Self> {
    if width == 0 || depth == 0 || cells.len() != width * depth {
      return None;
    }
    Some(Self {
      width,
      depth,
      data: cells.iter().flatten().copied().collect(),
    })
  }

  /// Field with the same value everywhere.
  pub fn constant(value: DensitySample) -> Self {
    Self {
      width: 1,
      depth: 1,
      data: value.to_vec(),
    }
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  #[inline]
  fn cell(&self, x: i64, z: i64) -> &[u8] {
    let x = x.rem_euclid(self.width as i64) as usize;
    let z = z.rem_euclid(self.depth as i64) as usize;
    let start = (z * self.width + x) * DENSITY_CHANNELS;
    &self.data[start..start + DENSITY_CHANNELS]
  }
}

impl DensityField for BilinearNoise {
  fn sample(&self, x: f64, z: f64) -> DensitySample {
    let x0 = x.floor();
    let z0 = z.floor();
    let fx = x - x0;
    let fz = z - z0;
    let (ix, iz) = (x0 as i64, z0 as i64);

    let c00 = self.cell(ix, iz);
    let c10 = self.cell(ix + 1, iz);
    let c01 = self.cell(ix, iz + 1);
    let c11 = self.cell(ix + 1, iz + 1);

    let mut out = [0u8; DENSITY_CHANNELS];
    for (i, value) in out.iter_mut().enumerate() {
      let top = c00[i] as f64 + (c10[i] as f64 - c00[i] as f64) * fx;
      let bottom = c01[i] as f64 + (c11[i] as f64 - c01[i] as f64) * fx;
      let v = top + (bottom - top) * fz;
      *value = v.round().clamp(0.0, 255.0) as u8;
    }
    out
  }
}

/// Byte channel mapped to `[0, 1]`.
#[inline]
pub fn unit(value: u8) -> f32 {
  value as f32 / 255.0
}

/// Byte channel mapped to `[-0.5, 0.5]`.
#[inline]
pub fn signed_unit(value: u8) -> f32 {
  unit(value) - 0.5
}

#[cfg(test)]
#[path = "density_test.rs"]
mod density_test;
