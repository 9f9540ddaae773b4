//! ScatterConfig - constants driving the placement rasterizer.

/// Rasterizer tuning. The defaults reproduce the stock tree plotting.
#[derive(Clone, Debug, PartialEq)]
pub struct ScatterConfig {
  /// Minimum up-component of a normal for anything to grow (sin 45°).
  pub slope_threshold: f32,

  /// Spacing of the environmental sampling grid in world units.
  pub sampling_resolution: f32,

  /// Inset applied to the snapped triangle rectangle to avoid samples that
  /// land exactly on triangle edges.
  pub edge_inset: f32,

  /// Plant lattice spacing as a multiple of `sampling_resolution`.
  pub lattice_multiplier: f32,

  /// Tolerance of the plant lattice modulo test.
  pub lattice_epsilon: f32,

  /// Offset above which a plant uses the doubled ("tall") lattice.
  pub tall_threshold: f32,

  /// Both noise offsets must exceed this to plant.
  pub accept_threshold: f32,

  /// Noise frequency of the per-sample position jitter.
  pub jitter_frequency: f64,

  /// Noise frequency of the domain warp feeding the density lookups.
  pub warp_frequency: f64,

  /// Noise frequency of the primary density field.
  pub density_frequency: f64,

  /// Noise frequency of the alternate density field.
  pub alt_frequency: f64,

  /// Per-triangle position nudge (scaled by `index % 2` and `index % 3`).
  pub seam_offset: f32,
}

impl Default for ScatterConfig {
  fn default() -> Self {
    Self {
      slope_threshold: std::f32::consts::FRAC_PI_4.sin(),
      sampling_resolution: 0.25,
      edge_inset: 0.01,
      lattice_multiplier: 5.0,
      lattice_epsilon: 0.1,
      tall_threshold: 0.75,
      accept_threshold: 0.5,
      jitter_frequency: 0.5,
      warp_frequency: 0.01,
      density_frequency: 0.07,
      alt_frequency: 0.11,
      seam_offset: 0.01,
    }
  }
}

impl ScatterConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_slope_threshold(mut self, threshold: f32) -> Self {
    self.slope_threshold = threshold;
    self
  }

  /// Triangles are skipped at scan time when `resolution` is not positive.
  pub fn with_sampling_resolution(mut self, resolution: f32) -> Self {
    debug_assert!(resolution > 0.0, "sampling resolution must be positive, got {resolution}");
    self.sampling_resolution = resolution;
    self
  }

  pub fn with_lattice_multiplier(mut self, multiplier: f32) -> Self {
    self.lattice_multiplier = multiplier;
    self
  }

  pub fn with_accept_threshold(mut self, threshold: f32) -> Self {
    self.accept_threshold = threshold;
    self
  }

  /// Plant lattice spacing for regular and tall plants.
  #[inline]
  pub fn plant_resolution(&self, tall: bool) -> f32 {
    let res = self.sampling_resolution * self.lattice_multiplier;
    if tall {
      res * 2.0
    } else {
      res
    }
  }
}
