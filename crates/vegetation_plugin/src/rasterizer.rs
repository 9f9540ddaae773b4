//! Placement rasterizer - turns a parent tile's triangles into tree
//! placements.
//!
//! ```text
//!  triangle ──► slope early-out ──► tile bounds ──► flatten to XZ, snap rect
//!                                                         │
//!       ┌─────────────────────────────────────────────────┘
//!       ▼
//!  sample grid (0.25) ─► jitter ─► barycentric inside? ─► interpolated slope
//!                                                         │
//!       ┌─────────────────────────────────────────────────┘
//!       ▼
//!  offset / altOffset > 0.5 ─► plant lattice (1.25 or 2.5) ─► species bin
//! ```
//!
//! The environment is sampled on the fine grid; trees only land where the fine
//! sample also falls on the coarser plant lattice, which gives a sparse but
//! irregular distribution.
//!
//! Output is deterministic for a given (triangles, region, seed, density
//! field). The only randomness is the yaw of each tree, drawn from a ChaCha
//! generator seeded per tile.

use glam::{Quat, Vec3};
use rand::Rng;
use rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use web_time::Instant;

use crate::config::ScatterConfig;
use crate::density::{signed_unit, unit, DensityField};
use crate::grid::{TileCoord, TileGrid};
use crate::mesh::TriangleSource;
use crate::types::{PlacementRecord, SpeciesBin, Triangle};

/// Area of the parent tile that belongs to one zone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanRegion {
  /// Tile minimum corner in the parent's local space.
  pub min: Vec3,
  /// Tile maximum corner in the parent's local space.
  pub max: Vec3,
  /// Tile minimum corner in world space (density lookups are world-space).
  pub world: Vec3,
}

impl ScanRegion {
  pub fn new(min: Vec3, max: Vec3, world: Vec3) -> Self {
    Self { min, max, world }
  }

  /// Region of `coord` inside a parent whose local origin sits at
  /// `parent_location`. The zone may be one of several splitting up a larger
  /// parent, so the scan area is relative to the parent's corner.
  pub fn for_tile(grid: &TileGrid, coord: TileCoord, parent_location: Vec3) -> Self {
    let world = grid.to_world(coord);
    let min = world - parent_location;
    Self {
      min,
      max: min + grid.cell_size,
      world,
    }
  }

  /// Inclusive containment in parent-local space.
  #[inline]
  pub fn contains(&self, v: Vec3) -> bool {
    v.cmpge(self.min).all() && v.cmple(self.max).all()
  }
}

/// Result of scanning one tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanOutput {
  /// One bin per species.
  pub bins: Vec<SpeciesBin>,
  /// Triangles that passed the slope and bounds tests.
  pub processed_triangles: usize,
  /// Triangles visited.
  pub total_triangles: usize,
}

impl ScanOutput {
  /// `bin_count` empty bins.
  pub fn empty(bin_count: usize) -> Self {
    Self {
      bins: vec![SpeciesBin::new(); bin_count],
      processed_triangles: 0,
      total_triangles: 0,
    }
  }

  pub fn placement_count(&self) -> usize {
    self.bins.iter().map(SpeciesBin::len).sum()
  }
}

/// Map the two density offsets onto a species bin.
///
/// `round(((offset - 0.5) + (alt_offset - 0.5)) * (bin_count - 1))`, rounding
/// halves up. Accepted offsets are both above 0.5, so the result is skewed
/// towards the upper bins.
#[inline]
pub fn bin_index(offset: f32, alt_offset: f32, bin_count: usize) -> usize {
  if bin_count <= 1 {
    return 0;
  }
  let bin_offset = (offset - 0.5) + (alt_offset - 0.5);
  let bin = (bin_offset * (bin_count - 1) as f32 + 0.5).floor();
  (bin.max(0.0) as usize).min(bin_count - 1)
}

/// Random yaw about +Y, then the shortest-arc tilt taking +Y onto `normal`.
/// The tilt is skipped when the normal already points straight up.
#[inline]
pub fn surface_orientation(normal: Vec3, yaw: f32) -> Quat {
  let rotation = Quat::from_rotation_y(yaw);
  let angle = Vec3::Y.angle_between(normal);
  if angle.abs() > 0.0 {
    if let Some(axis) = Vec3::Y.cross(normal).try_normalize() {
      return Quat::from_axis_angle(axis, angle) * rotation;
    }
  }
  rotation
}

/// Scans triangles one at a time, filling species bins.
pub struct PlacementRasterizer<'a, D: DensityField + ?Sized> {
  config: &'a ScatterConfig,
  density: &'a D,
  region: ScanRegion,
  rng: ChaCha8Rng,
  bins: Vec<SpeciesBin>,
  processed_triangles: usize,
  total_triangles: usize,
}

impl<'a, D: DensityField + ?Sized> PlacementRasterizer<'a, D> {
  pub fn new(
    bin_count: usize,
    seed: u64,
    region: ScanRegion,
    density: &'a D,
    config: &'a ScatterConfig,
  ) -> Self {
    Self {
      config,
      density,
      region,
      rng: ChaCha8Rng::seed_from_u64(seed),
      bins: vec![SpeciesBin::new(); bin_count],
      processed_triangles: 0,
      total_triangles: 0,
    }
  }

  /// Scan every triangle of `triangles` and return the filled bins.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "rasterizer::scan"))]
  pub fn scan(mut self, triangles: impl IntoIterator<Item = Triangle>) -> ScanOutput {
    let start = Instant::now();
    for tri in triangles {
      self.process_triangle(&tri);
    }
    let output = self.finish();

    if output.total_triangles > 0 {
      tracing::debug!(
        processed = output.processed_triangles,
        total = output.total_triangles,
        placements = output.placement_count(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "plotted placements"
      );
    }
    output
  }

  /// Scan a fresh pass over `source`.
  pub fn scan_source<S: TriangleSource + ?Sized>(self, source: &S) -> ScanOutput {
    self.scan(source.triangles())
  }

  /// Test one triangle and rasterize it when it qualifies.
  pub fn process_triangle(&mut self, tri: &Triangle) {
    self.total_triangles += 1;
    if self.bins.is_empty() {
      return;
    }

    // Cheap slope early-out before the per-vertex bounds tests.
    let threshold = self.config.slope_threshold;
    if tri.normals.iter().all(|n| n.y < threshold) {
      return;
    }

    // No clipping: triangles straddling the tile edge belong to the
    // neighbor scans.
    if !tri.vertices.iter().all(|v| self.region.contains(*v)) {
      return;
    }

    self.processed_triangles += 1;
    self.rasterize(tri);
  }

  pub fn finish(self) -> ScanOutput {
    ScanOutput {
      bins: self.bins,
      processed_triangles: self.processed_triangles,
      total_triangles: self.total_triangles,
    }
  }

  fn rasterize(&mut self, tri: &Triangle) {
    let config = self.config;
    let [p0, p1, p2] = tri.vertices;
    let flat = |v: Vec3| Vec3::new(v.x, 0.0, v.z);
    let f0 = flat(p0);
    let e0 = flat(p2) - f0;
    let e1 = flat(p1) - f0;

    let dot00 = e0.dot(e0);
    let dot01 = e0.dot(e1);
    let dot11 = e1.dot(e1);
    let inv_denom = 1.0 / (dot00 * dot11 - dot01 * dot01);
    if !inv_denom.is_finite() {
      tracing::trace!(triangle = tri.index, "skipping zero-area triangle");
      return;
    }

    let seam = Vec3::new(
      (tri.index % 2) as f32 * config.seam_offset,
      0.0,
      (tri.index % 3) as f32 * config.seam_offset,
    );

    // Snap the flattened bounding rectangle to the sampling grid, then pull it
    // in slightly to avoid samples exactly on triangle edges.
    let res = config.sampling_resolution;
    if res.is_nan() || res <= 0.0 {
      tracing::trace!(triangle = tri.index, res, "skipping triangle: non-positive sampling resolution");
      return;
    }
    let mut min_x = p0.x.min(p1.x).min(p2.x);
    let mut min_z = p0.z.min(p1.z).min(p2.z);
    let mut max_x = p0.x.max(p1.x).max(p2.x);
    let mut max_z = p0.z.max(p1.z).max(p2.z);
    min_x -= min_x % res;
    min_z -= min_z % res;
    max_x += max_x % res;
    max_z += max_z % res;
    min_x += config.edge_inset;
    min_z += config.edge_inset;
    max_x -= config.edge_inset;
    max_z -= config.edge_inset;

    // Far from the origin the f32 step can round away and the walk would
    // never reach the far edge.
    let stalls = |v: f32| v + res <= v;
    if stalls(min_x) || stalls(max_x) || stalls(min_z) || stalls(max_z) {
      tracing::trace!(triangle = tri.index, "skipping triangle: sampling step below float precision");
      return;
    }

    let bary = Barycentric {
      f0,
      e0,
      e1,
      dot00,
      dot01,
      dot11,
      inv_denom,
    };

    let mut z = min_z;
    while z < max_z {
      let mut x = min_x;
      while x < max_x {
        if let Some(record) = self.sample(tri, &bary, seam, x, z) {
          self.bins[record.0].push(record.1);
        }
        x += res;
      }
      z += res;
    }
  }

  /// Evaluate one grid sample. Returns the bin and the placement when a tree
  /// is planted here.
  fn sample(
    &mut self,
    tri: &Triangle,
    bary: &Barycentric,
    seam: Vec3,
    x: f32,
    z: f32,
  ) -> Option<(usize, PlacementRecord)> {
    let config = self.config;
    let region = self.region;
    let threshold = config.slope_threshold;

    let jitter = self.density.sample(
      (region.world.x + (x - region.min.x)) as f64 * config.jitter_frequency,
      (region.world.z + (z - region.min.z)) as f64 * config.jitter_frequency,
    );
    let px = x + signed_unit(jitter[2]);
    let pz = z + signed_unit(jitter[3]);

    let (u, v) = bary.coords(px, pz);
    if !(u >= 0.0 && v >= 0.0 && u + v < 1.0) {
      return None;
    }

    let [p0, p1, p2] = tri.vertices;
    let [n0, n1, n2] = tri.normals;
    let y = p0.y + (p2.y - p0.y) * u + (p1.y - p0.y) * v;
    let plot = Vec3::new(px, y, pz) - region.min + seam;

    let normal = (n0 + (n2 - n0) * u + (n1 - n0) * v).try_normalize()?;
    if normal.y < threshold {
      return None;
    }

    // Domain warp for the density lookups, plus the base density channel.
    let wx = (region.world.x + plot.x) as f64;
    let wz = (region.world.z + plot.z) as f64;
    let warp = self.density.sample(wx * config.warp_frequency, wz * config.warp_frequency);
    let x_warp = signed_unit(warp[2]) as f64;
    let z_warp = signed_unit(warp[3]) as f64;
    let base = unit(warp[1]);

    let normal_offset = (normal.y - threshold) - ((1.0 - threshold) * 0.5);

    let primary = self.density.sample(
      wx * config.density_frequency + x_warp,
      wz * config.density_frequency + z_warp,
    );
    let offset = (base + signed_unit(primary[1]) + normal_offset).clamp(0.0, 1.0);

    let alternate = self
      .density
      .sample(wx * config.alt_frequency + x_warp, wz * config.alt_frequency + z_warp);
    let alt_offset = (base + signed_unit(alternate[1]) + normal_offset).clamp(0.0, 1.0);

    if !(offset > config.accept_threshold && alt_offset > config.accept_threshold) {
      return None;
    }

    let tall = offset > config.tall_threshold;
    let plant_res = config.plant_resolution(tall);
    if !((plot.x % plant_res) < config.lattice_epsilon && (plot.z % plant_res) < config.lattice_epsilon) {
      return None;
    }

    let bin = bin_index(offset, alt_offset, self.bins.len());
    let yaw = std::f32::consts::TAU * self.rng.random::<f32>();
    let rotation = surface_orientation(normal, yaw);

    Some((bin, PlacementRecord::new(plot, rotation, 1.0)))
  }
}

/// Per-triangle barycentric setup against the flattened triangle.
struct Barycentric {
  f0: Vec3,
  e0: Vec3,
  e1: Vec3,
  dot00: f32,
  dot01: f32,
  dot11: f32,
  inv_denom: f32,
}

impl Barycentric {
  /// `u` weights vertex 2, `v` weights vertex 1.
  #[inline]
  fn coords(&self, x: f32, z: f32) -> (f32, f32) {
    let p = Vec3::new(x, 0.0, z) - self.f0;
    let dot02 = self.e0.dot(p);
    let dot12 = self.e1.dot(p);
    let u = (self.dot11 * dot02 - self.dot01 * dot12) * self.inv_denom;
    let v = (self.dot00 * dot12 - self.dot01 * dot02) * self.inv_denom;
    (u, v)
  }
}

#[cfg(test)]
#[path = "rasterizer_test.rs"]
mod rasterizer_test;
