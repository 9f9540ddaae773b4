use super::*;
use crate::density::BilinearNoise;
use crate::mesh::TerrainMesh;
use crate::test_utils::{barren_field, flat_tile, lush_field};

fn tile_region(size: f32) -> ScanRegion {
  ScanRegion::new(Vec3::ZERO, Vec3::splat(size), Vec3::ZERO)
}

fn scan(
  mesh: &TerrainMesh,
  field: &BilinearNoise,
  bins: usize,
  seed: u64,
  config: &ScatterConfig,
) -> ScanOutput {
  PlacementRasterizer::new(bins, seed, tile_region(32.0), field, config).scan_source(mesh)
}

fn up_triangle(index: usize, vertices: [Vec3; 3]) -> Triangle {
  Triangle {
    index,
    vertices,
    normals: [Vec3::Y; 3],
  }
}

#[test]
fn test_bin_index_mapping() {
  assert_eq!(bin_index(1.0, 1.0, 4), 3);
  assert_eq!(bin_index(0.6, 0.6, 4), 1);
  assert_eq!(bin_index(0.55, 0.55, 4), 0);
  assert_eq!(bin_index(0.75, 0.625, 3), 1);
  // Exact half rounds up.
  assert_eq!(bin_index(0.625, 0.625, 3), 1);
  assert_eq!(bin_index(0.9, 0.9, 1), 0);
  assert_eq!(bin_index(0.9, 0.9, 0), 0);
}

#[test]
fn test_bin_index_in_range() {
  for bins in 1..8 {
    for i in 0..=50 {
      for j in 0..=50 {
        let offset = 0.5 + i as f32 / 100.0;
        let alt = 0.5 + j as f32 / 100.0;
        assert!(bin_index(offset, alt, bins) < bins);
      }
    }
  }
}

#[test]
fn test_surface_orientation_upright() {
  let q = surface_orientation(Vec3::Y, 1.0);
  assert!(q.abs_diff_eq(Quat::from_rotation_y(1.0), 1e-6));
}

#[test]
fn test_surface_orientation_tilts_onto_normal() {
  let normal = Vec3::new(-0.5, 1.0, 0.25).normalize();
  for yaw in [0.0, 1.0, 4.0] {
    let q = surface_orientation(normal, yaw);
    assert!((q * Vec3::Y).abs_diff_eq(normal, 1e-5));
  }
}

#[test]
fn test_lush_flat_tile_plants() {
  let config = ScatterConfig::default();
  let out = scan(&flat_tile(32), &lush_field(), 3, 7, &config);

  assert_eq!(out.bins.len(), 3);
  assert_eq!(out.total_triangles, 32 * 32 * 2);
  assert_eq!(out.processed_triangles, out.total_triangles);
  assert!(out.placement_count() > 0);

  // Saturated offsets land in the last bin.
  assert!(out.bins[0].is_empty());
  assert!(out.bins[1].is_empty());
  assert_eq!(out.bins[2].len(), out.placement_count());
}

#[test]
fn test_placements_on_lattice_and_inside_tile() {
  let config = ScatterConfig::default();
  let out = scan(&flat_tile(32), &lush_field(), 1, 11, &config);
  let lattice = config.plant_resolution(true);

  for rec in out.bins[0].iter() {
    let p = rec.position;
    assert!(p.x >= 0.0 && p.x <= 32.0 + 0.6, "{p}");
    assert!(p.z >= 0.0 && p.z <= 32.0 + 0.6, "{p}");
    assert_eq!(p.y, 0.0);
    assert!(p.x % lattice < config.lattice_epsilon);
    assert!(p.z % lattice < config.lattice_epsilon);
    assert_eq!(rec.scale, 1.0);
  }
}

#[test]
fn test_short_trees_use_the_fine_lattice() {
  // Offsets land between the accept and tall thresholds.
  let config = ScatterConfig::default();
  let field = BilinearNoise::constant([0, 120, 128, 128]);
  let out = scan(&flat_tile(32), &field, 1, 11, &config);
  let fine = config.plant_resolution(false);
  let coarse = config.plant_resolution(true);

  assert!(out.placement_count() > 0);
  for rec in out.bins[0].iter() {
    let p = rec.position;
    assert!(p.x % fine < config.lattice_epsilon, "{p}");
    assert!(p.z % fine < config.lattice_epsilon, "{p}");
  }
  assert!(out.bins[0]
    .iter()
    .any(|r| r.position.x % coarse >= config.lattice_epsilon || r.position.z % coarse >= config.lattice_epsilon));
}

#[test]
fn test_barren_field_plants_nothing() {
  let config = ScatterConfig::default();
  let out = scan(&flat_tile(32), &barren_field(), 3, 7, &config);
  assert_eq!(out.bins.len(), 3);
  assert_eq!(out.placement_count(), 0);
  assert_eq!(out.processed_triangles, out.total_triangles);
}

#[test]
fn test_deterministic_for_same_seed() {
  let config = ScatterConfig::default();
  let field = BilinearNoise::random(64, 64, 99);
  let mesh = TerrainMesh::from_heightfield(32, 32, 1.0, |x, z| (x * 0.1).sin() + (z * 0.2).cos());

  let a = scan(&mesh, &field, 4, 1234, &config);
  let b = scan(&mesh, &field, 4, 1234, &config);
  assert_eq!(a, b);
  for (ba, bb) in a.bins.iter().zip(&b.bins) {
    for (ra, rb) in ba.iter().zip(bb.iter()) {
      assert_eq!(ra.position.to_array().map(f32::to_bits), rb.position.to_array().map(f32::to_bits));
      assert_eq!(ra.rotation.to_array().map(f32::to_bits), rb.rotation.to_array().map(f32::to_bits));
    }
  }
}

#[test]
fn test_seed_only_changes_yaw() {
  let config = ScatterConfig::default();
  let field = lush_field();
  let a = scan(&flat_tile(32), &field, 1, 1, &config);
  let b = scan(&flat_tile(32), &field, 1, 2, &config);

  assert_eq!(a.placement_count(), b.placement_count());
  let positions_a: Vec<_> = a.bins[0].iter().map(|r| r.position).collect();
  let positions_b: Vec<_> = b.bins[0].iter().map(|r| r.position).collect();
  assert_eq!(positions_a, positions_b);
  assert!(a.bins[0].iter().zip(b.bins[0].iter()).any(|(x, y)| x.rotation != y.rotation));
}

#[test]
fn test_at_most_one_tree_per_sample() {
  let config = ScatterConfig::default();
  let out = scan(&flat_tile(32), &lush_field(), 1, 3, &config);
  let mut keys: Vec<_> = out.bins[0]
    .iter()
    .map(|r| (r.position.x.to_bits(), r.position.z.to_bits()))
    .collect();
  let before = keys.len();
  keys.sort_unstable();
  keys.dedup();
  assert_eq!(keys.len(), before);
}

#[test]
fn test_slope_rotation_follows_normal() {
  let config = ScatterConfig::default();
  let mesh = TerrainMesh::from_heightfield(32, 32, 1.0, |x, _| 0.5 * x);
  let region = ScanRegion::new(Vec3::new(0.0, -100.0, 0.0), Vec3::new(32.0, 100.0, 32.0), Vec3::ZERO);
  let out = PlacementRasterizer::new(1, 5, region, &lush_field(), &config).scan_source(&mesh);

  let expected = Vec3::new(-0.5, 1.0, 0.0).normalize();
  assert!(out.placement_count() > 0);
  for rec in out.bins[0].iter() {
    assert!((rec.rotation * Vec3::Y).abs_diff_eq(expected, 1e-4));
  }
}

#[test]
fn test_mixed_normals_reject_steep_samples() {
  let config = ScatterConfig::default();
  let field = lush_field();
  let vertices = [Vec3::ZERO, Vec3::new(30.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 30.0)];
  let side = Vec3::new(1.0, 0.3, 0.0).normalize();
  assert!(side.y < config.slope_threshold);

  let mixed = Triangle {
    index: 0,
    vertices,
    normals: [Vec3::Y, side, side],
  };
  let out = PlacementRasterizer::new(1, 0, tile_region(32.0), &field, &config).scan([mixed]);
  assert_eq!(out.processed_triangles, 1);
  assert!(out.placement_count() > 0);
  for rec in out.bins[0].iter() {
    assert!((rec.rotation * Vec3::Y).y >= config.slope_threshold - 1e-5, "{rec:?}");
  }

  // Samples near the far edge are too steep and drop out.
  let upright = PlacementRasterizer::new(1, 0, tile_region(32.0), &field, &config).scan([up_triangle(0, vertices)]);
  assert!(out.placement_count() < upright.placement_count());
}

#[test]
fn test_far_from_origin_triangle_terminates() {
  let config = ScatterConfig::default();
  let field = lush_field();
  let far = 5_000_000.0;
  let tri = up_triangle(
    0,
    [Vec3::new(far, 0.0, far), Vec3::new(far + 4.0, 0.0, far), Vec3::new(far, 0.0, far + 4.0)],
  );
  let region = ScanRegion::new(
    Vec3::new(far - 8.0, -1.0, far - 8.0),
    Vec3::new(far + 8.0, 1.0, far + 8.0),
    Vec3::ZERO,
  );
  let out = PlacementRasterizer::new(1, 0, region, &field, &config).scan([tri]);
  assert_eq!(out.processed_triangles, 1);
  assert_eq!(out.placement_count(), 0);
}

#[test]
fn test_non_positive_resolution_plants_nothing() {
  let field = lush_field();
  for resolution in [0.0, -0.25, f32::NAN] {
    let config = ScatterConfig {
      sampling_resolution: resolution,
      ..ScatterConfig::default()
    };
    let out = scan(&flat_tile(4), &field, 1, 0, &config);
    assert_eq!(out.processed_triangles, out.total_triangles);
    assert_eq!(out.placement_count(), 0);
  }
}

#[test]
fn test_steep_triangles_rejected() {
  let config = ScatterConfig::default();
  let wall = Triangle {
    index: 0,
    vertices: [Vec3::new(0.0, 0.0, 1.0), Vec3::new(4.0, 0.0, 1.0), Vec3::new(0.0, 4.0, 1.0)],
    normals: [Vec3::Z; 3],
  };
  let field = lush_field();
  let out = PlacementRasterizer::new(2, 0, tile_region(32.0), &field, &config).scan([wall]);
  assert_eq!(out.total_triangles, 1);
  assert_eq!(out.processed_triangles, 0);
  assert_eq!(out.placement_count(), 0);
}

#[test]
fn test_triangles_outside_tile_rejected() {
  let config = ScatterConfig::default();
  let field = lush_field();
  let straddling = up_triangle(0, [Vec3::new(30.0, 0.0, 0.0), Vec3::new(34.0, 0.0, 0.0), Vec3::new(30.0, 0.0, 4.0)]);
  let out = PlacementRasterizer::new(2, 0, tile_region(32.0), &field, &config).scan([straddling]);
  assert_eq!(out.processed_triangles, 0);
  assert_eq!(out.placement_count(), 0);
}

#[test]
fn test_zero_area_triangle_skipped() {
  let config = ScatterConfig::default();
  let field = lush_field();
  let sliver = up_triangle(0, [Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 2.0, 2.0)]);
  let out = PlacementRasterizer::new(2, 0, tile_region(32.0), &field, &config).scan([sliver]);
  assert_eq!(out.processed_triangles, 1);
  assert_eq!(out.placement_count(), 0);
}

#[test]
fn test_empty_source_yields_empty_bins() {
  let config = ScatterConfig::default();
  let field = lush_field();
  let out = PlacementRasterizer::new(5, 0, tile_region(32.0), &field, &config).scan(std::iter::empty());
  assert_eq!(out, ScanOutput::empty(5));
  assert!(out.bins.iter().all(SpeciesBin::is_empty));
}

#[test]
fn test_zero_bins_is_noop() {
  let config = ScatterConfig::default();
  let out = scan(&flat_tile(4), &lush_field(), 0, 0, &config);
  assert!(out.bins.is_empty());
  assert_eq!(out.processed_triangles, 0);
  assert_eq!(out.total_triangles, 4 * 4 * 2);
}

#[test]
fn test_region_for_tile() {
  let grid = TileGrid::new(Vec3::splat(32.0));
  let region = ScanRegion::for_tile(&grid, TileCoord::new(1, 0, 2), Vec3::new(0.0, 0.0, 32.0));
  assert_eq!(region.world, Vec3::new(32.0, 0.0, 64.0));
  assert_eq!(region.min, Vec3::new(32.0, 0.0, 32.0));
  assert_eq!(region.max, Vec3::new(64.0, 32.0, 64.0));
  assert!(region.contains(region.max));
  assert!(!region.contains(Vec3::new(31.9, 0.0, 40.0)));
}
