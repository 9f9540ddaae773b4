//! Benchmarks for placement scanning and zone building.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use vegetation_plugin::{
  build_batch, BilinearNoise, MaterialId, MeshPart, PlacementRasterizer, ScanRegion, ScatterConfig, SpeciesTemplate,
  TemplateMesh, TerrainMesh, TileCoord, TileGrid, TreeZoneFactory,
};

const TILE: f32 = 32.0;

/// Rolling hills, gentle enough that most triangles pass the slope test.
fn hills(cells: usize) -> TerrainMesh {
  let spacing = TILE / cells as f32;
  TerrainMesh::from_heightfield(cells, cells, spacing, |x, z| {
    2.0 * (x * 0.15).sin() + 1.5 * (z * 0.11).cos() + 4.0
  })
}

/// Two crossed cards.
fn card(height: f32) -> TemplateMesh {
  let h = height * 0.5;
  TemplateMesh::new(
    vec![
      Vec3::new(-h, 0.0, 0.0),
      Vec3::new(h, 0.0, 0.0),
      Vec3::new(h, height, 0.0),
      Vec3::new(-h, height, 0.0),
      Vec3::new(0.0, 0.0, -h),
      Vec3::new(0.0, 0.0, h),
      Vec3::new(0.0, height, h),
      Vec3::new(0.0, height, -h),
    ],
    vec![Vec3::Z, Vec3::Z, Vec3::Z, Vec3::Z, Vec3::X, Vec3::X, Vec3::X, Vec3::X],
    vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7],
  )
}

fn species(name: &str) -> SpeciesTemplate {
  let full = || vec![MeshPart::new("trunk", card(3.0)), MeshPart::new("crown", card(6.0))];
  SpeciesTemplate::new(name, [full(), full(), vec![MeshPart::new("impostor", card(6.0))]])
    .expect("bench species is valid")
}

fn bench_scan(c: &mut Criterion) {
  let config = ScatterConfig::default();
  let field = BilinearNoise::random(256, 256, 42);
  let region = ScanRegion::new(Vec3::ZERO, Vec3::splat(TILE), Vec3::ZERO);

  let mut group = c.benchmark_group("rasterizer::scan");
  for cells in [16usize, 32, 64] {
    let mesh = hills(cells);
    group.bench_with_input(BenchmarkId::from_parameter(cells), &mesh, |b, mesh| {
      b.iter(|| {
        let output = PlacementRasterizer::new(4, TileCoord::default().seed(), region, &field, &config)
          .scan_source(black_box(mesh));
        black_box(output)
      })
    });
  }
  group.finish();
}

fn bench_zone_lifecycle(c: &mut Criterion) {
  let factory = TreeZoneFactory::new(
    TileGrid::new(Vec3::splat(TILE)),
    vec![species("oak"), species("birch"), species("pine"), species("spruce")],
    Arc::new(BilinearNoise::random(256, 256, 42)),
    MaterialId(0),
  )
  .with_parent(Arc::new(hills(32)));

  c.bench_function("zone::build+apply+release (32 cells, 4 species)", |b| {
    b.iter(|| {
      let mut zone = factory.create_zone(TileCoord::default());
      zone.build().expect("build");
      zone.apply().expect("apply");
      zone.release().expect("release");
      black_box(zone.tree_count())
    })
  });

  c.bench_function("build_queue::build_batch (16 zones)", |b| {
    b.iter(|| {
      let mut zones: Vec<_> = (0..16).map(|_| factory.create_zone(TileCoord::default())).collect();
      let results = build_batch(black_box(&mut zones));
      for zone in &mut zones {
        zone.release().expect("release");
      }
      black_box(results)
    })
  });
}

criterion_group!(benches, bench_scan, bench_zone_lifecycle);
criterion_main!(benches);
