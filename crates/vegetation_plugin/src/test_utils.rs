//! Shared fixtures for unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec3;

use crate::density::BilinearNoise;
use crate::geometry::{BufferId, GeometryPart};
use crate::grid::TileCoord;
use crate::mesh::TerrainMesh;
use crate::scene::PresentationLayer;
use crate::species::{MeshPart, SpeciesTemplate, TemplateMesh};

/// Vertical quad in the XY plane, `height` tall and wide, base centered on
/// the origin.
pub fn quad_mesh(height: f32) -> TemplateMesh {
  let h = height * 0.5;
  TemplateMesh::new(
    vec![
      Vec3::new(-h, 0.0, 0.0),
      Vec3::new(h, 0.0, 0.0),
      Vec3::new(h, height, 0.0),
      Vec3::new(-h, height, 0.0),
    ],
    vec![Vec3::Z; 4],
    vec![0, 1, 2, 0, 2, 3],
  )
}

/// Species with trunk and leaves on the instanced tiers and a single card on
/// the batched tier.
pub fn species(name: &str) -> SpeciesTemplate {
  let full = || vec![MeshPart::new("trunk", quad_mesh(4.0)), MeshPart::new("leaves", quad_mesh(6.0))];
  SpeciesTemplate::new(name, [full(), full(), vec![MeshPart::new("card", quad_mesh(5.0))]])
    .expect("fixture species is valid")
}

/// Dense, saturated field: every flat sample is accepted and lands in the
/// last bin.
pub fn lush_field() -> BilinearNoise {
  BilinearNoise::constant([255, 255, 128, 128])
}

/// Field that never accepts a sample.
pub fn barren_field() -> BilinearNoise {
  BilinearNoise::constant([0, 0, 128, 128])
}

/// Flat `cells x cells` terrain at height zero with unit spacing.
pub fn flat_tile(cells: usize) -> TerrainMesh {
  TerrainMesh::from_heightfield(cells, cells, 1.0, |_, _| 0.0)
}

/// Vertical wall - no triangle passes the slope test.
pub fn wall_tile() -> TerrainMesh {
  TerrainMesh::new(
    vec![
      Vec3::new(0.0, 0.0, 1.0),
      Vec3::new(8.0, 0.0, 1.0),
      Vec3::new(8.0, 8.0, 1.0),
      Vec3::new(0.0, 8.0, 1.0),
    ],
    vec![Vec3::Z; 4],
    vec![0, 1, 2, 0, 2, 3],
  )
}

/// Destroy every distinct buffer behind `parts`.
pub fn destroy_all(parts: &[Arc<GeometryPart>]) {
  let mut seen = HashSet::new();
  for part in parts {
    for buffer in part.mesh.buffers() {
      if seen.insert(buffer.id()) {
        buffer.destroy().expect("buffer destroyed once");
      }
    }
  }
}

/// Scene callback recorded by [`RecordingPresentation`].
#[derive(Clone, Debug, PartialEq)]
pub enum SceneEvent {
  Attached { coord: TileCoord, part: String },
  Detached { coord: TileCoord, part: String },
  BufferFreed(BufferId),
  Released(TileCoord),
}

/// Presentation layer that records every callback.
#[derive(Default)]
pub struct RecordingPresentation {
  events: Mutex<Vec<SceneEvent>>,
}

impl RecordingPresentation {
  pub fn events(&self) -> Vec<SceneEvent> {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn count(&self, f: impl Fn(&SceneEvent) -> bool) -> usize {
    self.events().iter().filter(|e| f(e)).count()
  }

  fn push(&self, event: SceneEvent) {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
  }
}

impl PresentationLayer for RecordingPresentation {
  fn on_part_attached(&self, coord: TileCoord, part: &GeometryPart) {
    self.push(SceneEvent::Attached {
      coord,
      part: part.name.clone(),
    });
  }

  fn on_part_detached(&self, coord: TileCoord, part: &GeometryPart) {
    self.push(SceneEvent::Detached {
      coord,
      part: part.name.clone(),
    });
  }

  fn on_buffer_destroyed(&self, id: BufferId) {
    self.push(SceneEvent::BufferFreed(id));
  }

  fn on_zone_released(&self, coord: TileCoord) {
    self.push(SceneEvent::Released(coord));
  }
}
