//! Parent tile geometry as a lazy triangle stream.
//!
//! The rasterizer never sees a mesh representation directly; it consumes
//! [`Triangle`] records from a [`TriangleSource`]. Every call to
//! [`TriangleSource::triangles`] starts a fresh scan.

use glam::Vec3;

use crate::types::Triangle;

/// Anything that can enumerate triangles with per-vertex normals.
pub trait TriangleSource: Send + Sync {
  /// Start a new scan over all triangles.
  fn triangles(&self) -> Box<dyn Iterator<Item = Triangle> + '_>;

  /// Number of triangles a full scan visits (upper bound when malformed
  /// triangles are skipped).
  fn triangle_count(&self) -> usize;
}

/// The terrain tile whose surface trees are planted on.
///
/// Triangle positions are local to the parent; `world_location` places that
/// local space in the world.
pub trait ParentTile: TriangleSource {
  fn world_location(&self) -> Vec3;
}

/// Indexed triangle mesh with per-vertex normals.
#[derive(Clone, Debug, Default)]
pub struct TerrainMesh {
  origin: Vec3,
  positions: Vec<Vec3>,
  normals: Vec<Vec3>,
  indices: Vec<u32>,
}

impl TerrainMesh {
  /// Build from raw buffers. `normals` must be parallel to `positions`;
  /// missing normals default to +Y.
  pub fn new(positions: Vec<Vec3>, mut normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
    normals.resize(positions.len(), Vec3::Y);
    Self {
      origin: Vec3::ZERO,
      positions,
      normals,
      indices,
    }
  }

  /// Regular heightfield of `cells_x * cells_z` quads, two triangles each.
  /// Normals come from central differences of `height`.
  pub fn from_heightfield(
    cells_x: usize,
    cells_z: usize,
    spacing: f32,
    height: impl Fn(f32, f32) -> f32,
  ) -> Self {
    let row = cells_x + 1;
    let mut positions = Vec::with_capacity(row * (cells_z + 1));
    let mut normals = Vec::with_capacity(positions.capacity());

    for iz in 0..=cells_z {
      for ix in 0..=cells_x {
        let x = ix as f32 * spacing;
        let z = iz as f32 * spacing;
        positions.push(Vec3::new(x, height(x, z), z));

        let dx = height(x + spacing, z) - height(x - spacing, z);
        let dz = height(x, z + spacing) - height(x, z - spacing);
        normals.push(Vec3::new(-dx, 2.0 * spacing, -dz).normalize());
      }
    }

    let mut indices = Vec::with_capacity(cells_x * cells_z * 6);
    for iz in 0..cells_z {
      for ix in 0..cells_x {
        let i = (iz * row + ix) as u32;
        let r = row as u32;
        indices.extend_from_slice(&[i, i + r, i + 1, i + 1, i + r, i + r + 1]);
      }
    }

    Self {
      origin: Vec3::ZERO,
      positions,
      normals,
      indices,
    }
  }

  /// Place the mesh's local space in the world.
  pub fn with_origin(mut self, origin: Vec3) -> Self {
    self.origin = origin;
    self
  }

  pub fn positions(&self) -> &[Vec3] {
    &self.positions
  }

  pub fn iter(&self) -> TriangleIter<'_> {
    TriangleIter {
      mesh: self,
      next: 0,
    }
  }
}

impl TriangleSource for TerrainMesh {
  fn triangles(&self) -> Box<dyn Iterator<Item = Triangle> + '_> {
    Box::new(self.iter())
  }

  fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

impl ParentTile for TerrainMesh {
  fn world_location(&self) -> Vec3 {
    self.origin
  }
}

/// Lazy triangle walk over a [`TerrainMesh`].
///
/// Triangles referencing out-of-range vertices are skipped; their ordinal is
/// still consumed so indices stay stable.
pub struct TriangleIter<'a> {
  mesh: &'a TerrainMesh,
  next: usize,
}

impl Iterator for TriangleIter<'_> {
  type Item = Triangle;

  fn next(&mut self) -> Option<Triangle> {
    let mesh = self.mesh;
    let count = mesh.indices.len() / 3;
    while self.next < count {
      let index = self.next;
      self.next += 1;

      let idx = &mesh.indices[index * 3..index * 3 + 3];
      let vertex = |k: usize| {
        let i = idx[k] as usize;
        Some((*mesh.positions.get(i)?, *mesh.normals.get(i)?))
      };
      if let (Some(a), Some(b), Some(c)) = (vertex(0), vertex(1), vertex(2)) {
        return Some(Triangle {
          index,
          vertices: [a.0, b.0, c.0],
          normals: [a.1, b.1, c.1],
        });
      }
    }
    None
  }
}
