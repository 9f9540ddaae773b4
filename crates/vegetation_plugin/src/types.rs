//! Core data types shared by the scatter, instancing and zone stages.

use glam::{Mat4, Quat, Vec3};

/// One planted object: position, orientation and size.
///
/// Records are produced by the rasterizer and are never modified afterwards;
/// the owning [`SpeciesBin`] is shared read-only once placements are computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRecord {
  /// Position relative to the tile's minimum corner.
  pub position: Vec3,

  /// Orientation (random yaw composed with the surface tilt).
  pub rotation: Quat,

  /// Uniform scale. Reserved for size variation, currently always 1.0.
  pub scale: f32,
}

impl PlacementRecord {
  pub fn new(position: Vec3, rotation: Quat, scale: f32) -> Self {
    Self {
      position,
      rotation,
      scale,
    }
  }

  /// Local-to-tile transform for this placement.
  #[inline]
  pub fn transform(&self) -> Mat4 {
    Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.position)
  }
}

/// Placements for one species within one tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpeciesBin {
  records: Vec<PlacementRecord>,
}

impl SpeciesBin {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn push(&mut self, record: PlacementRecord) {
    self.records.push(record);
  }

  pub fn records(&self) -> &[PlacementRecord] {
    &self.records
  }

  pub fn iter(&self) -> impl Iterator<Item = &PlacementRecord> {
    self.records.iter()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

impl FromIterator<PlacementRecord> for SpeciesBin {
  fn from_iter<I: IntoIterator<Item = PlacementRecord>>(iter: I) -> Self {
    Self {
      records: iter.into_iter().collect(),
    }
  }
}

/// A single source triangle from a parent tile's mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
  /// Ordinal of the triangle within its mesh.
  pub index: usize,

  /// Vertex positions in the parent tile's local space.
  pub vertices: [Vec3; 3],

  /// Per-vertex unit normals.
  pub normals: [Vec3; 3],
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  pub min: Vec3,
  pub max: Vec3,
}

impl Aabb {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: Vec3::splat(f32::INFINITY),
      max: Vec3::splat(f32::NEG_INFINITY),
    }
  }

  pub fn new(min: Vec3, max: Vec3) -> Self {
    Self { min, max }
  }

  /// Smallest box containing every point.
  pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
    let mut aabb = Self::empty();
    for p in points {
      aabb.encapsulate(*p);
    }
    aabb
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Expand AABB to include another box.
  #[inline]
  pub fn merge(&mut self, other: &Aabb) {
    if other.is_valid() {
      self.encapsulate(other.min);
      self.encapsulate(other.max);
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }

  /// Inclusive containment test.
  #[inline]
  pub fn contains(&self, point: Vec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }

  pub fn corners(&self) -> [Vec3; 8] {
    let (a, b) = (self.min, self.max);
    [
      Vec3::new(a.x, a.y, a.z),
      Vec3::new(b.x, a.y, a.z),
      Vec3::new(a.x, b.y, a.z),
      Vec3::new(b.x, b.y, a.z),
      Vec3::new(a.x, a.y, b.z),
      Vec3::new(b.x, a.y, b.z),
      Vec3::new(a.x, b.y, b.z),
      Vec3::new(b.x, b.y, b.z),
    ]
  }

  /// Bounds of this box after an affine transform.
  pub fn transformed(&self, transform: &Mat4) -> Aabb {
    if !self.is_valid() {
      return *self;
    }
    let mut out = Aabb::empty();
    for corner in self.corners() {
      out.encapsulate(transform.transform_point3(corner));
    }
    out
  }
}

impl Default for Aabb {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
