//! Tile addressing - the slice of the paging grid the zones depend on.
//!
//! Which tiles exist and when they page in or out is decided elsewhere; a zone
//! only needs its own cell coordinates and the grid's cell-to-world mapping.

use std::fmt;

use glam::Vec3;

use crate::types::Aabb;

/// Integer cell coordinates of a tile - immutable value type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TileCoord {
  pub x: i32,
  pub y: i32,
  pub z: i32,
}

impl TileCoord {
  pub fn new(x: i32, y: i32, z: i32) -> Self {
    Self { x, y, z }
  }

  /// Placement RNG seed. Depends only on the coordinates so repeated builds
  /// of a tile plant identical trees.
  pub fn seed(&self) -> u64 {
    let xz = ((self.x as u32 as u64) << 32) | (self.z as u32 as u64);
    xz ^ (self.y as u32 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
  }

  /// Cell offset from `viewer` to this tile.
  pub fn relative_to(&self, viewer: TileCoord) -> (i32, i32, i32) {
    (
      self.x.wrapping_sub(viewer.x),
      self.y.wrapping_sub(viewer.y),
      self.z.wrapping_sub(viewer.z),
    )
  }
}

impl fmt::Display for TileCoord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
  }
}

/// Uniform grid mapping cell coordinates to world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileGrid {
  /// World size of one cell on each axis.
  pub cell_size: Vec3,

  /// World position of cell (0, 0, 0)'s minimum corner.
  pub origin: Vec3,
}

impl TileGrid {
  pub fn new(cell_size: Vec3) -> Self {
    Self {
      cell_size,
      origin: Vec3::ZERO,
    }
  }

  pub fn with_origin(mut self, origin: Vec3) -> Self {
    self.origin = origin;
    self
  }

  /// World-space minimum corner of a cell.
  #[inline]
  pub fn to_world(&self, coord: TileCoord) -> Vec3 {
    self.origin
      + Vec3::new(
        coord.x as f32 * self.cell_size.x,
        coord.y as f32 * self.cell_size.y,
        coord.z as f32 * self.cell_size.z,
      )
  }

  /// Cell containing a world position.
  pub fn to_cell(&self, world: Vec3) -> TileCoord {
    let local = (world - self.origin) / self.cell_size;
    TileCoord::new(
      local.x.floor() as i32,
      local.y.floor() as i32,
      local.z.floor() as i32,
    )
  }

  /// World-space bounds of a cell.
  pub fn cell_bounds(&self, coord: TileCoord) -> Aabb {
    let min = self.to_world(coord);
    Aabb::new(min, min + self.cell_size)
  }
}

impl Default for TileGrid {
  fn default() -> Self {
    Self::new(Vec3::splat(32.0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_to_world_with_origin() {
    let grid = TileGrid::new(Vec3::new(32.0, 64.0, 32.0)).with_origin(Vec3::new(100.0, 0.0, -50.0));
    let world = grid.to_world(TileCoord::new(2, 0, -1));
    assert_eq!(world, Vec3::new(164.0, 0.0, -82.0));
  }

  #[test]
  fn test_to_cell_roundtrip() {
    let grid = TileGrid::default();
    for coord in [TileCoord::new(0, 0, 0), TileCoord::new(-3, 1, 7), TileCoord::new(5, -2, -9)] {
      let center = grid.to_world(coord) + grid.cell_size * 0.5;
      assert_eq!(grid.to_cell(center), coord);
    }
  }

  #[test]
  fn test_cell_bounds() {
    let grid = TileGrid::new(Vec3::splat(16.0));
    let bounds = grid.cell_bounds(TileCoord::new(1, 0, 1));
    assert_eq!(bounds.min, Vec3::new(16.0, 0.0, 16.0));
    assert_eq!(bounds.max, Vec3::new(32.0, 16.0, 32.0));
  }

  #[test]
  fn test_seed_is_stable_and_distinct() {
    let a = TileCoord::new(3, 0, 4);
    assert_eq!(a.seed(), TileCoord::new(3, 0, 4).seed());
    assert_ne!(a.seed(), TileCoord::new(4, 0, 3).seed());
    assert_ne!(a.seed(), TileCoord::new(3, 1, 4).seed());
    assert_ne!(TileCoord::new(-1, 0, 0).seed(), TileCoord::new(1, 0, 0).seed());
  }

  #[test]
  fn test_relative_to() {
    let tile = TileCoord::new(5, 0, -2);
    assert_eq!(tile.relative_to(TileCoord::new(2, 0, 1)), (3, 0, -3));
  }

  #[test]
  fn test_relative_to_extremes_wraps() {
    let tile = TileCoord::new(i32::MAX, 0, i32::MIN);
    assert_eq!(tile.relative_to(TileCoord::new(-1, 0, 1)), (i32::MIN, 0, i32::MAX));
  }
}
