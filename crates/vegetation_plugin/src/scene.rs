//! Scene seam - where a zone's active geometry is attached for rendering.
//!
//! The core never talks to an engine directly. Each zone owns a [`ZoneRoot`]
//! holding the parts of its active tier, and every attach, detach and buffer
//! destroy is forwarded to a [`PresentationLayer`] so an engine bridge can
//! mirror it.

use std::sync::Arc;

use crate::geometry::{BufferId, GeometryPart};
use crate::grid::TileCoord;

/// Callback interface for engine bridges.
///
/// Must be thread-safe: zones may be released from a different thread than
/// the one that built them.
pub trait PresentationLayer: Send + Sync {
  /// A part became visible under the zone's root.
  fn on_part_attached(&self, coord: TileCoord, part: &GeometryPart);

  /// A part was removed from the zone's root.
  fn on_part_detached(&self, coord: TileCoord, part: &GeometryPart);

  /// A device buffer was freed. Bridges drop their upload of it.
  fn on_buffer_destroyed(&self, id: BufferId);

  /// The zone released all of its resources.
  fn on_zone_released(&self, coord: TileCoord);
}

/// No-op implementation for headless use.
pub struct NullPresentation;

impl PresentationLayer for NullPresentation {
  fn on_part_attached(&self, _coord: TileCoord, _part: &GeometryPart) {}

  fn on_part_detached(&self, _coord: TileCoord, _part: &GeometryPart) {}

  fn on_buffer_destroyed(&self, _id: BufferId) {}

  fn on_zone_released(&self, _coord: TileCoord) {}
}

/// Scene node a zone hangs its active parts under.
pub struct ZoneRoot {
  coord: TileCoord,
  children: Vec<Arc<GeometryPart>>,
  presentation: Arc<dyn PresentationLayer>,
}

impl ZoneRoot {
  pub fn new(coord: TileCoord, presentation: Arc<dyn PresentationLayer>) -> Self {
    Self {
      coord,
      children: Vec::new(),
      presentation,
    }
  }

  pub fn coord(&self) -> TileCoord {
    self.coord
  }

  pub fn attach(&mut self, part: &Arc<GeometryPart>) {
    self.presentation.on_part_attached(self.coord, part);
    self.children.push(Arc::clone(part));
  }

  /// Detach every child. Returns how many were attached.
  pub fn detach_all(&mut self) -> usize {
    let count = self.children.len();
    for part in self.children.drain(..) {
      self.presentation.on_part_detached(self.coord, &part);
    }
    count
  }

  /// Detach the children matching `f`. Returns how many were removed.
  pub fn detach_if(&mut self, f: impl Fn(&Arc<GeometryPart>) -> bool) -> usize {
    let before = self.children.len();
    let (detached, kept): (Vec<_>, Vec<_>) = self.children.drain(..).partition(|p| f(p));
    self.children = kept;
    for part in &detached {
      self.presentation.on_part_detached(self.coord, part);
    }
    before - self.children.len()
  }

  pub fn children(&self) -> &[Arc<GeometryPart>] {
    &self.children
  }

  pub fn is_attached(&self, part: &Arc<GeometryPart>) -> bool {
    self.children.iter().any(|c| Arc::ptr_eq(c, part))
  }

  pub fn len(&self) -> usize {
    self.children.len()
  }

  pub fn is_empty(&self) -> bool {
    self.children.is_empty()
  }

  pub(crate) fn presentation(&self) -> &dyn PresentationLayer {
    self.presentation.as_ref()
  }
}

impl std::fmt::Debug for ZoneRoot {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ZoneRoot")
      .field("coord", &self.coord)
      .field("children", &self.children.len())
      .finish()
  }
}
