//! Error types.
//!
//! [`LifecycleError`] values indicate a zone bookkeeping bug (GPU buffers freed
//! twice, or never). Callers should treat them as fatal.

use thiserror::Error;

use crate::geometry::BufferId;
use crate::grid::TileCoord;

/// Zone lifecycle invariant violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
  #[error("zone {0} already released")]
  AlreadyReleased(TileCoord),

  #[error("mismatched buffer destroy in zone {0}: active buffer count went negative")]
  NegativeActiveBuffers(TileCoord),

  #[error("zone {coord} destroy mismatch: {allocations} allocations, {destroys} destroys")]
  DestroyMismatch {
    coord: TileCoord,
    allocations: u32,
    destroys: u32,
  },

  #[error("gpu buffer {0} destroyed twice")]
  BufferDestroyedTwice(BufferId),
}

/// Species template construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
  #[error("species '{species}' has no mesh parts at LOD {lod}")]
  EmptyTier { species: String, lod: usize },

  #[error("species '{species}' part '{part}' has no triangles")]
  EmptyMesh { species: String, part: String },
}
