//! Render geometry produced for a tile.
//!
//! GPU buffers live outside the Rust heap from the renderer's point of view:
//! dropping the last reference does not free the device allocation, so every
//! [`GpuBuffer`] must be destroyed explicitly, exactly once. Buffers shared
//! between detail tiers are shared through `Arc`; whoever releases a tile
//! deduplicates them by pointer before destroying.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use smallvec::SmallVec;

use crate::error::LifecycleError;
use crate::species::TemplateMesh;
use crate::stats::VegetationStats;
use crate::types::Aabb;

/// Atomic counter for generating unique BufferIds.
static BUFFER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque buffer identifier, unique within the process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BufferId(u64);

impl BufferId {
  fn next() -> Self {
    Self(BUFFER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

impl fmt::Display for BufferId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// What a buffer holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
  /// Column-major 4x4 transform per instance (16 floats each).
  InstanceTransforms,
  /// xyz per vertex.
  Position,
  /// xyz per vertex.
  Normal,
  /// Triangle list indices.
  Index,
}

/// Buffer contents.
#[derive(Clone, Debug, PartialEq)]
pub enum BufferData {
  F32(Vec<f32>),
  U32(Vec<u32>),
}

impl BufferData {
  pub fn len(&self) -> usize {
    match self {
      BufferData::F32(v) => v.len(),
      BufferData::U32(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Device-side buffer with explicit destruction.
pub struct GpuBuffer {
  id: BufferId,
  kind: BufferKind,
  len: usize,
  data: Mutex<Option<BufferData>>,
  stats: Arc<VegetationStats>,
}

impl GpuBuffer {
  pub(crate) fn new(kind: BufferKind, data: BufferData, stats: &Arc<VegetationStats>) -> Arc<Self> {
    stats.record_buffer_allocated();
    Arc::new(Self {
      id: BufferId::next(),
      kind,
      len: data.len(),
      data: Mutex::new(Some(data)),
      stats: Arc::clone(stats),
    })
  }

  pub fn id(&self) -> BufferId {
    self.id
  }

  pub fn kind(&self) -> BufferKind {
    self.kind
  }

  /// Element count at creation (floats or indices).
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn is_destroyed(&self) -> bool {
    self.data.lock().unwrap_or_else(PoisonError::into_inner).is_none()
  }

  /// Read the contents (for upload). `None` once destroyed.
  pub fn with_data<R>(&self, f: impl FnOnce(&BufferData) -> R) -> Option<R> {
    self.data.lock().unwrap_or_else(PoisonError::into_inner).as_ref().map(f)
  }

  /// Free the backing storage. Fails if already destroyed.
  pub fn destroy(&self) -> Result<(), LifecycleError> {
    let freed = self.data.lock().unwrap_or_else(PoisonError::into_inner).take();
    match freed {
      Some(_) => {
        tracing::trace!(buffer = %self.id, kind = ?self.kind, "destroying buffer");
        self.stats.record_buffer_destroyed();
        Ok(())
      }
      None => {
        tracing::error!(buffer = %self.id, "buffer destroyed twice");
        Err(LifecycleError::BufferDestroyedTwice(self.id))
      }
    }
  }
}

impl fmt::Debug for GpuBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("GpuBuffer")
      .field("id", &self.id)
      .field("kind", &self.kind)
      .field("len", &self.len)
      .field("destroyed", &self.is_destroyed())
      .finish()
  }
}

impl Drop for GpuBuffer {
  fn drop(&mut self) {
    let live = self.data.get_mut().unwrap_or_else(PoisonError::into_inner).is_some();
    if live {
      tracing::warn!(buffer = %self.id, kind = ?self.kind, "gpu buffer dropped without destroy");
    }
  }
}

/// Shadow participation of a part.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShadowMode {
  #[default]
  Off,
  Cast,
  Receive,
  CastAndReceive,
}

/// Opaque handle to the render material bound by the zone factory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Device resources behind one part.
#[derive(Clone, Debug)]
pub enum PartMesh {
  /// Template mesh drawn once per transform.
  Instanced {
    template: Arc<TemplateMesh>,
    transforms: Arc<GpuBuffer>,
    bounds: Arc<Aabb>,
    instance_count: usize,
  },
  /// One merged static mesh.
  Batched {
    positions: Arc<GpuBuffer>,
    normals: Arc<GpuBuffer>,
    indices: Arc<GpuBuffer>,
    bounds: Aabb,
  },
}

impl PartMesh {
  /// Every buffer backing this part.
  pub fn buffers(&self) -> SmallVec<[&Arc<GpuBuffer>; 3]> {
    match self {
      PartMesh::Instanced { transforms, .. } => SmallVec::from_slice(&[transforms]),
      PartMesh::Batched {
        positions,
        normals,
        indices,
        ..
      } => SmallVec::from_slice(&[positions, normals, indices]),
    }
  }

  pub fn bounds(&self) -> Aabb {
    match self {
      PartMesh::Instanced { bounds, .. } => **bounds,
      PartMesh::Batched { bounds, .. } => *bounds,
    }
  }

  pub fn is_instanced(&self) -> bool {
    matches!(self, PartMesh::Instanced { .. })
  }
}

/// One renderable object of a tile: a species' mesh part at one tier.
#[derive(Clone, Debug)]
pub struct GeometryPart {
  pub name: String,
  pub species: usize,
  pub lod: usize,
  pub material: MaterialId,
  pub shadow_mode: ShadowMode,
  pub mesh: PartMesh,
}
