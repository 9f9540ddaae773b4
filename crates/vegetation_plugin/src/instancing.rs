//! Species instance builder - realizes one species' placements as geometry.
//!
//! Instanced tiers share a single per-instance transform buffer and bounding
//! volume: the first instanced part of the build pass allocates them, every
//! later instanced part (same tier or another tier) reuses them. The batched
//! tier bakes every placement into merged vertex data per part.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::geometry::{BufferData, BufferKind, GeometryPart, GpuBuffer, MaterialId, PartMesh, ShadowMode};
use crate::species::{BatchTemplate, InstanceTemplate, LodTemplate, SpeciesTemplate};
use crate::stats::{VegetationStats, ZoneCounters};
use crate::types::{Aabb, SpeciesBin};

/// Parts realized for one species at one tier.
pub type PartList = SmallVec<[Arc<GeometryPart>; 2]>;

/// Floats per instance transform (column-major 4x4).
pub const TRANSFORM_STRIDE: usize = 16;

/// Instance data shared by every instanced part of one species build.
#[derive(Clone, Debug)]
struct SharedInstances {
  transforms: Arc<GpuBuffer>,
  bounds: Arc<Aabb>,
  count: usize,
}

/// Builds the parts of one species for every tier of a single zone build.
///
/// Lives for one species' pass over the tiers; sharing never crosses species
/// or builds.
pub struct SpeciesInstanceBuilder<'a> {
  species: &'a SpeciesTemplate,
  species_index: usize,
  material: MaterialId,
  stats: &'a Arc<VegetationStats>,
  counters: &'a ZoneCounters,
  shared: Option<SharedInstances>,
}

impl<'a> SpeciesInstanceBuilder<'a> {
  pub fn new(
    species: &'a SpeciesTemplate,
    species_index: usize,
    material: MaterialId,
    stats: &'a Arc<VegetationStats>,
    counters: &'a ZoneCounters,
  ) -> Self {
    Self {
      species,
      species_index,
      material,
      stats,
      counters,
      shared: None,
    }
  }

  /// Geometry for `lod` from the species' placements. `None` when the bin is
  /// empty or `lod` is not a tier.
  pub fn realize(&mut self, lod: usize, bin: &SpeciesBin) -> Option<PartList> {
    if bin.is_empty() {
      return None;
    }
    let Some(template) = self.species.lods().get(lod) else {
      tracing::warn!(species = self.species.name(), lod, "no such tier");
      return None;
    };

    let parts = match template {
      LodTemplate::Instanced(templates) => templates
        .iter()
        .map(|t| Arc::new(self.instanced(t, lod, bin)))
        .collect(),
      LodTemplate::Batched(templates) => templates
        .iter()
        .map(|t| Arc::new(self.batched(t, lod, bin)))
        .collect(),
    };
    Some(parts)
  }

  fn instanced(&mut self, template: &InstanceTemplate, lod: usize, bin: &SpeciesBin) -> GeometryPart {
    let shared = self.shared_instances(bin);
    let mesh = PartMesh::Instanced {
      template: Arc::clone(&template.part().mesh),
      transforms: shared.transforms,
      bounds: shared.bounds,
      instance_count: shared.count,
    };
    self.part(&template.part().name, lod, mesh)
  }

  fn batched(&self, template: &BatchTemplate, lod: usize, bin: &SpeciesBin) -> GeometryPart {
    let source = &template.part().mesh;
    let vertices = source.vertex_count();
    let mut positions = Vec::with_capacity(vertices * bin.len() * 3);
    let mut normals = Vec::with_capacity(vertices * bin.len() * 3);
    let mut indices = Vec::with_capacity(source.indices().len() * bin.len());
    let mut bounds = Aabb::empty();

    for (i, record) in bin.iter().enumerate() {
      let transform = record.transform();
      let base = (i * vertices) as u32;

      for p in source.positions() {
        let p = transform.transform_point3(*p);
        bounds.encapsulate(p);
        positions.extend_from_slice(&p.to_array());
      }
      for n in source.normals() {
        normals.extend_from_slice(&transform.transform_vector3(*n).normalize_or_zero().to_array());
      }
      indices.extend(source.indices().iter().map(|idx| idx + base));
    }

    let mesh = PartMesh::Batched {
      positions: self.allocate(BufferKind::Position, BufferData::F32(positions)),
      normals: self.allocate(BufferKind::Normal, BufferData::F32(normals)),
      indices: self.allocate(BufferKind::Index, BufferData::U32(indices)),
      bounds,
    };
    self.part(&template.part().name, lod, mesh)
  }

  /// Transform buffer and bounds for the instanced tiers, allocated on first
  /// use.
  fn shared_instances(&mut self, bin: &SpeciesBin) -> SharedInstances {
    if let Some(shared) = &self.shared {
      return shared.clone();
    }

    let extent = self.species.instance_extent();
    let mut bounds = Aabb::empty();
    let mut transforms = Vec::with_capacity(bin.len() * TRANSFORM_STRIDE);
    for record in bin.iter() {
      let transform = record.transform();
      transforms.extend_from_slice(&transform.to_cols_array());
      bounds.merge(&extent.transformed(&transform));
    }

    let shared = SharedInstances {
      transforms: self.allocate(BufferKind::InstanceTransforms, BufferData::F32(transforms)),
      bounds: Arc::new(bounds),
      count: bin.len(),
    };
    self.shared = Some(shared.clone());
    shared
  }

  fn allocate(&self, kind: BufferKind, data: BufferData) -> Arc<GpuBuffer> {
    self.counters.record_allocation();
    GpuBuffer::new(kind, data, self.stats)
  }

  fn part(&self, name: &str, lod: usize, mesh: PartMesh) -> GeometryPart {
    GeometryPart {
      name: format!("{}_{}_lod{}", self.species.name(), name, lod),
      species: self.species_index,
      lod,
      material: self.material,
      shadow_mode: ShadowMode::CastAndReceive,
      mesh,
    }
  }
}
