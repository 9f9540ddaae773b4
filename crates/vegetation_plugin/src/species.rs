//! Per-species render templates.
//!
//! A [`SpeciesTemplate`] is derived once from authoring geometry (the output of
//! the tree generator: three detail tiers, each a list of named mesh parts)
//! and is then shared read-only by every zone.

use std::sync::Arc;

use glam::Vec3;
use smallvec::SmallVec;

use crate::error::TemplateError;
use crate::lod::{RenderMode, LOD_COUNT};
use crate::types::Aabb;

/// Authoring mesh for one part of one tier (trunk, leaves, impostor quad...).
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateMesh {
  positions: Vec<Vec3>,
  normals: Vec<Vec3>,
  indices: Vec<u32>,
  bounds: Aabb,
}

impl TemplateMesh {
  /// Missing normals default to +Y.
  pub fn new(positions: Vec<Vec3>, mut normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
    normals.resize(positions.len(), Vec3::Y);
    let bounds = Aabb::from_points(&positions);
    Self {
      positions,
      normals,
      indices,
      bounds,
    }
  }

  pub fn positions(&self) -> &[Vec3] {
    &self.positions
  }

  pub fn normals(&self) -> &[Vec3] {
    &self.normals
  }

  pub fn indices(&self) -> &[u32] {
    &self.indices
  }

  pub fn bounds(&self) -> Aabb {
    self.bounds
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty() || self.indices.len() < 3
  }
}

/// A named authoring mesh.
#[derive(Clone, Debug)]
pub struct MeshPart {
  pub name: String,
  pub mesh: Arc<TemplateMesh>,
}

impl MeshPart {
  pub fn new(name: impl Into<String>, mesh: TemplateMesh) -> Self {
    Self {
      name: name.into(),
      mesh: Arc::new(mesh),
    }
  }
}

/// Mesh part realized through GPU instancing.
#[derive(Clone, Debug)]
pub struct InstanceTemplate {
  part: MeshPart,
}

impl InstanceTemplate {
  pub fn new(part: MeshPart) -> Self {
    Self { part }
  }

  pub fn part(&self) -> &MeshPart {
    &self.part
  }
}

/// Mesh part realized by merging every placement into one static mesh.
#[derive(Clone, Debug)]
pub struct BatchTemplate {
  part: MeshPart,
}

impl BatchTemplate {
  pub fn new(part: MeshPart) -> Self {
    Self { part }
  }

  pub fn part(&self) -> &MeshPart {
    &self.part
  }
}

/// Templates for one species at one tier. The mode is fixed when the species
/// is set up and never mixed within a tier.
#[derive(Clone, Debug)]
pub enum LodTemplate {
  Instanced(SmallVec<[InstanceTemplate; 2]>),
  Batched(SmallVec<[BatchTemplate; 2]>),
}

impl LodTemplate {
  fn from_parts(mode: RenderMode, parts: Vec<MeshPart>) -> Self {
    match mode {
      RenderMode::Instanced => LodTemplate::Instanced(parts.into_iter().map(InstanceTemplate::new).collect()),
      RenderMode::Batched => LodTemplate::Batched(parts.into_iter().map(BatchTemplate::new).collect()),
    }
  }

  pub fn mode(&self) -> RenderMode {
    match self {
      LodTemplate::Instanced(_) => RenderMode::Instanced,
      LodTemplate::Batched(_) => RenderMode::Batched,
    }
  }

  pub fn part_count(&self) -> usize {
    match self {
      LodTemplate::Instanced(t) => t.len(),
      LodTemplate::Batched(t) => t.len(),
    }
  }
}

/// All tiers of one tree species.
#[derive(Clone, Debug)]
pub struct SpeciesTemplate {
  name: String,
  lods: [LodTemplate; LOD_COUNT],
  instance_extent: Aabb,
}

impl SpeciesTemplate {
  /// Build templates from the three authoring tiers (closest first).
  ///
  /// Every tier needs at least one non-empty part. The render mode of each
  /// tier follows [`RenderMode::for_tier`].
  pub fn new(name: impl Into<String>, tiers: [Vec<MeshPart>; LOD_COUNT]) -> Result<Self, TemplateError> {
    let name = name.into();
    let mut instance_extent = Aabb::empty();

    for (lod, parts) in tiers.iter().enumerate() {
      if parts.is_empty() {
        return Err(TemplateError::EmptyTier {
          species: name.clone(),
          lod,
        });
      }
      for part in parts {
        if part.mesh.is_empty() {
          return Err(TemplateError::EmptyMesh {
            species: name.clone(),
            part: part.name.clone(),
          });
        }
        if RenderMode::for_tier(lod) == RenderMode::Instanced {
          instance_extent.merge(&part.mesh.bounds());
        }
      }
    }

    let mut lod = 0;
    let lods = tiers.map(|parts| {
      let template = LodTemplate::from_parts(RenderMode::for_tier(lod), parts);
      lod += 1;
      template
    });

    Ok(Self {
      name,
      lods,
      instance_extent,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Panics if `lod >= LOD_COUNT`.
  pub fn lod(&self, lod: usize) -> &LodTemplate {
    debug_assert!(lod < LOD_COUNT, "lod {lod} out of range");
    &self.lods[lod]
  }

  pub fn lods(&self) -> &[LodTemplate; LOD_COUNT] {
    &self.lods
  }

  /// Union of every instanced part's bounds. One instance of any instanced
  /// tier fits inside it, so a single bounding volume serves all of them.
  pub fn instance_extent(&self) -> Aabb {
    self.instance_extent
  }
}
