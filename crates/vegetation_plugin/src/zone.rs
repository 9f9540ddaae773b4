//! Tile zone - the paged unit of tree scattering.
//!
//! ```text
//!   Unbuilt ──build()──► Built ──apply()──► Applied{lod}
//!                                             │    ▲
//!                                      build()│    │apply()
//!                                             ▼    │
//!                                         Rebuilding{lod}
//!
//!   any state ──release()──► Released   (exactly once)
//! ```
//!
//! `build()` is the expensive part (rasterize, then realize three tiers) and
//! runs off the render thread. `apply()` and `release()` touch the scene root
//! and GPU buffers and belong on the thread that owns them.
//!
//! The zone keeps two LOD sets: `built`, the latest build, and `active`, the
//! one attached to the scene. They differ only between a build and the next
//! apply, and the swap is a single `Arc` assignment.

use std::collections::HashSet;
use std::sync::Arc;

use web_time::Instant;

use crate::config::ScatterConfig;
use crate::density::DensityField;
use crate::error::LifecycleError;
use crate::geometry::{GeometryPart, GpuBuffer, MaterialId};
use crate::grid::{TileCoord, TileGrid};
use crate::instancing::SpeciesInstanceBuilder;
use crate::lod::{detail_tier, LOD_COUNT};
use crate::mesh::ParentTile;
use crate::rasterizer::{PlacementRasterizer, ScanOutput, ScanRegion};
use crate::scene::{NullPresentation, PresentationLayer, ZoneRoot};
use crate::species::SpeciesTemplate;
use crate::stats::{VegetationStats, ZoneCounters};
use crate::types::SpeciesBin;

/// Every species' parts at one detail tier.
#[derive(Debug, Default)]
pub struct LodLevel {
  parts: Vec<Arc<GeometryPart>>,
}

impl LodLevel {
  pub fn parts(&self) -> &[Arc<GeometryPart>] {
    &self.parts
  }

  pub fn len(&self) -> usize {
    self.parts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.parts.is_empty()
  }
}

/// The three tiers produced by one build pass.
#[derive(Debug, Default)]
pub struct LodSet {
  levels: [LodLevel; LOD_COUNT],
}

impl LodSet {
  /// Panics if `lod >= LOD_COUNT`.
  pub fn level(&self, lod: usize) -> &LodLevel {
    debug_assert!(lod < LOD_COUNT, "lod {lod} out of range");
    &self.levels[lod]
  }

  pub fn levels(&self) -> &[LodLevel; LOD_COUNT] {
    &self.levels
  }

  pub fn part_count(&self) -> usize {
    self.levels.iter().map(LodLevel::len).sum()
  }

  pub fn contains(&self, part: &Arc<GeometryPart>) -> bool {
    self.levels.iter().flat_map(|l| l.parts.iter()).any(|p| Arc::ptr_eq(p, part))
  }

  /// Every buffer behind the set, each listed once even when several tiers
  /// share it.
  pub fn distinct_buffers(&self) -> Vec<Arc<GpuBuffer>> {
    let mut seen = HashSet::new();
    let mut buffers = Vec::new();
    for part in self.levels.iter().flat_map(|l| l.parts.iter()) {
      for buffer in part.mesh.buffers() {
        if seen.insert(buffer.id()) {
          buffers.push(Arc::clone(buffer));
        }
      }
    }
    buffers
  }
}

/// Observable lifecycle state of a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneState {
  Unbuilt,
  /// A build exists that has not been applied yet.
  Built,
  Applied { lod: usize },
  /// A newer build is waiting while an older one is applied at `lod`.
  Rebuilding { lod: usize },
  Released,
}

/// Everything zones created by one factory share.
#[derive(Clone)]
struct ZoneContext {
  grid: TileGrid,
  material: MaterialId,
  density: Arc<dyn DensityField>,
  species: Arc<[SpeciesTemplate]>,
  config: ScatterConfig,
  stats: Arc<VegetationStats>,
  presentation: Arc<dyn PresentationLayer>,
}

/// Trees for one terrain tile.
pub struct TileZone {
  coord: TileCoord,
  context: Arc<ZoneContext>,
  parent: Option<Arc<dyn ParentTile>>,
  placements: Option<Arc<[SpeciesBin]>>,
  built: Option<Arc<LodSet>>,
  active: Option<Arc<LodSet>>,
  selected_lod: usize,
  applied_lod: Option<usize>,
  root: ZoneRoot,
  counters: ZoneCounters,
  released: bool,
}

fn same_set(a: &Option<Arc<LodSet>>, b: &Option<Arc<LodSet>>) -> bool {
  match (a, b) {
    (Some(a), Some(b)) => Arc::ptr_eq(a, b),
    (None, None) => true,
    _ => false,
  }
}

impl TileZone {
  fn new(coord: TileCoord, context: Arc<ZoneContext>, parent: Option<Arc<dyn ParentTile>>) -> Self {
    let root = ZoneRoot::new(coord, Arc::clone(&context.presentation));
    Self {
      coord,
      context,
      parent,
      placements: None,
      built: None,
      active: None,
      selected_lod: 0,
      applied_lod: None,
      root,
      counters: ZoneCounters::default(),
      released: false,
    }
  }

  pub fn coord(&self) -> TileCoord {
    self.coord
  }

  pub fn state(&self) -> ZoneState {
    if self.released {
      return ZoneState::Released;
    }
    match (&self.built, &self.active, self.applied_lod) {
      (None, None, _) => ZoneState::Unbuilt,
      (Some(built), Some(active), Some(lod)) if !Arc::ptr_eq(built, active) => ZoneState::Rebuilding { lod },
      (_, Some(_), Some(lod)) => ZoneState::Applied { lod },
      _ => ZoneState::Built,
    }
  }

  pub fn selected_lod(&self) -> usize {
    self.selected_lod
  }

  /// Tier currently attached. `None` before the first apply or right after a
  /// swap.
  pub fn applied_lod(&self) -> Option<usize> {
    self.applied_lod
  }

  /// Per-species placements, once computed.
  pub fn placements(&self) -> Option<&[SpeciesBin]> {
    self.placements.as_deref()
  }

  pub fn tree_count(&self) -> usize {
    self.placements().map_or(0, |bins| bins.iter().map(SpeciesBin::len).sum())
  }

  pub fn built(&self) -> Option<&Arc<LodSet>> {
    self.built.as_ref()
  }

  pub fn active(&self) -> Option<&Arc<LodSet>> {
    self.active.as_ref()
  }

  /// Scene node holding the attached parts.
  pub fn root(&self) -> &ZoneRoot {
    &self.root
  }

  pub fn counters(&self) -> &ZoneCounters {
    &self.counters
  }

  pub fn is_released(&self) -> bool {
    self.released
  }

  /// Parent tile the trees are planted on. Only read by the first build;
  /// placements are never recomputed.
  pub fn set_parent(&mut self, parent: Option<Arc<dyn ParentTile>>) {
    self.parent = parent;
  }

  /// Update the detail tier from the cell offset to the viewer's tile.
  /// Returns true when the tier changed and the zone needs an apply.
  pub fn set_relative_grid_location(&mut self, dx: i32, dy: i32, dz: i32) -> bool {
    let lod = detail_tier(dx, dy, dz);
    let changed = lod != self.selected_lod;
    self.selected_lod = lod;
    changed
  }

  /// Same as [`Self::set_relative_grid_location`] with the viewer's tile.
  pub fn set_viewer_tile(&mut self, viewer: TileCoord) -> bool {
    let (dx, dy, dz) = self.coord.relative_to(viewer);
    self.set_relative_grid_location(dx, dy, dz)
  }

  /// Compute placements (first call only) and realize every tier into a new
  /// built set. Safe to call off the render thread and before any apply.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "zone::build"))]
  pub fn build(&mut self) -> Result<(), LifecycleError> {
    if self.released {
      tracing::error!(coord = %self.coord, "build on released zone");
      return Err(LifecycleError::AlreadyReleased(self.coord));
    }
    let start = Instant::now();
    let placements = self.compute_placements();

    // A build that was never applied is never attached; drop it now.
    if !same_set(&self.built, &self.active) {
      if let Some(stale) = self.built.take() {
        tracing::debug!(coord = %self.coord, "discarding unapplied build");
        self.release_set(&stale)?;
      }
    }

    let context = Arc::clone(&self.context);
    let mut levels: [LodLevel; LOD_COUNT] = Default::default();
    for (index, (species, bin)) in context.species.iter().zip(placements.iter()).enumerate() {
      let mut builder =
        SpeciesInstanceBuilder::new(species, index, context.material, &context.stats, &self.counters);
      for (lod, level) in levels.iter_mut().enumerate() {
        if let Some(parts) = builder.realize(lod, bin) {
          level.parts.extend(parts);
        }
      }
    }

    let set = LodSet { levels };
    context.stats.record_lod_set_allocated();

    let trees = self.tree_count();
    if context.stats.observe_tree_count(trees) {
      tracing::info!(coord = %self.coord, trees, "new max tree count");
    }

    tracing::debug!(
      coord = %self.coord,
      trees,
      parts = set.part_count(),
      elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
      "built zone"
    );
    self.built = Some(Arc::new(set));
    Ok(())
  }

  /// Adopt a newer build and attach the selected tier. Does nothing when
  /// neither the build nor the selection changed.
  ///
  /// A failure releasing the replaced set is returned after the new set has
  /// been attached, so the zone stays consistent either way.
  pub fn apply(&mut self) -> Result<(), LifecycleError> {
    if self.released {
      tracing::error!(coord = %self.coord, "apply on released zone");
      return Err(LifecycleError::AlreadyReleased(self.coord));
    }

    let mut result = Ok(());
    if !same_set(&self.built, &self.active) {
      let previous = std::mem::replace(&mut self.active, self.built.clone());
      self.applied_lod = None;
      if let Some(previous) = previous {
        result = self.release_set(&previous);
      }
    }

    if self.applied_lod != Some(self.selected_lod) {
      self.root.detach_all();
      if let Some(active) = &self.active {
        for part in active.level(self.selected_lod).parts() {
          self.root.attach(part);
        }
      }
      self.applied_lod = Some(self.selected_lod);
      tracing::trace!(coord = %self.coord, lod = self.selected_lod, parts = self.root.len(), "applied tier");
    }
    result
  }

  /// Tear down both sets and destroy every buffer. Must be called exactly
  /// once; the zone is unusable afterwards.
  pub fn release(&mut self) -> Result<(), LifecycleError> {
    if self.released {
      tracing::error!(coord = %self.coord, "zone released twice");
      return Err(LifecycleError::AlreadyReleased(self.coord));
    }
    self.released = true;

    let built = self.built.take();
    let active = self.active.take();
    let mut result = Ok(());

    if let Some(built) = built {
      let applied = active.as_ref().is_some_and(|a| Arc::ptr_eq(a, &built));
      if !applied {
        result = result.and(self.release_set(&built));
      }
    }
    if let Some(active) = active {
      result = result.and(self.release_set(&active));
    }
    self.root.detach_all();
    self.applied_lod = None;

    let allocations = self.counters.allocations();
    let destroys = self.counters.destroys();
    if allocations != destroys {
      tracing::error!(coord = %self.coord, allocations, destroys, "buffer allocation/destroy mismatch");
      result = result.and(Err(LifecycleError::DestroyMismatch {
        coord: self.coord,
        allocations,
        destroys,
      }));
    }

    self.root.presentation().on_zone_released(self.coord);
    tracing::debug!(coord = %self.coord, destroys, "released zone");
    result
  }

  fn compute_placements(&mut self) -> Arc<[SpeciesBin]> {
    if let Some(placements) = &self.placements {
      return Arc::clone(placements);
    }

    let context = &self.context;
    let bin_count = context.species.len();
    let output = match &self.parent {
      Some(parent) => {
        let region = ScanRegion::for_tile(&context.grid, self.coord, parent.world_location());
        PlacementRasterizer::new(bin_count, self.coord.seed(), region, context.density.as_ref(), &context.config)
          .scan_source(parent.as_ref())
      }
      None => ScanOutput::empty(bin_count),
    };

    let placements: Arc<[SpeciesBin]> = output.bins.into();
    self.placements = Some(Arc::clone(&placements));
    placements
  }

  /// Detach a set's parts and destroy its buffers. Keeps going after a
  /// failure and returns the first error.
  fn release_set(&mut self, set: &LodSet) -> Result<(), LifecycleError> {
    self.root.detach_if(|part| set.contains(part));

    let mut result = Ok(());
    for buffer in set.distinct_buffers() {
      result = result.and(buffer.destroy());
      self.root.presentation().on_buffer_destroyed(buffer.id());

      let active = self.counters.record_destroy();
      if active < 0 {
        tracing::error!(coord = %self.coord, active, "active buffer count went negative");
        result = result.and(Err(LifecycleError::NegativeActiveBuffers(self.coord)));
      }
    }
    self.context.stats.record_lod_set_destroyed();
    result
  }
}

impl Drop for TileZone {
  fn drop(&mut self) {
    if !self.released && (self.built.is_some() || self.active.is_some()) {
      tracing::warn!(coord = %self.coord, "tile zone dropped without release");
    }
  }
}

impl std::fmt::Debug for TileZone {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TileZone")
      .field("coord", &self.coord)
      .field("state", &self.state())
      .field("selected_lod", &self.selected_lod)
      .field("trees", &self.tree_count())
      .finish()
  }
}

/// Creates zones bound to one species set, density field and material.
#[derive(Clone)]
pub struct TreeZoneFactory {
  context: Arc<ZoneContext>,
  parent: Option<Arc<dyn ParentTile>>,
}

impl TreeZoneFactory {
  /// Factory with default config, fresh stats and no presentation bridge.
  pub fn new(
    grid: TileGrid,
    species: impl Into<Arc<[SpeciesTemplate]>>,
    density: Arc<dyn DensityField>,
    material: MaterialId,
  ) -> Self {
    Self {
      context: Arc::new(ZoneContext {
        grid,
        material,
        density,
        species: species.into(),
        config: ScatterConfig::default(),
        stats: Arc::new(VegetationStats::new()),
        presentation: Arc::new(NullPresentation),
      }),
      parent: None,
    }
  }

  pub fn with_config(mut self, config: ScatterConfig) -> Self {
    Arc::make_mut(&mut self.context).config = config;
    self
  }

  pub fn with_stats(mut self, stats: Arc<VegetationStats>) -> Self {
    Arc::make_mut(&mut self.context).stats = stats;
    self
  }

  pub fn with_presentation(mut self, presentation: Arc<dyn PresentationLayer>) -> Self {
    Arc::make_mut(&mut self.context).presentation = presentation;
    self
  }

  pub fn with_parent(mut self, parent: Arc<dyn ParentTile>) -> Self {
    self.parent = Some(parent);
    self
  }

  /// Parent tile handed to zones created from now on.
  pub fn set_parent(&mut self, parent: Option<Arc<dyn ParentTile>>) {
    self.parent = parent;
  }

  pub fn stats(&self) -> &Arc<VegetationStats> {
    &self.context.stats
  }

  pub fn grid(&self) -> &TileGrid {
    &self.context.grid
  }

  pub fn species(&self) -> &[SpeciesTemplate] {
    &self.context.species
  }

  /// New unbuilt zone for `coord`.
  pub fn create_zone(&self, coord: TileCoord) -> TileZone {
    TileZone::new(coord, Arc::clone(&self.context), self.parent.clone())
  }
}

#[cfg(test)]
#[path = "zone_test.rs"]
mod zone_test;
