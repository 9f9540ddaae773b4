//! vegetation_plugin - Framework/engine independent tree scattering
//!
//! Plants trees procedurally on streamed terrain tiles. Each tile is owned by
//! a [`TileZone`] that scans its parent terrain mesh once, realizes three
//! detail tiers of geometry, and swaps the tier chosen by viewer distance in
//! and out of its scene root.
//!
//! # Features
//!
//! - **Placement rasterization**: deterministic, noise-driven planting on a
//!   coarse lattice over a fine environmental sampling grid
//! - **Cross-LOD instancing**: instanced tiers share one transform buffer and
//!   bounding volume per species
//! - **Static batching**: the impostor tier merges every placement per part
//! - **Explicit GPU lifecycle**: every buffer is destroyed exactly once, with
//!   leak auditing per zone and per process
//!
//! # Example
//!
//! ```ignore
//! use vegetation_plugin::{BilinearNoise, MaterialId, TileCoord, TileGrid, TreeZoneFactory};
//!
//! let factory = TreeZoneFactory::new(grid, species, Arc::new(BilinearNoise::random(64, 64, 1)), MaterialId(0))
//!   .with_parent(terrain);
//!
//! let mut zone = factory.create_zone(TileCoord::new(0, 0, 0));
//! zone.build()?;                  // worker thread
//! zone.set_viewer_tile(viewer);
//! zone.apply()?;                  // render thread
//! zone.release()?;                // when the tile pages out
//! ```

pub mod config;
pub mod density;
pub mod error;
pub mod grid;
pub mod lod;
pub mod mesh;
pub mod types;

pub use config::ScatterConfig;
pub use density::{BilinearNoise, DensityField, DensitySample};
pub use error::{LifecycleError, TemplateError};
pub use grid::{TileCoord, TileGrid};
pub use lod::{detail_tier, RenderMode, LOD_COUNT, MAX_LOD};
pub use mesh::{ParentTile, TerrainMesh, TriangleSource};
pub use types::{Aabb, PlacementRecord, SpeciesBin, Triangle};

// Placement scanning
pub mod rasterizer;
pub use rasterizer::{PlacementRasterizer, ScanOutput, ScanRegion};

// Species templates and per-tile geometry
pub mod geometry;
pub mod instancing;
pub mod species;
pub use geometry::{BufferId, GeometryPart, GpuBuffer, MaterialId, PartMesh, ShadowMode};
pub use instancing::SpeciesInstanceBuilder;
pub use species::{BatchTemplate, InstanceTemplate, LodTemplate, MeshPart, SpeciesTemplate, TemplateMesh};

// Tile lifecycle
pub mod scene;
pub mod stats;
pub mod zone;
pub use scene::{NullPresentation, PresentationLayer, ZoneRoot};
pub use stats::{StatsSnapshot, VegetationStats};
pub use zone::{LodLevel, LodSet, TileZone, TreeZoneFactory, ZoneState};

// Off-thread building
pub mod build_queue;
pub use build_queue::{build_batch, CompletedBuild, ZoneBuildQueue};

pub mod metrics;

#[cfg(test)]
mod test_utils;
