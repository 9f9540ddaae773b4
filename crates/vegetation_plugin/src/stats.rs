//! Lifecycle accounting shared by every zone.
//!
//! [`VegetationStats`] is created by the application and handed to the zone
//! factory, so independent worlds (and tests) each get their own counters.
//! Everything is atomic: zones are built on worker threads and released on
//! the render thread.

use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Process-wide counters for LOD set and GPU buffer bookkeeping.
#[derive(Debug, Default)]
pub struct VegetationStats {
  lod_sets_allocated: AtomicU64,
  lod_sets_destroyed: AtomicU64,
  buffers_allocated: AtomicU64,
  buffers_destroyed: AtomicU64,
  max_tree_count: AtomicUsize,
}

/// Point-in-time copy of [`VegetationStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
  pub lod_sets_allocated: u64,
  pub lod_sets_destroyed: u64,
  pub buffers_allocated: u64,
  pub buffers_destroyed: u64,
  pub max_tree_count: usize,
}

impl StatsSnapshot {
  /// LOD sets built but not yet released.
  pub fn live_lod_sets(&self) -> u64 {
    self.lod_sets_allocated.saturating_sub(self.lod_sets_destroyed)
  }

  /// GPU buffers created but not yet destroyed.
  pub fn live_buffers(&self) -> u64 {
    self.buffers_allocated.saturating_sub(self.buffers_destroyed)
  }
}

impl VegetationStats {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn record_lod_set_allocated(&self) {
    self.lod_sets_allocated.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn record_lod_set_destroyed(&self) {
    self.lod_sets_destroyed.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn record_buffer_allocated(&self) {
    self.buffers_allocated.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn record_buffer_destroyed(&self) {
    self.buffers_destroyed.fetch_add(1, Ordering::Relaxed);
  }

  /// Track the largest tree count seen in a single zone.
  /// Returns true when `count` is a new maximum.
  pub(crate) fn observe_tree_count(&self, count: usize) -> bool {
    self.max_tree_count.fetch_max(count, Ordering::Relaxed) < count
  }

  pub fn max_tree_count(&self) -> usize {
    self.max_tree_count.load(Ordering::Relaxed)
  }

  pub fn snapshot(&self) -> StatsSnapshot {
    StatsSnapshot {
      lod_sets_allocated: self.lod_sets_allocated.load(Ordering::Relaxed),
      lod_sets_destroyed: self.lod_sets_destroyed.load(Ordering::Relaxed),
      buffers_allocated: self.buffers_allocated.load(Ordering::Relaxed),
      buffers_destroyed: self.buffers_destroyed.load(Ordering::Relaxed),
      max_tree_count: self.max_tree_count.load(Ordering::Relaxed),
    }
  }

  /// Zero every counter.
  pub fn reset(&self) {
    self.lod_sets_allocated.store(0, Ordering::Relaxed);
    self.lod_sets_destroyed.store(0, Ordering::Relaxed);
    self.buffers_allocated.store(0, Ordering::Relaxed);
    self.buffers_destroyed.store(0, Ordering::Relaxed);
    self.max_tree_count.store(0, Ordering::Relaxed);
  }
}

/// Per-zone allocation bookkeeping.
#[derive(Debug, Default)]
pub struct ZoneCounters {
  allocations: AtomicU32,
  destroys: AtomicU32,
  active_buffers: AtomicI32,
}

impl ZoneCounters {
  pub(crate) fn record_allocation(&self) {
    self.allocations.fetch_add(1, Ordering::Relaxed);
    self.active_buffers.fetch_add(1, Ordering::Relaxed);
  }

  /// Returns the active buffer count after the decrement.
  pub(crate) fn record_destroy(&self) -> i32 {
    self.destroys.fetch_add(1, Ordering::Relaxed);
    self.active_buffers.fetch_sub(1, Ordering::Relaxed) - 1
  }

  pub fn allocations(&self) -> u32 {
    self.allocations.load(Ordering::Relaxed)
  }

  pub fn destroys(&self) -> u32 {
    self.destroys.load(Ordering::Relaxed)
  }

  pub fn active_buffers(&self) -> i32 {
    self.active_buffers.load(Ordering::Relaxed)
  }
}
