//! Engine-agnostic metrics for tree scattering.
//!
//! Feature-gated and runtime-toggled so there is no overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use vegetation_plugin::metrics::{ScatterMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // Record a finished build:
//! metrics.record_build(timing_us, placements);
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Rolling window of recent values.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl RollingWindow<u64> {
    pub fn sum(&self) -> u64 {
        self.buffer.iter().sum()
    }

    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = *self.buffer.iter().min()?;
        let max = *self.buffer.iter().max()?;
        Some((min, max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128)
    }
}

/// Scatter statistics, updated as zone builds complete.
#[derive(Debug, Clone)]
pub struct ScatterMetrics {
    /// Rolling window of zone build times in microseconds.
    pub build_timings: RollingWindow<u64>,
    /// Rolling window of placements per built zone.
    pub placement_counts: RollingWindow<u64>,

    /// Last build time in microseconds.
    pub last_build_us: u64,
    /// Zones built this session.
    pub total_zones_built: u64,
    /// Trees planted this session.
    pub total_placements: u64,
}

impl Default for ScatterMetrics {
    fn default() -> Self {
        Self {
            build_timings: RollingWindow::new(128),
            placement_counts: RollingWindow::new(128),
            last_build_us: 0,
            total_zones_built: 0,
            total_placements: 0,
        }
    }
}

impl ScatterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset windows. Session totals are cumulative and kept.
    pub fn reset(&mut self) {
        self.build_timings.clear();
        self.placement_counts.clear();
        self.last_build_us = 0;
    }

    /// Record a finished zone build.
    pub fn record_build(&mut self, timing_us: u64, placements: usize) {
        if !is_enabled() {
            return;
        }
        self.build_timings.push(timing_us);
        self.placement_counts.push(placements as u64);
        self.last_build_us = timing_us;
        self.total_zones_built += 1;
        self.total_placements += placements as u64;
    }

    pub fn avg_build_timing_us(&self) -> f64 {
        self.build_timings.average()
    }

    pub fn avg_placements(&self) -> f64 {
        self.placement_counts.average()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());
        assert_eq!(window.min_max(), None);

        window.push(10u64);
        window.push(20);
        window.push(30);
        assert_eq!(window.sum(), 60);
        assert_eq!(window.average(), 20.0);

        // Oldest evicted.
        window.push(40);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 90);
        assert_eq!(window.min_max(), Some((20, 40)));
        assert_eq!(window.last(), Some(&40));
    }

    #[test]
    fn test_zero_capacity_window() {
        let mut window = RollingWindow::new(0);
        window.push(1u64);
        assert!(window.is_empty());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_scatter_metrics() {
        let mut metrics = ScatterMetrics::new();

        metrics.record_build(1000, 12);
        metrics.record_build(3000, 4);
        assert_eq!(metrics.total_zones_built, 2);
        assert_eq!(metrics.total_placements, 16);
        assert_eq!(metrics.avg_build_timing_us(), 2000.0);
        assert_eq!(metrics.last_build_us, 3000);

        assert_eq!(metrics.avg_placements(), 8.0);

        metrics.reset();
        assert!(metrics.build_timings.is_empty());
        assert_eq!(metrics.last_build_us, 0);
        assert_eq!(metrics.total_zones_built, 2);
    }

    #[cfg(not(feature = "metrics"))]
    #[test]
    fn test_disabled_metrics_record_nothing() {
        let mut metrics = ScatterMetrics::new();
        metrics.record_build(1000, 12);
        assert_eq!(metrics.total_zones_built, 0);
        assert!(metrics.build_timings.is_empty());
    }
}
