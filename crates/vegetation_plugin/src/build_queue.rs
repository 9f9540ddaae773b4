//! Off-thread zone building.
//!
//! ```text
//! Render thread                      rayon pool
//! ┌──────────────┐   submit(zone)
//! │ page tile in │ ─────────────────► zone.build()
//! └──────────────┘                        │
//!                                         │ crossbeam channel
//! ┌──────────────┐   poll()               │
//! │ apply()      │ ◄──────────────────────┘
//! └──────────────┘
//! ```
//!
//! Zones own disjoint state, so many can build at once. Each one goes back to
//! the caller through the channel; `apply()` and `release()` stay on the
//! thread that owns the scene.

use crossbeam_channel::{self as channel, Receiver, Sender, TryRecvError};
use rayon::prelude::*;
use web_time::Instant;

use crate::error::LifecycleError;
use crate::metrics::ScatterMetrics;
use crate::zone::TileZone;

/// Build every zone in parallel on the rayon pool. Results are in zone
/// order.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "build_queue::build_batch"))]
pub fn build_batch(zones: &mut [TileZone]) -> Vec<Result<(), LifecycleError>> {
  zones.par_iter_mut().map(TileZone::build).collect()
}

/// A zone coming back from a worker.
#[derive(Debug)]
pub struct CompletedBuild {
  pub zone: TileZone,
  pub result: Result<(), LifecycleError>,
  /// Build time in microseconds.
  pub build_us: u64,
}

/// Non-blocking build queue.
///
/// `submit` moves the zone to a rayon worker; `poll` hands finished zones
/// back without blocking.
pub struct ZoneBuildQueue {
  sender: Sender<CompletedBuild>,
  receiver: Receiver<CompletedBuild>,
  in_flight: usize,
  metrics: ScatterMetrics,
}

impl ZoneBuildQueue {
  pub fn new() -> Self {
    let (sender, receiver) = channel::unbounded();
    Self {
      sender,
      receiver,
      in_flight: 0,
      metrics: ScatterMetrics::new(),
    }
  }

  /// Zones submitted and not yet returned by `poll`.
  pub fn in_flight(&self) -> usize {
    self.in_flight
  }

  pub fn is_idle(&self) -> bool {
    self.in_flight == 0
  }

  pub fn metrics(&self) -> &ScatterMetrics {
    &self.metrics
  }

  /// Start building `zone` on the pool.
  pub fn submit(&mut self, mut zone: TileZone) {
    let sender = self.sender.clone();
    self.in_flight += 1;
    rayon::spawn(move || {
      let start = Instant::now();
      let result = zone.build();
      let build_us = start.elapsed().as_micros() as u64;
      // Receiver lives in the queue; a send only fails once it is dropped.
      let _ = sender.send(CompletedBuild {
        zone,
        result,
        build_us,
      });
    });
  }

  /// Every build finished since the last poll.
  pub fn poll(&mut self) -> Vec<CompletedBuild> {
    let mut done = Vec::new();
    loop {
      match self.receiver.try_recv() {
        Ok(completed) => done.push(self.complete(completed)),
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
      }
    }
    done
  }

  /// Block until every submitted zone is back.
  pub fn wait_all(&mut self) -> Vec<CompletedBuild> {
    let mut done = Vec::with_capacity(self.in_flight);
    while self.in_flight > 0 {
      match self.receiver.recv() {
        Ok(completed) => done.push(self.complete(completed)),
        Err(_) => break,
      }
    }
    done
  }

  fn complete(&mut self, completed: CompletedBuild) -> CompletedBuild {
    self.in_flight = self.in_flight.saturating_sub(1);
    if let Err(err) = &completed.result {
      tracing::warn!(coord = %completed.zone.coord(), %err, "zone build failed");
    }
    self.metrics.record_build(completed.build_us, completed.zone.tree_count());
    completed
  }
}

impl Default for ZoneBuildQueue {
  fn default() -> Self {
    Self::new()
  }
}
