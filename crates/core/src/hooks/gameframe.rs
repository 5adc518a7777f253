//! GameFrame bookkeeping
//!
//! The runtime does its per-frame work (player promotion, system
//! activation) inside [`FrameStats::measure`], which counts frames and warns
//! about slow ones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Frames slower than this are logged
const SLOW_FRAME_NS: u64 = 1_000_000;

#[derive(Debug, Default)]
pub struct FrameStats {
    /// Increments every GameFrame call
    frame_count: AtomicU64,
    /// Last frame's processing time in nanoseconds
    last_frame_time_ns: AtomicU64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    pub fn last_frame_time_ns(&self) -> u64 {
        self.last_frame_time_ns.load(Ordering::Relaxed)
    }

    /// Run one frame's work and record how long it took
    pub fn measure<R>(&self, frame: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let frame_number = self.frame_count.fetch_add(1, Ordering::Relaxed) + 1;

        let result = frame();

        let elapsed = start.elapsed().as_nanos() as u64;
        self.last_frame_time_ns.store(elapsed, Ordering::Relaxed);

        if elapsed > SLOW_FRAME_NS {
            tracing::warn!(
                "GameFrame took {}ms (frame {})",
                elapsed / 1_000_000,
                frame_number
            );
        }

        result
    }
}
