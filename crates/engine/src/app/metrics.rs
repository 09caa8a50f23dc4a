use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LockResult, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static POISON_REPORTED: AtomicBool = AtomicBool::new(false);

/// Unwraps a possibly poisoned guard. The snapshot is plain data, so a
/// panic mid-write cannot leave it inconsistent.
fn recover<G>(result: LockResult<G>, operation: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        if !POISON_REPORTED.swap(true, Ordering::Relaxed) {
            warn!(operation, "metrics_lock_poisoned; recovered");
        }
        poisoned.into_inner()
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    /// Mean wall time spent inside one scene update.
    pub tick_time_ms: f32,
    pub dropped_backlog_ms: f32,
}

/// Read side of the loop metrics; clones share one snapshot.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *recover(self.latest.read(), "read")
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *recover(self.latest.write(), "write") = snapshot;
    }
}

#[derive(Debug, Default)]
struct WindowTotals {
    frames: u32,
    ticks: u32,
    frame_time: Duration,
    tick_time: Duration,
    dropped_backlog: Duration,
}

impl WindowTotals {
    fn mean_ms(total: Duration, count: u32) -> f32 {
        if count == 0 {
            return 0.0;
        }
        total.as_secs_f32() * 1000.0 / count as f32
    }

    fn summarize(&self, elapsed: Duration) -> LoopMetricsSnapshot {
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms: Self::mean_ms(self.frame_time, self.frames),
            tick_time_ms: Self::mean_ms(self.tick_time, self.ticks),
            dropped_backlog_ms: self.dropped_backlog.as_secs_f32() * 1000.0,
        }
    }
}

/// Collects frame and tick timings over a fixed wall-clock window and
/// emits one snapshot per elapsed window.
#[derive(Debug)]
pub(crate) struct MetricsWindow {
    started: Instant,
    length: Duration,
    totals: WindowTotals,
}

impl MetricsWindow {
    pub(crate) fn new(length: Duration) -> Self {
        Self {
            started: Instant::now(),
            length,
            totals: WindowTotals::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        let totals = &mut self.totals;
        totals.frames = totals.frames.saturating_add(1);
        totals.frame_time = totals.frame_time.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self, tick_dt: Duration) {
        let totals = &mut self.totals;
        totals.ticks = totals.ticks.saturating_add(1);
        totals.tick_time = totals.tick_time.saturating_add(tick_dt);
    }

    pub(crate) fn record_dropped_backlog(&mut self, dropped: Duration) {
        self.totals.dropped_backlog = self.totals.dropped_backlog.saturating_add(dropped);
    }

    /// Closes the window once `length` has passed since it opened.
    pub(crate) fn close_if_elapsed(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.length {
            return None;
        }
        let totals = std::mem::take(&mut self.totals);
        self.started = now;
        Some(totals.summarize(elapsed))
    }
}
