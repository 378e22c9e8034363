//! Periodic task scheduler and tracker mount lifecycle.
//!
//! A mounted tracker runs two independent named tasks on the tokio timer:
//!
//! | Task | Period | Action |
//! |------|--------|--------|
//! | `flush` | `flush_interval` | spawns [`Tracker::flush`] |
//! | `inactivity` | `tick_interval` | calls [`Tracker::tick`] |
//!
//! Each task first fires one full period after mount. Missed ticks are
//! delayed rather than replayed in a burst. The flush runs on its own task so
//! a slow collector never holds up the inactivity check.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace};

use super::core::Tracker;

// ============================================================================
// Constants
// ============================================================================

/// Name of the flush task.
pub const FLUSH_TASK: &str = "flush";

/// Name of the inactivity check task.
pub const INACTIVITY_TASK: &str = "inactivity";

// ============================================================================
// PeriodicTask
// ============================================================================

/// A named task running on a fixed period.
struct PeriodicTask {
    name: &'static str,
    period: Duration,
    handle: JoinHandle<()>,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Owner of a set of named periodic tasks.
///
/// Dropping the scheduler cancels every task.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<PeriodicTask>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tasks.iter().map(|task| (task.name, task.period)))
            .finish()
    }
}

impl Scheduler {
    /// Creates a scheduler with no tasks.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` every `period`, first one period from now.
    ///
    /// The action receives the instant the tick was scheduled for.
    pub fn every<F>(&mut self, runtime: &Handle, name: &'static str, period: Duration, action: F)
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let handle = runtime.spawn(Self::run_periodic(name, period, action));
        debug!(task = name, period_ms = period.as_millis() as u64, "Periodic task scheduled");
        self.tasks.push(PeriodicTask {
            name,
            period,
            handle,
        });
    }

    /// Returns the names of scheduled tasks.
    #[must_use]
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|task| task.name).collect()
    }

    /// Returns `true` while any task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.handle.is_finished())
    }

    /// Cancels every task.
    pub fn cancel(&mut self) {
        for task in self.tasks.drain(..) {
            task.handle.abort();
            debug!(task = task.name, "Periodic task cancelled");
        }
    }

    /// Timer loop of one task.
    async fn run_periodic<F>(name: &'static str, period: Duration, mut action: F)
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let now = interval.tick().await;
            trace!(task = name, "Periodic task fired");
            action(now);
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// TrackerMount
// ============================================================================

/// A tracker with its periodic tasks running.
///
/// Created by [`Tracker::mount`]. Unmounting (explicitly or on drop) cancels
/// both tasks and tears the tracker down.
#[derive(Debug)]
pub struct TrackerMount {
    tracker: Tracker,
    scheduler: Scheduler,
    mounted: bool,
}

impl TrackerMount {
    /// Schedules the flush and inactivity tasks for `tracker`.
    pub(crate) fn new(tracker: Tracker) -> Self {
        let runtime = tracker.inner.runtime.clone();
        let options = tracker.options().clone();
        let mut scheduler = Scheduler::new();

        let flushing = tracker.clone();
        let flush_runtime = runtime.clone();
        scheduler.every(&runtime, FLUSH_TASK, options.flush_interval, move |_| {
            let tracker = flushing.clone();
            flush_runtime.spawn(async move {
                tracker.flush().await;
            });
        });

        let ticking = tracker.clone();
        scheduler.every(&runtime, INACTIVITY_TASK, options.tick_interval, move |now| {
            ticking.tick(now);
        });

        info!(module = %options.module_name, "Tracker mounted");

        Self {
            tracker,
            scheduler,
            mounted: true,
        }
    }

    /// Returns the mounted tracker.
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Returns the scheduler.
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Cancels the periodic tasks and tears the tracker down.
    ///
    /// Returns `true` when a final best-effort send was issued.
    pub fn unmount(mut self) -> bool {
        self.shutdown()
    }

    fn shutdown(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        self.mounted = false;

        self.scheduler.cancel();
        let sent = self.tracker.teardown();
        info!(module = %self.tracker.options().module_name, "Tracker unmounted");
        sent
    }
}

impl Drop for TrackerMount {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================
