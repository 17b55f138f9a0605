// src/engine/control.rs
//
// Run control: progress reporting and cooperative cancellation.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Receives `(completed, total)` after each unit of work.
///
/// Reporting is best-effort: a sink that panics is logged and ignored, the run
/// carries on.
pub trait ProgressSink: Send + Sync {
    fn report(&self, completed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn report(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Sink that records every report, in arrival order.
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<(usize, usize)>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(usize, usize)> {
        self.events.lock().clone()
    }

    /// Most recent report, if any.
    pub fn last(&self) -> Option<(usize, usize)> {
        self.events.lock().last().copied()
    }
}

impl ProgressSink for ProgressLog {
    fn report(&self, completed: usize, total: usize) {
        self.events.lock().push((completed, total));
    }
}

/// Deliver a progress report without letting a faulty sink abort the run.
pub(crate) fn report_progress(sink: &dyn ProgressSink, completed: usize, total: usize) {
    if catch_unwind(AssertUnwindSafe(|| sink.report(completed, total))).is_err() {
        warn!(completed, total, "progress sink panicked; report dropped");
    }
}

/// Shared cancellation flag, polled between tiles.
///
/// Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
