use std::sync::atomic::{AtomicUsize, Ordering};

use tessera_types::Progress;

/// Receives `{completed, total}` updates as transfers finish.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Sink that discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: Progress) {}
}

/// Shared completion counter for one batch of concurrent transfers.
pub(crate) struct Tally<'a> {
    total: usize,
    completed: AtomicUsize,
    sink: &'a dyn ProgressSink,
}

impl<'a> Tally<'a> {
    pub(crate) fn new(total: usize, sink: &'a dyn ProgressSink) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            sink,
        }
    }

    /// Record one finished transfer and notify the sink.
    pub(crate) fn complete_one(&self) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.sink.on_progress(Progress::new(completed, self.total));
    }
}
