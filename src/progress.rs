/// Per-item progress for long-running bulk and section operations.
/// Emitted once per processed member; callers own the surrounding
/// operation state and decide whether to throttle rendering. Never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub label: String,
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Sink for callers that do not render progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}
