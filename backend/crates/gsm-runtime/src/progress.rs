/// One-way channel for human readable upgrade progress.
///
/// Called from background tasks while state transitions happen elsewhere, so
/// implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, message: &str, suppress_newline: bool);
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str, bool) + Send + Sync,
{
    fn report(&self, percent: u8, message: &str, suppress_newline: bool) {
        self(percent, message, suppress_newline)
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _percent: u8, _message: &str, _suppress_newline: bool) {}
}
