//! Progress reporting for deletion batches

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives one `advance(1)` per processed resource.
///
/// `start` and `finish` bracket a non-empty batch; an empty batch touches
/// no method at all.
pub trait ProgressSink: Send + Sync {
    fn start(&self, _total: usize) {}
    fn advance(&self, n: usize);
    fn finish(&self) {}
}

/// Sink that ignores everything
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&self, _n: usize) {}
}

/// Sink that emits a `tracing` event per step
#[derive(Default)]
pub struct LogProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl ProgressSink for LogProgress {
    fn start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
    }

    fn advance(&self, n: usize) {
        let done = self.done.fetch_add(n, Ordering::Relaxed) + n;
        tracing::debug!("Progress {}/{}", done, self.total.load(Ordering::Relaxed));
    }
}

/// Single-line counter on stderr, for the CLI
pub struct ConsoleProgress {
    label: String,
    inner: LogProgress,
}

impl ConsoleProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inner: LogProgress::default(),
        }
    }

    fn draw(&self) {
        let done = self.inner.done.load(Ordering::Relaxed);
        let total = self.inner.total.load(Ordering::Relaxed);
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}: {}/{}", self.label, done, total);
        let _ = stderr.flush();
    }
}

impl ProgressSink for ConsoleProgress {
    fn start(&self, total: usize) {
        self.inner.start(total);
        self.draw();
    }

    fn advance(&self, n: usize) {
        self.inner.advance(n);
        self.draw();
    }

    fn finish(&self) {
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_progress_counts() {
        let sink = LogProgress::default();
        sink.start(3);
        sink.advance(1);
        sink.advance(2);
        assert_eq!(sink.done.load(Ordering::Relaxed), 3);
        assert_eq!(sink.total.load(Ordering::Relaxed), 3);
    }
}
