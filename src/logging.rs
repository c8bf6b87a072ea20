//! Structured timing and failure logging for retrieval operations

use crate::error::ScraperError;
use std::time::{Duration, Instant};

/// Logs the duration of an operation when dropped; at warn level once it
/// exceeds the slow threshold
pub struct Timer {
    start: Instant,
    operation: &'static str,
    slow_after: Option<Duration>,
}

impl Timer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
            slow_after: None,
        }
    }

    pub fn slow_after(mut self, threshold: Duration) -> Self {
        self.slow_after = Some(threshold);
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn is_slow(&self) -> bool {
        self.slow_after.is_some_and(|t| self.elapsed() >= t)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration_ms = self.elapsed().as_millis() as u64;
        if self.is_slow() {
            tracing::warn!(operation = self.operation, duration_ms, "Slow operation");
        } else {
            tracing::debug!(operation = self.operation, duration_ms, "Operation completed");
        }
    }
}

/// Record a failure that ends a run or a page walk
pub fn log_error(operation: &str, error: &ScraperError) {
    tracing::error!(
        operation = %operation,
        error = %error,
        error_kind = error.kind(),
        auth = error.is_auth(),
        "Operation failed"
    );
}
