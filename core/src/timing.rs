use std::time::{Duration, Instant};

/// Logs how long its scope took when dropped.
///
/// ```
/// use search_core::LogDuration;
///
/// let _timer = LogDuration::new("load documents");
/// // ... work ...
/// ```
#[derive(Debug)]
pub struct LogDuration {
    label: String,
    start: Instant,
}

impl LogDuration {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for LogDuration {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        tracing::debug!(
            label = %self.label,
            elapsed_ns = elapsed.as_nanos() as u64,
            took_s = elapsed.as_secs_f64(),
            "operation time"
        );
    }
}
