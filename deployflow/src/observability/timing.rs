//! Wall-clock timing for log fields and event payloads.

use std::time::Instant;

/// Measures the duration of a named operation.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: &'static str,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stops the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}
