//! Operation timing.

use std::time::Instant;
use tracing::{debug, info_span, Span};

/// Times one store operation inside its own tracing span.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    operation: &'static str,
    span: Span,
}

impl SpanTimer {
    /// Starts timing `operation` (e.g. `"build"`).
    #[must_use]
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
            span: info_span!("apicontract", operation),
        }
    }

    /// Span the timed work should run in.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        self.operation
    }

    /// Milliseconds since start.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Stops the timer and returns the elapsed milliseconds.
    pub fn finish(self) -> f64 {
        let duration_ms = self.elapsed_ms();
        self.span.in_scope(|| {
            debug!(operation = self.operation, duration_ms, "Operation finished");
        });
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("build");
        assert_eq!(timer.operation(), "build");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let ran = timer.span().in_scope(|| 42);
        assert_eq!(ran, 42);
        assert!(timer.finish() >= 5.0);
    }
}
