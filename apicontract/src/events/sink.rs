//! Error sink trait and implementations.

use parking_lot::RwLock;
use tracing::{debug, warn, Level};

use crate::errors::ExtractionError;

/// Receives per-route extraction errors.
///
/// Sinks are invoked, never thrown through: a report must not panic and
/// must not abort the build that produced it.
///
/// Any `Fn(&str, &str)` closure is a sink and receives `(code, message)`.
pub trait ErrorSink {
    /// Reports a structured extraction error.
    fn report(&self, error: &ExtractionError);
}

impl<F> ErrorSink for F
where
    F: Fn(&str, &str),
{
    fn report(&self, error: &ExtractionError) {
        self(&error.code, &error.message);
    }
}

/// A no-op sink that discards all errors.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpErrorSink;

impl ErrorSink for NoOpErrorSink {
    fn report(&self, _error: &ExtractionError) {
        // Intentionally empty - discards all errors
    }
}

/// A sink that logs errors using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingErrorSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingErrorSink {
    fn default() -> Self {
        Self { level: Level::WARN }
    }
}

impl LoggingErrorSink {
    /// Creates a new logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl ErrorSink for LoggingErrorSink {
    fn report(&self, error: &ExtractionError) {
        if self.level == Level::DEBUG {
            debug!(
                code = %error.code,
                context = ?error.context,
                suggestion = ?error.suggestion,
                "Extraction error: {}", error.message
            );
        } else {
            warn!(
                code = %error.code,
                context = ?error.context,
                suggestion = ?error.suggestion,
                "Extraction error: {}", error.message
            );
        }
    }
}

/// A collecting sink for tests and batch reporting.
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    errors: RwLock<Vec<ExtractionError>>,
}

impl CollectingErrorSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected errors.
    #[must_use]
    pub fn errors(&self) -> Vec<ExtractionError> {
        self.errors.read().clone()
    }

    /// Returns the collected error codes in report order.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        self.errors.read().iter().map(|e| e.code.clone()).collect()
    }

    /// Returns the number of collected errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.read().len()
    }

    /// Returns true if no errors have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.read().is_empty()
    }

    /// Clears all collected errors.
    pub fn clear(&self) {
        self.errors.write().clear();
    }

    /// Returns errors whose code starts with `prefix`.
    #[must_use]
    pub fn errors_with_prefix(&self, prefix: &str) -> Vec<ExtractionError> {
        self.errors
            .read()
            .iter()
            .filter(|e| e.code.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, error: &ExtractionError) {
        self.errors.write().push(error.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_noop_sink() {
        let sink = NoOpErrorSink;
        sink.report(&ExtractionError::new("X", "ignored"));
        // Should not panic
    }

    #[test]
    fn test_logging_sink() {
        LoggingErrorSink::default().report(&ExtractionError::new("X", "logged"));
        LoggingErrorSink::debug().report(&ExtractionError::new("X", "logged"));
        // Should not panic
    }

    #[test]
    fn test_closure_sink_receives_code_and_message() {
        let seen = RefCell::new(Vec::new());
        let sink = |code: &str, message: &str| {
            seen.borrow_mut().push(format!("{code}:{message}"));
        };

        sink.report(&ExtractionError::new("ROUTE_HANDLER_NOT_FOUND", "missing"));
        assert_eq!(seen.into_inner(), vec!["ROUTE_HANDLER_NOT_FOUND:missing".to_string()]);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingErrorSink::new();
        assert!(sink.is_empty());

        sink.report(&ExtractionError::new("ROUTE_METHOD_NOT_FOUND", "a"));
        sink.report(&ExtractionError::new("RESOURCE_CLASS_NOT_FOUND", "b"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.codes(), vec!["ROUTE_METHOD_NOT_FOUND", "RESOURCE_CLASS_NOT_FOUND"]);
        assert_eq!(sink.errors_with_prefix("RESOURCE_").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
