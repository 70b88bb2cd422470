//! Error reporting sinks.
//!
//! Extraction never fails a whole build; problems scoped to one route are
//! handed to an [`ErrorSink`] supplied by the caller.

mod sink;

pub use sink::{CollectingErrorSink, ErrorSink, LoggingErrorSink, NoOpErrorSink};
