//! Observability utilities.

mod logging;
mod timing;

pub use logging::init_logging;
pub use timing::SpanTimer;
