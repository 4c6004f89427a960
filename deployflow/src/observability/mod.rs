//! Logging setup and timing helpers.

mod logging;
mod timing;

pub use logging::{init_logging, LogFormat, DEFAULT_FILTER};
pub use timing::SpanTimer;
