//! Logging setup and timing helpers.

mod logging;
mod timing;

pub use logging::{setup_logging, LoggingError};
pub use timing::ScopedTimer;
pub use tracing_appender::non_blocking::WorkerGuard;
