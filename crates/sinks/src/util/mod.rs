//! Shared sink utilities

mod line_format;
mod rate_limited_logger;

pub use line_format::LineFormat;
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
