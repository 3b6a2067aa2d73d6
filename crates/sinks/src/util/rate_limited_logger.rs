//! Rate-limited error logging
//!
//! A sink writing to a full disk or a closed pipe fails on every record.
//! This logs at most once per interval and reports how many errors were
//! suppressed in between.

use std::fmt::Display;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sluice_metrics::Counter;

/// Default interval between two logged errors
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Error logger that logs at most once per interval
#[derive(Debug)]
pub struct RateLimitedLogger {
    component: &'static str,
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,
    pending: Counter,
    total: Counter,
}

impl RateLimitedLogger {
    /// Logger for `component` with the given interval
    pub fn new(component: &'static str, min_interval: Duration) -> Self {
        Self {
            component,
            min_interval,
            last_log_time: Mutex::new(None),
            pending: Counter::new(),
            total: Counter::new(),
        }
    }

    /// Record an error, logging it if the interval has elapsed
    ///
    /// Returns `true` if the error was logged.
    pub fn error(&self, message: &str, error: &dyn Display) -> bool {
        self.pending.inc();
        self.total.inc();

        let should_log = {
            let mut last = self.last_log_time.lock();
            let now = Instant::now();
            match *last {
                Some(at) if now.duration_since(at) < self.min_interval => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };
        if !should_log {
            return false;
        }

        let suppressed = self.pending.take().saturating_sub(1);
        tracing::error!(
            component = self.component,
            error = %error,
            suppressed,
            total_errors = self.total.get(),
            "{message}"
        );
        true
    }

    /// Errors recorded since the last logged one
    pub fn pending_error_count(&self) -> u64 {
        self.pending.get()
    }

    /// Errors recorded in total
    pub fn total_error_count(&self) -> u64 {
        self.total.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_first_error_always_logs() {
        let logger = RateLimitedLogger::new("file", Duration::from_secs(10));
        let error = io::Error::other("disk full");

        assert!(logger.error("write failed", &error));
        assert_eq!(logger.total_error_count(), 1);
        assert_eq!(logger.pending_error_count(), 0);
    }

    #[test]
    fn test_rapid_errors_suppressed() {
        let logger = RateLimitedLogger::new("file", Duration::from_secs(10));
        let error = io::Error::other("disk full");

        assert!(logger.error("write failed", &error));
        for _ in 0..10 {
            assert!(!logger.error("write failed", &error));
        }

        assert_eq!(logger.total_error_count(), 11);
        assert_eq!(logger.pending_error_count(), 10);
    }

    #[test]
    fn test_zero_interval_logs_every_error() {
        let logger = RateLimitedLogger::new("stdout", Duration::ZERO);
        let error = io::Error::other("broken pipe");

        assert!(logger.error("flush failed", &error));
        assert!(logger.error("flush failed", &error));
        assert_eq!(logger.pending_error_count(), 0);
    }
}
