//! Stats output formatters
//!
//! Formats collected stats for human-readable or JSON output.

mod human;
mod json;

pub use human::HumanFormatter;
pub use json::JsonFormatter;

use crate::{CollectedStats, StatsRates};

/// Trait for stats formatters
pub trait StatsFormatter: Send + Sync {
    /// Format one report
    ///
    /// `rates` is `None` for the first report, before a baseline exists.
    fn format(
        &self,
        stats: &CollectedStats,
        rates: Option<&StatsRates>,
        include_invalid_fields: bool,
    ) -> String;
}

/// Scale `value` by the largest unit it reaches
fn scaled(value: f64, units: &[(f64, &str)], suffix: &str) -> String {
    for &(size, unit) in units {
        if value >= size {
            return format!("{:.1}{unit}{suffix}", value / size);
        }
    }
    format!("{value:.0}{suffix}")
}

const DECIMAL: [(f64, &str); 2] = [(1e6, "M"), (1e3, "K")];
const BINARY: [(f64, &str); 2] = [(1024.0 * 1024.0, " MB"), (1024.0, " KB")];

/// Bytes per second, binary units
pub fn format_bytes_per_sec(bytes_per_sec: f64) -> String {
    if bytes_per_sec < 1024.0 {
        return format!("{bytes_per_sec:.0} B/s");
    }
    scaled(bytes_per_sec, &BINARY, "/s")
}

/// Count with a K/M suffix
pub fn format_count(count: u64) -> String {
    scaled(count as f64, &DECIMAL, "")
}

/// Records per second with a K/M suffix
pub fn format_rate(rate: f64) -> String {
    scaled(rate, &DECIMAL, "/s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_per_sec() {
        assert_eq!(format_bytes_per_sec(500.0), "500 B/s");
        assert_eq!(format_bytes_per_sec(2048.0), "2.0 KB/s");
        assert_eq!(format_bytes_per_sec(3.0 * 1024.0 * 1024.0), "3.0 MB/s");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1500), "1.5K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(42.0), "42/s");
        assert_eq!(format_rate(1000.0), "1.0K/s");
        assert_eq!(format_rate(1_200_000.0), "1.2M/s");
    }
}
