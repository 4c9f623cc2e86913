//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Wire format for every timestamp pushed to subscribers
pub const JSON_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format an instant the way subscribers expect it
pub fn format_json_time(instant: &DateTime<Utc>) -> String {
    instant.format(JSON_TIME_FORMAT).to_string()
}

/// Time left until `period` has passed since something took `elapsed`
///
/// Never negative: an overrun yields zero rather than a catch-up burst.
pub fn remaining(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Format a duration as whole or fractional seconds for log lines
pub fn format_secs(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{secs:.0}s")
    } else {
        format!("{secs:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_json_time() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(format_json_time(&instant), "2024-03-05T07:08:09Z");
    }

    #[test]
    fn test_remaining_clamps_to_zero() {
        assert_eq!(
            remaining(Duration::from_secs(60), Duration::from_secs(15)),
            Duration::from_secs(45)
        );
        assert_eq!(
            remaining(Duration::from_secs(60), Duration::from_secs(75)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(Duration::from_secs(60)), "60s");
        assert_eq!(format_secs(Duration::from_millis(1500)), "1.5s");
    }
}
