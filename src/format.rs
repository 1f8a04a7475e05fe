//! Human-readable byte sizes and durations for logs and summaries.

use std::time::Duration;

const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

/// Formats a byte count using binary multiples (e.g. "512 B", "1.50 KB", "100.00 MB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Formats a duration as "4.2s", "3m 07s" or "2h 00m 09s".
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}.{}s", d.subsec_millis() / 100),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, s) => format!("{h}h {m:02}m {s:02}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(100 * 1024 * 1024), "100.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
        assert_eq!(format_bytes(2 * 1024_u64.pow(4)), "2.00 TB");
    }

    #[test]
    fn format_bytes_caps_at_largest_unit() {
        assert!(format_bytes(u64::MAX).ends_with(" PB"));
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::from_millis(4200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(187)), "3m 07s");
        assert_eq!(format_duration(Duration::from_secs(7209)), "2h 00m 09s");
        assert_eq!(format_duration(Duration::ZERO), "0.0s");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn format_bytes_never_panics(bytes in any::<u64>()) {
                let _ = format_bytes(bytes);
            }

            #[test]
            fn format_duration_never_panics(millis in 0u64..10_000_000_000) {
                let _ = format_duration(Duration::from_millis(millis));
            }
        }
    }
}
