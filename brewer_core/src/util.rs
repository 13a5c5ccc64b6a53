//! Small helpers shared across brewer_core.

use std::time::Duration;

/// Reduce an order name to a safe file stem: `[A-Za-z0-9_-]`, every other
/// character becomes `_`. Blank names map to `order`.
pub fn sanitize_file_stem(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "order".to_string();
    }
    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Milliseconds to `Duration`, clamping zero to 1 ms so a loop period can
/// never spin.
#[inline]
pub fn period_from_ms(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

/// Whole seconds of a fractional unix timestamp, saturating at 0.
#[inline]
pub fn epoch_secs(unix_time: f64) -> u64 {
    if unix_time.is_finite() && unix_time > 0.0 {
        unix_time.floor() as u64
    } else {
        0
    }
}
