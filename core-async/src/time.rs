//! Time-related abstractions.
//!
//! Monotonic timing goes through tokio so tests can pause and advance the
//! clock (`tokio::time::pause`). Wall-clock helpers are provided for values
//! that are reported to the host, such as sleep-timer deadlines.

pub use tokio::time::{interval, sleep, sleep_until, timeout, Interval, Sleep, Timeout};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::Instant;

/// Converts fractional seconds into a `Duration`, clamping negatives and NaN
/// to zero and saturating values too large to represent.
///
/// ```rust
/// use core_async::time::{secs_f64, Duration};
///
/// assert_eq!(secs_f64(1.5), Duration::from_millis(1500));
/// assert_eq!(secs_f64(-3.0), Duration::ZERO);
/// assert_eq!(secs_f64(f64::MAX), Duration::MAX);
/// ```
pub fn secs_f64(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_f64_handles_nan() {
        assert_eq!(secs_f64(f64::NAN), Duration::ZERO);
        assert_eq!(secs_f64(0.25), Duration::from_millis(250));
    }

    #[test]
    fn secs_f64_saturates() {
        assert_eq!(secs_f64(f64::INFINITY), Duration::ZERO);
        assert_eq!(secs_f64(1e30), Duration::MAX);
    }
}
