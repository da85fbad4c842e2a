//! Time source for all queue timing computations.
//!
//! The queue runs in a single configured UTC offset. Timestamps are stored
//! in UTC; the offset only affects presentation. A manual source is
//! available so lifecycle tests can control elapsed time deterministically.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::error::{QmsError, Result};

/// Largest supported offset magnitude, in minutes (UTC±18:00).
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

#[derive(Debug, Clone)]
enum Source {
    System,
    Manual(Arc<Mutex<DateTime<Utc>>>),
}

/// Clock with a single configured UTC offset.
#[derive(Debug, Clone)]
pub struct Clock {
    offset: FixedOffset,
    source: Source,
}

impl Clock {
    /// Create a system-backed clock at the given offset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidation` if the offset is outside UTC±18:00.
    pub fn system(offset_minutes: i32) -> Result<Self> {
        Ok(Self {
            offset: offset_from_minutes(offset_minutes)?,
            source: Source::System,
        })
    }

    /// Create a manual clock frozen at `start`, for tests.
    ///
    /// The instant only moves when [`Clock::advance`] or [`Clock::set`] is
    /// called. Clones share the same underlying instant.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidation` if the offset is outside UTC±18:00.
    pub fn manual(start: DateTime<Utc>, offset_minutes: i32) -> Result<Self> {
        Ok(Self {
            offset: offset_from_minutes(offset_minutes)?,
            source: Source::Manual(Arc::new(Mutex::new(start))),
        })
    }

    /// Current instant in UTC.
    #[must_use]
    pub fn now_utc(&self) -> DateTime<Utc> {
        match &self.source {
            Source::System => Utc::now(),
            Source::Manual(instant) => *instant.lock().expect("clock mutex poisoned"),
        }
    }

    /// Current instant in the configured offset.
    #[must_use]
    pub fn now_local(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&self.offset)
    }

    /// The configured offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Advance a manual clock by `delta`. No effect on a system clock.
    pub fn advance(&self, delta: Duration) {
        if let Source::Manual(instant) = &self.source {
            let mut guard = instant.lock().expect("clock mutex poisoned");
            *guard += delta;
        }
    }

    /// Set a manual clock to `instant`. No effect on a system clock.
    pub fn set(&self, new_instant: DateTime<Utc>) {
        if let Source::Manual(instant) = &self.source {
            let mut guard = instant.lock().expect("clock mutex poisoned");
            *guard = new_instant;
        }
    }
}

/// Elapsed whole seconds from `from` to `to`, clamped at zero.
///
/// Persisted timestamps are not guaranteed monotonic across process
/// restarts; small negative deltas collapse to zero.
#[must_use]
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().max(0)
}

fn offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
        return Err(QmsError::ConfigValidation(format!(
            "utc_offset_minutes must be within +/-{MAX_OFFSET_MINUTES} (got {minutes})"
        )));
    }
    FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
        QmsError::ConfigValidation(format!("invalid utc_offset_minutes: {minutes}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_manual_clock_is_frozen_until_advanced() {
        let clock = Clock::manual(instant(), 0).unwrap();
        assert_eq!(clock.now_utc(), instant());

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now_utc(), instant() + Duration::seconds(90));
    }

    #[test]
    fn test_manual_clock_clones_share_instant() {
        let clock = Clock::manual(instant(), 0).unwrap();
        let other = clock.clone();
        clock.advance(Duration::minutes(5));
        assert_eq!(other.now_utc(), instant() + Duration::minutes(5));
    }

    #[test]
    fn test_now_local_applies_offset() {
        let clock = Clock::manual(instant(), 330).unwrap(); // UTC+05:30
        let local = clock.now_local();
        assert_eq!(local.offset().local_minus_utc(), 330 * 60);
        assert_eq!(local.with_timezone(&Utc), instant());
    }

    #[test]
    fn test_offset_out_of_range_rejected() {
        assert!(Clock::system(19 * 60).is_err());
        assert!(Clock::system(-19 * 60).is_err());
        assert!(Clock::system(MAX_OFFSET_MINUTES).is_ok());
    }

    #[test]
    fn test_elapsed_seconds_clamps_negative_deltas() {
        let earlier = instant();
        let later = earlier + Duration::seconds(42);
        assert_eq!(elapsed_seconds(earlier, later), 42);
        assert_eq!(elapsed_seconds(later, earlier), 0);
        assert_eq!(elapsed_seconds(earlier, earlier), 0);
    }
}
