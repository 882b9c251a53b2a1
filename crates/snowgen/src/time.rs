use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Epoch used by generators unless one is given explicitly.
pub const EPOCH: Duration = TWITTER_EPOCH;

/// Last instant representable by the 41-bit timestamp field relative to
/// [`EPOCH`]: Wednesday, July 10, 2080 17:30:30.208 UTC.
///
/// Generation fails with [`Error::TimestampOutOfRange`] past this point.
///
/// [`Error::TimestampOutOfRange`]: crate::Error::TimestampOutOfRange
pub const EPOCH_EXHAUSTION: Duration =
    Duration::from_millis(EPOCH.as_millis() as u64 + crate::SnowflakeId::max_timestamp());

/// A source of wall-clock time in **milliseconds since the Unix epoch**.
///
/// Generators read the clock on every call. Implement this trait to inject a
/// mocked clock in tests.
///
/// # Example
///
/// ```
/// use snowgen::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since 1970-01-01 UTC.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// The system wall clock.
///
/// Unlike a monotonic timer this follows NTP and manual adjustments, so a
/// regression is observable by the generator and reported as
/// [`Error::ClockMovedBackward`] rather than hidden.
///
/// [`Error::ClockMovedBackward`]: crate::Error::ClockMovedBackward
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as 0, which then fails the epoch check.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}
