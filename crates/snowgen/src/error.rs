/// A result type defaulting to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `snowgen` can emit.
///
/// Sequence exhaustion is never an error: generators spin (or return
/// [`Poll::Pending`]) until the clock reaches the next millisecond.
///
/// [`Poll::Pending`]: crate::Poll::Pending
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The node identifier does not fit the 10-bit node field.
    #[error("invalid configuration: node id {node_id} is outside [0, {max}]")]
    InvalidConfiguration {
        /// The rejected value.
        node_id: i128,
        /// Largest accepted node id.
        max: u16,
    },

    /// The clock returned a timestamp earlier than the last one used.
    ///
    /// Generator state is left untouched; a later call succeeds once the
    /// clock catches up.
    #[error("clock moved backward: now {now} ms < last {last} ms")]
    ClockMovedBackward {
        /// Milliseconds since the Unix epoch reported by the clock.
        now: u64,
        /// Timestamp of the most recently generated ID.
        last: u64,
    },

    /// The clock reading cannot be encoded in the 41-bit timestamp field,
    /// either because it precedes the epoch or because the field is
    /// exhausted.
    #[error("timestamp {millis} ms is not representable relative to epoch {epoch} ms")]
    TimestampOutOfRange {
        /// Milliseconds since the Unix epoch reported by the clock.
        millis: u64,
        /// Generator epoch in milliseconds since the Unix epoch.
        epoch: u64,
    },

    /// A thread panicked while holding the generator lock.
    ///
    /// When the `parking-lot` feature is enabled, mutexes do **not** poison,
    /// so this variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,

    /// A string could not be parsed as a [`SnowflakeId`].
    ///
    /// [`SnowflakeId`]: crate::SnowflakeId
    #[error("cannot parse snowflake id: {reason}")]
    ParseId {
        /// Why parsing failed.
        reason: String,
    },
}

impl From<core::convert::Infallible> for Error {
    fn from(e: core::convert::Infallible) -> Self {
        match e {}
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
