use core::time::Duration;

use crate::{NodeId, Poll, Result, SnowflakeId, TimeSource};

/// A minimal interface for generating Snowflake IDs.
///
/// Implemented by [`IdGenerator`] and [`AtomicIdGenerator`] so callers (and
/// tests) can be written once over either strategy.
///
/// [`IdGenerator`]: crate::IdGenerator
/// [`AtomicIdGenerator`]: crate::AtomicIdGenerator
pub trait SnowflakeGenerator<T: TimeSource> {
    /// Creates a generator for an already validated node id.
    fn from_node(node_id: NodeId, epoch: Duration, time: T) -> Self
    where
        Self: Sized;

    /// The node id encoded into every ID.
    fn node_id(&self) -> NodeId;

    /// Generates the next ID, spinning into the next millisecond if the
    /// current one is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackward`] if the clock regressed.
    /// - [`Error::TimestampOutOfRange`] if the clock cannot be encoded.
    /// - [`Error::LockPoisoned`] for lock-based implementations whose lock is
    ///   poisoned.
    ///
    /// [`Error::ClockMovedBackward`]: crate::Error::ClockMovedBackward
    /// [`Error::TimestampOutOfRange`]: crate::Error::TimestampOutOfRange
    /// [`Error::LockPoisoned`]: crate::Error
    fn next_id(&self) -> Result<SnowflakeId>;

    /// Attempts to generate the next ID without blocking.
    ///
    /// # Errors
    ///
    /// Same as [`SnowflakeGenerator::next_id`].
    fn poll_id(&self) -> Result<Poll>;
}
