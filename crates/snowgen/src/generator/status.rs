use crate::SnowflakeId;

/// The outcome of a non-blocking generation attempt.
///
/// Returned by `poll_id`, which never spins:
///
/// - [`Poll::Ready`] carries a newly generated ID.
/// - [`Poll::Pending`] means the sequence for the current millisecond is
///   exhausted (or, for [`AtomicIdGenerator`], another thread won the race).
///   Nothing was mutated; retry after `yield_for` milliseconds.
///
/// # Example
///
/// ```
/// use snowgen::{IdGenerator, NodeId, Poll, TimeSource, TWITTER_EPOCH};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         TWITTER_EPOCH.as_millis() as u64 + 1
///     }
/// }
///
/// let node = NodeId::new(0)?;
/// let generator = IdGenerator::from_state(node, TWITTER_EPOCH, Some(TWITTER_EPOCH.as_millis() as u64 + 1), 4095, FixedTime);
/// match generator.poll_id()? {
///     Poll::Ready { id } => println!("ID: {id}"),
///     Poll::Pending { yield_for } => println!("Back off for {yield_for} ms"),
/// }
/// # Ok::<(), snowgen::Error>(())
/// ```
///
/// [`AtomicIdGenerator`]: crate::AtomicIdGenerator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated right now.
    Pending {
        /// Milliseconds to wait before trying again. Zero means retry
        /// immediately.
        yield_for: u64,
    },
}
