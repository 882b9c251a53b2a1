use core::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    EPOCH, Error, NodeId, Poll, Result, SnowflakeGenerator, SnowflakeId, SystemClock, TimeSource,
    generator::state::{GeneratorState, Step, encode, wait_next_millis},
};

/// A lock-free Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The last timestamp (relative to the epoch) and sequence are packed into a
/// single [`AtomicU64`] and advanced with compare-and-swap. An ID is only returned by the thread whose
/// CAS installed its `(timestamp, sequence)` pair, so IDs are unique and
/// strictly increase in the order the successful swaps happen.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ No lock, no poisoning
/// - ❌ Unfair under heavy contention (a thread may lose many races)
///
/// ## See Also
/// - [`IdGenerator`]
///
/// [`IdGenerator`]: crate::IdGenerator
#[derive(Debug)]
pub struct AtomicIdGenerator<T = SystemClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    node_id: NodeId,
    epoch_ms: u64,
    time: T,
}

/// Outcome of a single CAS round.
enum Attempt {
    Ready(SnowflakeId),
    Exhausted { last: u64 },
    Contended,
}

impl AtomicIdGenerator<SystemClock> {
    /// Creates a generator reading the system wall clock, with timestamps
    /// relative to [`EPOCH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `node_id` is outside
    /// `[0, 1023]`.
    pub fn new<N>(node_id: N) -> Result<Self>
    where
        N: TryInto<NodeId>,
        Error: From<N::Error>,
    {
        Self::with_clock(node_id, SystemClock)
    }
}

impl<T> AtomicIdGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator with a custom [`TimeSource`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `node_id` is outside
    /// `[0, 1023]`.
    pub fn with_clock<N>(node_id: N, time: T) -> Result<Self>
    where
        N: TryInto<NodeId>,
        Error: From<N::Error>,
    {
        Self::with_epoch(node_id, EPOCH, time)
    }

    /// Creates a generator whose timestamps are measured from `epoch`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `node_id` is outside
    /// `[0, 1023]`.
    pub fn with_epoch<N>(node_id: N, epoch: Duration, time: T) -> Result<Self>
    where
        N: TryInto<NodeId>,
        Error: From<N::Error>,
    {
        let node_id = node_id.try_into()?;
        Ok(Self::from_node(node_id, epoch, time))
    }

    /// Creates a generator from explicit state. See
    /// [`IdGenerator::from_state`].
    ///
    /// [`IdGenerator::from_state`]: crate::IdGenerator::from_state
    pub fn from_state(
        node_id: NodeId,
        epoch: Duration,
        last_timestamp: Option<u64>,
        sequence: u16,
        time: T,
    ) -> Self {
        let epoch_ms = epoch.as_millis() as u64;
        let initial = AtomicU64::new(GeneratorState::new(last_timestamp, sequence).pack(epoch_ms));
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(initial),
            #[cfg(not(feature = "cache-padded"))]
            state: initial,
            node_id,
            epoch_ms,
            time,
        }
    }

    /// Returns the node id encoded into every ID.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Returns the epoch timestamps are measured from.
    pub fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_ms)
    }

    /// Generates the next ID, retrying lost CAS races and spinning into the
    /// next millisecond when the current one is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackward`] if the clock regressed.
    /// - [`Error::TimestampOutOfRange`] if the clock cannot be encoded.
    ///
    /// # Example
    /// ```
    /// use snowgen::AtomicIdGenerator;
    ///
    /// let generator = AtomicIdGenerator::new(7)?;
    /// let id = generator.next_id()?;
    /// assert_eq!(id.node_id(), 7);
    /// # Ok::<(), snowgen::Error>(())
    /// ```
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self), fields(node_id = %self.node_id))
    )]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        loop {
            match self.attempt()? {
                Attempt::Ready(id) => break Ok(id),
                Attempt::Exhausted { last } => {
                    wait_next_millis(&self.time, last);
                }
                Attempt::Contended => core::hint::spin_loop(),
            }
        }
    }

    /// Attempts to generate the next ID without spinning or retrying.
    ///
    /// - `Poll::Pending { yield_for: 1 }`: the millisecond is exhausted.
    /// - `Poll::Pending { yield_for: 0 }`: another thread won the CAS; retry
    ///   immediately.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self), fields(node_id = %self.node_id))
    )]
    pub fn poll_id(&self) -> Result<Poll> {
        Ok(match self.attempt()? {
            Attempt::Ready(id) => Poll::Ready { id },
            Attempt::Exhausted { .. } => Poll::Pending { yield_for: 1 },
            Attempt::Contended => Poll::Pending { yield_for: 0 },
        })
    }

    fn attempt(&self) -> Result<Attempt> {
        // Load before reading the clock: a peer can only move the state
        // forward to a timestamp it read earlier than our own reading.
        let current_raw = self.state.load(Ordering::Acquire);
        let current = GeneratorState::unpack(current_raw, self.epoch_ms);
        let now = self.time.current_millis();

        let (timestamp, sequence) = match current.step(now)? {
            Step::Ready {
                timestamp,
                sequence,
            } => (timestamp, sequence),
            Step::Exhausted { last } => return Ok(Attempt::Exhausted { last }),
        };

        let id = encode(self.epoch_ms, self.node_id, timestamp, sequence)?;
        let next_raw = GeneratorState::new(Some(timestamp), sequence).pack(self.epoch_ms);

        if self
            .state
            .compare_exchange(current_raw, next_raw, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(Attempt::Ready(id))
        } else {
            Ok(Attempt::Contended)
        }
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> GeneratorState {
        GeneratorState::unpack(self.state.load(Ordering::Acquire), self.epoch_ms)
    }
}

impl<T> SnowflakeGenerator<T> for AtomicIdGenerator<T>
where
    T: TimeSource,
{
    fn from_node(node_id: NodeId, epoch: Duration, time: T) -> Self {
        Self::from_state(node_id, epoch, None, 0, time)
    }

    fn node_id(&self) -> NodeId {
        self.node_id()
    }

    fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id()
    }

    fn poll_id(&self) -> Result<Poll> {
        self.poll_id()
    }
}
