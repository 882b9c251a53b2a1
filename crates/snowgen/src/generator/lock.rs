use core::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    EPOCH, Error, NodeId, Poll, Result, SnowflakeGenerator, SnowflakeId, SystemClock, TimeSource,
    generator::{
        Mutex, MutexGuard,
        state::{GeneratorState, Step, encode, wait_next_millis},
    },
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The whole generation step runs under one mutex: the clock read, the
/// comparison against the last timestamp, the spin into the next millisecond
/// when 4096 IDs were already handed out, and the state update. Calls
/// therefore never interleave, and IDs strictly increase in the order the
/// calls complete.
///
/// Share it across threads with `&` or an [`Arc`].
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Fair access across threads
/// - ❌ Contended calls block on the lock (including a peer's spin-wait)
///
/// ## See Also
/// - [`AtomicIdGenerator`]
///
/// [`Arc`]: std::sync::Arc
/// [`AtomicIdGenerator`]: crate::AtomicIdGenerator
#[derive(Debug)]
pub struct IdGenerator<T = SystemClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<GeneratorState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<GeneratorState>,
    node_id: NodeId,
    epoch_ms: u64,
    time: T,
}

impl IdGenerator<SystemClock> {
    /// Creates a generator reading the system wall clock, with timestamps
    /// relative to [`EPOCH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `node_id` is outside
    /// `[0, 1023]`.
    ///
    /// # Example
    /// ```
    /// use snowgen::{Error, IdGenerator};
    ///
    /// assert!(IdGenerator::new(1023).is_ok());
    /// assert!(matches!(IdGenerator::new(1024), Err(Error::InvalidConfiguration { .. })));
    /// ```
    pub fn new<N>(node_id: N) -> Result<Self>
    where
        N: TryInto<NodeId>,
        Error: From<N::Error>,
    {
        Self::with_clock(node_id, SystemClock)
    }
}

impl<T> IdGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator with a custom [`TimeSource`], with timestamps
    /// relative to [`EPOCH`].
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

    /// Creates a generator whose timestamps are measured from `epoch`
    /// (a [`Duration`] since 1970-01-01 UTC).
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

    /// Creates a generator from explicit state.
    ///
    /// `last_timestamp` is in milliseconds since the Unix epoch, `None`
    /// meaning no ID has been generated yet. This is primarily useful for
    /// resuming a known state or for tests; prefer [`IdGenerator::new`].
    pub fn from_state(
        node_id: NodeId,
        epoch: Duration,
        last_timestamp: Option<u64>,
        sequence: u16,
        time: T,
    ) -> Self {
        let state = Mutex::new(GeneratorState::new(last_timestamp, sequence));
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
            node_id,
            epoch_ms: epoch.as_millis() as u64,
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

    /// Generates the next ID.
    ///
    /// If all 4096 sequence numbers of the current millisecond are used, the
    /// call busy-polls the clock (holding the lock) until the next
    /// millisecond and continues there with sequence 0.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackward`] if the clock reads earlier than the
    ///   last generated ID. State is unchanged.
    /// - [`Error::TimestampOutOfRange`] if the clock precedes the epoch or
    ///   overflows the 41-bit field. State is unchanged.
    /// - `Error::LockPoisoned` if another thread panicked mid-generation
    ///   (std mutex only).
    ///
    /// # Example
    /// ```
    /// use snowgen::IdGenerator;
    ///
    /// let generator = IdGenerator::new(1)?;
    ///
    /// let a = generator.next_id()?;
    /// let b = generator.next_id()?;
    /// assert!(a < b);
    /// # Ok::<(), snowgen::Error>(())
    /// ```
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self), fields(node_id = %self.node_id))
    )]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = self.lock()?;
        let now = self.time.current_millis();

        let (timestamp, sequence) = match state.step(now)? {
            Step::Ready {
                timestamp,
                sequence,
            } => (timestamp, sequence),
            // Rollover: the wrapped sequence restarts at 0 in the new tick.
            Step::Exhausted { last } => (wait_next_millis(&self.time, last), 0),
        };

        let id = encode(self.epoch_ms, self.node_id, timestamp, sequence)?;
        *state = GeneratorState::new(Some(timestamp), sequence);
        Ok(id)
    }

    /// Attempts to generate the next ID without spinning.
    ///
    /// Returns [`Poll::Pending`] with `yield_for = 1` when the current
    /// millisecond is exhausted; nothing is mutated in that case.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self), fields(node_id = %self.node_id))
    )]
    pub fn poll_id(&self) -> Result<Poll> {
        let mut state = self.lock()?;
        let now = self.time.current_millis();

        match state.step(now)? {
            Step::Ready {
                timestamp,
                sequence,
            } => {
                let id = encode(self.epoch_ms, self.node_id, timestamp, sequence)?;
                *state = GeneratorState::new(Some(timestamp), sequence);
                Ok(Poll::Ready { id })
            }
            Step::Exhausted { .. } => Ok(Poll::Pending { yield_for: 1 }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, GeneratorState>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> GeneratorState {
        *self.lock().unwrap()
    }
}

impl<T> SnowflakeGenerator<T> for IdGenerator<T>
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
