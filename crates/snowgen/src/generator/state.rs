use core::cmp::Ordering;

use crate::{Error, NodeId, Result, SnowflakeId, TimeSource};

/// What the next ID should look like given the last committed state and the
/// current clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Ready { timestamp: u64, sequence: u16 },
    /// Every sequence number of `last` has been handed out.
    Exhausted { last: u64 },
}

/// Mutable state guarded by [`IdGenerator`]'s lock.
///
/// [`IdGenerator`]: crate::IdGenerator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GeneratorState {
    /// Unix millis of the last ID, `None` until the first ID is generated.
    pub(crate) last_timestamp: Option<u64>,
    pub(crate) sequence: u16,
}

impl GeneratorState {
    pub(crate) const fn new(last_timestamp: Option<u64>, sequence: u16) -> Self {
        Self {
            last_timestamp,
            sequence: sequence & SnowflakeId::SEQUENCE_MASK as u16,
        }
    }

    /// Packs the state into one word for [`AtomicIdGenerator`].
    ///
    /// The timestamp is stored relative to `epoch_ms`. Committed timestamps
    /// lie in `[epoch, epoch + 2^41 - 1]`, so the delta fits whatever the
    /// epoch is. A timestamp the generator could never have committed is
    /// stored as the nearest state that rejects the same clock readings:
    /// below the epoch as "no ID yet", past the 41-bit horizon as one past
    /// it. `u64::MAX` is the "no ID yet" sentinel.
    ///
    /// [`AtomicIdGenerator`]: crate::AtomicIdGenerator
    pub(crate) const fn pack(self, epoch_ms: u64) -> u64 {
        let Some(ts) = self.last_timestamp else {
            return u64::MAX;
        };
        if ts < epoch_ms {
            return u64::MAX;
        }
        let mut delta = ts - epoch_ms;
        if delta > SnowflakeId::max_timestamp() {
            delta = SnowflakeId::max_timestamp() + 1;
        }
        (delta << SnowflakeId::SEQUENCE_BITS) | self.sequence as u64
    }

    pub(crate) const fn unpack(raw: u64, epoch_ms: u64) -> Self {
        if raw == u64::MAX {
            return Self::new(None, 0);
        }
        Self::new(
            Some(epoch_ms.saturating_add(raw >> SnowflakeId::SEQUENCE_BITS)),
            (raw & SnowflakeId::SEQUENCE_MASK) as u16,
        )
    }

    /// Decides the next `(timestamp, sequence)` for a clock reading of
    /// `now`. Never mutates; callers commit only after encoding succeeds.
    pub(crate) fn step(self, now: u64) -> Result<Step> {
        let Some(last) = self.last_timestamp else {
            return Ok(Step::Ready {
                timestamp: now,
                sequence: 0,
            });
        };

        match now.cmp(&last) {
            Ordering::Greater => Ok(Step::Ready {
                timestamp: now,
                sequence: 0,
            }),
            Ordering::Equal => {
                if u64::from(self.sequence) < SnowflakeId::max_sequence() {
                    Ok(Step::Ready {
                        timestamp: now,
                        sequence: self.sequence + 1,
                    })
                } else {
                    Ok(Step::Exhausted { last })
                }
            }
            Ordering::Less => Err(cold_clock_behind(now, last)),
        }
    }
}

#[cold]
#[inline(never)]
fn cold_clock_behind(now: u64, last: u64) -> Error {
    Error::ClockMovedBackward { now, last }
}

/// Spins until the clock strictly exceeds `last` and returns that reading.
pub(crate) fn wait_next_millis<T: TimeSource>(time: &T, last: u64) -> u64 {
    #[cfg(feature = "tracing")]
    tracing::trace!(last, "sequence exhausted, waiting for next millisecond");

    loop {
        let now = time.current_millis();
        if now > last {
            return now;
        }
        core::hint::spin_loop();
    }
}

/// Builds the ID for a committed `(timestamp, sequence)` pair.
pub(crate) fn encode(
    epoch_ms: u64,
    node_id: NodeId,
    timestamp: u64,
    sequence: u16,
) -> Result<SnowflakeId> {
    let delta = timestamp
        .checked_sub(epoch_ms)
        .filter(|delta| *delta <= SnowflakeId::max_timestamp())
        .ok_or(Error::TimestampOutOfRange {
            millis: timestamp,
            epoch: epoch_ms,
        })?;
    Ok(SnowflakeId::from_parts(delta, node_id, sequence))
}
