use core::{fmt, str::FromStr};

use crate::{Error, NodeId};

/// A 64-bit Snowflake ID.
///
/// ## Bit layout
///
/// The ID is packed from **MSB to LSB**:
///
/// ```text
///  Bit Index:  63           63 62            22 21             12 11             0
///              +--------------+----------------+-----------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | node id (10)    | sequence (12) |
///              +--------------+----------------+-----------------+---------------+
///              |<----------- MSB ---------- 64 bits ----------- LSB ------------>|
/// ```
///
/// The timestamp is the number of milliseconds since the generator's epoch.
/// The reserved bit is always zero, so every ID is a non-negative `i64`.
///
/// IDs order by timestamp, then node id, then sequence, which is the same as
/// ordering their raw integers.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Width of the reserved sign bit.
    pub const RESERVED_BITS: u64 = 1;
    /// Width of the timestamp field.
    pub const TIMESTAMP_BITS: u64 = 41;
    /// Width of the node id field.
    pub const NODE_ID_BITS: u64 = 10;
    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u64 = 12;

    /// Bit offset of the sequence field.
    pub const SEQUENCE_SHIFT: u64 = 0;
    /// Bit offset of the node id field.
    pub const NODE_ID_SHIFT: u64 = Self::SEQUENCE_SHIFT + Self::SEQUENCE_BITS;
    /// Bit offset of the timestamp field.
    pub const TIMESTAMP_SHIFT: u64 = Self::NODE_ID_SHIFT + Self::NODE_ID_BITS;
    /// Bit offset of the reserved sign bit.
    pub const RESERVED_SHIFT: u64 = Self::TIMESTAMP_SHIFT + Self::TIMESTAMP_BITS;

    /// Mask of the reserved bit, before shifting.
    pub const RESERVED_MASK: u64 = (1 << Self::RESERVED_BITS) - 1;
    /// Mask of the timestamp field, before shifting.
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;
    /// Mask of the node id field, before shifting.
    pub const NODE_ID_MASK: u64 = (1 << Self::NODE_ID_BITS) - 1;
    /// Mask of the sequence field, before shifting.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Packs the three fields into an ID. Each value is masked to its field
    /// width.
    pub const fn from_components(timestamp: u64, node_id: u64, sequence: u64) -> Self {
        let t = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let n = (node_id & Self::NODE_ID_MASK) << Self::NODE_ID_SHIFT;
        let s = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self { id: t | n | s }
    }

    pub(crate) const fn from_parts(timestamp: u64, node_id: NodeId, sequence: u16) -> Self {
        Self::from_components(timestamp, node_id.get() as u64, sequence as u64)
    }

    /// Extracts the timestamp (milliseconds since the epoch).
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the node id.
    pub const fn node_id(&self) -> u64 {
        (self.id >> Self::NODE_ID_SHIFT) & Self::NODE_ID_MASK
    }

    /// Extracts the sequence number.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Largest encodable timestamp, `2^41 - 1`.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Largest encodable node id, `1023`.
    pub const fn max_node_id() -> u64 {
        Self::NODE_ID_MASK
    }

    /// Largest sequence number within one millisecond, `4095`.
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// Returns `true` if the reserved sign bit is clear.
    pub const fn is_valid(&self) -> bool {
        (self.id >> Self::RESERVED_SHIFT) & Self::RESERVED_MASK == 0
    }

    /// Returns the raw integer.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Wraps a raw integer without validation; see [`Self::is_valid`].
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the ID as a signed integer. Valid IDs are never negative.
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Returns the timestamp as milliseconds since the Unix epoch, given the
    /// epoch the ID was generated against.
    pub const fn unix_millis(&self, epoch: core::time::Duration) -> u64 {
        self.timestamp() + epoch.as_millis() as u64
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("node_id", &self.node_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl FromStr for SnowflakeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().parse::<u64>().map_err(|e| Error::ParseId {
            reason: e.to_string(),
        })?;
        let id = Self::from_raw(raw);
        if !id.is_valid() {
            return Err(Error::ParseId {
                reason: format!("{raw} has the reserved bit set"),
            });
        }
        Ok(id)
    }
}
