//! # snowgen
//!
//! Single-node Snowflake ID generation.
//!
//! Every ID is a 64-bit integer packed from most to least significant bit as:
//!
//! ```text
//!  +------+----------------------+-------------+---------------+
//!  | sign | timestamp delta (41) | node id(10) | sequence (12) |
//!  +------+----------------------+-------------+---------------+
//! ```
//!
//! The sign bit is always zero, so IDs are also valid non-negative `i64`s.
//!
//! Two generators are provided:
//!
//! - [`IdGenerator`]: a mutex guards the whole generation step, including the
//!   clock read and the spin into the next millisecond when the sequence is
//!   exhausted.
//! - [`AtomicIdGenerator`]: a compare-and-swap loop over a packed
//!   `(timestamp, sequence)` word.
//!
//! Both are strictly monotonic per instance and return
//! [`Error::ClockMovedBackward`] when the wall clock regresses, leaving
//! their state untouched.
//!
//! ```
//! use snowgen::{IdGenerator, SnowflakeId};
//!
//! let generator = IdGenerator::new(1)?;
//! let a = generator.next_id()?;
//! let b = generator.next_id()?;
//!
//! assert!(a < b);
//! assert_eq!(a.node_id(), 1);
//! assert!(b.sequence() <= SnowflakeId::max_sequence());
//! # Ok::<(), snowgen::Error>(())
//! ```
//!
//! ## Feature flags
//!
//! - `parking-lot`: use `parking_lot::Mutex` (no lock poisoning).
//! - `cache-padded`: pad generator state to a cache line.
//! - `tracing`: trace-level spans around generation.
//! - `serde`: (de)serialize [`SnowflakeId`] as its native integer.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod generator;
mod id;
mod node;
#[cfg(feature = "serde")]
mod serde;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::node::*;
pub use crate::time::*;
