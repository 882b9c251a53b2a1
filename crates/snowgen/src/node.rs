use core::fmt;

use crate::{Error, Result};

/// A validated node identifier in `[0, 1023]`.
///
/// Every generator instance in a fleet must be given a distinct node id;
/// `snowgen` only checks the range, never fleet-wide uniqueness.
///
/// ```
/// use snowgen::NodeId;
///
/// assert!(NodeId::try_from(1023).is_ok());
/// assert!(NodeId::try_from(1024).is_err());
/// assert!(NodeId::try_from(-1).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u16);

impl NodeId {
    /// Largest node id that fits the 10-bit node field.
    pub const MAX: u16 = (1 << 10) - 1;

    /// Validates `node_id` against the node field width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `node_id > 1023`.
    pub const fn new(node_id: u16) -> Result<Self> {
        if node_id > Self::MAX {
            return Err(Error::InvalidConfiguration {
                node_id: node_id as i128,
                max: Self::MAX,
            });
        }
        Ok(Self(node_id))
    }

    /// Returns the raw node id.
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<NodeId> for u16 {
    fn from(node_id: NodeId) -> Self {
        node_id.0
    }
}

macro_rules! impl_try_from_int {
    ($($int:ty),* $(,)?) => {
        $(
            impl TryFrom<$int> for NodeId {
                type Error = Error;

                fn try_from(node_id: $int) -> Result<Self> {
                    match u16::try_from(node_id) {
                        Ok(raw) if raw <= Self::MAX => Ok(Self(raw)),
                        _ => Err(Error::InvalidConfiguration {
                            node_id: node_id as i128,
                            max: Self::MAX,
                        }),
                    }
                }
            }
        )*
    };
}

impl_try_from_int!(i16, i32, i64, u16, u32, u64, usize);
