use std::{io::Write, time::Duration};

use serde::Serialize;
use snowgen::SnowflakeId;

/// The decoded fields of one ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decoded {
    pub id: SnowflakeId,
    /// Milliseconds since the generator epoch.
    pub timestamp: u64,
    /// Milliseconds since the Unix epoch.
    pub unix_ms: u64,
    pub node_id: u64,
    pub sequence: u64,
}

impl Decoded {
    pub fn new(id: SnowflakeId, epoch: Duration) -> Self {
        Self {
            id,
            timestamp: id.timestamp(),
            unix_ms: id.unix_millis(epoch),
            node_id: id.node_id(),
            sequence: id.sequence(),
        }
    }
}

/// Writes a bare ID, or the decoded fields as one JSON line.
pub fn write_id(
    out: &mut impl Write,
    id: SnowflakeId,
    epoch: Duration,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        serde_json::to_writer(&mut *out, &Decoded::new(id, epoch))?;
        writeln!(out)?;
    } else {
        writeln!(out, "{id}")?;
    }
    Ok(())
}

/// Writes the decoded fields, one `name: value` per line.
pub fn write_decoded(
    out: &mut impl Write,
    id: SnowflakeId,
    epoch: Duration,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return write_id(out, id, epoch, true);
    }
    let decoded = Decoded::new(id, epoch);
    writeln!(out, "id:        {}", decoded.id)?;
    writeln!(out, "timestamp: {}", decoded.timestamp)?;
    writeln!(out, "unix_ms:   {}", decoded.unix_ms)?;
    writeln!(out, "node_id:   {}", decoded.node_id)?;
    writeln!(out, "sequence:  {}", decoded.sequence)?;
    Ok(())
}
