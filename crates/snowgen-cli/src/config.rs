use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use snowgen::{EPOCH, NodeId};

/// Runtime configuration for the `snowgen` binary.
///
/// Global settings are parsed from CLI arguments or environment variables
/// (a `.env` file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "snowgen",
    version,
    about = "Generate and decode 64-bit Snowflake IDs"
)]
pub struct CliArgs {
    /// Node identifier encoded into every ID, in `[0, 1023]`.
    ///
    /// Must be unique per running generator across the fleet; this tool only
    /// checks the range.
    ///
    /// Environment variable: `NODE_ID`
    #[arg(long, env = "NODE_ID", default_value_t = 0, allow_negative_numbers = true, global = true)]
    pub node_id: i64,

    /// Epoch in milliseconds since the Unix epoch that ID timestamps are
    /// measured from. Must not be in the future.
    ///
    /// Environment variable: `EPOCH_MS`
    #[arg(long, env = "EPOCH_MS", default_value_t = EPOCH.as_millis() as u64, global = true)]
    pub epoch_ms: u64,

    /// Generator strategy.
    ///
    /// Environment variable: `GENERATOR`
    #[arg(long, env = "GENERATOR", value_enum, default_value_t = GeneratorKind::Lock, global = true)]
    pub generator: GeneratorKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate IDs and print one per line.
    Generate {
        /// Number of IDs to generate.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u64,

        /// Print each ID with its decoded fields as a JSON object.
        #[arg(long)]
        json: bool,
    },
    /// Print the fields packed into an ID.
    Decode {
        /// The ID as a decimal integer.
        id: String,

        /// Print as a JSON object.
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// Mutex-guarded generator.
    Lock,
    /// Compare-and-swap generator.
    Atomic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub node_id: NodeId,
    pub epoch: Duration,
    pub generator: GeneratorKind,
    pub command: Command,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let node_id = NodeId::try_from(args.node_id).context("NODE_ID is invalid")?;

        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .context("system clock is before 1970")?
            .as_millis();
        if u128::from(args.epoch_ms) > now_ms {
            bail!(
                "EPOCH_MS ({}) is in the future (now = {now_ms})",
                args.epoch_ms
            );
        }

        if let Command::Generate { count: 0, .. } = args.command {
            bail!("--count must be greater than 0");
        }

        Ok(Self {
            node_id,
            epoch: Duration::from_millis(args.epoch_ms),
            generator: args.generator,
            command: args.command,
        })
    }
}
