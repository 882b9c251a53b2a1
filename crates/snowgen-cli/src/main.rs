mod config;
mod output;
mod telemetry;

use std::io::{BufWriter, Write};

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, Command, Config, GeneratorKind};
use snowgen::{AtomicIdGenerator, IdGenerator, SnowflakeGenerator, SnowflakeId, SystemClock};

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    telemetry::init_logging();

    let config = Config::try_from(args).inspect_err(|e| tracing::error!("{e:#}"))?;
    tracing::debug!(
        node_id = %config.node_id,
        epoch_ms = config.epoch.as_millis() as u64,
        generator = ?config.generator,
        "starting"
    );

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match &config.command {
        Command::Generate { count, json } => {
            let generator = build_generator(&config);
            generate(generator.as_ref(), *count, *json, &config, &mut out)?;
        }
        Command::Decode { id, json } => {
            let id: SnowflakeId = id.parse().context("cannot decode id")?;
            output::write_decoded(&mut out, id, config.epoch, *json)?;
        }
    }

    out.flush().context("failed to flush stdout")?;
    Ok(())
}

fn build_generator(config: &Config) -> Box<dyn SnowflakeGenerator<SystemClock>> {
    match config.generator {
        GeneratorKind::Lock => Box::new(IdGenerator::from_node(
            config.node_id,
            config.epoch,
            SystemClock,
        )),
        GeneratorKind::Atomic => Box::new(AtomicIdGenerator::from_node(
            config.node_id,
            config.epoch,
            SystemClock,
        )),
    }
}

fn generate(
    generator: &dyn SnowflakeGenerator<SystemClock>,
    count: u64,
    json: bool,
    config: &Config,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    for n in 0..count {
        let id = generator
            .next_id()
            .inspect_err(|e| tracing::warn!(generated = n, "generation failed: {e}"))
            .with_context(|| format!("failed to generate id {} of {count}", n + 1))?;
        output::write_id(out, id, config.epoch, json)?;
    }
    tracing::info!(count, node_id = %generator.node_id(), "generated ids");
    Ok(())
}
