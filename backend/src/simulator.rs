// Sensor simulator binary entry point

mod store_config;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agriweather_backend::{
    group_hourly, shard_path, validate_coordinates, validate_device_id, Location, ReadingStore,
    SensorSimulator,
};
use store_config::StoreConfig;

pub const DEFAULT_DEVICE_ID: &str = "agriweather-device-001";

#[derive(Debug, Parser)]
#[command(name = "simulator")]
#[command(about = "Synthetic weather station writing readings into the shard store", long_about = None)]
struct Cli {
    #[arg(long, env = "DEVICE_ID", default_value = DEFAULT_DEVICE_ID)]
    device_id: String,

    #[arg(long, env = "DEVICE_LAT", default_value_t = 50.0, allow_negative_numbers = true)]
    latitude: f64,

    #[arg(long, env = "DEVICE_LON", default_value_t = 20.0, allow_negative_numbers = true)]
    longitude: f64,

    /// Seconds between live readings
    #[arg(long, env = "SEND_INTERVAL", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Live mode when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write historical readings grouped into hourly shards
    Backfill {
        /// How many hours ago the first reading is taken
        #[arg(default_value_t = 24, value_parser = clap::value_parser!(i64).range(0..))]
        hours: i64,

        /// Number of readings, 15 minutes apart
        #[arg(default_value_t = 50)]
        count: usize,
    },
}

/// Append one reading per interval onto the current minute shard until Ctrl-C
async fn run_live(
    store: &ReadingStore,
    simulator: &mut SensorSimulator,
    interval: Duration,
) -> anyhow::Result<()> {
    info!(
        device_id = %simulator.device_id(),
        interval_secs = interval.as_secs(),
        "Simulator started in live mode"
    );

    let mut ticker = tokio::time::interval(interval);
    let mut sent = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                let reading = simulator.next_reading(now);
                let shard = shard_path(simulator.device_id(), now);

                match store.append_reading(&shard, reading).await {
                    Ok(in_shard) => {
                        sent += 1;
                        info!(shard = %shard, in_shard, sent, "Reading uploaded");
                    }
                    Err(e) => warn!(shard = %shard, error = %e, "Failed to upload reading"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(sent, "Simulator stopped");
                return Ok(());
            }
        }
    }
}

/// Generate `count` readings starting `hours` ago and write them hour by hour.
/// Returns the number of shards written.
async fn run_backfill(
    store: &ReadingStore,
    simulator: &mut SensorSimulator,
    hours: i64,
    count: usize,
) -> anyhow::Result<usize> {
    let readings = simulator.backfill(Utc::now(), hours, count);
    let shards = group_hourly(simulator.device_id(), readings);

    for (name, readings) in &shards {
        store
            .write_readings(name, readings)
            .await
            .with_context(|| format!("Failed to write shard {}", name))?;
        info!(shard = %name, readings = readings.len(), "Shard written");
    }

    info!(
        device_id = %simulator.device_id(),
        shards = shards.len(),
        readings = count,
        "Backfill complete"
    );
    Ok(shards.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    validate_device_id(&cli.device_id)?;
    validate_coordinates(cli.latitude, cli.longitude)?;

    let store = StoreConfig::from_env()?
        .connect()?
        .context("No reading store configured (set STORAGE_ACCOUNT_NAME/STORAGE_ACCOUNT_KEY, S3_BUCKET or DATA_DIR)")?;

    let location = Location {
        latitude: cli.latitude,
        longitude: cli.longitude,
    };
    let mut simulator = SensorSimulator::new(&cli.device_id, location, Utc::now());

    match cli.command {
        Some(Command::Backfill { hours, count }) => {
            run_backfill(&store, &mut simulator, hours, count).await?;
        }
        None => {
            run_live(&store, &mut simulator, Duration::from_secs(cli.interval)).await?;
        }
    }

    Ok(())
}
