//! Rescale migration for network percent metrics
//!
//! Rewrites every sample recorded before the cutoff, multiplied by the
//! conversion factor, under the same series, tags and timestamp.
//!
//! Usage:
//!   cargo run --bin rescale-migrate -- --influxip 10.0.0.5:8086 --chunks 200 --dryrun

use influx_rescale::config::{database_for_customer, ComponentFactory, MigrationConfig, StoreConfig};
use influx_rescale::migrate::Migrator;
use influx_rescale::telemetry::{self, LogFormat};

use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

/// Chunked rescale migration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dry run - read and transform, but don't write
    #[arg(long = "dryrun", env = "RESCALE_DRY_RUN", default_value = "false")]
    dry_run: bool,

    /// InfluxDB host (optionally host:port or a full URL)
    #[arg(long = "influxip", env = "INFLUX_IP", default_value = "172.17.42.1")]
    influx_ip: String,

    /// Number of chunks to split each metric's history into
    #[arg(long, env = "RESCALE_CHUNKS", default_value = "100")]
    chunks: u64,

    /// Customer whose database is migrated
    #[arg(
        long,
        env = "RESCALE_CUSTOMER_ID",
        default_value = "416c300b-2164-4ecd-92e0-ff77fcf08bec"
    )]
    customer_id: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: LogFormat,
}

async fn run(args: Args) -> anyhow::Result<()> {
    let store_config = StoreConfig {
        address: args.influx_ip.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        ..Default::default()
    };
    let store = ComponentFactory::create_store_client(&store_config)?;

    let config = MigrationConfig {
        chunks: args.chunks,
        dry_run: args.dry_run,
        database: database_for_customer(&args.customer_id),
        ..Default::default()
    };

    let mut migrator = Migrator::new(config, store)?;
    let report = migrator.run().await?;

    println!();
    for metric in &report.metrics {
        info!(
            metric = %metric.metric,
            skipped = metric.skipped,
            chunks = metric.chunks_processed,
            accepted = metric.accepted,
            rejected = metric.rejected,
            points_written = metric.points_written,
            "Metric summary"
        );
    }
    if report.dry_run {
        info!("DRY RUN - No changes were made");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = telemetry::init_logging(&args.log_level, args.log_format) {
        eprintln!("{e}");
        std::process::exit(2);
    }

    info!(
        influx_ip = %args.influx_ip,
        chunks = args.chunks,
        dry_run = args.dry_run,
        customer_id = %args.customer_id,
        "Starting rescale migration"
    );

    if let Err(e) = run(args).await {
        error!(error = %e, "Migration aborted");
        std::process::exit(1);
    }
}
