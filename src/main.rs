//! Console front end: reads integers from stdin, prints flushed batches to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use ring_pipeline::console::{self, ConsoleObserver};
use ring_pipeline::{
    PipelineBuilder, PipelineConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_INTERVAL,
};
use std::io;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter integers from stdin and print the buffered survivors periodically
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of values kept before the oldest is evicted
    #[arg(short, long, default_value_t = DEFAULT_BUFFER_CAPACITY)]
    capacity: usize,

    /// Seconds between buffer flushes
    #[arg(short, long, default_value_t = DEFAULT_FLUSH_INTERVAL.as_secs())]
    interval_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout only carries results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ring_pipeline={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!(version = ring_pipeline::VERSION, "starting ring pipeline");

    let config = PipelineConfig {
        buffer_capacity: args.capacity,
        flush_interval: Duration::from_secs(args.interval_secs),
    };

    let running = PipelineBuilder::new()
        .config(config)
        .build()
        .context("invalid pipeline configuration")?
        .start(ConsoleObserver::new(io::stdout()))
        .context("failed to start pipeline")?;

    let result = console::run(io::stdin().lock(), io::stdout(), &running);

    debug!("{}", running.metrics_summary());
    running.wait().context("failed to stop pipeline")?;
    result.context("reading standard input")?;
    Ok(())
}
